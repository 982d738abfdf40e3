// Overlay pipeline: mod storage, packaging, prebuild coordination
mod cache;
pub mod coordinator;
mod core;
mod error;
mod game_config;
pub mod historic;
mod job;
mod mod_tools;
pub mod storage;

pub use cache::PrebuiltCache;
pub use coordinator::{CoordinatorStatus, OverlayBuilder, PrebuildCoordinator};
pub use self::core::{InjectorPaths, SkinInjector};
pub use error::{InjectionError, ModState};
pub use game_config::enable_mods_in_game_cfg;
pub use historic::{HistoricEntry, HistoricStore};
pub use job::{BuildArtifact, BuildTarget, PrebuildJob};
pub use mod_tools::ModTools;
pub use storage::{ModPackage, ModStorage, PackageKind, StageReport};
