//! Game-client collaborator.
//!
//! Monitors depend on the narrow capability traits below; `LcuClient`
//! implements all of them against the client's local HTTPS API.

mod client;
mod lockfile;
pub mod session;

pub use client::LcuClient;
pub use lockfile::{read_lockfile, LcuConnection};

use crate::catalog::CatalogEntry;
use crate::state::Phase;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LcuError {
  #[error("lockfile not found under {0}")]
  LockfileNotFound(String),
  #[error("not connected to the client")]
  NotConnected,
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),
  #[error("unexpected status {0} from {1}")]
  Status(u16, String),
  #[error("could not parse response: {0}")]
  Parse(String),
}

impl From<serde_json::Error> for LcuError {
  fn from(err: serde_json::Error) -> Self {
    Self::Parse(err.to_string())
  }
}

/// Countdown of the current champion-select sub-phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadoutTimer {
  pub phase: String,
  pub remaining_ms: u64,
}

impl LoadoutTimer {
  /// The final loadout window before the game locks assets.
  pub fn is_finalization(&self) -> bool {
    self.phase.eq_ignore_ascii_case("FINALIZATION")
  }
}

pub trait PhaseSource: Send + Sync {
  fn get_phase(&self) -> Result<Phase, LcuError>;
}

pub trait ChampSelectSource: Send + Sync {
  fn get_hovered_champion(&self) -> Result<Option<u32>, LcuError>;
  fn get_locked_champion(&self) -> Result<Option<u32>, LcuError>;
  fn get_loadout_timer(&self) -> Result<Option<LoadoutTimer>, LcuError>;
}

pub trait InventorySource: Send + Sync {
  fn get_owned_cosmetics(&self) -> Result<Vec<u32>, LcuError>;
}

pub trait NameCatalog: Send + Sync {
  fn get_client_language(&self) -> Result<String, LcuError>;
  /// Cosmetic names for one champion in catalog order.
  fn get_cosmetic_names(&self, champion_id: u32, language: &str) -> Result<Vec<CatalogEntry>, LcuError>;
}

/// Everything the agent needs from the client.
pub trait GameClient: PhaseSource + ChampSelectSource + InventorySource + NameCatalog {}

impl<T> GameClient for T where T: PhaseSource + ChampSelectSource + InventorySource + NameCatalog {}
