use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, info, warn};

use crate::injection::coordinator::OverlayBuilder;
use crate::injection::error::{InjectionError, ModState};
use crate::injection::game_config::enable_mods_in_game_cfg;
use crate::injection::job::{BuildArtifact, BuildTarget, PrebuildJob};
use crate::injection::mod_tools::ModTools;
use crate::injection::storage::{self, ModPackage, ModStorage};

// Where the injector writes
#[derive(Debug, Clone)]
pub struct InjectorPaths {
    pub prebuilt_dir: PathBuf,
    pub overlay_dir: PathBuf,
    pub overlay_config: PathBuf,
}

// Builds overlays from mod packages and runs the live one
pub struct SkinInjector {
    state: Mutex<ModState>,
    game_path: PathBuf, // Game subdirectory of the client install
    paths: InjectorPaths,
    storage: ModStorage,
    tools: ModTools,
}

impl SkinInjector {
    pub fn new(
        league_path: &Path,
        paths: InjectorPaths,
        storage: ModStorage,
        tools: ModTools,
    ) -> Result<Self, InjectionError> {
        let game_path = league_path.join("Game");
        if !game_path.is_dir() {
            return Err(InjectionError::InvalidGamePath(format!("{} does not exist", game_path.display())));
        }

        storage.ensure_layout()?;
        fs::create_dir_all(&paths.prebuilt_dir)?;
        fs::create_dir_all(&paths.overlay_dir)?;

        let injector = Self {
            state: Mutex::new(ModState::Idle),
            game_path,
            paths,
            storage,
            tools,
        };
        // Leftovers from a previous run are never valid
        storage::purge(&injector.paths.prebuilt_dir);
        Ok(injector)
    }

    pub fn state(&self) -> ModState {
        self.state.lock().map(|s| *s).unwrap_or(ModState::CriticalError)
    }

    fn set_state(&self, new_state: ModState) {
        if let Ok(mut state) = self.state.lock() {
            if *state != new_state {
                debug!("[Injector] State changed to {:?}", new_state);
                *state = new_state;
            }
        }
    }

    fn job_dir(&self, job: &PrebuildJob) -> PathBuf {
        self.paths.prebuilt_dir.join(job.id.simple().to_string())
    }

    pub fn resolve_package(&self, target: &BuildTarget) -> Option<ModPackage> {
        match target {
            BuildTarget::Cosmetic { cosmetic_id, chroma_id } => chroma_id
                .and_then(|chroma| self.storage.resolve(chroma))
                .or_else(|| self.storage.resolve(*cosmetic_id)),
            BuildTarget::Custom { relative_path } => self.storage.resolve_relative(relative_path),
        }
    }

    // Cancellation boundary inside a build
    fn checkpoint(job: &PrebuildJob, stage: &str) -> Result<(), InjectionError> {
        if job.is_cancelled() {
            debug!("[Injector] Job {} cancelled {}", job.short_id(), stage);
            return Err(InjectionError::Cancelled);
        }
        Ok(())
    }

    fn build_into(&self, job: &PrebuildJob, job_dir: &Path) -> Result<BuildArtifact, InjectionError> {
        let package = self
            .resolve_package(&job.target)
            .ok_or_else(|| InjectionError::MissingPackage(job.target.key()))?;
        let mod_name = package.mod_name();

        let mods_dir = job_dir.join("mods");
        let overlay_out = job_dir.join("overlay");
        fs::create_dir_all(mods_dir.join(&mod_name))?;
        fs::create_dir_all(&overlay_out)?;

        Self::checkpoint(job, "before staging")?;
        self.storage.stage(&package, &mods_dir.join(&mod_name))?;
        Self::checkpoint(job, "after staging")?;

        self.tools
            .mkoverlay(&mods_dir, &overlay_out, &self.game_path, &[mod_name], &job.cancel)?;

        Ok(BuildArtifact {
            job_id: job.id,
            champion_id: job.champion_id,
            target: job.target.clone(),
            output_dir: Some(job_dir.to_path_buf()),
        })
    }

    // Move the prebuilt overlay into the live overlay path
    fn install_overlay(&self, job_dir: &Path) -> Result<(), InjectionError> {
        let source = job_dir.join("overlay");
        let live = &self.paths.overlay_dir;

        storage::purge(live);
        if live.exists() {
            fs::remove_dir(live)?;
        }
        if fs::rename(&source, live).is_err() {
            debug!("[Injector] Rename failed, linking overlay instead");
            storage::link_tree(&source, live)?;
        }
        storage::remove_with_retries(job_dir);
        Ok(())
    }
}

impl OverlayBuilder for SkinInjector {
    fn build(&self, job: &PrebuildJob) -> Result<BuildArtifact, InjectionError> {
        Self::checkpoint(job, "before start")?;
        self.set_state(ModState::Busy);

        let job_dir = self.job_dir(job);
        let result = self.build_into(job, &job_dir);
        if result.is_err() {
            // Partial output never outlives a cancelled or failed build
            storage::remove_with_retries(&job_dir);
        }
        self.set_state(if self.tools.is_overlay_running() { ModState::Running } else { ModState::Idle });
        result
    }

    fn discard(&self, artifact: &BuildArtifact) {
        if let Some(dir) = &artifact.output_dir {
            storage::remove_with_retries(dir);
        }
    }

    fn activate(&self, artifact: &BuildArtifact) -> Result<(), InjectionError> {
        let Some(job_dir) = &artifact.output_dir else {
            info!("[Injector] {} needs no overlay; nothing to inject", artifact.target.key());
            return Ok(());
        };

        enable_mods_in_game_cfg(&self.game_path)?;
        self.tools.stop_overlay();
        self.install_overlay(job_dir)?;

        match self
            .tools
            .run_overlay(&self.paths.overlay_dir, &self.paths.overlay_config, &self.game_path)
        {
            Ok(()) => {
                self.set_state(ModState::Running);
                info!("[Injector] Activated overlay for {}", artifact.target.key());
                Ok(())
            }
            Err(e) => {
                self.set_state(ModState::CriticalError);
                Err(e)
            }
        }
    }

    fn stop_overlay(&self) {
        self.tools.stop_overlay();
        self.set_state(ModState::Idle);
    }

    fn kill_stale_overlays(&self) {
        self.tools.kill_stale();
    }

    fn purge_outputs(&self) {
        let left = storage::purge(&self.paths.prebuilt_dir) + storage::purge(&self.paths.overlay_dir);
        if left > 0 {
            warn!("[Injector] {} overlay entries could not be removed", left);
        }
    }
}
