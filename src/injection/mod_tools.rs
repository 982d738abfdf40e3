use std::env;
use std::fs;
use std::io;
#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::injection::error::InjectionError;

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

#[cfg(target_os = "windows")]
const MOD_TOOLS_EXE: &str = "mod-tools.exe";
#[cfg(not(target_os = "windows"))]
const MOD_TOOLS_EXE: &str = "mod-tools";

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const MKOVERLAY_ATTEMPTS: u32 = 3;
// STATUS_ACCESS_VIOLATION; mkoverlay occasionally crashes with it under load
const ACCESS_VIOLATION: i32 = 0xC000_0005_u32 as i32;

// Wrapper around the external packaging tool (mkoverlay / runoverlay)
pub struct ModTools {
    exe: Option<PathBuf>,
    timeout: Duration,
    overlay_process: Mutex<Option<Child>>,
}

impl ModTools {
    pub fn new(exe: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            exe,
            timeout,
            overlay_process: Mutex::new(None),
        }
    }

    /// Look for the tool: explicit path, then the data dir, then next to
    /// the running executable.
    pub fn locate(explicit: Option<&Path>, data_dir: &Path) -> Option<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Some(path.to_path_buf());
            }
            warn!("[ModTools] Configured mod-tools path does not exist: {}", path.display());
        }

        let mut candidates = vec![
            data_dir.join("cslol-tools").join(MOD_TOOLS_EXE),
            data_dir.join(MOD_TOOLS_EXE),
        ];
        if let Some(exe_dir) = env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
            candidates.push(exe_dir.join("cslol-tools").join(MOD_TOOLS_EXE));
            candidates.push(exe_dir.join(MOD_TOOLS_EXE));
        }
        candidates.into_iter().find(|c| c.exists())
    }

    pub fn exe(&self) -> Result<&Path, InjectionError> {
        match &self.exe {
            Some(path) if path.exists() => Ok(path),
            Some(path) => Err(InjectionError::Process(format!(
                "mod-tools was found during initialization but is no longer at path: {}",
                path.display()
            ))),
            None => Err(InjectionError::Process("mod-tools not found".into())),
        }
    }

    fn command(&self) -> Result<Command, InjectionError> {
        #[allow(unused_mut)]
        let mut command = Command::new(self.exe()?);
        #[cfg(target_os = "windows")]
        command.creation_flags(CREATE_NO_WINDOW);
        command.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        Ok(command)
    }

    /// Compile staged mods into an overlay. Stops early when `cancel` fires
    /// or the configured timeout passes.
    pub fn mkoverlay(
        &self,
        mods_dir: &Path,
        overlay_dir: &Path,
        game_path: &Path,
        mod_names: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), InjectionError> {
        let mods_arg = mod_names.join("/");
        let mut attempt = 1;
        loop {
            let mut command = self.command()?;
            command
                .arg("mkoverlay")
                .arg(mods_dir)
                .arg(overlay_dir)
                .arg(format!("--game:{}", game_path.display()))
                .arg(format!("--mods:{}", mods_arg))
                .args(["--noTFT", "--ignoreConflict"]);

            let started = Instant::now();
            let child = command.spawn().map_err(|e| {
                InjectionError::Process(format!("Failed to start mkoverlay: {}", e))
            })?;
            let status = self.wait_cancellable(child, cancel)?;
            debug!("[ModTools] mkoverlay finished in {:?} with {}", started.elapsed(), status);

            if status.success() {
                return Ok(());
            }
            if status.code() == Some(ACCESS_VIOLATION) && attempt < MKOVERLAY_ATTEMPTS {
                warn!(
                    "[ModTools] Access violation in mkoverlay (attempt {}/{}). Retrying...",
                    attempt, MKOVERLAY_ATTEMPTS
                );
                attempt += 1;
                continue;
            }
            return Err(InjectionError::Process(format!("mkoverlay exited with {}", status)));
        }
    }

    fn wait_cancellable(
        &self,
        mut child: Child,
        cancel: &CancellationToken,
    ) -> Result<std::process::ExitStatus, InjectionError> {
        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(InjectionError::Cancelled);
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(InjectionError::Timeout(format!(
                    "mkoverlay did not finish within {:?}",
                    self.timeout
                )));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Start the overlay process for the game session.
    pub fn run_overlay(&self, overlay_dir: &Path, config_path: &Path, game_path: &Path) -> Result<(), InjectionError> {
        fs::write(config_path, r#"{"enableMods":true}"#)?;

        self.stop_overlay();
        self.kill_stale();

        let mut command = self.command()?;
        command
            .arg("runoverlay")
            .arg(overlay_dir)
            .arg(config_path)
            .arg(format!("--game:{}", game_path.display()))
            .arg("--opts:configless");

        let child = command.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => InjectionError::Process(format!(
                "mod-tools not found or is inaccessible: {}",
                e
            )),
            io::ErrorKind::PermissionDenied => {
                InjectionError::Process("Permission denied when trying to run mod-tools".into())
            }
            _ => InjectionError::Process(format!("Error running mod-tools: {}", e)),
        })?;

        info!("[ModTools] Overlay process started (pid {})", child.id());
        if let Ok(mut slot) = self.overlay_process.lock() {
            *slot = Some(child);
        }
        Ok(())
    }

    pub fn stop_overlay(&self) {
        let child = self.overlay_process.lock().ok().and_then(|mut slot| slot.take());
        if let Some(mut child) = child {
            let _ = child.kill();
            let _ = child.wait();
            info!("[ModTools] Overlay process stopped");
        }
    }

    pub fn is_overlay_running(&self) -> bool {
        match self.overlay_process.lock() {
            Ok(mut slot) => match slot.as_mut().map(|c| c.try_wait()) {
                Some(Ok(None)) => true,
                _ => false,
            },
            Err(_) => false,
        }
    }

    // Kill overlay processes we don't hold a handle for (previous match,
    // previous agent run)
    pub fn kill_stale(&self) {
        #[cfg(target_os = "windows")]
        {
            let mut command = Command::new("taskkill");
            command.args(["/F", "/IM", MOD_TOOLS_EXE]);
            command.creation_flags(CREATE_NO_WINDOW);
            if let Err(e) = command.output() {
                warn!("[ModTools] Could not run taskkill: {}", e);
            }
        }

        #[cfg(not(target_os = "windows"))]
        {
            let mut command = Command::new("pkill");
            command.args(["-f", MOD_TOOLS_EXE]);
            if let Err(e) = command.output() {
                debug!("[ModTools] Could not run pkill: {}", e);
            }
        }
    }
}
