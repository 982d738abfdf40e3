//! Prebuild coordinator.
//!
//! Turns the stream of selection changes into at most one in-flight overlay
//! build, and activates the freshest finished build when the loadout
//! countdown reaches the injection threshold.
//!
//! ```text
//! Idle --select(x)--> Building(x) --ok--> Ready(x) --deadline--> activate(x)
//!                         |  \--err--> Failed   (next select retries)
//!                         \--select(y)--> Building(y)   (x cancelled)
//! ```

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::injection::cache::PrebuiltCache;
use crate::injection::error::InjectionError;
use crate::injection::historic::{HistoricEntry, HistoricStore};
use crate::injection::job::{BuildArtifact, BuildTarget, PrebuildJob};
use crate::state::SharedState;

/// The part of the injector the coordinator drives.
pub trait OverlayBuilder: Send + Sync {
    /// Build the overlay for `job`. Implementations check `job.cancel` at
    /// their safe points and remove their own partial output on error.
    fn build(&self, job: &PrebuildJob) -> Result<BuildArtifact, InjectionError>;
    /// Throw away a finished build that will never be activated.
    fn discard(&self, artifact: &BuildArtifact);
    /// Make a finished build the live overlay.
    fn activate(&self, artifact: &BuildArtifact) -> Result<(), InjectionError>;
    fn stop_overlay(&self);
    fn kill_stale_overlays(&self);
    /// Remove every prebuilt and live overlay output.
    fn purge_outputs(&self);
}

/// Externally visible coordinator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorStatus {
    Idle,
    Building(BuildTarget),
    Ready(BuildTarget),
    Cancelled,
    Failed(BuildTarget),
}

enum BuildStatus {
    Idle,
    Building(PrebuildJob),
    Ready(BuildArtifact),
    Cancelled,
    Failed { target: BuildTarget, error: String },
}

struct ChampionContext {
    champion_id: u32,
    owned: HashSet<u32>,
}

struct Core {
    status: BuildStatus,
    champion: Option<ChampionContext>,
    cache: PrebuiltCache,
    deadline_handled: bool,
}

struct Inner {
    builder: Arc<dyn OverlayBuilder>,
    state: Arc<SharedState>,
    historic: Option<HistoricStore>,
    max_deadline_wait: Duration,
    core: Mutex<Core>,
    changed: Condvar,
    builds_started: AtomicU64,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

#[derive(Clone)]
pub struct PrebuildCoordinator {
    inner: Arc<Inner>,
}

fn lock_core(inner: &Inner) -> MutexGuard<'_, Core> {
    inner.core.lock().unwrap_or_else(|e| e.into_inner())
}

impl PrebuildCoordinator {
    pub fn new(
        builder: Arc<dyn OverlayBuilder>,
        state: Arc<SharedState>,
        historic: Option<HistoricStore>,
        max_deadline_wait: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                builder,
                state,
                historic,
                max_deadline_wait,
                core: Mutex::new(Core {
                    status: BuildStatus::Idle,
                    champion: None,
                    cache: PrebuiltCache::new(),
                    deadline_handled: false,
                }),
                changed: Condvar::new(),
                builds_started: AtomicU64::new(0),
                workers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn status(&self) -> CoordinatorStatus {
        match &lock_core(&self.inner).status {
            BuildStatus::Idle => CoordinatorStatus::Idle,
            BuildStatus::Building(job) => CoordinatorStatus::Building(job.target.clone()),
            BuildStatus::Ready(artifact) => CoordinatorStatus::Ready(artifact.target.clone()),
            BuildStatus::Cancelled => CoordinatorStatus::Cancelled,
            BuildStatus::Failed { target, .. } => CoordinatorStatus::Failed(target.clone()),
        }
    }

    /// Number of builds handed to the builder since creation.
    pub fn builds_started(&self) -> u64 {
        self.inner.builds_started.load(Ordering::SeqCst)
    }

    /// A champion was locked (or re-locked). A different champion drops all
    /// work for the previous one; the historic selection seeds a build.
    pub fn on_champion_locked(&self, champion_id: u32, owned: HashSet<u32>) {
        let seed = self.inner.historic.as_ref().and_then(|h| h.seed_target(champion_id));

        let mut core = lock_core(&self.inner);
        let same_champion = core.champion.as_ref().map(|c| c.champion_id) == Some(champion_id);
        if !same_champion {
            info!("[Prebuild] New champion context {}", champion_id);
            self.supersede(&mut core);
            core.cache.clear();
            core.status = BuildStatus::Idle;
        }
        core.champion = Some(ChampionContext { champion_id, owned });

        let can_seed = matches!(
            core.status,
            BuildStatus::Idle | BuildStatus::Cancelled | BuildStatus::Failed { .. }
        );
        if let (Some(target), true) = (seed, can_seed) {
            info!("[Prebuild] Seeding champion {} from history: {}", champion_id, target.key());
            self.start(&mut core, target);
        }
        self.inner.changed.notify_all();
    }

    /// Champion whose selections are currently accepted.
    pub fn champion_id(&self) -> Option<u32> {
        lock_core(&self.inner).champion.as_ref().map(|c| c.champion_id)
    }

    /// Ownership for the locked champion was re-read. A build in progress
    /// or ready for a cosmetic that is now owned turns into a no-op.
    pub fn on_owned_changed(&self, champion_id: u32, owned: HashSet<u32>) {
        let mut core = lock_core(&self.inner);
        match core.champion.as_mut() {
            Some(ctx) if ctx.champion_id == champion_id => ctx.owned = owned,
            _ => return,
        }
        if core.deadline_handled {
            return;
        }

        let current = match &core.status {
            BuildStatus::Building(job) => Some(job.target.clone()),
            BuildStatus::Ready(artifact) if artifact.output_dir.is_some() => Some(artifact.target.clone()),
            _ => None,
        };
        let now_owned = match (&current, core.champion.as_ref()) {
            (Some(target), Some(ctx)) => !target.needs_overlay(&ctx.owned),
            _ => false,
        };
        if let (Some(target), true) = (current, now_owned) {
            info!("[Prebuild] {} is now owned; dropping its overlay", target.key());
            match std::mem::replace(&mut core.status, BuildStatus::Idle) {
                BuildStatus::Building(job) => job.cancel.cancel(),
                BuildStatus::Ready(artifact) => self.inner.builder.discard(&artifact),
                _ => {}
            }
            self.start(&mut core, target);
        }
        self.inner.changed.notify_all();
    }

    /// The resolved selection changed.
    pub fn on_selection(&self, target: BuildTarget) {
        let mut core = lock_core(&self.inner);
        if core.deadline_handled {
            debug!("[Prebuild] Ignoring {} after the deadline", target.key());
            return;
        }
        if core.champion.is_none() {
            debug!("[Prebuild] Ignoring {} without a locked champion", target.key());
            return;
        }

        match &core.status {
            BuildStatus::Building(job) if job.target == target => {
                debug!("[Prebuild] Already building {}", target.key());
                return;
            }
            BuildStatus::Ready(artifact) if artifact.target == target => {
                debug!("[Prebuild] Already ready for {}", target.key());
                return;
            }
            _ => {}
        }

        self.supersede(&mut core);
        self.start(&mut core, target);
        self.inner.changed.notify_all();
    }

    // Cancel a running build or park a finished one in the cache
    fn supersede(&self, core: &mut Core) {
        match std::mem::replace(&mut core.status, BuildStatus::Idle) {
            BuildStatus::Building(job) => {
                info!("[Prebuild] Cancelling build {} for {}", job.short_id(), job.target.key());
                job.cancel.cancel();
            }
            BuildStatus::Ready(artifact) => {
                if let Some(dir) = artifact.output_dir {
                    core.cache.insert(&artifact.target.key(), dir);
                }
            }
            _ => {}
        }
    }

    fn start(&self, core: &mut Core, target: BuildTarget) {
        let Some(ctx) = core.champion.as_ref() else {
            return;
        };
        let key = target.key();
        let job = PrebuildJob::new(ctx.champion_id, target.clone());

        if !target.needs_overlay(&ctx.owned) {
            info!("[Prebuild] {} is owned or default; nothing to build", key);
            core.status = BuildStatus::Ready(BuildArtifact::empty(&job));
            return;
        }

        if core.cache.get(&key).is_some() {
            if let Some(dir) = core.cache.take(&key) {
                info!("[Prebuild] Reusing prebuilt overlay for {}", key);
                core.status = BuildStatus::Ready(BuildArtifact {
                    job_id: job.id,
                    champion_id: job.champion_id,
                    target,
                    output_dir: Some(dir),
                });
                return;
            }
        }

        info!(
            "[Prebuild] Building {} for champion {} (job {})",
            key,
            job.champion_id,
            job.short_id()
        );
        core.status = BuildStatus::Building(job.clone());
        self.inner.builds_started.fetch_add(1, Ordering::SeqCst);

        let inner = Arc::clone(&self.inner);
        let spawned = thread::Builder::new()
            .name(format!("prebuild-{}", job.short_id()))
            .spawn(move || run_build(inner, job));
        match spawned {
            Ok(handle) => {
                if let Ok(mut workers) = self.inner.workers.lock() {
                    workers.retain(|w| !w.is_finished());
                    workers.push(handle);
                }
            }
            Err(e) => {
                error!("[Prebuild] Could not start build worker: {}", e);
                core.status = BuildStatus::Failed {
                    target,
                    error: e.to_string(),
                };
            }
        }
    }

    /// The countdown crossed the injection threshold. Activates the Ready
    /// build, waiting at most `budget` (capped) for one still in progress.
    /// Returns true when an activation happened.
    pub fn on_deadline(&self, budget: Duration) -> bool {
        let wait = budget.min(self.inner.max_deadline_wait);
        let mut core = lock_core(&self.inner);
        if core.deadline_handled {
            return false;
        }
        core.deadline_handled = true;

        if let BuildStatus::Building(job) = &core.status {
            let job_id = job.id;
            info!("[Prebuild] Deadline reached while building {}; waiting up to {:?}", job.target.key(), wait);
            let (guard, _) = self
                .inner
                .changed
                .wait_timeout_while(core, wait, |c| {
                    matches!(&c.status, BuildStatus::Building(j) if j.id == job_id)
                })
                .unwrap_or_else(|e| e.into_inner());
            core = guard;
        }

        let artifact = match &core.status {
            BuildStatus::Ready(artifact) => artifact.clone(),
            BuildStatus::Building(job) => {
                warn!("[Prebuild] Build for {} not ready at deadline; skipping activation", job.target.key());
                job.cancel.cancel();
                core.status = BuildStatus::Cancelled;
                return false;
            }
            BuildStatus::Failed { target, error } => {
                warn!("[Prebuild] Last build for {} failed ({}); nothing to activate", target.key(), error);
                return false;
            }
            BuildStatus::Idle | BuildStatus::Cancelled => {
                info!("[Prebuild] Deadline reached with no prebuilt overlay");
                return false;
            }
        };
        drop(core);

        match self.inner.builder.activate(&artifact) {
            Ok(()) => {
                self.inner.state.set_injection_completed(true);
                if artifact.output_dir.is_some() {
                    self.remember(&artifact);
                }
                true
            }
            Err(e) => {
                error!("[Prebuild] Activation of {} failed: {}", artifact.target.key(), e);
                false
            }
        }
    }

    fn remember(&self, artifact: &BuildArtifact) {
        let (Some(store), Some(entry)) = (&self.inner.historic, HistoricEntry::from_target(&artifact.target)) else {
            return;
        };
        if let Err(e) = store.write(artifact.champion_id, entry) {
            warn!("[Prebuild] Could not save historic selection: {}", e);
        }
    }

    /// Cancel the in-flight build, if any, without starting another.
    pub fn cancel_current(&self) {
        let mut core = lock_core(&self.inner);
        if let BuildStatus::Building(job) = &core.status {
            info!("[Prebuild] Cancelling build {} for {}", job.short_id(), job.target.key());
            job.cancel.cancel();
            core.status = BuildStatus::Cancelled;
            self.inner.changed.notify_all();
        }
    }

    /// Back to Idle: cancel, drop finished outputs and forget the champion.
    pub fn reset(&self) {
        let mut core = lock_core(&self.inner);
        match std::mem::replace(&mut core.status, BuildStatus::Idle) {
            BuildStatus::Building(job) => job.cancel.cancel(),
            BuildStatus::Ready(artifact) => self.inner.builder.discard(&artifact),
            _ => {}
        }
        core.cache.clear();
        core.champion = None;
        core.deadline_handled = false;
        self.inner.changed.notify_all();
    }

    pub fn purge_outputs(&self) {
        self.inner.builder.purge_outputs();
    }

    pub fn stop_overlay(&self) {
        self.inner.builder.stop_overlay();
    }

    pub fn kill_stale_overlays(&self) {
        self.inner.builder.kill_stale_overlays();
    }

    /// Blocks until no build is in progress or `timeout` passes.
    pub fn wait_until_settled(&self, timeout: Duration) -> CoordinatorStatus {
        {
            let core = lock_core(&self.inner);
            let _settled = self
                .inner
                .changed
                .wait_timeout_while(core, timeout, |c| matches!(c.status, BuildStatus::Building(_)))
                .unwrap_or_else(|e| e.into_inner());
        }
        self.status()
    }

    /// Join every build worker that was started.
    pub fn join_workers(&self) {
        let handles: Vec<_> = match self.inner.workers.lock() {
            Ok(mut workers) => workers.drain(..).collect(),
            Err(_) => return,
        };
        for handle in handles {
            let _ = handle.join();
        }
    }

    pub fn shutdown(&self) {
        self.cancel_current();
        self.join_workers();
    }
}

fn run_build(inner: Arc<Inner>, job: PrebuildJob) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| inner.builder.build(&job)))
        .unwrap_or_else(|_| Err(InjectionError::Process("build step panicked".into())));

    let mut core = lock_core(&inner);
    let current = matches!(&core.status, BuildStatus::Building(j) if j.id == job.id);
    match result {
        Ok(artifact) if current => {
            info!(
                "[Prebuild] Ready: {} in {:?}",
                job.target.key(),
                job.started_at.elapsed()
            );
            core.status = BuildStatus::Ready(artifact);
        }
        Ok(artifact) => {
            debug!("[Prebuild] Superseded build {} finished; discarding", job.short_id());
            inner.builder.discard(&artifact);
        }
        Err(e) if e.is_cancelled() => {
            debug!("[Prebuild] Build {} cancelled", job.short_id());
            if current {
                core.status = BuildStatus::Cancelled;
            }
        }
        Err(e) if current => {
            warn!("[Prebuild] Build failed for {}: {}", job.target.key(), e);
            core.status = BuildStatus::Failed {
                target: job.target.clone(),
                error: e.to_string(),
            };
        }
        Err(e) => debug!("[Prebuild] Superseded build {} failed: {}", job.short_id(), e),
    }
    drop(core);
    inner.changed.notify_all();
}
