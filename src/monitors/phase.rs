// Gameflow phase monitor: drives champ-select resets and overlay cleanup

use super::Monitor;
use crate::injection::PrebuildCoordinator;
use crate::lcu::PhaseSource;
use crate::state::{Phase, SharedState};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

pub struct PhaseMonitor {
  source: Arc<dyn PhaseSource>,
  state: Arc<SharedState>,
  coordinator: PrebuildCoordinator,
  interval: Duration,
  last_phase: Option<Phase>,
}

impl PhaseMonitor {
  pub fn new(
    source: Arc<dyn PhaseSource>,
    state: Arc<SharedState>,
    coordinator: PrebuildCoordinator,
    interval: Duration,
  ) -> Self {
    Self {
      source,
      state,
      coordinator,
      interval,
      last_phase: None,
    }
  }

  /// Apply an observed phase. Repeats of the current phase do nothing.
  pub fn observe(&mut self, phase: Phase) {
    if self.last_phase.as_ref() == Some(&phase) {
      return;
    }
    let previous = self.last_phase.replace(phase.clone()).unwrap_or_default();
    info!("[Phase] {} -> {}", previous, phase);

    // Champ select is published only after its resets; other phases are
    // published before their cleanup.
    if phase.is_champ_select() {
      self.state.reset_for_champ_select();
      self.coordinator.reset();
      self.state.set_phase(phase);
      return;
    }
    self.state.set_phase(phase.clone());

    match phase {
      Phase::Lobby => {
        self.coordinator.cancel_current();
        self.coordinator.stop_overlay();
        self.coordinator.kill_stale_overlays();
        self.coordinator.reset();
        self.coordinator.purge_outputs();
        self.state.clear_champion_tracking();
      }
      Phase::EndOfGame => {
        self.coordinator.stop_overlay();
      }
      _ => {
        self.state.clear_champion_tracking();
        if previous.is_champ_select() {
          self.coordinator.reset();
        }
      }
    }
  }
}

impl Monitor for PhaseMonitor {
  fn name(&self) -> &'static str {
    "Phase"
  }

  fn interval(&self) -> Duration {
    self.interval
  }

  fn tick(&mut self) {
    match self.source.get_phase() {
      Ok(phase) => self.observe(phase),
      Err(e) => debug!("[Phase] Phase query failed: {}", e),
    }
  }
}
