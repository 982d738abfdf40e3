// Forwards resolved selections from the shared state to the coordinator

use super::Monitor;
use crate::injection::{BuildTarget, PrebuildCoordinator};
use crate::state::SharedState;
use log::debug;
use std::sync::Arc;
use std::time::Duration;

pub struct SelectionWatcher {
  state: Arc<SharedState>,
  coordinator: PrebuildCoordinator,
  interval: Duration,
  seen_seq: u64,
}

impl SelectionWatcher {
  pub fn new(state: Arc<SharedState>, coordinator: PrebuildCoordinator, interval: Duration) -> Self {
    let seen_seq = state.snapshot().selection_seq;
    Self {
      state,
      coordinator,
      interval,
      seen_seq,
    }
  }
}

impl Monitor for SelectionWatcher {
  fn name(&self) -> &'static str {
    "Selection"
  }

  fn interval(&self) -> Duration {
    self.interval
  }

  fn tick(&mut self) {
    let snapshot = self.state.snapshot();
    if snapshot.selection_seq == self.seen_seq {
      return;
    }
    self.seen_seq = snapshot.selection_seq;
    let Some(cosmetic_id) = snapshot.last_hovered_cosmetic_id else {
      return;
    };
    let target = BuildTarget::cosmetic(cosmetic_id, snapshot.selected_chroma_id);
    debug!("[Selection] #{} -> {}", snapshot.selection_seq, target.key());
    self.coordinator.on_selection(target);
  }
}
