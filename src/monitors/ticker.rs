// Loadout countdown ticker. Publishes the remaining time and fires the
// prebuild deadline once per countdown.

use super::Monitor;
use crate::injection::PrebuildCoordinator;
use crate::lcu::{ChampSelectSource, LoadoutTimer};
use crate::state::SharedState;
use log::{debug, info};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct LoadoutTicker {
  client: Arc<dyn ChampSelectSource>,
  state: Arc<SharedState>,
  coordinator: PrebuildCoordinator,
  interval: Duration,
  threshold_ms: u64,
  last: Option<(LoadoutTimer, Instant)>,
  fired: bool,
}

impl LoadoutTicker {
  pub fn new(
    client: Arc<dyn ChampSelectSource>,
    state: Arc<SharedState>,
    coordinator: PrebuildCoordinator,
    interval: Duration,
    threshold_ms: u64,
  ) -> Self {
    Self {
      client,
      state,
      coordinator,
      interval,
      threshold_ms,
      last: None,
      fired: false,
    }
  }

  /// Remaining finalization time, corrected for the age of the observation.
  fn remaining_ms(&self) -> Option<u64> {
    let (timer, observed_at) = self.last.as_ref()?;
    if !timer.is_finalization() {
      return None;
    }
    let age = observed_at.elapsed().as_millis() as u64;
    Some(timer.remaining_ms.saturating_sub(age))
  }

  fn disarm(&mut self) {
    if self.last.take().is_some() || self.fired {
      self.state.set_countdown(false, None);
    }
    self.fired = false;
  }
}

impl Monitor for LoadoutTicker {
  fn name(&self) -> &'static str {
    "Ticker"
  }

  fn interval(&self) -> Duration {
    self.interval
  }

  fn tick(&mut self) {
    if !self.state.phase().is_champ_select() {
      self.disarm();
      return;
    }

    match self.client.get_loadout_timer() {
      Ok(Some(timer)) => self.last = Some((timer, Instant::now())),
      Ok(None) => self.last = None,
      // keep extrapolating from the latest observation
      Err(e) => debug!("[Ticker] Timer query failed: {}", e),
    }

    let remaining = self.remaining_ms();
    self.state.set_countdown(remaining.is_some(), remaining);

    let Some(remaining) = remaining else {
      self.fired = false;
      return;
    };
    if !self.fired && remaining <= self.threshold_ms {
      self.fired = true;
      info!("[Ticker] {} ms left (threshold {} ms); activating overlay", remaining, self.threshold_ms);
      let activated = self.coordinator.on_deadline(Duration::from_millis(remaining));
      debug!("[Ticker] Deadline handled, activated: {}", activated);
    }
  }
}
