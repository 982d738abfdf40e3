// Connection and client-language monitor

use super::Monitor;
use crate::catalog::SkinCatalog;
use crate::lcu::{NameCatalog, PhaseSource};
use crate::state::SharedState;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

const LANGUAGE_RECHECK: Duration = Duration::from_secs(30);
const LANGUAGE_RETRY: Duration = Duration::from_secs(2);

pub struct ConnectionMonitor {
  phase: Arc<dyn PhaseSource>,
  names: Arc<dyn NameCatalog>,
  catalog: Arc<SkinCatalog>,
  state: Arc<SharedState>,
  interval: Duration,
  connected: Option<bool>,
  language: Option<String>,
  next_language_check: Option<Instant>,
}

impl ConnectionMonitor {
  pub fn new(
    phase: Arc<dyn PhaseSource>,
    names: Arc<dyn NameCatalog>,
    catalog: Arc<SkinCatalog>,
    state: Arc<SharedState>,
    interval: Duration,
  ) -> Self {
    Self {
      phase,
      names,
      catalog,
      state,
      interval,
      connected: None,
      language: None,
      next_language_check: None,
    }
  }

  fn on_reconnect(&mut self) {
    info!("[LCU] Connected to the client");
    self.next_language_check = None;
    if self.state.snapshot().locked_champion_id.is_some() {
      debug!("[LCU] Requesting an ownership refresh for the locked champion");
      self.state.request_owned_refresh();
    }
  }

  fn check_language(&mut self) {
    let due = self.next_language_check.map_or(true, |at| Instant::now() >= at);
    if !due {
      return;
    }
    match self.names.get_client_language() {
      Ok(language) => {
        self.next_language_check = Some(Instant::now() + LANGUAGE_RECHECK);
        if self.catalog.set_language(&language) || self.language.is_none() {
          debug!("[LCU] Client language {}", language);
        }
        self.language = Some(language);
      }
      Err(e) => {
        debug!("[LCU] Language query failed: {}", e);
        self.next_language_check = Some(Instant::now() + LANGUAGE_RETRY);
      }
    }
  }
}

impl Monitor for ConnectionMonitor {
  fn name(&self) -> &'static str {
    "Connection"
  }

  fn interval(&self) -> Duration {
    self.interval
  }

  fn tick(&mut self) {
    let connected = self.phase.get_phase().is_ok();
    if self.connected != Some(connected) {
      if connected {
        self.on_reconnect();
      } else if self.connected.is_some() {
        warn!("[LCU] Lost connection to the client");
      }
      self.connected = Some(connected);
    }
    if connected {
      self.check_language();
    }
    self.state.set_connection(connected, self.language.clone());
  }
}
