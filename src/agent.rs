//! Wires the shared state, coordinator and monitors together and owns
//! their threads.

use crate::catalog::{Resolver, SkinCatalog};
use crate::config::{AgentConfig, AgentPaths};
use crate::injection::{HistoricStore, OverlayBuilder, PrebuildCoordinator};
use crate::lcu::GameClient;
use crate::monitors::detection::Gating;
use crate::monitors::{
  self, ChampionMonitor, ConnectionMonitor, DetectionMonitor, LoadoutTicker, PhaseMonitor, SelectionWatcher,
  TextDetector,
};
use crate::state::SharedState;
use log::{info, warn};
use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// A detection strategy with its own threshold and cadence.
pub struct DetectorSlot {
  pub detector: Box<dyn TextDetector>,
  pub min_similarity: f64,
  pub interval: Duration,
}

pub struct Agent {
  state: Arc<SharedState>,
  coordinator: PrebuildCoordinator,
  catalog: Arc<SkinCatalog>,
  handles: Vec<JoinHandle<()>>,
}

impl Agent {
  pub fn start<C: GameClient + 'static>(
    client: Arc<C>,
    builder: Arc<dyn OverlayBuilder>,
    config: &AgentConfig,
    paths: &AgentPaths,
    detectors: Vec<DetectorSlot>,
  ) -> io::Result<Self> {
    let state = Arc::new(SharedState::new());
    let catalog = Arc::new(SkinCatalog::new(client.clone()));
    let historic = HistoricStore::new(paths.historic_file()).with_catalog(catalog.clone());
    let coordinator = PrebuildCoordinator::new(
      builder,
      state.clone(),
      Some(historic),
      Duration::from_millis(config.injection_threshold_ms),
    );
    let interval = AgentConfig::interval;

    let mut agent = Self {
      state: state.clone(),
      coordinator: coordinator.clone(),
      catalog: catalog.clone(),
      handles: Vec::new(),
    };

    agent.spawn(PhaseMonitor::new(
      client.clone(),
      state.clone(),
      coordinator.clone(),
      interval(config.phase_poll_ms),
    ))?;
    agent.spawn(ChampionMonitor::new(
      client.clone(),
      client.clone(),
      state.clone(),
      coordinator.clone(),
      interval(config.champion_poll_ms),
      Duration::from_millis(config.ownership_refetch_cooldown_ms),
    ))?;
    agent.spawn(LoadoutTicker::new(
      client.clone(),
      state.clone(),
      coordinator.clone(),
      interval(config.ticker_poll_ms),
      config.injection_threshold_ms,
    ))?;
    agent.spawn(ConnectionMonitor::new(
      client.clone(),
      client.clone(),
      catalog.clone(),
      state.clone(),
      interval(config.connection_poll_ms),
    ))?;
    agent.spawn(SelectionWatcher::new(
      state.clone(),
      coordinator.clone(),
      interval(config.selection_poll_ms),
    ))?;

    let gating = Gating {
      grace: Duration::from_millis(config.detection_grace_ms),
      injection_threshold_ms: config.injection_threshold_ms,
    };
    if detectors.is_empty() {
      warn!("[Agent] No detection strategy enabled; only remembered selections will be built");
    }
    for slot in detectors {
      info!("[Agent] Detection strategy {} enabled", slot.detector.name());
      agent.spawn(DetectionMonitor::new(
        slot.detector,
        state.clone(),
        catalog.clone(),
        Resolver::new(slot.min_similarity),
        gating,
        slot.interval,
      ))?;
    }

    info!("[Agent] Started {} monitors", agent.handles.len());
    Ok(agent)
  }

  fn spawn<M: monitors::Monitor>(&mut self, monitor: M) -> io::Result<()> {
    match monitors::spawn(monitor, self.state.clone()) {
      Ok(handle) => {
        self.handles.push(handle);
        Ok(())
      }
      Err(e) => {
        // Do not leave half the monitors running
        self.state.request_stop();
        Err(e)
      }
    }
  }

  pub fn state(&self) -> Arc<SharedState> {
    self.state.clone()
  }

  pub fn coordinator(&self) -> &PrebuildCoordinator {
    &self.coordinator
  }

  pub fn catalog(&self) -> Arc<SkinCatalog> {
    self.catalog.clone()
  }

  /// Blocks until every monitor thread has exited.
  pub fn wait(&mut self) {
    for handle in self.handles.drain(..) {
      let _ = handle.join();
    }
  }

  pub fn shutdown(mut self) {
    info!("[Agent] Shutting down");
    self.state.request_stop();
    self.wait();
    self.coordinator.shutdown();
    self.coordinator.stop_overlay();
  }
}
