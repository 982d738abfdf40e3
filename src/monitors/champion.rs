// Champion monitor: hover and lock tracking while in champion select

use super::Monitor;
use crate::injection::PrebuildCoordinator;
use crate::lcu::{ChampSelectSource, InventorySource};
use crate::state::SharedState;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct OwnedCache {
  champion_id: u32,
  fetched_at: Instant,
  owned: HashSet<u32>,
}

pub struct ChampionMonitor {
  client: Arc<dyn ChampSelectSource>,
  inventory: Arc<dyn InventorySource>,
  state: Arc<SharedState>,
  coordinator: PrebuildCoordinator,
  interval: Duration,
  refetch_cooldown: Duration,
  last_lock: Option<u32>,
  last_hover: Option<u32>,
  owned_cache: Option<OwnedCache>,
}

impl ChampionMonitor {
  pub fn new(
    client: Arc<dyn ChampSelectSource>,
    inventory: Arc<dyn InventorySource>,
    state: Arc<SharedState>,
    coordinator: PrebuildCoordinator,
    interval: Duration,
    refetch_cooldown: Duration,
  ) -> Self {
    Self {
      client,
      inventory,
      state,
      coordinator,
      interval,
      refetch_cooldown,
      last_lock: None,
      last_hover: None,
      owned_cache: None,
    }
  }

  fn owned_for(&mut self, champion_id: u32) -> HashSet<u32> {
    if let Some(cache) = &self.owned_cache {
      if cache.champion_id == champion_id && cache.fetched_at.elapsed() < self.refetch_cooldown {
        debug!("[Champion] Reusing owned cosmetics fetched {:?} ago", cache.fetched_at.elapsed());
        return cache.owned.clone();
      }
    }
    match self.inventory.get_owned_cosmetics() {
      Ok(ids) => {
        let owned: HashSet<u32> = ids.into_iter().collect();
        self.owned_cache = Some(OwnedCache {
          champion_id,
          fetched_at: Instant::now(),
          owned: owned.clone(),
        });
        owned
      }
      Err(e) => {
        warn!("[Champion] Could not load owned cosmetics ({}); treating none as owned", e);
        HashSet::new()
      }
    }
  }

  // Connection came back while locked: re-read ownership, ignoring the cooldown
  fn refresh_owned(&mut self, champion_id: u32) {
    match self.inventory.get_owned_cosmetics() {
      Ok(ids) => {
        let owned: HashSet<u32> = ids.into_iter().collect();
        debug!("[Champion] Refreshed {} owned cosmetics for {}", owned.len(), champion_id);
        self.owned_cache = Some(OwnedCache {
          champion_id,
          fetched_at: Instant::now(),
          owned: owned.clone(),
        });
        self.state.set_owned_cosmetics(owned.clone());
        self.coordinator.on_owned_changed(champion_id, owned);
      }
      Err(e) => warn!("[Champion] Owned cosmetics refresh failed: {}", e),
    }
  }

  fn on_lock(&mut self, champion_id: u32) {
    let owned = self.owned_for(champion_id);
    let seq = self.state.record_lock(champion_id, owned.clone());
    info!(
      "[Champion] Locked champion {} ({} owned cosmetics, lock #{})",
      champion_id,
      owned.len(),
      seq
    );
    self.last_lock = Some(champion_id);
    self.coordinator.on_champion_locked(champion_id, owned);
  }
}

impl Monitor for ChampionMonitor {
  fn name(&self) -> &'static str {
    "Champion"
  }

  fn interval(&self) -> Duration {
    self.interval
  }

  fn tick(&mut self) {
    let snapshot = self.state.snapshot();
    if !snapshot.phase.is_champ_select() {
      self.last_lock = None;
      self.last_hover = None;
      return;
    }

    match self.client.get_hovered_champion() {
      Ok(hovered) if hovered != self.last_hover => {
        debug!("[Champion] Hovering {:?}", hovered);
        self.last_hover = hovered;
        self.state.set_hovered_champion(hovered);
      }
      Ok(_) => {}
      Err(e) => debug!("[Champion] Hover query failed: {}", e),
    }

    let locked = match self.client.get_locked_champion() {
      Ok(locked) => locked,
      Err(e) => {
        debug!("[Champion] Lock query failed: {}", e);
        return;
      }
    };

    // A cleared state lock means a reset happened since our last lock
    if snapshot.locked_champion_id.is_none() {
      self.last_lock = None;
    }

    let refresh = self.state.take_owned_refresh();
    if let Some(champion_id) = locked {
      if self.last_lock != Some(champion_id) {
        if refresh {
          self.owned_cache = None;
        }
        self.on_lock(champion_id);
        return;
      }
      if self.coordinator.champion_id() != Some(champion_id) {
        info!("[Champion] Prebuild lost champion {}; signalling the lock again", champion_id);
        self.coordinator.on_champion_locked(champion_id, snapshot.owned_cosmetic_ids.clone());
      }
      if refresh {
        self.refresh_owned(champion_id);
      }
    }
  }
}
