//! Cosmetic-name detection.
//!
//! A [`TextDetector`] reads the name currently shown for the hovered
//! cosmetic (UI scraping or OCR). [`DetectionMonitor`] gates it on the
//! champ-select state, resolves the text against the locked champion's
//! catalog and records the selection.

pub mod band;
pub mod ocr;
pub mod ui;

use super::Monitor;
use crate::catalog::{ids, CatalogEntry, Resolver, SkinCatalog, SkinMatch};
use crate::state::{SharedState, StateSnapshot};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectError {
  #[error("detection backend unavailable: {0}")]
  Unavailable(String),
  #[error("cached UI element is no longer valid")]
  StaleHandle,
  #[error("capture failed: {0}")]
  Capture(String),
  #[error("backend error: {0}")]
  Backend(String),
}

pub trait TextDetector: Send + 'static {
  fn name(&self) -> &'static str;
  /// One read of the displayed cosmetic name, if any is visible.
  fn poll(&mut self) -> Result<Option<String>, DetectError>;
  /// Forget cached handles and retry counters.
  fn reset(&mut self);
}

impl TextDetector for Box<dyn TextDetector> {
  fn name(&self) -> &'static str {
    (**self).name()
  }

  fn poll(&mut self) -> Result<Option<String>, DetectError> {
    (**self).poll()
  }

  fn reset(&mut self) {
    (**self).reset()
  }
}

#[derive(Debug, Clone, Copy)]
pub struct Gating {
  pub grace: Duration,
  pub injection_threshold_ms: u64,
}

/// Detection runs only in champ select, after a lock has settled for
/// `grace`, before injection, and while the countdown is above threshold.
pub fn should_run_detection(snapshot: &StateSnapshot, now: Instant, gating: &Gating) -> bool {
  if !snapshot.phase.is_champ_select() || snapshot.locked_champion_id.is_none() {
    return false;
  }
  let settled = snapshot
    .locked_at
    .map_or(false, |at| now.saturating_duration_since(at) >= gating.grace);
  if !settled || snapshot.injection_completed {
    return false;
  }
  if snapshot.loadout_countdown_active {
    if let Some(remaining) = snapshot.remaining_countdown_ms {
      return remaining > gating.injection_threshold_ms;
    }
  }
  true
}

/// Record a resolved match. A chroma entry selects its parent cosmetic and
/// the chroma; moving outside the previous id's variant window clears the
/// chroma. Returns false when nothing changed.
pub fn apply_selection(
  state: &SharedState,
  previous: Option<u32>,
  found: &SkinMatch,
  entries: &[CatalogEntry],
) -> bool {
  let parent = entries
    .iter()
    .find(|e| e.id == found.id)
    .and_then(|e| e.parent_id);

  if let Some(parent_id) = parent {
    let parent_name = entries
      .iter()
      .find(|e| e.id == parent_id)
      .map(|e| e.name.as_str())
      .unwrap_or(found.name.as_str());
    if !state.record_chroma_selection(parent_id, parent_name, found.id) {
      return false;
    }
    info!("[Detection] Chroma {} ({}) of {}", found.name, found.id, parent_id);
    return true;
  }

  if previous == Some(found.id) {
    return false;
  }
  let keep_chroma = previous.map_or(false, |prev| ids::stays_within_variants(prev, found.id));
  state.record_selection(found.id, &found.name, keep_chroma);
  info!(
    "[Detection] Hovered {} ({}, score {:.2}){}",
    found.name,
    found.id,
    found.score,
    if keep_chroma { ", chroma kept" } else { "" }
  );
  true
}

pub struct DetectionMonitor<D: TextDetector> {
  detector: D,
  state: Arc<SharedState>,
  catalog: Arc<SkinCatalog>,
  resolver: Resolver,
  gating: Gating,
  interval: Duration,
  active: bool,
  armed_lock_seq: u64,
  last_detected: Option<String>,
}

impl<D: TextDetector> DetectionMonitor<D> {
  pub fn new(
    detector: D,
    state: Arc<SharedState>,
    catalog: Arc<SkinCatalog>,
    resolver: Resolver,
    gating: Gating,
    interval: Duration,
  ) -> Self {
    Self {
      detector,
      state,
      catalog,
      resolver,
      gating,
      interval,
      active: false,
      armed_lock_seq: 0,
      last_detected: None,
    }
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  fn set_active(&mut self, active: bool) {
    if self.active == active {
      return;
    }
    self.active = active;
    self.detector.reset();
    self.last_detected = None;
    debug!(
      "[Detection][{}] {}",
      self.detector.name(),
      if active { "started" } else { "stopped" }
    );
  }

  fn handle_text(&mut self, snapshot: &StateSnapshot, text: String) {
    let text = text.trim().to_string();
    if text.is_empty() || self.last_detected.as_deref() == Some(text.as_str()) {
      return;
    }
    let Some(champion_id) = snapshot.locked_champion_id else {
      return;
    };

    let entries = match self.catalog.entries_for(champion_id) {
      Ok(entries) => entries,
      Err(e) => {
        warn!("[Detection] Catalog for champion {} unavailable: {}", champion_id, e);
        return;
      }
    };
    self.last_detected = Some(text.clone());

    match self.resolver.resolve(&text, &entries) {
      Some(found) => {
        apply_selection(&self.state, snapshot.last_hovered_cosmetic_id, &found, &entries);
      }
      None => debug!("[Detection][{}] No catalog match for '{}'", self.detector.name(), text),
    }
  }
}

impl<D: TextDetector> Monitor for DetectionMonitor<D> {
  fn name(&self) -> &'static str {
    self.detector.name()
  }

  fn interval(&self) -> Duration {
    self.interval
  }

  fn tick(&mut self) {
    let snapshot = self.state.snapshot();
    let run = should_run_detection(&snapshot, Instant::now(), &self.gating);
    self.set_active(run);
    if !run {
      return;
    }

    if snapshot.lock_seq != self.armed_lock_seq {
      self.armed_lock_seq = snapshot.lock_seq;
      self.detector.reset();
      self.last_detected = None;
    }

    match self.detector.poll() {
      Ok(Some(text)) => self.handle_text(&snapshot, text),
      Ok(None) => {}
      Err(e) => debug!("[Detection][{}] {}", self.detector.name(), e),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::state::Phase;
  use std::collections::HashSet;

  fn gating() -> Gating {
    Gating {
      grace: Duration::from_millis(200),
      injection_threshold_ms: 300,
    }
  }

  fn locked_snapshot(state: &SharedState) -> StateSnapshot {
    state.set_phase(Phase::ChampSelect);
    state.record_lock(157, HashSet::new());
    state.snapshot()
  }

  #[test]
  fn gating_waits_for_grace_after_lock() {
    let state = SharedState::new();
    let snap = locked_snapshot(&state);
    let locked_at = snap.locked_at.unwrap();
    assert!(!should_run_detection(&snap, locked_at, &gating()));
    assert!(should_run_detection(&snap, locked_at + Duration::from_millis(250), &gating()));
  }

  #[test]
  fn gating_stops_near_deadline_and_after_injection() {
    let state = SharedState::new();
    let mut snap = locked_snapshot(&state);
    let later = snap.locked_at.unwrap() + Duration::from_secs(1);

    snap.loadout_countdown_active = true;
    snap.remaining_countdown_ms = Some(300);
    assert!(!should_run_detection(&snap, later, &gating()));
    snap.remaining_countdown_ms = Some(301);
    assert!(should_run_detection(&snap, later, &gating()));

    snap.injection_completed = true;
    assert!(!should_run_detection(&snap, later, &gating()));
  }

  #[test]
  fn gating_requires_champ_select_and_lock() {
    let state = SharedState::new();
    let mut snap = locked_snapshot(&state);
    let later = snap.locked_at.unwrap() + Duration::from_secs(1);
    snap.phase = Phase::Lobby;
    assert!(!should_run_detection(&snap, later, &gating()));
    snap.phase = Phase::ChampSelect;
    snap.locked_champion_id = None;
    assert!(!should_run_detection(&snap, later, &gating()));
  }

  #[test]
  fn chroma_entry_selects_parent_and_chroma() {
    let state = SharedState::new();
    let entries = vec![
      CatalogEntry::new(157002, "Dragon Fist Lee Sin"),
      CatalogEntry::chroma(157003, "Dragon Fist Lee Sin Ruby", 157002),
    ];
    let found = SkinMatch {
      id: 157003,
      name: "Dragon Fist Lee Sin Ruby".to_string(),
      score: 1.0,
    };
    assert!(apply_selection(&state, None, &found, &entries));
    let snap = state.snapshot();
    assert_eq!(snap.last_hovered_cosmetic_id, Some(157002));
    assert_eq!(snap.last_hovered_cosmetic_name.as_deref(), Some("Dragon Fist Lee Sin"));
    assert_eq!(snap.selected_chroma_id, Some(157003));
  }

  #[test]
  fn chroma_from_another_skin_is_published_once() {
    let state = SharedState::new();
    let entries = vec![
      CatalogEntry::new(157001, "Blood Moon Lee Sin"),
      CatalogEntry::new(157002, "Dragon Fist Lee Sin"),
      CatalogEntry::chroma(157003, "Dragon Fist Lee Sin Ruby", 157002),
    ];
    state.record_selection(157001, "Blood Moon Lee Sin", false);
    let before = state.snapshot().selection_seq;

    let found = SkinMatch {
      id: 157003,
      name: "Dragon Fist Lee Sin Ruby".to_string(),
      score: 1.0,
    };
    assert!(apply_selection(&state, Some(157001), &found, &entries));
    assert_eq!(state.snapshot().selection_seq, before + 1);

    // Reading the same chroma again changes nothing
    assert!(!apply_selection(&state, Some(157002), &found, &entries));
    assert_eq!(state.snapshot().selection_seq, before + 1);
  }

  #[test]
  fn same_id_is_not_reapplied() {
    let state = SharedState::new();
    let entries = vec![CatalogEntry::new(157002, "Dragon Fist Lee Sin")];
    let found = SkinMatch {
      id: 157002,
      name: "Dragon Fist Lee Sin".to_string(),
      score: 1.0,
    };
    assert!(apply_selection(&state, None, &found, &entries));
    let seq = state.snapshot().selection_seq;
    assert!(!apply_selection(&state, Some(157002), &found, &entries));
    assert_eq!(state.snapshot().selection_seq, seq);
  }
}
