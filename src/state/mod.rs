//! Process-wide agent state.
//!
//! `SharedState` is created once by the agent and handed to every monitor
//! as an `Arc`. Fields are grouped into sections by the worker that owns
//! writes to them; readers call [`SharedState::snapshot`] once per tick and
//! work from the copy.

mod phase;

pub use phase::Phase;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

/// Written by the phase monitor.
#[derive(Debug, Clone, Default)]
struct PhaseSection {
  phase: Phase,
}

/// Written by the champion monitor. The phase monitor clears it on
/// phase boundaries while the champion monitor is idle.
#[derive(Debug, Clone, Default)]
struct ChampionSection {
  hovered_champion_id: Option<u32>,
  locked_champion_id: Option<u32>,
  locked_at: Option<Instant>,
  owned_cosmetic_ids: HashSet<u32>,
  // Bumped on every lock, including a re-lock of the same champion
  lock_seq: u64,
}

/// Written by the detection monitors.
#[derive(Debug, Clone, Default)]
struct SelectionSection {
  last_hovered_cosmetic_id: Option<u32>,
  last_hovered_cosmetic_name: Option<String>,
  selected_chroma_id: Option<u32>,
  selection_seq: u64,
}

/// Written by the loadout ticker.
#[derive(Debug, Clone, Default)]
struct CountdownSection {
  loadout_countdown_active: bool,
  remaining_countdown_ms: Option<u64>,
}

/// Written by the connection monitor.
#[derive(Debug, Clone, Default)]
struct ConnectionSection {
  connected: bool,
  language: Option<String>,
}

#[derive(Debug, Default)]
pub struct SharedState {
  phase: RwLock<PhaseSection>,
  champion: RwLock<ChampionSection>,
  selection: RwLock<SelectionSection>,
  countdown: RwLock<CountdownSection>,
  connection: RwLock<ConnectionSection>,
  // Written by the prebuild coordinator; reset by the phase monitor
  injection_completed: AtomicBool,
  // Raised by the connection monitor, consumed by the champion monitor
  owned_refresh_requested: AtomicBool,
  stop: AtomicBool,
}

/// Immutable copy of the state taken at the start of a tick.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
  pub phase: Phase,
  pub hovered_champion_id: Option<u32>,
  pub locked_champion_id: Option<u32>,
  pub locked_at: Option<Instant>,
  pub owned_cosmetic_ids: HashSet<u32>,
  pub lock_seq: u64,
  pub last_hovered_cosmetic_id: Option<u32>,
  pub last_hovered_cosmetic_name: Option<String>,
  pub selected_chroma_id: Option<u32>,
  pub selection_seq: u64,
  pub injection_completed: bool,
  pub loadout_countdown_active: bool,
  pub remaining_countdown_ms: Option<u64>,
  pub connected: bool,
  pub language: Option<String>,
  pub stop: bool,
}

// Poisoning only happens if a writer panicked mid-assignment; the sections
// hold plain values so the data is still usable.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
  lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
  lock.write().unwrap_or_else(|e| e.into_inner())
}

impl SharedState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn snapshot(&self) -> StateSnapshot {
    let phase = read(&self.phase).phase.clone();
    let champion = read(&self.champion).clone();
    let selection = read(&self.selection).clone();
    let countdown = read(&self.countdown).clone();
    let connection = read(&self.connection).clone();

    StateSnapshot {
      phase,
      hovered_champion_id: champion.hovered_champion_id,
      locked_champion_id: champion.locked_champion_id,
      locked_at: champion.locked_at,
      owned_cosmetic_ids: champion.owned_cosmetic_ids,
      lock_seq: champion.lock_seq,
      last_hovered_cosmetic_id: selection.last_hovered_cosmetic_id,
      last_hovered_cosmetic_name: selection.last_hovered_cosmetic_name,
      selected_chroma_id: selection.selected_chroma_id,
      selection_seq: selection.selection_seq,
      injection_completed: self.injection_completed.load(Ordering::SeqCst),
      loadout_countdown_active: countdown.loadout_countdown_active,
      remaining_countdown_ms: countdown.remaining_countdown_ms,
      connected: connection.connected,
      language: connection.language,
      stop: self.stop.load(Ordering::SeqCst),
    }
  }

  pub fn phase(&self) -> Phase {
    read(&self.phase).phase.clone()
  }

  // ---- phase monitor ----

  pub fn set_phase(&self, phase: Phase) {
    write(&self.phase).phase = phase;
  }

  /// Entry into champion select: every per-game field goes back to empty.
  pub fn reset_for_champ_select(&self) {
    {
      let mut champion = write(&self.champion);
      let lock_seq = champion.lock_seq;
      *champion = ChampionSection {
        lock_seq,
        ..ChampionSection::default()
      };
    }
    self.clear_selection();
    *write(&self.countdown) = CountdownSection::default();
    self.injection_completed.store(false, Ordering::SeqCst);
    self.owned_refresh_requested.store(false, Ordering::SeqCst);
  }

  /// Leaving champion select for a phase with no dedicated handling.
  pub fn clear_champion_tracking(&self) {
    {
      let mut champion = write(&self.champion);
      champion.hovered_champion_id = None;
      champion.locked_champion_id = None;
      champion.locked_at = None;
    }
    self.clear_selection();
    let mut countdown = write(&self.countdown);
    countdown.loadout_countdown_active = false;
    countdown.remaining_countdown_ms = None;
  }

  fn clear_selection(&self) {
    let mut selection = write(&self.selection);
    selection.last_hovered_cosmetic_id = None;
    selection.last_hovered_cosmetic_name = None;
    selection.selected_chroma_id = None;
  }

  // ---- champion monitor ----

  pub fn set_hovered_champion(&self, champion_id: Option<u32>) {
    write(&self.champion).hovered_champion_id = champion_id;
  }

  /// Records a (re-)lock. Returns the new lock sequence number.
  pub fn record_lock(&self, champion_id: u32, owned: HashSet<u32>) -> u64 {
    let mut champion = write(&self.champion);
    champion.locked_champion_id = Some(champion_id);
    if champion.hovered_champion_id.is_none() {
      champion.hovered_champion_id = Some(champion_id);
    }
    champion.locked_at = Some(Instant::now());
    champion.owned_cosmetic_ids = owned;
    champion.lock_seq += 1;
    champion.lock_seq
  }

  pub fn set_owned_cosmetics(&self, owned: HashSet<u32>) {
    write(&self.champion).owned_cosmetic_ids = owned;
  }

  /// True once per request raised with [`SharedState::request_owned_refresh`].
  pub fn take_owned_refresh(&self) -> bool {
    self.owned_refresh_requested.swap(false, Ordering::SeqCst)
  }

  // ---- detection monitors ----

  /// Stores a resolved selection. `keep_chroma` is false when the base
  /// cosmetic changed, which drops any chroma chosen for the old one.
  pub fn record_selection(&self, cosmetic_id: u32, name: &str, keep_chroma: bool) -> u64 {
    let mut selection = write(&self.selection);
    selection.last_hovered_cosmetic_id = Some(cosmetic_id);
    selection.last_hovered_cosmetic_name = Some(name.to_string());
    if !keep_chroma {
      selection.selected_chroma_id = None;
    }
    selection.selection_seq += 1;
    selection.selection_seq
  }

  /// Stores a chroma together with the cosmetic it recolors in one write,
  /// so watchers never see the parent without its chroma. Returns false
  /// when both were already selected.
  pub fn record_chroma_selection(&self, parent_id: u32, parent_name: &str, chroma_id: u32) -> bool {
    let mut selection = write(&self.selection);
    if selection.last_hovered_cosmetic_id == Some(parent_id) && selection.selected_chroma_id == Some(chroma_id) {
      return false;
    }
    selection.last_hovered_cosmetic_id = Some(parent_id);
    selection.last_hovered_cosmetic_name = Some(parent_name.to_string());
    selection.selected_chroma_id = Some(chroma_id);
    selection.selection_seq += 1;
    true
  }

  // ---- loadout ticker ----

  pub fn set_countdown(&self, active: bool, remaining_ms: Option<u64>) {
    let mut countdown = write(&self.countdown);
    countdown.loadout_countdown_active = active;
    countdown.remaining_countdown_ms = remaining_ms;
  }

  // ---- prebuild coordinator ----

  pub fn set_injection_completed(&self, completed: bool) {
    self.injection_completed.store(completed, Ordering::SeqCst);
  }

  pub fn injection_completed(&self) -> bool {
    self.injection_completed.load(Ordering::SeqCst)
  }

  // ---- connection monitor ----

  pub fn set_connection(&self, connected: bool, language: Option<String>) {
    let mut connection = write(&self.connection);
    connection.connected = connected;
    if language.is_some() {
      connection.language = language;
    }
  }

  /// Ask the champion monitor to re-read ownership for the locked champion.
  pub fn request_owned_refresh(&self) {
    self.owned_refresh_requested.store(true, Ordering::SeqCst);
  }

  // ---- lifecycle ----

  pub fn request_stop(&self) {
    self.stop.store(true, Ordering::SeqCst);
  }

  pub fn should_stop(&self) -> bool {
    self.stop.load(Ordering::SeqCst)
  }
}
