// Polling monitors. Each one owns a thread that ticks at its interval until
// the shared stop flag is raised.

pub mod champion;
pub mod connection;
pub mod detection;
pub mod phase;
pub mod selection;
pub mod ticker;

use crate::state::SharedState;
use log::{debug, error};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub use champion::ChampionMonitor;
pub use connection::ConnectionMonitor;
pub use detection::{DetectionMonitor, TextDetector};
pub use phase::PhaseMonitor;
pub use selection::SelectionWatcher;
pub use ticker::LoadoutTicker;

// Upper bound on how long a sleeping monitor takes to notice a stop request
const STOP_CHECK_SLICE: Duration = Duration::from_millis(50);

pub trait Monitor: Send + 'static {
  fn name(&self) -> &'static str;
  fn interval(&self) -> Duration;
  fn tick(&mut self);
  /// Runs once after the loop exits.
  fn on_stop(&mut self) {}
}

/// Tick `monitor` until the state's stop flag is set. A panicking tick is
/// logged and the loop carries on with the next one.
pub fn run_until_stopped<M: Monitor>(monitor: &mut M, state: &SharedState) {
  debug!("[{}] Monitor started", monitor.name());
  while !state.should_stop() {
    let started = Instant::now();
    if panic::catch_unwind(AssertUnwindSafe(|| monitor.tick())).is_err() {
      error!("[{}] Tick panicked; continuing", monitor.name());
    }
    let interval = monitor.interval();
    while !state.should_stop() {
      let elapsed = started.elapsed();
      if elapsed >= interval {
        break;
      }
      thread::sleep((interval - elapsed).min(STOP_CHECK_SLICE));
    }
  }
  monitor.on_stop();
  debug!("[{}] Monitor stopped", monitor.name());
}

pub fn spawn<M: Monitor>(mut monitor: M, state: Arc<SharedState>) -> io::Result<JoinHandle<()>> {
  thread::Builder::new()
    .name(monitor.name().to_lowercase())
    .spawn(move || run_until_stopped(&mut monitor, &state))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct Counting {
    ticks: Arc<AtomicUsize>,
    stop_after: usize,
    state: Arc<SharedState>,
    panic_on: Option<usize>,
  }

  impl Monitor for Counting {
    fn name(&self) -> &'static str {
      "Counting"
    }

    fn interval(&self) -> Duration {
      Duration::from_millis(1)
    }

    fn tick(&mut self) {
      let n = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
      if n >= self.stop_after {
        self.state.request_stop();
      }
      if self.panic_on == Some(n) {
        panic!("boom");
      }
    }
  }

  #[test]
  fn loop_runs_until_stop_requested() {
    let state = Arc::new(SharedState::new());
    let ticks = Arc::new(AtomicUsize::new(0));
    let mut monitor = Counting {
      ticks: ticks.clone(),
      stop_after: 3,
      state: state.clone(),
      panic_on: None,
    };
    run_until_stopped(&mut monitor, &state);
    assert_eq!(ticks.load(Ordering::SeqCst), 3);
  }

  #[test]
  fn panicking_tick_does_not_end_the_loop() {
    let state = Arc::new(SharedState::new());
    let ticks = Arc::new(AtomicUsize::new(0));
    let monitor = Counting {
      ticks: ticks.clone(),
      stop_after: 4,
      state: state.clone(),
      panic_on: Some(2),
    };
    let handle = spawn(monitor, state).unwrap();
    handle.join().unwrap();
    assert_eq!(ticks.load(Ordering::SeqCst), 4);
  }
}
