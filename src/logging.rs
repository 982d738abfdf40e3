// Logging backend: stdout, a bounded in-memory buffer and an on-disk live log

use chrono::{Local, Utc};
use log::{LevelFilter, Log, Metadata, Record};
use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const LOG_BUFFER_LINES: usize = 2000;
const LIVE_LOG_NAME: &str = "skinsync-live.log";

// Global in-memory log buffer
pub static LOG_BUFFER: Lazy<Mutex<VecDeque<String>>> =
  Lazy::new(|| Mutex::new(VecDeque::with_capacity(LOG_BUFFER_LINES)));

static LOGGER: Lazy<AgentLogger> = Lazy::new(AgentLogger::default);

#[derive(Default)]
pub struct AgentLogger {
  live_log: Mutex<Option<File>>,
}

impl AgentLogger {
  fn open_live_log(&self, logs_dir: &Path) {
    if let Err(e) = fs::create_dir_all(logs_dir) {
      // Non-fatal: we still keep logs in memory
      eprintln!("[Logging] Failed to ensure logs dir exists: {}", e);
      return;
    }
    match File::options().create(true).append(true).open(logs_dir.join(LIVE_LOG_NAME)) {
      Ok(f) => {
        if let Ok(mut slot) = self.live_log.lock() {
          *slot = Some(f);
        }
      }
      Err(e) => eprintln!("[Logging] Failed to open live log: {}", e),
    }
  }
}

fn push_bounded(buf: &mut VecDeque<String>, line: &str) {
  // Keep buffer bounded to the last LOG_BUFFER_LINES lines
  while buf.len() >= LOG_BUFFER_LINES {
    buf.pop_front();
  }
  buf.push_back(line.to_string());
}

pub fn push_buffer_line(line: &str) {
  if let Ok(mut buf) = LOG_BUFFER.lock() {
    push_bounded(&mut buf, line);
  }
}

impl Log for AgentLogger {
  fn enabled(&self, metadata: &Metadata) -> bool {
    metadata.level() <= log::max_level()
  }

  fn log(&self, record: &Record) {
    if !self.enabled(record.metadata()) {
      return;
    }

    let line = format!(
      "[{}] [{}] {}",
      Local::now().format("%H:%M:%S%.3f"),
      record.level(),
      record.args()
    );
    println!("{}", line);
    push_buffer_line(&line);

    if let Ok(mut slot) = self.live_log.lock() {
      if let Some(f) = slot.as_mut() {
        // Ignore failures to avoid taking down the caller
        let _ = writeln!(f, "{}", line);
      }
    }
  }

  fn flush(&self) {
    if let Ok(mut slot) = self.live_log.lock() {
      if let Some(f) = slot.as_mut() {
        let _ = f.flush();
      }
    }
  }
}

/// Installs the global logger. Calling it twice keeps the first logger.
pub fn init(logs_dir: Option<&Path>, verbose: bool) {
  if let Some(dir) = logs_dir {
    LOGGER.open_live_log(dir);
  }
  let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
  if log::set_logger(&*LOGGER).is_ok() {
    log::set_max_level(level);
  }
}

/// Write a timestamped copy of the runtime log and return its path.
pub fn export_logs(logs_dir: &Path) -> Result<PathBuf, String> {
  fs::create_dir_all(logs_dir).map_err(|e| format!("Failed to create log dir: {}", e))?;

  // Prefer the live log; it holds everything since the agent started
  let live_log = logs_dir.join(LIVE_LOG_NAME);
  let full_contents = match fs::read_to_string(&live_log) {
    Ok(s) if !s.is_empty() => s,
    _ => {
      let buf = LOG_BUFFER.lock().map_err(|e| format!("Lock error: {}", e))?;
      if buf.is_empty() {
        return Err("No logs available".to_string());
      }
      buf.iter().cloned().collect::<Vec<_>>().join("\n")
    }
  };

  let filename = format!("skinsync-logs-{}.txt", Utc::now().format("%Y%m%d-%H%M%S"));
  let out_path = logs_dir.join(filename);
  let mut file = File::create(&out_path).map_err(|e| format!("Failed to create file: {}", e))?;
  write!(file, "{}", full_contents).map_err(|e| format!("Failed to write logs: {}", e))?;

  Ok(out_path)
}
