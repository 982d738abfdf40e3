// Agent configuration: JSON file under the data dir, overridable from the CLI

use crate::monitors::detection::band::BandConfig;
use crate::monitors::detection::ui::UiPathStep;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read { path: PathBuf, source: std::io::Error },
  #[error("failed to parse {path}: {source}")]
  Parse { path: PathBuf, source: serde_json::Error },
  #[error("failed to write {path}: {source}")]
  Write { path: PathBuf, source: std::io::Error },
  #[error("no data directory available on this platform")]
  NoDataDir,
}

/// Which detection strategy feeds the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
  Ui,
  Ocr,
  Both,
  None,
}

impl DetectionMode {
  pub fn uses_ui(self) -> bool {
    matches!(self, DetectionMode::Ui | DetectionMode::Both)
  }

  pub fn uses_ocr(self) -> bool {
    matches!(self, DetectionMode::Ocr | DetectionMode::Both)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
  #[serde(default)]
  pub league_path: Option<PathBuf>,
  #[serde(default)]
  pub mod_tools_path: Option<PathBuf>,
  #[serde(default = "default_detection")]
  pub detection: DetectionMode,
  #[serde(default = "default_phase_poll_ms")]
  pub phase_poll_ms: u64,
  #[serde(default = "default_champion_poll_ms")]
  pub champion_poll_ms: u64,
  #[serde(default = "default_detection_poll_ms")]
  pub detection_poll_ms: u64,
  #[serde(default = "default_ocr_poll_ms")]
  pub ocr_poll_ms: u64,
  #[serde(default = "default_ticker_poll_ms")]
  pub ticker_poll_ms: u64,
  #[serde(default = "default_selection_poll_ms")]
  pub selection_poll_ms: u64,
  #[serde(default = "default_connection_poll_ms")]
  pub connection_poll_ms: u64,
  #[serde(default = "default_detection_grace_ms")]
  pub detection_grace_ms: u64,
  #[serde(default = "default_injection_threshold_ms")]
  pub injection_threshold_ms: u64,
  #[serde(default = "default_min_similarity")]
  pub ui_min_similarity: f64,
  #[serde(default = "default_min_similarity")]
  pub ocr_min_similarity: f64,
  #[serde(default = "default_ownership_refetch_cooldown_ms")]
  pub ownership_refetch_cooldown_ms: u64,
  #[serde(default = "default_packager_timeout_secs")]
  pub packager_timeout_secs: u64,
  #[serde(default = "default_startup_timeout_secs")]
  pub startup_timeout_secs: u64,
  #[serde(default)]
  pub ocr_band: BandConfig,
  /// Directory holding the OCR model files; `<data dir>/ocr` when unset.
  #[serde(default)]
  pub ocr_model_dir: Option<PathBuf>,
  #[serde(default = "default_capture_window")]
  pub capture_window: String,
  #[serde(default = "crate::monitors::detection::ui::default_ui_path")]
  pub ui_path: Vec<UiPathStep>,
  #[serde(default)]
  pub verbose: bool,
}

fn default_detection() -> DetectionMode {
  DetectionMode::Ui
}

fn default_phase_poll_ms() -> u64 {
  500
}

fn default_champion_poll_ms() -> u64 {
  250
}

fn default_detection_poll_ms() -> u64 {
  100
}

fn default_ocr_poll_ms() -> u64 {
  250
}

fn default_ticker_poll_ms() -> u64 {
  50
}

fn default_selection_poll_ms() -> u64 {
  50
}

fn default_connection_poll_ms() -> u64 {
  1000
}

fn default_capture_window() -> String {
  "League of Legends".to_string()
}

fn default_detection_grace_ms() -> u64 {
  200
}

fn default_injection_threshold_ms() -> u64 {
  300
}

fn default_min_similarity() -> f64 {
  crate::catalog::DEFAULT_MIN_SIMILARITY
}

fn default_ownership_refetch_cooldown_ms() -> u64 {
  2000
}

fn default_packager_timeout_secs() -> u64 {
  60
}

fn default_startup_timeout_secs() -> u64 {
  30
}

impl Default for AgentConfig {
  fn default() -> Self {
    Self {
      league_path: None,
      mod_tools_path: None,
      detection: default_detection(),
      phase_poll_ms: default_phase_poll_ms(),
      champion_poll_ms: default_champion_poll_ms(),
      detection_poll_ms: default_detection_poll_ms(),
      ocr_poll_ms: default_ocr_poll_ms(),
      ticker_poll_ms: default_ticker_poll_ms(),
      selection_poll_ms: default_selection_poll_ms(),
      connection_poll_ms: default_connection_poll_ms(),
      detection_grace_ms: default_detection_grace_ms(),
      injection_threshold_ms: default_injection_threshold_ms(),
      ui_min_similarity: default_min_similarity(),
      ocr_min_similarity: default_min_similarity(),
      ownership_refetch_cooldown_ms: default_ownership_refetch_cooldown_ms(),
      packager_timeout_secs: default_packager_timeout_secs(),
      startup_timeout_secs: default_startup_timeout_secs(),
      ocr_band: BandConfig::default(),
      ocr_model_dir: None,
      capture_window: default_capture_window(),
      ui_path: crate::monitors::detection::ui::default_ui_path(),
      verbose: false,
    }
  }
}

impl AgentConfig {
  /// Missing file means defaults; an unreadable or malformed one is an error.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    if !path.exists() {
      return Ok(Self::default());
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
      path: path.to_path_buf(),
      source,
    };
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(write_err)?;
    }
    let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    fs::write(path, json).map_err(write_err)
  }

  pub fn interval(value_ms: u64) -> Duration {
    Duration::from_millis(value_ms.max(1))
  }
}

/// Directory layout under the agent's data dir.
#[derive(Debug, Clone)]
pub struct AgentPaths {
  pub data_dir: PathBuf,
}

impl AgentPaths {
  pub fn new(data_dir: PathBuf) -> Self {
    Self { data_dir }
  }

  pub fn from_platform() -> Result<Self, ConfigError> {
    let base = dirs::data_local_dir().ok_or(ConfigError::NoDataDir)?;
    Ok(Self::new(base.join("skinsync")))
  }

  pub fn config_file(&self) -> PathBuf {
    self.data_dir.join("config").join("config.json")
  }

  pub fn logs_dir(&self) -> PathBuf {
    self.data_dir.join("logs")
  }

  pub fn mods_dir(&self) -> PathBuf {
    self.data_dir.join("mods")
  }

  pub fn extract_cache_dir(&self) -> PathBuf {
    self.data_dir.join("cache").join("extracted")
  }

  pub fn prebuilt_dir(&self) -> PathBuf {
    self.data_dir.join("prebuilt")
  }

  pub fn overlay_dir(&self) -> PathBuf {
    self.data_dir.join("overlay")
  }

  pub fn overlay_config_file(&self) -> PathBuf {
    self.data_dir.join("config.json")
  }

  pub fn historic_file(&self) -> PathBuf {
    self.data_dir.join("historic.json")
  }

  pub fn ocr_model_dir(&self) -> PathBuf {
    self.data_dir.join("ocr")
  }
}
