use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use skinsync_lib::agent::{Agent, DetectorSlot};
use skinsync_lib::config::{AgentConfig, AgentPaths, DetectionMode};
use skinsync_lib::injection::{InjectorPaths, ModStorage, ModTools, SkinInjector};
use skinsync_lib::lcu::LcuClient;
use skinsync_lib::{league_path, logging};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Pre-builds and activates cosmetic overlays during champion select")]
struct Args {
  /// Config file (defaults to <data dir>/config/config.json)
  #[arg(long)]
  config: Option<PathBuf>,

  /// Data directory for mods, caches, logs and history
  #[arg(long)]
  data_dir: Option<PathBuf>,

  /// Client install directory
  #[arg(long)]
  league_path: Option<PathBuf>,

  #[arg(long, value_enum)]
  detection: Option<DetectionMode>,

  /// Remaining countdown at which the overlay is activated
  #[arg(long)]
  threshold_ms: Option<u64>,

  #[arg(short, long)]
  verbose: bool,

  /// Write a copy of the live log next to it and exit
  #[arg(long)]
  export_logs: bool,
}

fn main() -> anyhow::Result<()> {
  let args = Args::parse();

  let paths = match &args.data_dir {
    Some(dir) => AgentPaths::new(dir.clone()),
    None => AgentPaths::from_platform()?,
  };

  if args.export_logs {
    let out = logging::export_logs(&paths.logs_dir()).map_err(anyhow::Error::msg)?;
    println!("{}", out.display());
    return Ok(());
  }

  let config_file = args.config.clone().unwrap_or_else(|| paths.config_file());
  let mut config = AgentConfig::load(&config_file).context("loading configuration")?;
  apply_overrides(&mut config, &args);

  logging::init(Some(&paths.logs_dir()), config.verbose);
  info!("[Agent] skinsync {} starting, data dir {}", env!("CARGO_PKG_VERSION"), paths.data_dir.display());

  let league = config
    .league_path
    .clone()
    .or_else(league_path::detect_league_path)
    .context("client install not found; pass --league-path")?;
  info!("[Agent] Client install: {}", league.display());

  let client = LcuClient::connect(&league, Duration::from_secs(config.startup_timeout_secs))
    .map_err(|e| {
      error!("[LCU] Could not reach the client: {}", e);
      e
    })
    .context("connecting to the game client")?;

  let injector = build_injector(&league, &config, &paths)?;
  let detectors = build_detectors(&config, &paths);

  let mut agent = Agent::start(Arc::new(client), Arc::new(injector), &config, &paths, detectors)
    .context("starting monitors")?;
  agent.wait();
  agent.shutdown();
  Ok(())
}

fn apply_overrides(config: &mut AgentConfig, args: &Args) {
  if let Some(path) = &args.league_path {
    config.league_path = Some(path.clone());
  }
  if let Some(mode) = args.detection {
    config.detection = mode;
  }
  if let Some(ms) = args.threshold_ms {
    config.injection_threshold_ms = ms;
  }
  config.verbose |= args.verbose;
}

fn build_injector(league: &std::path::Path, config: &AgentConfig, paths: &AgentPaths) -> anyhow::Result<SkinInjector> {
  let tools_exe = ModTools::locate(config.mod_tools_path.as_deref(), &paths.data_dir);
  if tools_exe.is_none() {
    warn!("[Agent] Mod tools not found; builds will fail until they are installed");
  }
  let tools = ModTools::new(tools_exe, Duration::from_secs(config.packager_timeout_secs));
  let storage = ModStorage::new(paths.mods_dir(), paths.extract_cache_dir());
  let injector_paths = InjectorPaths {
    prebuilt_dir: paths.prebuilt_dir(),
    overlay_dir: paths.overlay_dir(),
    overlay_config: paths.overlay_config_file(),
  };
  SkinInjector::new(league, injector_paths, storage, tools).context("preparing the injector")
}

fn build_detectors(config: &AgentConfig, paths: &AgentPaths) -> Vec<DetectorSlot> {
  let mut slots = Vec::new();
  let mut want_ocr = config.detection.uses_ocr();

  if config.detection.uses_ui() {
    // UI automation needs a platform backend that this binary does not ship
    warn!("[Agent] No UI-automation backend in this build; falling back to OCR");
    want_ocr = true;
  }

  if want_ocr {
    match ocr_slot(config, paths) {
      Some(slot) => slots.push(slot),
      None => warn!("[Agent] OCR detection unavailable"),
    }
  }
  slots
}

#[cfg(feature = "ocr")]
fn ocr_slot(config: &AgentConfig, paths: &AgentPaths) -> Option<DetectorSlot> {
  use skinsync_lib::monitors::detection::ocr::{OcrDetector, OcrModelPaths, PaddleOcr, WindowCapture};

  let dir = config.ocr_model_dir.clone().unwrap_or_else(|| paths.ocr_model_dir());
  let models = OcrModelPaths::in_dir(&dir);
  let missing = models.missing();
  if !missing.is_empty() {
    warn!("[Agent] OCR model files missing: {:?}", missing);
    return None;
  }
  let backend = match PaddleOcr::new(&models) {
    Ok(backend) => backend,
    Err(e) => {
      warn!("[Agent] OCR engine failed to load: {}", e);
      return None;
    }
  };
  let detector = OcrDetector::new(WindowCapture::new(&config.capture_window), backend, config.ocr_band.clone());
  Some(DetectorSlot {
    detector: Box::new(detector),
    min_similarity: config.ocr_min_similarity,
    interval: AgentConfig::interval(config.ocr_poll_ms),
  })
}

#[cfg(not(feature = "ocr"))]
fn ocr_slot(_config: &AgentConfig, _paths: &AgentPaths) -> Option<DetectorSlot> {
  warn!("[Agent] Built without the `ocr` feature");
  None
}
