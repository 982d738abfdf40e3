// Blocking HTTPS client for the local game-client API

use super::lockfile::{read_lockfile, LcuConnection};
use super::{session, ChampSelectSource, InventorySource, LcuError, LoadoutTimer, NameCatalog, PhaseSource};
use crate::catalog::CatalogEntry;
use crate::state::Phase;
use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub struct LcuClient {
  league_path: PathBuf,
  http: Client,
  connection: RwLock<Option<LcuConnection>>,
}

impl LcuClient {
  pub fn new(league_path: &Path) -> Result<Self, LcuError> {
    // The client serves a self-signed certificate on loopback
    let http = Client::builder()
      .danger_accept_invalid_certs(true)
      .timeout(Duration::from_secs(5))
      .build()?;

    Ok(Self {
      league_path: league_path.to_path_buf(),
      http,
      connection: RwLock::new(None),
    })
  }

  /// Waits until the client answers a phase query or `timeout` runs out.
  pub fn connect(league_path: &Path, timeout: Duration) -> Result<Self, LcuError> {
    let client = Self::new(league_path)?;
    let started = Instant::now();
    let mut last_err = LcuError::LockfileNotFound(league_path.display().to_string());

    while started.elapsed() < timeout {
      match client.get_phase() {
        Ok(phase) => {
          info!("[LCU] Connected to client (phase {})", phase);
          return Ok(client);
        }
        Err(e) => {
          debug!("[LCU] Client not reachable yet: {}", e);
          last_err = e;
        }
      }
      thread::sleep(Duration::from_millis(500));
    }
    Err(last_err)
  }

  fn current_connection(&self) -> Result<LcuConnection, LcuError> {
    if let Some(conn) = self.connection.read().unwrap_or_else(|e| e.into_inner()).clone() {
      return Ok(conn);
    }

    let conn = read_lockfile(&self.league_path)
      .ok_or_else(|| LcuError::LockfileNotFound(self.league_path.display().to_string()))?;
    debug!("[LCU] Using lockfile {}", conn.lockfile.display());
    *self.connection.write().unwrap_or_else(|e| e.into_inner()) = Some(conn.clone());
    Ok(conn)
  }

  // Forget the cached port/token so the next call re-reads the lockfile
  fn drop_connection(&self) {
    *self.connection.write().unwrap_or_else(|e| e.into_inner()) = None;
  }

  fn get_json(&self, path: &str) -> Result<Value, LcuError> {
    let conn = self.current_connection()?;
    let resp = match self
      .http
      .get(conn.url(path))
      .header("Authorization", conn.auth_header())
      .send()
    {
      Ok(resp) => resp,
      Err(e) => {
        if e.is_connect() {
          warn!("[LCU] Connection to client lost: {}", e);
          self.drop_connection();
        }
        return Err(e.into());
      }
    };

    let status = resp.status();
    if !status.is_success() {
      return Err(LcuError::Status(status.as_u16(), path.to_string()));
    }
    Ok(resp.json::<Value>()?)
  }

  // 404 from champ-select endpoints just means "not in champ select"
  fn get_json_opt(&self, path: &str) -> Result<Option<Value>, LcuError> {
    match self.get_json(path) {
      Ok(v) => Ok(Some(v)),
      Err(LcuError::Status(404, _)) => Ok(None),
      Err(e) => Err(e),
    }
  }
}

fn now_epoch_ms() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_millis() as u64
}

impl PhaseSource for LcuClient {
  fn get_phase(&self) -> Result<Phase, LcuError> {
    let body = self.get_json("/lol-gameflow/v1/gameflow-phase")?;
    let raw = body
      .as_str()
      .ok_or_else(|| LcuError::Parse(format!("phase is not a string: {}", body)))?;
    Ok(Phase::parse(raw))
  }
}

impl ChampSelectSource for LcuClient {
  fn get_hovered_champion(&self) -> Result<Option<u32>, LcuError> {
    Ok(
      self
        .get_json_opt("/lol-champ-select/v1/hovered-champion-id")?
        .as_ref()
        .and_then(session::hovered_champion_id),
    )
  }

  fn get_locked_champion(&self) -> Result<Option<u32>, LcuError> {
    Ok(
      self
        .get_json_opt("/lol-champ-select/v1/session")?
        .as_ref()
        .and_then(session::locked_champion_id),
    )
  }

  fn get_loadout_timer(&self) -> Result<Option<LoadoutTimer>, LcuError> {
    Ok(
      self
        .get_json_opt("/lol-champ-select/v1/session")?
        .as_ref()
        .and_then(|s| session::loadout_timer(s, now_epoch_ms())),
    )
  }
}

impl InventorySource for LcuClient {
  fn get_owned_cosmetics(&self) -> Result<Vec<u32>, LcuError> {
    let body = self.get_json("/lol-inventory/v2/inventory/CHAMPION_SKIN")?;
    Ok(session::owned_cosmetic_ids(&body))
  }
}

impl NameCatalog for LcuClient {
  fn get_client_language(&self) -> Result<String, LcuError> {
    let body = self.get_json("/riotclient/region-locale")?;
    body
      .get("locale")
      .and_then(|v| v.as_str())
      .map(str::to_string)
      .ok_or_else(|| LcuError::Parse("region-locale has no locale".into()))
  }

  // Game data is served in the client's current locale, so the language
  // only keys the cache on our side.
  fn get_cosmetic_names(&self, champion_id: u32, language: &str) -> Result<Vec<CatalogEntry>, LcuError> {
    let body = self.get_json(&format!("/lol-game-data/assets/v1/champions/{}.json", champion_id))?;
    let entries = session::catalog_entries(&body);
    debug!(
      "[LCU] Loaded {} cosmetic names for champion {} ({})",
      entries.len(),
      champion_id,
      language
    );
    Ok(entries)
  }
}
