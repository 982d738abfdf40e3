// Lockfile discovery for the local client API

use base64::{engine::general_purpose, Engine as _};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LcuConnection {
  pub port: String,
  pub token: String,
  pub lockfile: PathBuf,
}

impl LcuConnection {
  pub fn auth_header(&self) -> String {
    let auth = general_purpose::STANDARD.encode(format!("riot:{}", self.token));
    format!("Basic {}", auth)
  }

  pub fn url(&self, path: &str) -> String {
    format!("https://127.0.0.1:{}{}", self.port, path)
  }
}

// Lockfile format: name:pid:port:password:protocol
pub fn read_lockfile(league_path: &Path) -> Option<LcuConnection> {
  for name in ["lockfile", "LeagueClientUx.lockfile", "LeagueClient.lockfile"] {
    let path = league_path.join(name);
    if let Ok(content) = fs::read_to_string(&path) {
      let parts: Vec<&str> = content.trim().split(':').collect();
      if parts.len() >= 5 {
        return Some(LcuConnection {
          port: parts[2].to_string(),
          token: parts[3].to_string(),
          lockfile: path,
        });
      }
    }
  }
  None
}
