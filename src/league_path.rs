#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

// Locating the client install when none is configured

const COMMON_PATHS: [&str; 3] = [
  r"C:\Riot Games\League of Legends",
  r"C:\Program Files\Riot Games\League of Legends",
  r"C:\Program Files (x86)\Riot Games\League of Legends",
];

/// Client root: has the client executable or the game executable.
pub fn is_league_dir(dir: &Path) -> bool {
  dir.join("LeagueClient.exe").exists() || dir.join("Game").join("League of Legends.exe").exists()
}

pub fn detect_league_path() -> Option<PathBuf> {
  if let Some(found) = COMMON_PATHS.iter().map(PathBuf::from).find(|p| is_league_dir(p)) {
    return Some(found);
  }
  registry_location().filter(|p| is_league_dir(p))
}

fn registry_location() -> Option<PathBuf> {
  if !cfg!(target_os = "windows") {
    return None;
  }
  let mut command = Command::new("powershell");
  #[cfg(target_os = "windows")]
  command.creation_flags(0x08000000); // CREATE_NO_WINDOW

  command.args([
    "-NoProfile",
    "-Command",
    r#"Get-ItemProperty -Path 'HKLM:\SOFTWARE\WOW6432Node\Riot Games, Inc\League of Legends' -Name 'Location' -ErrorAction SilentlyContinue | Select-Object -ExpandProperty Location"#,
  ]);

  let output = command.output().ok()?;
  if !output.status.success() {
    return None;
  }
  let path = String::from_utf8(output.stdout).ok()?;
  let path = path.trim();
  if path.is_empty() {
    None
  } else {
    Some(PathBuf::from(path))
  }
}
