// Gameflow phase reported by the client

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
  #[default]
  None,
  Lobby,
  Matchmaking,
  ReadyCheck,
  ChampSelect,
  GameStart,
  InProgress,
  Reconnect,
  WaitingForStats,
  PreEndOfGame,
  EndOfGame,
  // Anything the client reports that we don't model explicitly
  Other(String),
}

impl Phase {
  pub fn parse(raw: &str) -> Self {
    match raw.trim().trim_matches('"') {
      "" | "None" => Phase::None,
      "Lobby" => Phase::Lobby,
      "Matchmaking" => Phase::Matchmaking,
      "ReadyCheck" => Phase::ReadyCheck,
      "ChampSelect" => Phase::ChampSelect,
      "GameStart" => Phase::GameStart,
      "InProgress" => Phase::InProgress,
      "Reconnect" => Phase::Reconnect,
      "WaitingForStats" => Phase::WaitingForStats,
      "PreEndOfGame" => Phase::PreEndOfGame,
      "EndOfGame" => Phase::EndOfGame,
      other => Phase::Other(other.to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Phase::None => "None",
      Phase::Lobby => "Lobby",
      Phase::Matchmaking => "Matchmaking",
      Phase::ReadyCheck => "ReadyCheck",
      Phase::ChampSelect => "ChampSelect",
      Phase::GameStart => "GameStart",
      Phase::InProgress => "InProgress",
      Phase::Reconnect => "Reconnect",
      Phase::WaitingForStats => "WaitingForStats",
      Phase::PreEndOfGame => "PreEndOfGame",
      Phase::EndOfGame => "EndOfGame",
      Phase::Other(raw) => raw,
    }
  }

  pub fn is_champ_select(&self) -> bool {
    matches!(self, Phase::ChampSelect)
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
