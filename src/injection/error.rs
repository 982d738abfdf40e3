use std::io;
use thiserror::Error;

// Error handling for overlay build and activation

#[derive(Debug, Error)]
pub enum InjectionError {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid game path: {0}")]
    InvalidGamePath(String),
    #[error("No mod package for {0}")]
    MissingPackage(String),
    #[error("Process error: {0}")]
    Process(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Build cancelled")]
    Cancelled,
    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl InjectionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// Injector state, mirroring the mod manager's state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModState {
    Idle,
    Busy,
    Running,
    CriticalError,
}
