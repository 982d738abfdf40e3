use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::catalog::ids;

// What a prebuild produces an overlay for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildTarget {
    Cosmetic { cosmetic_id: u32, chroma_id: Option<u32> },
    // Package path relative to the mods root
    Custom { relative_path: String },
}

impl BuildTarget {
    pub fn cosmetic(cosmetic_id: u32, chroma_id: Option<u32>) -> Self {
        Self::Cosmetic { cosmetic_id, chroma_id }
    }

    /// Id whose package ends up in the overlay.
    pub fn inject_id(&self) -> Option<u32> {
        match self {
            Self::Cosmetic { cosmetic_id, chroma_id } => Some(chroma_id.unwrap_or(*cosmetic_id)),
            Self::Custom { .. } => None,
        }
    }

    pub fn key(&self) -> String {
        match self {
            Self::Cosmetic { cosmetic_id, chroma_id: Some(chroma) } => format!("skin:{}:{}", cosmetic_id, chroma),
            Self::Cosmetic { cosmetic_id, chroma_id: None } => format!("skin:{}", cosmetic_id),
            Self::Custom { relative_path } => format!("path:{}", relative_path),
        }
    }

    /// Owned cosmetics and default looks are applied by the client itself.
    pub fn needs_overlay(&self, owned: &std::collections::HashSet<u32>) -> bool {
        match self.inject_id() {
            Some(id) => !ids::is_default_cosmetic(id) && !owned.contains(&id),
            None => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrebuildJob {
    pub id: Uuid,
    pub champion_id: u32,
    pub target: BuildTarget,
    pub started_at: Instant,
    pub cancel: CancellationToken,
}

impl PrebuildJob {
    pub fn new(champion_id: u32, target: BuildTarget) -> Self {
        Self {
            id: Uuid::new_v4(),
            champion_id,
            target,
            started_at: Instant::now(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Output of a finished build. `output_dir` is None when the target
/// needs no overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    pub job_id: Uuid,
    pub champion_id: u32,
    pub target: BuildTarget,
    pub output_dir: Option<PathBuf>,
}

impl BuildArtifact {
    pub fn empty(job: &PrebuildJob) -> Self {
        Self {
            job_id: job.id,
            champion_id: job.champion_id,
            target: job.target.clone(),
            output_dir: None,
        }
    }
}
