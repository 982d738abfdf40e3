// Last activated selection per champion, persisted as historic.json:
// { "<championId>": <cosmeticId> | "path:<package path under mods root>" }

use crate::catalog::{ids, SkinCatalog};
use crate::injection::error::InjectionError;
use crate::injection::job::BuildTarget;
use log::debug;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

const CUSTOM_PREFIX: &str = "path:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoricEntry {
    Cosmetic(u32),
    Custom(String),
}

impl HistoricEntry {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().and_then(|id| u32::try_from(id).ok()).map(Self::Cosmetic),
            Value::String(s) => s
                .strip_prefix(CUSTOM_PREFIX)
                .filter(|p| !p.is_empty())
                .map(|p| Self::Custom(p.to_string())),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Cosmetic(id) => Value::from(*id),
            Self::Custom(path) => Value::from(format!("{}{}", CUSTOM_PREFIX, path)),
        }
    }

    /// Build target for this entry. `parent` is the skin a chroma id
    /// recolors, when known; legacy variants use the override table.
    pub fn to_target(&self, parent: Option<u32>) -> BuildTarget {
        match self {
            Self::Cosmetic(id) => match ids::override_base(*id).or(parent) {
                Some(base) if base != *id => BuildTarget::cosmetic(base, Some(*id)),
                _ => BuildTarget::cosmetic(*id, None),
            },
            Self::Custom(path) => BuildTarget::Custom {
                relative_path: path.clone(),
            },
        }
    }

    pub fn from_target(target: &BuildTarget) -> Option<Self> {
        match target {
            BuildTarget::Cosmetic { .. } => target.inject_id().map(Self::Cosmetic),
            BuildTarget::Custom { relative_path } => Some(Self::Custom(relative_path.clone())),
        }
    }
}

#[derive(Clone)]
pub struct HistoricStore {
    path: PathBuf,
    catalog: Option<Arc<SkinCatalog>>,
}

impl HistoricStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path, catalog: None }
    }

    /// Use `catalog` to find the skin a remembered chroma belongs to.
    pub fn with_catalog(mut self, catalog: Arc<SkinCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Missing or unreadable file reads as an empty map.
    pub fn load(&self) -> BTreeMap<u32, HistoricEntry> {
        let parsed = fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| serde_json::from_str::<Map<String, Value>>(&s).ok());
        let Some(map) = parsed else {
            return BTreeMap::new();
        };

        map.iter()
            .filter_map(|(k, v)| Some((k.parse::<u32>().ok()?, HistoricEntry::from_value(v)?)))
            .collect()
    }

    pub fn get(&self, champion_id: u32) -> Option<HistoricEntry> {
        self.load().remove(&champion_id)
    }

    /// Target for the champion's remembered selection, shaped like the
    /// one detection produces for the same pick.
    pub fn seed_target(&self, champion_id: u32) -> Option<BuildTarget> {
        let entry = self.get(champion_id)?;
        let parent = match (&entry, &self.catalog) {
            (HistoricEntry::Cosmetic(id), Some(catalog)) => match catalog.entries_for(champion_id) {
                Ok(entries) => entries.iter().find(|e| e.id == *id).and_then(|e| e.parent_id),
                Err(e) => {
                    debug!("[Historic] No catalog for champion {} ({}); seeding {} as is", champion_id, e, id);
                    None
                }
            },
            _ => None,
        };
        Some(entry.to_target(parent))
    }

    pub fn write(&self, champion_id: u32, entry: HistoricEntry) -> Result<(), InjectionError> {
        let mut map = self.load();
        map.insert(champion_id, entry);

        let json: Map<String, Value> = map.iter().map(|(k, v)| (k.to_string(), v.to_value())).collect();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(&json).map_err(|e| InjectionError::Config(e.to_string()))?;
        fs::write(&self.path, body)?;
        debug!("[Historic] Saved entry for champion {}", champion_id);
        Ok(())
    }
}
