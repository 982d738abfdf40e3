//! Cosmetic name catalog, id arithmetic and fuzzy resolution.

pub mod ids;
mod resolver;

pub use resolver::{normalize_name, similarity, Resolver, SkinMatch, DEFAULT_MIN_SIMILARITY};

use crate::lcu::{LcuError, NameCatalog};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
  pub id: u32,
  pub name: String,
  // Set for chromas: the skin they recolor
  pub parent_id: Option<u32>,
}

impl CatalogEntry {
  pub fn new(id: u32, name: &str) -> Self {
    Self {
      id,
      name: name.to_string(),
      parent_id: None,
    }
  }

  pub fn chroma(id: u32, name: &str, parent_id: u32) -> Self {
    Self {
      id,
      name: name.to_string(),
      parent_id: Some(parent_id),
    }
  }
}

#[derive(Default)]
struct CatalogInner {
  language: Option<String>,
  champions: HashMap<u32, Arc<Vec<CatalogEntry>>>,
}

/// Per-champion name lists for the client's current language, loaded on
/// first use and dropped when the language changes.
pub struct SkinCatalog {
  source: Arc<dyn NameCatalog>,
  inner: Mutex<CatalogInner>,
}

impl SkinCatalog {
  pub fn new(source: Arc<dyn NameCatalog>) -> Self {
    Self {
      source,
      inner: Mutex::new(CatalogInner::default()),
    }
  }

  fn inner(&self) -> std::sync::MutexGuard<'_, CatalogInner> {
    self.inner.lock().unwrap_or_else(|e| e.into_inner())
  }

  pub fn language(&self) -> Option<String> {
    self.inner().language.clone()
  }

  /// Returns true when the language changed and cached names were dropped.
  pub fn set_language(&self, language: &str) -> bool {
    let mut inner = self.inner();
    if inner.language.as_deref() == Some(language) {
      return false;
    }
    if let Some(old) = &inner.language {
      info!("[Catalog] Client language changed {} -> {}; dropping cached names", old, language);
    }
    inner.language = Some(language.to_string());
    inner.champions.clear();
    true
  }

  pub fn entries_for(&self, champion_id: u32) -> Result<Arc<Vec<CatalogEntry>>, LcuError> {
    let language = {
      let inner = self.inner();
      if let Some(entries) = inner.champions.get(&champion_id) {
        return Ok(entries.clone());
      }
      inner.language.clone()
    };

    let language = match language {
      Some(lang) => lang,
      None => {
        let lang = self.source.get_client_language()?;
        self.set_language(&lang);
        lang
      }
    };

    // Fetch without holding the lock; a concurrent loader just overwrites
    let entries = Arc::new(self.source.get_cosmetic_names(champion_id, &language)?);
    debug!("[Catalog] Cached {} names for champion {}", entries.len(), champion_id);

    let mut inner = self.inner();
    if inner.language.as_deref() == Some(language.as_str()) {
      inner.champions.insert(champion_id, entries.clone());
    }
    Ok(entries)
  }
}
