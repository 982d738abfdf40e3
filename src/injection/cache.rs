use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

// Completed overlays kept for the current champion select, so hovering
// back to an already built cosmetic is instantly ready.

const MAX_AGE: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Default)]
pub struct PrebuiltCache {
    // Build target key hash -> (job output dir, last use)
    overlays: HashMap<String, (PathBuf, Instant)>,
}

impl PrebuiltCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn hash_key(key: &str) -> String {
        format!("{:x}", md5::compute(key))
    }

    /// Cached output for `key` if it still exists on disk and isn't stale.
    pub fn get(&mut self, key: &str) -> Option<PathBuf> {
        let hash = Self::hash_key(key);
        match self.overlays.get_mut(&hash) {
            Some((path, time)) if path.exists() && time.elapsed() < MAX_AGE => {
                *time = Instant::now();
                Some(path.clone())
            }
            Some(_) => {
                if let Some((path, _)) = self.overlays.remove(&hash) {
                    let _ = fs::remove_dir_all(path);
                }
                None
            }
            None => None,
        }
    }

    pub fn insert(&mut self, key: &str, path: PathBuf) {
        let hash = Self::hash_key(key);
        if let Some((old, _)) = self.overlays.insert(hash, (path.clone(), Instant::now())) {
            if old != path {
                let _ = fs::remove_dir_all(old);
            }
        }
    }

    /// Forget `key` without touching its output (it was moved elsewhere).
    pub fn take(&mut self, key: &str) -> Option<PathBuf> {
        self.overlays.remove(&Self::hash_key(key)).map(|(path, _)| path)
    }

    /// Remove every cached output from disk.
    pub fn clear(&mut self) {
        for (_, (path, _)) in self.overlays.drain() {
            if path.exists() {
                let _ = fs::remove_dir_all(path);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn returns_existing_output() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("job-a");
        fs::create_dir_all(&out).unwrap();

        let mut cache = PrebuiltCache::new();
        cache.insert("skin:157002", out.clone());
        assert_eq!(cache.get("skin:157002"), Some(out));
        assert_eq!(cache.get("skin:157003"), None);
    }

    #[test]
    fn vanished_output_is_dropped() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("job-b");
        fs::create_dir_all(&out).unwrap();

        let mut cache = PrebuiltCache::new();
        cache.insert("skin:1", out.clone());
        fs::remove_dir_all(&out).unwrap();
        assert_eq!(cache.get("skin:1"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_removes_outputs_from_disk() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("job-c");
        fs::create_dir_all(&out).unwrap();

        let mut cache = PrebuiltCache::new();
        cache.insert("skin:2", out.clone());
        cache.clear();
        assert!(!out.exists());
    }
}
