//! On-disk mod packages and overlay staging.
//!
//! Layout under the mods root:
//! `skins/<cosmetic_id>/<package>` where a package is a directory or a
//! `.zip`/`.fantome` archive. Other categories hold packages directly.

use crate::injection::error::InjectionError;
use log::{debug, warn};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

pub const CATEGORIES: &[&str] = &[
    "skins",
    "maps",
    "fonts",
    "announcers",
    "ui",
    "voiceover",
    "loading_screen",
    "vfx",
    "sfx",
    "others",
];

const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "fantome"];
const PURGE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    Directory,
    Archive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModPackage {
    pub path: PathBuf,
    pub kind: PackageKind,
    pub modified: SystemTime,
}

impl ModPackage {
    fn from_path(path: PathBuf) -> Option<Self> {
        let meta = fs::metadata(&path).ok()?;
        let kind = if meta.is_dir() {
            PackageKind::Directory
        } else if is_archive(&path) {
            PackageKind::Archive
        } else {
            return None;
        };
        Some(Self {
            modified: meta.modified().unwrap_or(UNIX_EPOCH),
            path,
            kind,
        })
    }

    /// Folder-safe name used as the mod name for the packaging tool.
    pub fn mod_name(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mod".to_string());
        stem.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
            .collect()
    }
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ARCHIVE_EXTENSIONS.iter().any(|a| e.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

/// How staged files got into the overlay tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    pub linked: usize,
    pub copied: usize,
}

#[derive(Debug, Clone)]
pub struct ModStorage {
    root: PathBuf,
    extract_cache: PathBuf,
}

impl ModStorage {
    pub fn new(root: PathBuf, extract_cache: PathBuf) -> Self {
        Self { root, extract_cache }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_layout(&self) -> Result<(), InjectionError> {
        for category in CATEGORIES {
            fs::create_dir_all(self.root.join(category))?;
        }
        fs::create_dir_all(&self.extract_cache)?;
        Ok(())
    }

    /// Newest package installed for a cosmetic id.
    pub fn resolve(&self, cosmetic_id: u32) -> Option<ModPackage> {
        self.resolve_in("skins", &cosmetic_id.to_string())
    }

    pub fn resolve_in(&self, category: &str, key: &str) -> Option<ModPackage> {
        let dir = self.root.join(category).join(key);
        let entries = fs::read_dir(&dir).ok()?;
        entries
            .filter_map(|e| e.ok())
            .filter_map(|e| ModPackage::from_path(e.path()))
            .max_by_key(|p| p.modified)
    }

    /// Package referenced by a path relative to the mods root.
    pub fn resolve_relative(&self, relative: &str) -> Option<ModPackage> {
        let rel = Path::new(relative);
        if rel.is_absolute() || rel.components().any(|c| matches!(c, Component::ParentDir)) {
            warn!("[Storage] Rejecting package path outside mods root: {}", relative);
            return None;
        }
        ModPackage::from_path(self.root.join(rel))
    }

    /// Place the package's files under `dest`, hard-linking where possible.
    pub fn stage(&self, package: &ModPackage, dest: &Path) -> Result<StageReport, InjectionError> {
        let source = match package.kind {
            PackageKind::Directory => package.path.clone(),
            PackageKind::Archive => self.extracted(package)?,
        };
        let report = link_tree(&source, dest)?;
        debug!(
            "[Storage] Staged {} ({} linked, {} copied)",
            package.path.display(),
            report.linked,
            report.copied
        );
        Ok(report)
    }

    // Archives are unpacked once; a new source mtime invalidates the copy
    fn extracted(&self, package: &ModPackage) -> Result<PathBuf, InjectionError> {
        let path_hash = format!("{:x}", md5::compute(package.path.to_string_lossy().as_bytes()));
        let folder_name = format!("{}-{}", package.mod_name(), &path_hash[..8]);
        let folder = self.extract_cache.join(&folder_name);
        let stamp_path = self.extract_cache.join(format!("{}.mtime", folder_name));
        let stamp = package
            .modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos().to_string())
            .unwrap_or_default();

        if folder.is_dir() && fs::read_to_string(&stamp_path).ok().as_deref() == Some(stamp.as_str()) {
            return Ok(folder);
        }

        if folder.exists() {
            fs::remove_dir_all(&folder)?;
        }
        fs::create_dir_all(&folder)?;
        extract_zip(&package.path, &folder)?;
        fs::write(&stamp_path, stamp)?;
        debug!("[Storage] Extracted {} into cache", package.path.display());
        Ok(folder)
    }
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<(), InjectionError> {
    let mut archive = zip::ZipArchive::new(File::open(archive_path)?)?;
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let rel = match file.enclosed_name() {
            Some(rel) => rel.to_path_buf(),
            None => continue,
        };
        let out = dest.join(rel);
        if file.is_dir() {
            fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out_file = File::create(&out)?;
        io::copy(&mut file, &mut out_file)?;
    }
    Ok(())
}

/// Mirror `src` into `dest`: directories are created, files hard-linked,
/// falling back to a copy when linking is not possible.
pub fn link_tree(src: &Path, dest: &Path) -> Result<StageReport, InjectionError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| InjectionError::Process(format!("Path error: {}", e)))?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            files.push((entry.path().to_path_buf(), target));
        }
    }

    let linked: Vec<bool> = files
        .par_iter()
        .map(|(from, to)| -> io::Result<bool> {
            if to.exists() {
                fs::remove_file(to)?;
            }
            match fs::hard_link(from, to) {
                Ok(()) => Ok(true),
                Err(_) => fs::copy(from, to).map(|_| false),
            }
        })
        .collect::<io::Result<_>>()?;

    let linked_count = linked.iter().filter(|l| **l).count();
    Ok(StageReport {
        linked: linked_count,
        copied: linked.len() - linked_count,
    })
}

/// Clear everything under `root`, keeping `root` itself. Missing paths are
/// fine; entries that stay locked after a few attempts are logged and left.
pub fn purge(root: &Path) -> usize {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
        Err(e) => {
            warn!("[Storage] Cannot list {}: {}", root.display(), e);
            return 0;
        }
    };

    let mut left = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !remove_with_retries(&path) {
            left += 1;
        }
    }
    left
}

pub fn remove_with_retries(path: &Path) -> bool {
    for attempt in 1..=PURGE_ATTEMPTS {
        let result = match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
            Ok(_) => fs::remove_file(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return true,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => return true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return true,
            Err(e) => {
                if attempt == PURGE_ATTEMPTS {
                    warn!("[Storage] Could not remove {}: {}", path.display(), e);
                } else {
                    thread::sleep(Duration::from_millis(100));
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn storage(dir: &TempDir) -> ModStorage {
        let s = ModStorage::new(dir.path().join("mods"), dir.path().join("cache"));
        s.ensure_layout().unwrap();
        s
    }

    fn write_zip(path: &Path, files: &[(&str, &str)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, body) in files {
            zip.start_file(*name, zip::write::FileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn layout_has_every_category() {
        let dir = TempDir::new().unwrap();
        let s = storage(&dir);
        for category in CATEGORIES {
            assert!(s.root().join(category).is_dir());
        }
    }

    #[test]
    fn resolve_prefers_newest_package() {
        let dir = TempDir::new().unwrap();
        let s = storage(&dir);
        let skin_dir = s.root().join("skins").join("157002");
        fs::create_dir_all(skin_dir.join("old_pack")).unwrap();
        thread::sleep(Duration::from_millis(50));
        write_zip(&skin_dir.join("new_pack.fantome"), &[("WAD/a.txt", "x")]);
        fs::write(skin_dir.join("readme.txt"), "ignored").unwrap();

        let pkg = s.resolve(157002).unwrap();
        assert_eq!(pkg.kind, PackageKind::Archive);
        assert_eq!(pkg.mod_name(), "new_pack");
        assert!(s.resolve(157003).is_none());
    }

    #[test]
    fn stage_directory_reproduces_tree() {
        let dir = TempDir::new().unwrap();
        let s = storage(&dir);
        let pkg_dir = s.root().join("skins").join("1").join("pack");
        fs::create_dir_all(pkg_dir.join("WAD")).unwrap();
        fs::write(pkg_dir.join("WAD").join("x.bin"), "abc").unwrap();
        fs::create_dir_all(pkg_dir.join("META")).unwrap();
        fs::write(pkg_dir.join("META").join("info.json"), "{}").unwrap();

        let pkg = s.resolve(1).unwrap();
        let dest = dir.path().join("staged");
        let report = s.stage(&pkg, &dest).unwrap();
        assert_eq!(report.linked + report.copied, 2);
        assert_eq!(fs::read_to_string(dest.join("WAD").join("x.bin")).unwrap(), "abc");
    }

    #[test]
    fn stage_archive_extracts_once() {
        let dir = TempDir::new().unwrap();
        let s = storage(&dir);
        let skin_dir = s.root().join("skins").join("2");
        fs::create_dir_all(&skin_dir).unwrap();
        write_zip(&skin_dir.join("pack.zip"), &[("META/info.json", "{}"), ("WAD/y.bin", "yy")]);

        let pkg = s.resolve(2).unwrap();
        s.stage(&pkg, &dir.path().join("a")).unwrap();
        let cached = s.extracted(&pkg).unwrap();
        let marker = cached.join("marker");
        fs::write(&marker, "").unwrap();

        // Same mtime: the cached extraction is reused untouched
        s.stage(&pkg, &dir.path().join("b")).unwrap();
        assert!(marker.exists());
        assert_eq!(fs::read_to_string(dir.path().join("b").join("WAD").join("y.bin")).unwrap(), "yy");
    }

    #[test]
    fn relative_paths_cannot_escape_root() {
        let dir = TempDir::new().unwrap();
        let s = storage(&dir);
        assert!(s.resolve_relative("../secret").is_none());
        fs::create_dir_all(s.root().join("skins").join("3").join("custom")).unwrap();
        assert!(s.resolve_relative("skins/3/custom").is_some());
    }

    #[test]
    fn purge_tolerates_missing_root_and_clears_contents() {
        let dir = TempDir::new().unwrap();
        assert_eq!(purge(&dir.path().join("does-not-exist")), 0);

        let root = dir.path().join("overlay");
        fs::create_dir_all(root.join("a").join("b")).unwrap();
        fs::write(root.join("file.txt"), "x").unwrap();
        assert_eq!(purge(&root), 0);
        assert!(root.exists());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }
}
