//! Addon manifest discovery on disk.
//!
//! The addons root holds one directory per addon, each with an `addon.toml`.
//! Errors in individual manifests are logged and do not stop discovery.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{AddonError, AddonResult};
use crate::manifest::AddonManifest;

/// Standard addon manifest file name.
pub const MANIFEST_FILE_NAME: &str = "addon.toml";

/// Load every addon manifest below `root`.
///
/// Each subdirectory containing an `addon.toml` is treated as an addon.
/// Results are ordered by directory path. Returns `(manifest, addon_dir)`
/// pairs.
///
/// # Errors
///
/// Returns an error if `root` cannot be read.
pub fn load_manifests_from_dir(root: &Path) -> AddonResult<Vec<(AddonManifest, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if path.is_dir() && path.join(MANIFEST_FILE_NAME).is_file() {
            dirs.push(path);
        }
    }
    dirs.sort();

    let mut manifests = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let manifest_path = dir.join(MANIFEST_FILE_NAME);
        match load_manifest(&manifest_path) {
            Ok(manifest) => {
                debug!(
                    path = %manifest_path.display(),
                    addon = %manifest.name,
                    "Loaded addon manifest"
                );
                manifests.push((manifest, dir));
            },
            Err(e) => {
                warn!(path = %manifest_path.display(), error = %e, "Failed to load addon manifest");
            },
        }
    }

    Ok(manifests)
}

/// Load a single addon manifest from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_manifest(path: &Path) -> AddonResult<AddonManifest> {
    let content = std::fs::read_to_string(path).map_err(|e| AddonError::ManifestParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    toml::from_str(&content).map_err(|e| AddonError::ManifestParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Write `manifest` to `<addon_dir>/addon.toml`.
///
/// The file is written next to the target and renamed over it, so a reader
/// never observes a half-written manifest.
///
/// # Errors
///
/// Returns an error if serialization or any filesystem step fails.
pub fn save_manifest(addon_dir: &Path, manifest: &AddonManifest) -> AddonResult<()> {
    let content = toml::to_string_pretty(manifest)
        .map_err(|e| AddonError::Io(std::io::Error::other(e.to_string())))?;
    let target = addon_dir.join(MANIFEST_FILE_NAME);
    let staging = addon_dir.join(format!("{MANIFEST_FILE_NAME}.tmp"));
    std::fs::write(&staging, content)?;
    std::fs::rename(&staging, &target)?;
    debug!(path = %target.display(), addon = %manifest.name, "Saved addon manifest");
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::manifest::AddonStatus;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let addon_dir = dir.join(name);
        std::fs::create_dir_all(&addon_dir).unwrap();
        std::fs::write(addon_dir.join(MANIFEST_FILE_NAME), body).unwrap();
        addon_dir
    }

    #[test]
    fn test_load_manifests_from_dir_subdirs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b", "name = \"beta\"\nversion = \"1\"\n");
        write(dir.path(), "a", "name = \"alpha\"\nversion = \"1\"\n");
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();
        std::fs::write(dir.path().join("stray.txt"), "x").unwrap();

        let found = load_manifests_from_dir(dir.path()).unwrap();
        let names: Vec<&str> = found.iter().map(|(m, _)| m.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(found[0].1, dir.path().join("a"));
    }

    #[test]
    fn test_malformed_manifest_is_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "good", "name = \"good\"\nversion = \"1\"\n");
        write(dir.path(), "bad", "name = [\n");

        let found = load_manifests_from_dir(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0.name, "good");
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_manifests_from_dir(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_load_manifest_reports_path() {
        let dir = TempDir::new().unwrap();
        let addon_dir = write(dir.path(), "bad", "version = 3");
        let err = load_manifest(&addon_dir.join(MANIFEST_FILE_NAME)).unwrap_err();
        assert!(matches!(err, AddonError::ManifestParseError { ref path, .. } if path.ends_with("bad/addon.toml")));
    }

    #[test]
    fn test_save_manifest_round_trips_status() {
        let dir = TempDir::new().unwrap();
        let addon_dir = write(dir.path(), "a", "name = \"a\"\nversion = \"1\"\n");
        let mut manifest = load_manifest(&addon_dir.join(MANIFEST_FILE_NAME)).unwrap();
        manifest.status = AddonStatus::Disabled;

        save_manifest(&addon_dir, &manifest).unwrap();
        let reread = load_manifest(&addon_dir.join(MANIFEST_FILE_NAME)).unwrap();
        assert_eq!(reread, manifest);
        assert!(!addon_dir.join("addon.toml.tmp").exists());
    }
}
