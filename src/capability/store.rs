//! On-disk manifest store.
//!
//! Manifests live in one directory as `<skill>.json`. A missing file is
//! created with deny-all content on first load. Loaded manifests are
//! cached behind a `RwLock` and shared as `Arc`s, so concurrent missions
//! read them without copying. Reloads and flag updates take the write
//! lock and are therefore serialized.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::error::GuardError;

use super::manifest::CapabilityManifest;

pub struct ManifestStore {
    dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<CapabilityManifest>>>,
}

impl ManifestStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the manifest for `skill`.
    ///
    /// Skill names become file names, so anything besides ASCII
    /// alphanumerics, `_` and `-` is rejected.
    pub fn manifest_path(&self, skill: &str) -> Result<PathBuf, GuardError> {
        let valid = !skill.is_empty()
            && skill
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(GuardError::Manifest(format!(
                "invalid skill name for manifest: '{skill}'"
            )));
        }
        Ok(self.dir.join(format!("{skill}.json")))
    }

    /// Returns the cached manifest for `skill`, loading (or creating) it
    /// on first use.
    pub fn load(&self, skill: &str) -> Result<Arc<CapabilityManifest>, GuardError> {
        if let Some(cached) = self.read_cache()?.get(skill) {
            return Ok(Arc::clone(cached));
        }

        let path = self.manifest_path(skill)?;
        let manifest = Arc::new(load_or_create(&path, skill)?);

        let mut cache = self.write_cache()?;
        let entry = cache
            .entry(skill.to_string())
            .or_insert_with(|| Arc::clone(&manifest));
        Ok(Arc::clone(entry))
    }

    /// Re-reads `skill`'s manifest from disk, replacing the cached copy.
    ///
    /// Missions that already hold the previous `Arc` keep using it.
    pub fn reload(&self, skill: &str) -> Result<Arc<CapabilityManifest>, GuardError> {
        let path = self.manifest_path(skill)?;
        let mut cache = self.write_cache()?;
        let manifest = Arc::new(load_or_create(&path, skill)?);
        cache.insert(skill.to_string(), Arc::clone(&manifest));
        info!(skill, "Manifest reloaded");
        Ok(manifest)
    }

    /// Sets boolean capability flags (`network`, `gpu`, `sensors`,
    /// `camera`) in `skill`'s manifest file and reloads it. Unknown keys
    /// are ignored.
    pub fn update_flags(
        &self,
        skill: &str,
        flags: &HashMap<String, bool>,
    ) -> Result<Arc<CapabilityManifest>, GuardError> {
        let path = self.manifest_path(skill)?;
        let mut cache = self.write_cache()?;

        let mut manifest = load_or_create(&path, skill)?;
        for (key, value) in flags {
            match key.as_str() {
                "network" => manifest.network = *value,
                "gpu" => manifest.gpu = *value,
                "sensors" => manifest.sensors = *value,
                "camera" => manifest.camera = *value,
                other => debug!(skill, key = other, "Ignoring unknown manifest flag"),
            }
        }
        write_manifest(&path, &manifest)?;

        let manifest = Arc::new(manifest);
        cache.insert(skill.to_string(), Arc::clone(&manifest));
        info!(skill, "Manifest flags updated");
        Ok(manifest)
    }

    fn read_cache(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Arc<CapabilityManifest>>>, GuardError>
    {
        self.cache
            .read()
            .map_err(|_| GuardError::Manifest("manifest cache lock poisoned".to_string()))
    }

    fn write_cache(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<CapabilityManifest>>>, GuardError>
    {
        self.cache
            .write()
            .map_err(|_| GuardError::Manifest("manifest cache lock poisoned".to_string()))
    }
}

/// Reads the manifest at `path`, first writing a deny-all manifest for
/// `skill` there if the file does not exist.
pub fn load_or_create(path: &Path, skill: &str) -> Result<CapabilityManifest, GuardError> {
    if !path.exists() {
        info!(path = %path.display(), skill, "Manifest missing, creating deny-all default");
        write_manifest(path, &CapabilityManifest::deny_all(skill))?;
    }

    let content = fs::read_to_string(path)?;
    let manifest = CapabilityManifest::from_json(&content)
        .map_err(|e| GuardError::Manifest(format!("{}: {e}", path.display())))?;
    debug!(path = %path.display(), skill = %manifest.skill_name, "Manifest loaded");
    Ok(manifest)
}

fn write_manifest(path: &Path, manifest: &CapabilityManifest) -> Result<(), GuardError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = manifest
        .to_json_pretty()
        .map_err(|e| GuardError::Manifest(e.to_string()))?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::manifest::FsOp;

    #[test]
    fn test_missing_manifest_is_created_deny_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path().join("manifests"));

        let manifest = store.load("FileReader").unwrap();
        assert_eq!(manifest.skill_name, "FileReader");
        assert!(!manifest.network);
        assert!(!manifest.validate(FsOp::Read, "/data/a.txt"));

        let on_disk = fs::read_to_string(dir.path().join("manifests/FileReader.json")).unwrap();
        assert!(on_disk.contains("\"network\": false"));
    }

    #[test]
    fn test_existing_manifest_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("WebSearch.json"),
            r#"{"skill_name": "WebSearch", "filesystem": {"read": [], "write": [], "delete": []},
                "network": true, "gpu": false, "sensors": false, "camera": false}"#,
        )
        .unwrap();
        let store = ManifestStore::new(dir.path());
        assert!(store.load("WebSearch").unwrap().network);
    }

    #[test]
    fn test_load_is_cached_until_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());
        let first = store.load("Skill").unwrap();

        fs::write(
            dir.path().join("Skill.json"),
            r#"{"skill_name": "Skill", "network": true}"#,
        )
        .unwrap();
        let cached = store.load("Skill").unwrap();
        assert!(Arc::ptr_eq(&first, &cached));
        assert!(!cached.network);

        let reloaded = store.reload("Skill").unwrap();
        assert!(reloaded.network);
        assert!(store.load("Skill").unwrap().network);
        // The earlier handle is unaffected.
        assert!(!first.network);
    }

    #[test]
    fn test_invalid_skill_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());
        for bad in ["", "../etc/passwd", "a/b", "x.json", "with space"] {
            assert!(
                matches!(store.load(bad), Err(GuardError::Manifest(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_update_flags_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());
        store.load("Cam").unwrap();

        let mut flags = HashMap::new();
        flags.insert("camera".to_string(), true);
        flags.insert("network".to_string(), true);
        flags.insert("teleport".to_string(), true);
        let updated = store.update_flags("Cam", &flags).unwrap();
        assert!(updated.camera);
        assert!(updated.network);
        assert!(!updated.gpu);

        let fresh = ManifestStore::new(dir.path());
        assert!(fresh.load("Cam").unwrap().camera);
        assert!(store.load("Cam").unwrap().camera);
    }

    #[test]
    fn test_corrupt_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Bad.json"), "{ not json").unwrap();
        let store = ManifestStore::new(dir.path());
        assert!(matches!(store.load("Bad"), Err(GuardError::Manifest(_))));
    }
}
