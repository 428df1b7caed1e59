use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const JOINED_COMMUNITIES_KEY: &str = "joinedCommunities";
pub const FEATURE_FLAGS_KEY: &str = "featureFlags";

#[derive(Debug, thiserror::Error)]
pub enum PreferencesError {
    #[error("Failed to write preferences: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize preference: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Device-local key -> JSON string map.
///
/// The file is read once on open; every setter rewrites it synchronously.
/// A value that fails to parse is deleted and the caller's default is used.
pub struct PreferenceStore {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<String, String>>,
}

impl PreferenceStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::load_from_file(&path);
        Self {
            path: Some(path),
            entries: Mutex::new(entries),
        }
    }

    /// Not backed by a file; nothing survives the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    fn load_from_file(path: &Path) -> BTreeMap<String, String> {
        let Ok(contents) = fs::read_to_string(path) else {
            return BTreeMap::new();
        };
        match serde_json::from_str(&contents) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("preferences file {} is corrupt, starting empty: {}", path.display(), e);
                BTreeMap::new()
            }
        }
    }

    fn save_to_file(&self, entries: &BTreeMap<String, String>) -> Result<(), PreferencesError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        let temp_file = path.with_extension("json.tmp");
        fs::write(&temp_file, json)?;
        fs::rename(&temp_file, path)?;
        Ok(())
    }

    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let mut entries = self.entries.lock();
        let Some(raw) = entries.get(key) else {
            return default;
        };
        match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("preference {} is malformed, resetting: {}", key, e);
                entries.remove(key);
                if let Err(e) = self.save_to_file(&entries) {
                    tracing::warn!("failed to persist preferences: {}", e);
                }
                default
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), PreferencesError> {
        let json = serde_json::to_string(value)?;
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), json);
        self.save_to_file(&entries)
    }

    pub fn remove(&self, key: &str) -> Result<(), PreferencesError> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.save_to_file(&entries)?;
        }
        Ok(())
    }

    // ===== Typed accessors =====

    /// Joined community ids, deduplicated, in stored order
    pub fn joined_communities(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.get_or(JOINED_COMMUNITIES_KEY, Vec::new());
        let mut seen = std::collections::HashSet::new();
        ids.retain(|id| seen.insert(id.clone()));
        ids
    }

    pub fn set_joined_communities(&self, ids: &[String]) -> Result<(), PreferencesError> {
        self.set(JOINED_COMMUNITIES_KEY, ids)
    }

    pub fn feature_flags(&self) -> BTreeMap<String, bool> {
        self.get_or(FEATURE_FLAGS_KEY, BTreeMap::new())
    }

    pub fn feature_flag(&self, name: &str) -> bool {
        self.feature_flags().get(name).copied().unwrap_or(false)
    }

    pub fn set_feature_flag(&self, name: &str, enabled: bool) -> Result<(), PreferencesError> {
        let mut flags = self.feature_flags();
        flags.insert(name.to_string(), enabled);
        self.set(FEATURE_FLAGS_KEY, &flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");

        let prefs = PreferenceStore::open(&path);
        prefs.set_joined_communities(&ids(&["c1", "c2"])).unwrap();
        prefs.set_feature_flag("chat", true).unwrap();

        let reopened = PreferenceStore::open(&path);
        assert_eq!(reopened.joined_communities(), ids(&["c1", "c2"]));
        assert!(reopened.feature_flag("chat"));
        assert!(!reopened.feature_flag("unknown"));
    }

    #[test]
    fn test_values_are_stored_as_json_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        let prefs = PreferenceStore::open(&path);
        prefs.set_joined_communities(&ids(&["c1"])).unwrap();

        assert_eq!(prefs.get_raw(JOINED_COMMUNITIES_KEY).as_deref(), Some(r#"["c1"]"#));
        let on_disk: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk[JOINED_COMMUNITIES_KEY], r#"["c1"]"#);
    }

    #[test]
    fn test_malformed_value_is_deleted_and_defaulted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, r#"{"joinedCommunities": "[\"c1\", oops"}"#).unwrap();

        let prefs = PreferenceStore::open(&path);
        assert!(prefs.joined_communities().is_empty());
        assert!(!prefs.contains(JOINED_COMMUNITIES_KEY));

        // The deletion was persisted too
        let reopened = PreferenceStore::open(&path);
        assert!(!reopened.contains(JOINED_COMMUNITIES_KEY));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, "not json at all").unwrap();

        let prefs = PreferenceStore::open(&path);
        assert!(prefs.joined_communities().is_empty());
        prefs.set_feature_flag("x", true).unwrap();
        assert!(PreferenceStore::open(&path).feature_flag("x"));
    }

    #[test]
    fn test_duplicate_ids_are_collapsed() {
        let prefs = PreferenceStore::in_memory();
        prefs.set_joined_communities(&ids(&["c1", "c2", "c1"])).unwrap();
        assert_eq!(prefs.joined_communities(), ids(&["c1", "c2"]));
    }

    #[test]
    fn test_remove_key() {
        let prefs = PreferenceStore::in_memory();
        prefs.set("k", &42).unwrap();
        assert_eq!(prefs.get_or("k", 0), 42);
        prefs.remove("k").unwrap();
        assert_eq!(prefs.get_or("k", 0), 0);
    }

    #[test]
    fn test_creates_missing_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.json");
        let prefs = PreferenceStore::open(&path);
        prefs.set_feature_flag("a", false).unwrap();
        assert!(path.exists());
    }
}
