//! Cache store backed by an index file plus one payload file per key

use crate::cache::index::{CacheIndex, IndexEntry, INDEX_VERSION};
use crate::error::{PolybuildError, PolybuildResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const INDEX_FILE: &str = "index.json";
const ENTRIES_DIR: &str = "entries";

/// Listing information for a cached key
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryInfo {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub dependencies: Vec<String>,
    /// Payload size, `None` when the payload file is missing
    pub size_bytes: Option<u64>,
}

/// Aggregate store usage
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
    pub dangling: usize,
}

/// Persistent key/value cache with dependency links
///
/// Not internally synchronized: callers must not interleave writes to the
/// same key from several threads. Last writer wins.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> PolybuildResult<Self> {
        let dir = dir.into();
        let entries = dir.join(ENTRIES_DIR);
        fs::create_dir_all(&entries).map_err(|e| {
            PolybuildError::io(format!("creating cache directory {}", entries.display()), e)
        })?;
        Ok(Self { dir })
    }

    /// Store root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    fn entries_dir(&self) -> PathBuf {
        self.dir.join(ENTRIES_DIR)
    }

    fn payload_path(&self, payload: &str) -> PathBuf {
        self.entries_dir().join(payload)
    }

    /// Payload file name for a key; keys are opaque so they are hashed
    fn payload_name(key: &str) -> String {
        format!("{}.json", hex::encode(Sha256::digest(key.as_bytes())))
    }

    /// Load the index, treating a missing or unreadable index as empty
    pub fn load_index(&self) -> PolybuildResult<CacheIndex> {
        let path = self.index_path();

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CacheIndex::default()),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!("Cache index {} is not UTF-8, ignoring it", path.display());
                return Ok(CacheIndex::default());
            }
            Err(e) => {
                return Err(PolybuildError::io(
                    format!("reading cache index {}", path.display()),
                    e,
                ))
            }
        };

        match serde_json::from_str::<CacheIndex>(&content) {
            Ok(index) if index.version == INDEX_VERSION => Ok(index),
            Ok(index) => {
                warn!(
                    "Cache index version {} is not supported (expected {}), starting empty",
                    index.version, INDEX_VERSION
                );
                Ok(CacheIndex::default())
            }
            Err(e) => {
                warn!("Cache index {} is corrupt ({}), starting empty", path.display(), e);
                Ok(CacheIndex::default())
            }
        }
    }

    fn save_index(&self, index: &CacheIndex) -> PolybuildResult<()> {
        let content = serde_json::to_vec_pretty(index)?;
        self.write_atomic(&self.index_path(), &content)
    }

    /// Write via a uniquely named temp file in the same directory, then rename
    fn write_atomic(&self, path: &Path, content: &[u8]) -> PolybuildResult<()> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        fs::write(&temp_path, content)
            .map_err(|e| PolybuildError::io(format!("writing {}", temp_path.display()), e))?;
        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            PolybuildError::io(format!("replacing {}", path.display()), e)
        })
    }

    fn remove_payload(&self, payload: &str) -> PolybuildResult<()> {
        let path = self.payload_path(payload);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PolybuildError::io(
                format!("removing cache payload {}", path.display()),
                e,
            )),
        }
    }

    /// Stored value for `key`, or `None` when absent or unreadable
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> PolybuildResult<Option<T>> {
        let index = self.load_index()?;
        let Some(entry) = index.entries.get(key) else {
            debug!("Cache miss: {}", key);
            return Ok(None);
        };

        let path = self.payload_path(&entry.payload);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Cache entry {} has no payload, treating as miss", key);
                return Ok(None);
            }
            Err(e) => {
                return Err(PolybuildError::io(
                    format!("reading cache payload {}", path.display()),
                    e,
                ))
            }
        };

        match serde_json::from_slice(&content) {
            Ok(value) => {
                debug!("Cache hit: {}", key);
                Ok(Some(value))
            }
            Err(e) => {
                warn!("Cache payload for {} is corrupt ({}), treating as miss", key, e);
                Ok(None)
            }
        }
    }

    /// Metadata for `key` without reading its payload
    pub fn entry(&self, key: &str) -> PolybuildResult<Option<CacheEntryInfo>> {
        let index = self.load_index()?;
        Ok(index.entries.get(key).map(|e| self.entry_info(key, e)))
    }

    fn entry_info(&self, key: &str, entry: &IndexEntry) -> CacheEntryInfo {
        CacheEntryInfo {
            key: key.to_string(),
            created_at: entry.created_at,
            dependencies: entry.dependencies.iter().cloned().collect(),
            size_bytes: fs::metadata(self.payload_path(&entry.payload))
                .ok()
                .map(|m| m.len()),
        }
    }

    /// Store `value` under `key`, replacing any previous entry
    pub fn set<T, I, S>(&self, key: &str, value: &T, dependencies: I) -> PolybuildResult<()>
    where
        T: Serialize + ?Sized,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let payload = Self::payload_name(key);
        let content = serde_json::to_vec_pretty(value)?;

        // Payload first: a crash here leaves an unindexed file, never a
        // dangling index entry
        self.write_atomic(&self.payload_path(&payload), &content)?;

        let mut index = self.load_index()?;
        let dependencies: BTreeSet<String> = dependencies.into_iter().map(Into::into).collect();
        index.entries.insert(
            key.to_string(),
            IndexEntry {
                created_at: Utc::now(),
                dependencies,
                payload,
            },
        );
        self.save_index(&index)?;

        debug!("Cached {}", key);
        Ok(())
    }

    /// Remove `key`; returns whether an entry existed
    pub fn invalidate(&self, key: &str) -> PolybuildResult<bool> {
        let mut index = self.load_index()?;
        let Some(entry) = index.entries.remove(key) else {
            return Ok(false);
        };

        self.save_index(&index)?;
        self.remove_payload(&entry.payload)?;

        debug!("Invalidated {}", key);
        Ok(true)
    }

    /// Remove every entry that lists `dependency` directly.
    ///
    /// Single level only: entries depending on the removed ones are kept.
    /// Returns the removed keys.
    pub fn invalidate_dependents(&self, dependency: &str) -> PolybuildResult<Vec<String>> {
        let mut index = self.load_index()?;
        let keys = index.dependents_of(dependency);
        if keys.is_empty() {
            return Ok(keys);
        }

        let removed: Vec<IndexEntry> = keys
            .iter()
            .filter_map(|k| index.entries.remove(k))
            .collect();
        self.save_index(&index)?;

        for entry in &removed {
            self.remove_payload(&entry.payload)?;
        }

        debug!("Invalidated {} dependents of {}", keys.len(), dependency);
        Ok(keys)
    }

    /// Remove all entries; returns how many were indexed
    pub fn clear(&self) -> PolybuildResult<usize> {
        let count = self.load_index()?.entries.len();

        match fs::remove_file(self.index_path()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(PolybuildError::io("removing cache index", e)),
        }

        for path in self.payload_files()? {
            fs::remove_file(&path).map_err(|e| {
                PolybuildError::io(format!("removing cache payload {}", path.display()), e)
            })?;
        }

        debug!("Cleared {} cache entries", count);
        Ok(count)
    }

    /// All indexed entries, sorted by key
    pub fn list(&self) -> PolybuildResult<Vec<CacheEntryInfo>> {
        let index = self.load_index()?;
        Ok(index
            .entries
            .iter()
            .map(|(key, entry)| self.entry_info(key, entry))
            .collect())
    }

    /// Entry count and payload bytes on disk
    pub fn stats(&self) -> PolybuildResult<CacheStats> {
        let mut stats = CacheStats::default();
        for info in self.list()? {
            stats.entries += 1;
            match info.size_bytes {
                Some(size) => stats.total_bytes += size,
                None => stats.dangling += 1,
            }
        }
        Ok(stats)
    }

    /// Remove entries older than `max_age`; returns the affected keys
    pub fn gc(&self, max_age: chrono::Duration, dry_run: bool) -> PolybuildResult<Vec<String>> {
        let mut index = self.load_index()?;
        let expired: Vec<String> = index
            .entries
            .iter()
            .filter(|(_, e)| e.is_older_than(max_age))
            .map(|(k, _)| k.clone())
            .collect();

        if dry_run || expired.is_empty() {
            return Ok(expired);
        }

        let removed: Vec<IndexEntry> = expired
            .iter()
            .filter_map(|k| index.entries.remove(k))
            .collect();
        self.save_index(&index)?;
        for entry in &removed {
            self.remove_payload(&entry.payload)?;
        }

        Ok(expired)
    }

    /// Delete payload and temp files no index entry points at
    pub fn prune_orphans(&self) -> PolybuildResult<usize> {
        let index = self.load_index()?;
        let live: HashSet<&str> = index.entries.values().map(|e| e.payload.as_str()).collect();

        let mut pruned = 0;
        for path in self.payload_files()? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if live.contains(name.as_str()) {
                continue;
            }
            debug!("Pruning orphaned payload {}", name);
            fs::remove_file(&path).map_err(|e| {
                PolybuildError::io(format!("removing orphan {}", path.display()), e)
            })?;
            pruned += 1;
        }

        // Interrupted index writes leave their temp file in the root
        for path in files_in(&self.dir)? {
            let is_temp = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(is_temp_file)
                .unwrap_or(false);
            if !is_temp {
                continue;
            }
            debug!("Pruning stale temp file {}", path.display());
            fs::remove_file(&path).map_err(|e| {
                PolybuildError::io(format!("removing temp file {}", path.display()), e)
            })?;
            pruned += 1;
        }

        Ok(pruned)
    }

    fn payload_files(&self) -> PolybuildResult<Vec<PathBuf>> {
        files_in(&self.entries_dir())
    }
}

/// Regular files directly inside `dir`; a missing directory has none
fn files_in(dir: &Path) -> PolybuildResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(PolybuildError::io(
                format!("reading cache directory {}", dir.display()),
                e,
            ))
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PolybuildError::io("reading cache entry", e))?;
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            files.push(entry.path());
        }
    }
    Ok(files)
}

/// Name pattern of the temp files `write_atomic` renames into place
fn is_temp_file(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(".tmp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_store() -> (CacheStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::open(temp.path().join("cache")).unwrap();
        (store, temp)
    }

    const NO_DEPS: [&str; 0] = [];

    #[test]
    fn set_then_get_round_trips() {
        let (store, _temp) = test_store();
        store.set("build-x", &json!({"ok": true}), NO_DEPS).unwrap();

        let value: serde_json::Value = store.get("build-x").unwrap().unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[test]
    fn signature_map_round_trips() {
        let (store, _temp) = test_store();
        let signature: std::collections::BTreeMap<String, String> = [
            ("a.txt".to_string(), "h1".to_string()),
            ("b.txt".to_string(), "h2".to_string()),
        ]
        .into();

        store.set("build-x", &signature, NO_DEPS).unwrap();

        let loaded: std::collections::BTreeMap<String, String> =
            store.get("build-x").unwrap().unwrap();
        assert_eq!(loaded, signature);
    }

    #[test]
    fn get_missing_is_none() {
        let (store, _temp) = test_store();
        let value: Option<String> = store.get("nothing").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn set_overwrites() {
        let (store, _temp) = test_store();
        store.set("k", "first", NO_DEPS).unwrap();
        store.set("k", "second", ["dep"]).unwrap();

        let value: String = store.get("k").unwrap().unwrap();
        assert_eq!(value, "second");
        assert_eq!(store.entry("k").unwrap().unwrap().dependencies, vec!["dep"]);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn entries_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("cache");
        CacheStore::open(&dir).unwrap().set("k", &42, NO_DEPS).unwrap();

        let reopened = CacheStore::open(&dir).unwrap();
        assert_eq!(reopened.get::<i32>("k").unwrap(), Some(42));
    }

    #[test]
    fn invalidate_removes_entry_and_payload() {
        let (store, _temp) = test_store();
        store.set("k", "v", NO_DEPS).unwrap();

        assert!(store.invalidate("k").unwrap());
        assert!(!store.invalidate("k").unwrap());
        assert!(store.get::<String>("k").unwrap().is_none());
        assert_eq!(store.prune_orphans().unwrap(), 0);
    }

    #[test]
    fn invalidate_dependents_is_single_level() {
        let (store, _temp) = test_store();
        store.set("core", "c", NO_DEPS).unwrap();
        store.set("lib", "l", ["core"]).unwrap();
        store.set("app", "a", ["lib"]).unwrap();
        store.set("docs", "d", NO_DEPS).unwrap();

        let removed = store.invalidate_dependents("core").unwrap();

        assert_eq!(removed, vec!["lib"]);
        assert!(store.get::<String>("lib").unwrap().is_none());
        assert_eq!(store.get::<String>("app").unwrap().as_deref(), Some("a"));
        assert_eq!(store.get::<String>("core").unwrap().as_deref(), Some("c"));
        assert_eq!(store.get::<String>("docs").unwrap().as_deref(), Some("d"));
    }

    #[test]
    fn clear_removes_everything_and_is_idempotent() {
        let (store, _temp) = test_store();
        store.set("a", "1", NO_DEPS).unwrap();
        store.set("b", "2", ["a"]).unwrap();

        assert_eq!(store.clear().unwrap(), 2);
        assert!(store.get::<String>("a").unwrap().is_none());
        assert!(store.get::<String>("b").unwrap().is_none());
        assert_eq!(store.clear().unwrap(), 0);

        store.set("a", "again", NO_DEPS).unwrap();
        assert_eq!(store.get::<String>("a").unwrap().as_deref(), Some("again"));
    }

    #[test]
    fn dangling_index_entry_reads_as_miss() {
        let (store, _temp) = test_store();
        store.set("k", "v", NO_DEPS).unwrap();
        fs::remove_file(store.payload_path(&CacheStore::payload_name("k"))).unwrap();

        assert!(store.get::<String>("k").unwrap().is_none());
        assert_eq!(store.stats().unwrap().dangling, 1);

        store.set("k", "healed", NO_DEPS).unwrap();
        assert_eq!(store.get::<String>("k").unwrap().as_deref(), Some("healed"));
    }

    #[test]
    fn corrupt_index_reads_as_empty_and_self_repairs() {
        let (store, _temp) = test_store();
        store.set("k", "v", NO_DEPS).unwrap();
        fs::write(store.dir().join(INDEX_FILE), "{ not json").unwrap();

        assert!(store.get::<String>("k").unwrap().is_none());
        assert!(store.list().unwrap().is_empty());

        store.set("k", "v2", NO_DEPS).unwrap();
        assert_eq!(store.get::<String>("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn unsupported_index_version_reads_as_empty() {
        let (store, _temp) = test_store();
        fs::write(
            store.dir().join(INDEX_FILE),
            r#"{"version": 999, "entries": {}}"#,
        )
        .unwrap();
        assert!(store.load_index().unwrap().entries.is_empty());
    }

    #[test]
    fn corrupt_payload_reads_as_miss() {
        let (store, _temp) = test_store();
        store.set("k", "v", NO_DEPS).unwrap();
        fs::write(store.payload_path(&CacheStore::payload_name("k")), "garbage").unwrap();

        assert!(store.get::<String>("k").unwrap().is_none());
    }

    #[test]
    fn prune_orphans_reclaims_unindexed_payloads() {
        let (store, _temp) = test_store();
        store.set("live", "v", NO_DEPS).unwrap();
        fs::write(store.entries_dir().join("orphan.json"), "{}").unwrap();
        fs::write(store.entries_dir().join(".orphan.json.dead.tmp"), "{}").unwrap();

        assert_eq!(store.prune_orphans().unwrap(), 2);
        assert_eq!(store.get::<String>("live").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn prune_orphans_reclaims_interrupted_index_writes() {
        let (store, _temp) = test_store();
        store.set("live", "v", NO_DEPS).unwrap();
        let leftover = store.dir().join(".index.json.0f3c.tmp");
        fs::write(&leftover, "{").unwrap();

        assert_eq!(store.prune_orphans().unwrap(), 1);
        assert!(!leftover.exists());
        assert!(store.dir().join(INDEX_FILE).is_file());
        assert_eq!(store.get::<String>("live").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn gc_removes_old_entries() {
        let (store, _temp) = test_store();
        store.set("old", "v", NO_DEPS).unwrap();
        store.set("new", "v", NO_DEPS).unwrap();

        let mut index = store.load_index().unwrap();
        index.entries.get_mut("old").unwrap().created_at = Utc::now() - chrono::Duration::days(60);
        store.save_index(&index).unwrap();

        let preview = store.gc(chrono::Duration::days(30), true).unwrap();
        assert_eq!(preview, vec!["old"]);
        assert_eq!(store.list().unwrap().len(), 2);

        let removed = store.gc(chrono::Duration::days(30), false).unwrap();
        assert_eq!(removed, vec!["old"]);
        assert!(store.get::<String>("old").unwrap().is_none());
        assert!(store.get::<String>("new").unwrap().is_some());
    }

    #[test]
    fn keys_with_path_characters_are_safe() {
        let (store, _temp) = test_store();
        store.set("build/../../etc", "v", NO_DEPS).unwrap();
        assert_eq!(
            store.get::<String>("build/../../etc").unwrap().as_deref(),
            Some("v")
        );
    }
}
