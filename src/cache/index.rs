//! Cache index format

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Bump when the index layout changes; older indexes read as empty
pub const INDEX_VERSION: u32 = 1;

/// Durable key -> metadata map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheIndex {
    pub version: u32,
    #[serde(default)]
    pub entries: BTreeMap<String, IndexEntry>,
}

impl Default for CacheIndex {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

impl CacheIndex {
    /// Keys whose recorded dependencies include `dependency`
    pub fn dependents_of(&self, dependency: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.dependencies.contains(dependency))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

/// Metadata for one cached key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// When the entry was written
    pub created_at: DateTime<Utc>,

    /// Other cache keys this entry's correctness depends on
    #[serde(default)]
    pub dependencies: BTreeSet<String>,

    /// Payload file name inside the entries directory
    pub payload: String,
}

impl IndexEntry {
    /// Check if this entry is older than the given age
    pub fn is_older_than(&self, age: chrono::Duration) -> bool {
        self.created_at < Utc::now() - age
    }
}
