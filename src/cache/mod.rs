//! Persistent content-addressed build cache
//!
//! Stores opaque build outcomes keyed by unit of work, together with the set
//! of other keys each outcome depends on. Freshness (does the recorded
//! signature still match the project?) is decided by the caller; the store
//! only answers "what was recorded for this key".
//!
//! # On-disk layout
//!
//! | Path | Contents |
//! |------|----------|
//! | `index.json` | key -> created_at, dependencies, payload file |
//! | `entries/<sha256(key)>.json` | the stored value |
//!
//! # Consistency
//!
//! - Payloads are written before the index entry that points at them
//! - Invalidation drops the index entry before deleting the payload
//! - Both files are replaced via temp file + rename
//!
//! A crash therefore leaves at worst an unindexed payload, reclaimed by
//! [`CacheStore::prune_orphans`]. An index entry whose payload is missing, or
//! any payload or index that fails to parse, reads as a miss.

pub mod index;
pub mod invalidation;
pub mod store;

pub use index::{CacheIndex, IndexEntry, INDEX_VERSION};
pub use invalidation::invalidate_cascade;
pub use store::{CacheEntryInfo, CacheStats, CacheStore};
