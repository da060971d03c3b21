//! Project fingerprinting
//!
//! Derives a stable, order-independent signature of project state from file
//! contents. Same bytes produce the same digest, so two scans of an unchanged
//! tree always compare equal no matter how the filesystem enumerates it.
//!
//! The caller decides which files matter (see [`collect_tracked_files`]); the
//! engine itself only skips files above a size limit.

mod walk;

pub use walk::{collect_tracked_files, DEFAULT_IGNORE_DIRS};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Files larger than this are skipped to bound hashing cost
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Number of hex characters kept from each SHA-256 digest
pub const DIGEST_HEX_LEN: usize = 16;

/// Snapshot of tracked project files: relative path -> content digest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectSignature {
    pub files: BTreeMap<String, String>,
}

impl ProjectSignature {
    /// Create an empty signature
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files in the signature
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the signature tracks no files
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Digest recorded for a path
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Record a digest for a path
    pub fn insert(&mut self, path: impl Into<String>, digest: impl Into<String>) {
        self.files.insert(path.into(), digest.into());
    }

    /// Tracked paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Sub-signature containing only the given paths.
    ///
    /// Paths absent from this signature are absent from the result too, so a
    /// deleted file shows up as a difference when compared against a
    /// recorded snapshot.
    pub fn restrict_to<'a, I>(&self, paths: I) -> ProjectSignature
    where
        I: IntoIterator<Item = &'a str>,
    {
        let files = paths
            .into_iter()
            .filter_map(|p| self.files.get(p).map(|d| (p.to_string(), d.clone())))
            .collect();
        ProjectSignature { files }
    }

    /// Paths that differ between `self` (previous) and `current`
    pub fn changed_paths(&self, current: &ProjectSignature) -> SignatureDiff {
        let mut diff = SignatureDiff::default();

        for (path, digest) in &current.files {
            match self.files.get(path) {
                None => diff.added.push(path.clone()),
                Some(old) if old != digest => diff.modified.push(path.clone()),
                Some(_) => {}
            }
        }
        for path in self.files.keys() {
            if !current.files.contains_key(path) {
                diff.removed.push(path.clone());
            }
        }

        diff
    }

    /// Single digest over the whole mapping, stable for equal signatures
    pub fn combined_digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (path, digest) in &self.files {
            hasher.update(path.as_bytes());
            hasher.update(b"\0");
            hasher.update(digest.as_bytes());
            hasher.update(b"\n");
        }
        truncate_digest(&hasher.finalize())
    }
}

impl FromIterator<(String, String)> for ProjectSignature {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

/// Difference between two signatures
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignatureDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

impl SignatureDiff {
    /// Whether the signatures were identical
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Total number of changed paths
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}

/// Why a file was left out of a signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// File exceeds the configured size limit (actual size in bytes)
    TooLarge(u64),
    /// File could not be read
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge(size) => write!(f, "too large ({} bytes)", size),
            Self::Unreadable(reason) => write!(f, "unreadable: {}", reason),
        }
    }
}

/// A file the engine did not hash
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: String,
    pub reason: SkipReason,
}

/// Signature plus the files that were skipped while computing it
#[derive(Debug, Clone, Default)]
pub struct SignatureScan {
    pub signature: ProjectSignature,
    pub skipped: Vec<SkippedFile>,
}

/// Computes content signatures for a set of project files
#[derive(Debug, Clone)]
pub struct FingerprintEngine {
    max_file_size: u64,
}

impl FingerprintEngine {
    /// Create an engine with the default size limit
    pub fn new() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Override the per-file size limit
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Compute the signature of `files` (relative to `root`)
    ///
    /// Unreadable and oversized files are left out; a partial signature is
    /// still a valid signature.
    pub fn compute_signature<S: AsRef<str> + Sync>(
        &self,
        root: &Path,
        files: &[S],
    ) -> ProjectSignature {
        self.scan(root, files).signature
    }

    /// Compute the signature and report skipped files
    pub fn scan<S: AsRef<str> + Sync>(&self, root: &Path, files: &[S]) -> SignatureScan {
        let results: Vec<(String, Result<String, SkipReason>)> = files
            .par_iter()
            .map(|rel| {
                let rel = rel.as_ref();
                (rel.to_string(), self.digest_file(&root.join(rel)))
            })
            .collect();

        let mut scan = SignatureScan::default();
        for (path, result) in results {
            match result {
                Ok(digest) => {
                    scan.signature.files.insert(path, digest);
                }
                Err(reason) => {
                    debug!("Skipping {}: {}", path, reason);
                    scan.skipped.push(SkippedFile { path, reason });
                }
            }
        }

        debug!(
            "Fingerprinted {} files ({} skipped)",
            scan.signature.len(),
            scan.skipped.len()
        );
        scan
    }

    fn digest_file(&self, path: &Path) -> Result<String, SkipReason> {
        let unreadable = |e: io::Error| SkipReason::Unreadable(e.to_string());

        let size = fs::metadata(path).map_err(unreadable)?.len();
        if size >= self.max_file_size {
            return Err(SkipReason::TooLarge(size));
        }

        let contents = fs::read(path).map_err(unreadable)?;
        Ok(digest_bytes(&contents))
    }
}

impl Default for FingerprintEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 of `data`, truncated to [`DIGEST_HEX_LEN`] hex characters
pub fn digest_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    truncate_digest(&hasher.finalize())
}

fn truncate_digest(full: &[u8]) -> String {
    hex::encode(&full[..DIGEST_HEX_LEN / 2])
}
