//! Tracked-file enumeration

use crate::error::{PolybuildError, PolybuildResult};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Directory names skipped unless the configuration says otherwise
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".polybuild",
    "venv",
    ".venv",
    "target",
    "build",
    "dist",
    ".gradle",
];

/// List project files relative to `root`, skipping ignored directories.
///
/// Paths use `/` separators on every platform and come back sorted. Entries
/// that cannot be visited (permission errors, broken links) are skipped.
pub fn collect_tracked_files<S: AsRef<str>>(
    root: &Path,
    ignore_dirs: &[S],
) -> PolybuildResult<Vec<String>> {
    if !root.is_dir() {
        return Err(PolybuildError::ProjectNotFound(root.to_path_buf()));
    }

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            // Never filter the root itself, even if its name is ignored
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            e.file_name()
                .to_str()
                .map(|name| !ignore_dirs.iter().any(|d| d.as_ref() == name))
                .unwrap_or(true)
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };

        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(rel);
    }

    files.sort();
    debug!("Tracking {} files under {}", files.len(), root.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn skips_ignored_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.js"), "").unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
        fs::write(dir.path().join("Cargo.toml"), "").unwrap();

        let files = collect_tracked_files(dir.path(), DEFAULT_IGNORE_DIRS).unwrap();

        assert_eq!(files, vec!["Cargo.toml", "src/main.rs"]);
    }

    #[test]
    fn build_output_is_not_tracked() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("build")).unwrap();
        fs::create_dir_all(dir.path().join("dist")).unwrap();
        fs::create_dir_all(dir.path().join(".gradle/8.5")).unwrap();
        fs::write(dir.path().join("build/CMakeCache.txt"), "cache").unwrap();
        fs::write(dir.path().join("dist/pkg.whl"), "wheel").unwrap();
        fs::write(dir.path().join(".gradle/8.5/fileHashes.bin"), "").unwrap();
        fs::write(dir.path().join("main.c"), "int main() {}").unwrap();

        let files = collect_tracked_files(dir.path(), DEFAULT_IGNORE_DIRS).unwrap();

        assert_eq!(files, vec!["main.c"]);
    }

    #[test]
    fn ignored_name_only_applies_to_directories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("target"), "a file named target").unwrap();

        let files = collect_tracked_files(dir.path(), &["target"]).unwrap();
        assert_eq!(files, vec!["target"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = collect_tracked_files(&dir.path().join("nope"), DEFAULT_IGNORE_DIRS).unwrap_err();
        assert!(matches!(err, PolybuildError::ProjectNotFound(_)));
    }
}
