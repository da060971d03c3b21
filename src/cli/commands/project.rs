//! Shared project analysis for commands that inspect a project directory

use crate::build::merge_units;
use crate::config::Config;
use crate::detect::{native_units, BuildUnit, ProjectProfile};
use crate::error::{PolybuildError, PolybuildResult};
use crate::fingerprint::{collect_tracked_files, FingerprintEngine, SignatureScan};
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything a command learns about a project before acting on it
pub struct ProjectAnalysis {
    pub root: PathBuf,
    pub files: Vec<String>,
    pub scan: SignatureScan,
    pub profile: ProjectProfile,
}

impl ProjectAnalysis {
    /// Detected native units overlaid with the configured ones
    pub fn units(&self, config: &Config) -> Vec<BuildUnit> {
        merge_units(native_units(&self.profile), &config.build.units)
    }
}

/// Canonical project directory, or `ProjectNotFound`
pub fn resolve_root(path: &Path) -> PolybuildResult<PathBuf> {
    if !path.is_dir() {
        return Err(PolybuildError::ProjectNotFound(path.to_path_buf()));
    }
    path.canonicalize()
        .map_err(|e| PolybuildError::io(format!("resolving {}", path.display()), e))
}

/// Enumerate, fingerprint, and profile the project at `path`
pub fn analyze(path: &Path, config: &Config) -> PolybuildResult<ProjectAnalysis> {
    let root = resolve_root(path)?;
    let files = collect_tracked_files(&root, &config.fingerprint.ignore_dirs)?;

    let engine =
        FingerprintEngine::new().with_max_file_size(config.fingerprint.max_file_size_bytes());
    let scan = engine.scan(&root, &files);
    let profile = ProjectProfile::analyze(&root, &files);

    info!(
        "Analyzed {}: {} files, type {}",
        root.display(),
        files.len(),
        profile.project_type()
    );

    Ok(ProjectAnalysis {
        root,
        files,
        scan,
        profile,
    })
}
