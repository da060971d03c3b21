//! Project detection
//!
//! Works out which languages, frameworks, and build tools a project uses by
//! scoring file names and content against static tables, then derives
//! optimization hints and native build units from the result.

mod commands;
mod tables;

pub use commands::{native_units, unit_cache_key, BuildUnit};
pub use tables::{BuildTool, Framework, Language, FRAMEWORK_MANIFESTS};

use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Minimum score for a language to count as present
pub const LANGUAGE_THRESHOLD: u32 = 2;

/// Files at or above this size are not sampled for content indicators
const SAMPLE_MAX_FILE_SIZE: u64 = 1_000_000;

/// Bytes read from the start of each sampled file
const SAMPLE_BYTES: u64 = 10_000;

/// Hints consumed by strategy selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OptimizationHints {
    /// More than one language: per-tool units can run side by side
    pub parallel_capable: bool,
    /// An incremental tool (webpack, rollup, tsc) is available
    pub incremental_capable: bool,
    /// A language whose builds are expensive enough to cache
    pub cache_beneficial: bool,
}

/// Everything detection learned about a project
#[derive(Debug, Clone, Serialize)]
pub struct ProjectProfile {
    pub root: PathBuf,
    pub languages: Vec<Language>,
    pub frameworks: Vec<Framework>,
    pub build_tools: Vec<BuildTool>,
    pub dependencies: BTreeMap<String, Vec<String>>,
    pub hints: OptimizationHints,
    pub files_analyzed: usize,
}

impl ProjectProfile {
    /// Analyze `root` using the given tracked files (relative, `/`-separated)
    pub fn analyze(root: &Path, files: &[String]) -> Self {
        let languages = detect_languages(root, files);
        let frameworks = detect_frameworks(root);
        let build_tools = detect_build_tools(root, &languages);
        let dependencies = extract_dependencies(root, &languages);
        let hints = infer_hints(&languages, &build_tools);

        info!(
            "Detected languages [{}], tools [{}]",
            join(&languages),
            join(&build_tools)
        );

        Self {
            root: root.to_path_buf(),
            languages,
            frameworks,
            build_tools,
            dependencies,
            hints,
            files_analyzed: files.len(),
        }
    }

    /// Key used to group build history, e.g. `javascript+python`
    pub fn project_type(&self) -> String {
        if self.languages.is_empty() {
            return "unknown".to_string();
        }
        self.languages
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join("+")
    }

    pub fn has_tool(&self, tool: BuildTool) -> bool {
        self.build_tools.contains(&tool)
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Score every language; returns scores indexed in table order
pub fn score_languages(root: &Path, files: &[String]) -> BTreeMap<Language, u32> {
    let languages = Language::all();

    let totals = files
        .par_iter()
        .map(|file| score_file(root, file))
        .reduce(
            || vec![0u32; languages.len()],
            |mut acc, scores| {
                for (total, score) in acc.iter_mut().zip(scores) {
                    *total += score;
                }
                acc
            },
        );

    languages.iter().copied().zip(totals).collect()
}

fn score_file(root: &Path, file: &str) -> Vec<u32> {
    let name = file.rsplit('/').next().unwrap_or(file);
    let sample = sample_content(&root.join(file));

    Language::all()
        .iter()
        .map(|lang| {
            let by_name = lang
                .file_suffixes()
                .iter()
                .filter(|suffix| name.ends_with(*suffix))
                .count() as u32
                * 2;
            let by_content = sample
                .as_deref()
                .map(|content| {
                    lang.indicators()
                        .iter()
                        .filter(|indicator| content.contains(*indicator))
                        .count() as u32
                })
                .unwrap_or(0);
            by_name + by_content
        })
        .collect()
}

/// First bytes of a file as lossy UTF-8, `None` when too large or unreadable
fn sample_content(path: &Path) -> Option<String> {
    let size = fs::metadata(path).ok()?.len();
    if size >= SAMPLE_MAX_FILE_SIZE {
        return None;
    }

    let mut buf = Vec::new();
    File::open(path)
        .ok()?
        .take(SAMPLE_BYTES)
        .read_to_end(&mut buf)
        .ok()?;
    Some(String::from_utf8_lossy(&buf).into_owned())
}

fn detect_languages(root: &Path, files: &[String]) -> Vec<Language> {
    let scores = score_languages(root, files);
    debug!("Language scores: {:?}", scores);
    scores
        .into_iter()
        .filter(|(_, score)| *score >= LANGUAGE_THRESHOLD)
        .map(|(lang, _)| lang)
        .collect()
}

fn detect_frameworks(root: &Path) -> Vec<Framework> {
    let mut found = BTreeSet::new();

    for manifest in FRAMEWORK_MANIFESTS {
        let Ok(bytes) = fs::read(root.join(manifest)) else {
            continue;
        };
        let content = String::from_utf8_lossy(&bytes).to_lowercase();
        for framework in Framework::all() {
            if framework.indicators().iter().any(|i| content.contains(i)) {
                debug!("Framework {} indicated by {}", framework, manifest);
                found.insert(*framework);
            }
        }
    }

    found.into_iter().collect()
}

fn detect_build_tools(root: &Path, languages: &[Language]) -> Vec<BuildTool> {
    let candidates: BTreeSet<BuildTool> = languages
        .iter()
        .flat_map(|lang| lang.build_tools().iter().copied())
        .collect();

    candidates
        .into_iter()
        .filter(|tool| verify_tool(root, *tool))
        .collect()
}

fn verify_tool(root: &Path, tool: BuildTool) -> bool {
    match tool.verification_files() {
        Some(files) => files.iter().any(|f| root.join(f).exists()),
        None => true,
    }
}

fn extract_dependencies(root: &Path, languages: &[Language]) -> BTreeMap<String, Vec<String>> {
    let mut deps = BTreeMap::new();

    if languages.contains(&Language::Python) {
        deps.insert(Language::Python.to_string(), python_dependencies(root));
    }
    if languages.contains(&Language::Javascript) || languages.contains(&Language::Typescript) {
        deps.insert(Language::Javascript.to_string(), js_dependencies(root));
    }

    deps
}

fn python_dependencies(root: &Path) -> Vec<String> {
    let mut deps = Vec::new();

    if let Ok(content) = fs::read_to_string(root.join("requirements.txt")) {
        deps.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(requirement_name),
        );
    }

    if let Ok(content) = fs::read_to_string(root.join("pyproject.toml")) {
        if content.contains("dependencies") {
            deps.push("pyproject-dependencies".to_string());
        }
    }

    deps
}

/// Package name from a requirement line such as `requests>=2.0`
fn requirement_name(line: &str) -> String {
    ["==", ">=", "~="]
        .iter()
        .fold(line, |name, sep| name.split(sep).next().unwrap_or(name))
        .trim()
        .to_string()
}

fn js_dependencies(root: &Path) -> Vec<String> {
    let Some(manifest) = read_package_json(root) else {
        return Vec::new();
    };

    ["dependencies", "devDependencies"]
        .iter()
        .filter_map(|section| manifest.get(section)?.as_object())
        .flat_map(|deps| deps.keys().cloned())
        .collect()
}

/// Parsed `package.json`, `None` when missing or malformed
pub(crate) fn read_package_json(root: &Path) -> Option<serde_json::Value> {
    let content = fs::read_to_string(root.join("package.json")).ok()?;
    serde_json::from_str(&content).ok()
}

fn infer_hints(languages: &[Language], tools: &[BuildTool]) -> OptimizationHints {
    OptimizationHints {
        parallel_capable: languages.len() > 1,
        incremental_capable: tools.iter().any(BuildTool::is_incremental),
        cache_beneficial: languages.iter().any(Language::cache_beneficial),
    }
}
