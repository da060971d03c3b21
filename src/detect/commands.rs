//! Native build commands for detected tools

use super::{read_package_json, BuildTool, ProjectProfile};
use serde::Serialize;
use std::path::Path;

/// A named group of shell commands built as one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildUnit {
    pub name: String,
    /// Tool the unit was generated for; `None` for user-defined units
    pub tool: Option<BuildTool>,
    pub commands: Vec<String>,
}

impl BuildUnit {
    pub fn new(name: impl Into<String>, commands: Vec<String>) -> Self {
        Self {
            name: name.into(),
            tool: None,
            commands,
        }
    }

    /// Cache key under which this unit's outcome is recorded
    pub fn cache_key(&self) -> String {
        unit_cache_key(&self.name)
    }
}

/// Cache key for a unit name
pub fn unit_cache_key(name: &str) -> String {
    format!("build/{}", name)
}

/// Tools with native commands, in the order their units are generated
const NATIVE_TOOLS: &[BuildTool] = &[
    BuildTool::Pip,
    BuildTool::Poetry,
    BuildTool::Npm,
    BuildTool::Yarn,
    BuildTool::Cargo,
    BuildTool::Go,
    BuildTool::Maven,
    BuildTool::Gradle,
    BuildTool::Cmake,
    BuildTool::Make,
];

/// One unit per detected tool that has native commands
pub fn native_units(profile: &ProjectProfile) -> Vec<BuildUnit> {
    NATIVE_TOOLS
        .iter()
        .filter(|tool| profile.has_tool(**tool))
        .filter_map(|tool| {
            let commands = tool_commands(profile, *tool);
            if commands.is_empty() {
                return None;
            }
            Some(BuildUnit {
                name: tool.to_string(),
                tool: Some(*tool),
                commands,
            })
        })
        .collect()
}

fn tool_commands(profile: &ProjectProfile, tool: BuildTool) -> Vec<String> {
    let root = profile.root.as_path();
    let commands: Vec<&str> = match tool {
        BuildTool::Pip => {
            let mut cmds = Vec::new();
            if root.join("requirements.txt").exists() {
                cmds.push("pip install -r requirements.txt");
            }
            if root.join("setup.py").exists() {
                cmds.push("python setup.py build");
            }
            cmds
        }
        BuildTool::Poetry => vec!["poetry install", "poetry build"],
        BuildTool::Npm => {
            if has_package_script(root, "build") {
                vec!["npm install", "npm run build"]
            } else {
                vec!["npm install"]
            }
        }
        BuildTool::Yarn => {
            if has_package_script(root, "build") {
                vec!["yarn install", "yarn build"]
            } else {
                vec!["yarn install"]
            }
        }
        BuildTool::Cargo => vec!["cargo build --release"],
        BuildTool::Go => vec!["go build ./..."],
        BuildTool::Maven => vec!["mvn clean install"],
        BuildTool::Gradle => vec!["gradle build"],
        BuildTool::Cmake => vec!["cmake -S . -B build", "cmake --build build"],
        // CMake drives make itself
        BuildTool::Make if !profile.has_tool(BuildTool::Cmake) => vec!["make"],
        _ => Vec::new(),
    };

    commands.into_iter().map(String::from).collect()
}

/// Whether `package.json` declares `scripts.<name>`
fn has_package_script(root: &Path, name: &str) -> bool {
    read_package_json(root)
        .and_then(|manifest| manifest.get("scripts")?.get(name).cloned())
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{Language, OptimizationHints};
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn profile(root: &Path, tools: &[BuildTool]) -> ProjectProfile {
        ProjectProfile {
            root: root.to_path_buf(),
            languages: vec![Language::Javascript],
            frameworks: Vec::new(),
            build_tools: tools.to_vec(),
            dependencies: BTreeMap::new(),
            hints: OptimizationHints::default(),
            files_analyzed: 0,
        }
    }

    #[test]
    fn npm_build_script_is_optional() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        let units = native_units(&profile(dir.path(), &[BuildTool::Npm]));
        assert_eq!(units[0].commands, vec!["npm install"]);

        fs::write(
            dir.path().join("package.json"),
            r#"{"scripts": {"build": "vite build"}}"#,
        )
        .unwrap();
        let units = native_units(&profile(dir.path(), &[BuildTool::Npm, BuildTool::Webpack]));
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "npm");
        assert_eq!(units[0].commands, vec!["npm install", "npm run build"]);
        assert_eq!(units[0].cache_key(), "build/npm");
    }

    #[test]
    fn make_skipped_when_cmake_present() {
        let dir = TempDir::new().unwrap();
        let units = native_units(&profile(dir.path(), &[BuildTool::Cmake, BuildTool::Make]));
        let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["cmake"]);

        let units = native_units(&profile(dir.path(), &[BuildTool::Make]));
        assert_eq!(units[0].commands, vec!["make"]);
    }

    #[test]
    fn pip_without_manifests_yields_no_unit() {
        let dir = TempDir::new().unwrap();
        assert!(native_units(&profile(dir.path(), &[BuildTool::Pip])).is_empty());

        fs::write(dir.path().join("setup.py"), "").unwrap();
        let units = native_units(&profile(dir.path(), &[BuildTool::Pip]));
        assert_eq!(units[0].commands, vec!["python setup.py build"]);
    }

    #[test]
    fn units_follow_fixed_tool_order() {
        let dir = TempDir::new().unwrap();
        let units = native_units(&profile(dir.path(), &[BuildTool::Go, BuildTool::Cargo]));
        let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["cargo", "go"]);
    }
}
