//! Static language, framework, and build tool tables

use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages recognized by detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Typescript,
    Rust,
    Go,
    Java,
    Cpp,
    C,
}

impl Language {
    /// All languages in table order
    pub fn all() -> &'static [Self] {
        &[
            Self::Python,
            Self::Javascript,
            Self::Typescript,
            Self::Rust,
            Self::Go,
            Self::Java,
            Self::Cpp,
            Self::C,
        ]
    }

    /// File name suffixes that count as evidence for this language
    pub fn file_suffixes(&self) -> &'static [&'static str] {
        match self {
            Self::Python => &[".py", "setup.py", "pyproject.toml", "requirements.txt"],
            Self::Javascript => &[".js", "package.json", ".mjs"],
            Self::Typescript => &[".ts", ".tsx", "tsconfig.json"],
            Self::Rust => &[".rs", "Cargo.toml"],
            Self::Go => &[".go", "go.mod"],
            Self::Java => &[".java", "pom.xml", "build.gradle"],
            Self::Cpp => &[".cpp", ".hpp", ".cc", "CMakeLists.txt"],
            Self::C => &[".c", ".h", "Makefile"],
        }
    }

    /// Content fragments that count as evidence for this language
    pub fn indicators(&self) -> &'static [&'static str] {
        match self {
            Self::Python => &["import ", "def ", "class ", "if __name__"],
            Self::Javascript => &["require(", "import ", "export ", "module.exports"],
            Self::Typescript => &["interface ", "type ", ": string", ": number"],
            Self::Rust => &["fn ", "impl ", "use ", "pub "],
            Self::Go => &["package ", "import ", "func ", "type "],
            Self::Java => &["public class", "import java", "package "],
            Self::Cpp => &["#include", "namespace ", "class ", "::"],
            Self::C => &["#include", "int main", "void "],
        }
    }

    /// Build tools associated with this language, before verification
    pub fn build_tools(&self) -> &'static [BuildTool] {
        use BuildTool::*;
        match self {
            Self::Python => &[Pip, Poetry, Setuptools, Pipenv, Conda],
            Self::Javascript => &[Npm, Yarn, Pnpm, Webpack, Rollup],
            Self::Typescript => &[Tsc, TsNode, Webpack, Rollup],
            Self::Rust => &[Cargo, Rustc],
            Self::Go => &[Go],
            Self::Java => &[Maven, Gradle, Ant],
            Self::Cpp => &[Cmake, Make, Ninja, Meson],
            Self::C => &[Make, Cmake, Gcc, Clang],
        }
    }

    /// Whether build outputs for this language are worth caching
    pub fn cache_beneficial(&self) -> bool {
        matches!(self, Self::Javascript | Self::Typescript | Self::Rust)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Python => "python",
            Self::Javascript => "javascript",
            Self::Typescript => "typescript",
            Self::Rust => "rust",
            Self::Go => "go",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::C => "c",
        };
        write!(f, "{}", name)
    }
}

/// Frameworks recognized from package manifests
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    React,
    Vue,
    Angular,
    Django,
    Flask,
    Fastapi,
    Express,
    Spring,
    Rails,
    Laravel,
}

impl Framework {
    pub fn all() -> &'static [Self] {
        &[
            Self::React,
            Self::Vue,
            Self::Angular,
            Self::Django,
            Self::Flask,
            Self::Fastapi,
            Self::Express,
            Self::Spring,
            Self::Rails,
            Self::Laravel,
        ]
    }

    /// Lower-case fragments matched against lower-cased manifest content
    pub fn indicators(&self) -> &'static [&'static str] {
        match self {
            Self::React => &["react", "jsx", "create-react-app"],
            Self::Vue => &["vue", "vue-cli", ".vue"],
            Self::Angular => &["angular", "@angular", "ng "],
            Self::Django => &["django", "manage.py", "wsgi.py"],
            Self::Flask => &["flask", "app.py", "flask("],
            Self::Fastapi => &["fastapi", "fastapi("],
            Self::Express => &["express", "app.listen"],
            Self::Spring => &["springframework", "springboot"],
            Self::Rails => &["rails", "gemfile"],
            Self::Laravel => &["laravel", "artisan"],
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::React => "react",
            Self::Vue => "vue",
            Self::Angular => "angular",
            Self::Django => "django",
            Self::Flask => "flask",
            Self::Fastapi => "fastapi",
            Self::Express => "express",
            Self::Spring => "spring",
            Self::Rails => "rails",
            Self::Laravel => "laravel",
        };
        write!(f, "{}", name)
    }
}

/// Package manifests scanned for framework indicators
pub const FRAMEWORK_MANIFESTS: &[&str] = &[
    "package.json",
    "requirements.txt",
    "Pipfile",
    "Gemfile",
    "pom.xml",
    "build.gradle",
    "Cargo.toml",
    "go.mod",
];

/// Build tools that detection can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildTool {
    Pip,
    Poetry,
    Setuptools,
    Pipenv,
    Conda,
    Npm,
    Yarn,
    Pnpm,
    Webpack,
    Rollup,
    Tsc,
    TsNode,
    Cargo,
    Rustc,
    Go,
    Maven,
    Gradle,
    Ant,
    Cmake,
    Make,
    Ninja,
    Meson,
    Gcc,
    Clang,
}

impl BuildTool {
    /// Files whose presence confirms the tool applies to the project.
    ///
    /// `None` means the tool has no verification rule and is accepted
    /// whenever one of its languages is detected.
    pub fn verification_files(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::Npm | Self::Yarn => Some(&["package.json"]),
            Self::Pip => Some(&["requirements.txt", "setup.py", "pyproject.toml"]),
            Self::Poetry => Some(&["pyproject.toml"]),
            Self::Cargo => Some(&["Cargo.toml"]),
            Self::Go => Some(&["go.mod"]),
            Self::Maven => Some(&["pom.xml"]),
            Self::Gradle => Some(&["build.gradle", "build.gradle.kts"]),
            Self::Cmake => Some(&["CMakeLists.txt"]),
            Self::Make => Some(&["Makefile"]),
            _ => None,
        }
    }

    /// Tools that rebuild only what changed
    pub fn is_incremental(&self) -> bool {
        matches!(self, Self::Webpack | Self::Rollup | Self::Tsc)
    }
}

impl fmt::Display for BuildTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pip => "pip",
            Self::Poetry => "poetry",
            Self::Setuptools => "setuptools",
            Self::Pipenv => "pipenv",
            Self::Conda => "conda",
            Self::Npm => "npm",
            Self::Yarn => "yarn",
            Self::Pnpm => "pnpm",
            Self::Webpack => "webpack",
            Self::Rollup => "rollup",
            Self::Tsc => "tsc",
            Self::TsNode => "ts-node",
            Self::Cargo => "cargo",
            Self::Rustc => "rustc",
            Self::Go => "go",
            Self::Maven => "maven",
            Self::Gradle => "gradle",
            Self::Ant => "ant",
            Self::Cmake => "cmake",
            Self::Make => "make",
            Self::Ninja => "ninja",
            Self::Meson => "meson",
            Self::Gcc => "gcc",
            Self::Clang => "clang",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde_names() {
        for lang in Language::all() {
            let json = serde_json::to_string(lang).unwrap();
            assert_eq!(json, format!("\"{}\"", lang));
        }
        for framework in Framework::all() {
            let json = serde_json::to_string(framework).unwrap();
            assert_eq!(json, format!("\"{}\"", framework));
        }
        assert_eq!(serde_json::to_string(&BuildTool::TsNode).unwrap(), "\"ts-node\"");
        assert_eq!(BuildTool::TsNode.to_string(), "ts-node");
    }

    #[test]
    fn framework_indicators_are_lowercase() {
        for framework in Framework::all() {
            for indicator in framework.indicators() {
                assert_eq!(*indicator, indicator.to_lowercase());
            }
        }
    }

    #[test]
    fn verification_rules() {
        assert_eq!(BuildTool::Cargo.verification_files(), Some(&["Cargo.toml"][..]));
        assert!(BuildTool::Webpack.verification_files().is_none());
        assert!(BuildTool::Tsc.is_incremental());
        assert!(!BuildTool::Cargo.is_incremental());
    }
}
