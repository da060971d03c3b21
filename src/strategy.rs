//! Build strategies and selection

use crate::detect::OptimizationHints;
use crate::error::PolybuildError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a build is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum BuildStrategy {
    /// Run independent units concurrently, wave by wave
    Parallel,
    /// Run units one by one in dependency order, stopping at the first failure
    DependencyGraph,
    /// Skip units whose recorded signature still matches
    Incremental,
    /// Skip the whole build when every unit is fresh
    Cached,
    /// Pick one of the above from project hints and build history
    Adaptive,
}

impl BuildStrategy {
    /// Concrete strategies, excluding `Adaptive`
    pub fn concrete() -> &'static [Self] {
        &[
            Self::Parallel,
            Self::DependencyGraph,
            Self::Incremental,
            Self::Cached,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::DependencyGraph => "dependency_graph",
            Self::Incremental => "incremental",
            Self::Cached => "cached",
            Self::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for BuildStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BuildStrategy {
    type Err = PolybuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parallel" => Ok(Self::Parallel),
            "dependency_graph" => Ok(Self::DependencyGraph),
            "incremental" => Ok(Self::Incremental),
            "cached" => Ok(Self::Cached),
            "adaptive" => Ok(Self::Adaptive),
            other => Err(PolybuildError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Choose a concrete strategy from project hints.
///
/// `cache_valid` is whether every unit has a fresh recorded outcome.
pub fn select_strategy(hints: &OptimizationHints, cache_valid: bool) -> BuildStrategy {
    if hints.cache_beneficial && cache_valid {
        BuildStrategy::Cached
    } else if hints.incremental_capable {
        BuildStrategy::Incremental
    } else if hints.parallel_capable {
        BuildStrategy::Parallel
    } else {
        BuildStrategy::DependencyGraph
    }
}

/// Resolve `Adaptive` to a concrete strategy, preferring a learned one.
///
/// A fully valid cache always resolves to `Cached`, whatever was learned.
/// A learned `Cached` is ignored while the cache is not valid.
pub fn resolve_adaptive(
    hints: &OptimizationHints,
    cache_valid: bool,
    learned: Option<BuildStrategy>,
) -> BuildStrategy {
    if cache_valid {
        return BuildStrategy::Cached;
    }
    match learned {
        Some(BuildStrategy::Adaptive | BuildStrategy::Cached) | None => {
            select_strategy(hints, cache_valid)
        }
        Some(strategy) => strategy,
    }
}
