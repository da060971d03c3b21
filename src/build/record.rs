//! Recorded build outcomes

use crate::fingerprint::ProjectSignature;
use crate::strategy::BuildStrategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a recorded signature is compared against the current project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FreshnessPolicy {
    /// Every tracked file must match, and no file may be added or removed
    #[default]
    Exact,
    /// Only the files present when the record was made are compared
    Restricted,
}

/// Value stored in the cache for each successfully built unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub unit: String,
    /// Commands the unit ran; a change invalidates the record
    pub commands: Vec<String>,
    pub signature: ProjectSignature,
    pub strategy: BuildStrategy,
    pub duration_ms: u64,
    pub recorded_at: DateTime<Utc>,
}

impl BuildRecord {
    /// Whether this record still describes the current project state
    pub fn is_fresh(&self, current: &ProjectSignature, policy: FreshnessPolicy) -> bool {
        match policy {
            FreshnessPolicy::Exact => &self.signature == current,
            FreshnessPolicy::Restricted => {
                current.restrict_to(self.signature.paths()) == self.signature
            }
        }
    }

    /// Freshness plus an unchanged command list
    pub fn is_fresh_for(
        &self,
        commands: &[String],
        current: &ProjectSignature,
        policy: FreshnessPolicy,
    ) -> bool {
        self.commands == commands && self.is_fresh(current, policy)
    }
}
