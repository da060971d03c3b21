use serde::Serialize;
use std::fmt;

/// A closed dependency path, e.g. `[a, b, c, a]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cycle(Vec<String>);

impl Cycle {
    pub(crate) fn new(path: Vec<String>) -> Self {
        Self(path)
    }

    /// Full path including the repeated start node
    pub fn path(&self) -> &[String] {
        &self.0
    }

    /// Distinct members of the cycle, in path order
    pub fn nodes(&self) -> &[String] {
        &self.0[..self.0.len().saturating_sub(1)]
    }

    /// Rotation-independent identity used to de-duplicate cycles
    pub(crate) fn canonical(&self) -> Vec<String> {
        let nodes = self.nodes();
        let Some(start) = nodes
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(i, _)| i)
        else {
            return Vec::new();
        };

        nodes[start..]
            .iter()
            .chain(nodes[..start].iter())
            .cloned()
            .collect()
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" -> "))
    }
}
