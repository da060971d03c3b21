//! Build plan: units, their dependency graph, and execution order

use crate::config::schema::UnitConfig;
use crate::detect::{unit_cache_key, BuildUnit};
use crate::graph::{Cycle, DependencyGraph};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Units to build and the order to build them in
#[derive(Debug, Clone)]
pub struct BuildPlan {
    units: Vec<BuildUnit>,
    graph: DependencyGraph,
    order: Vec<String>,
    cycles: Vec<Cycle>,
}

impl BuildPlan {
    /// Plan `units` with `dependencies` (unit -> units it needs first).
    ///
    /// Names in `dependencies` that are not among `units` are dropped with a
    /// warning; units come and go with detection and config. Cycles do not
    /// fail planning either, they are reported through [`BuildPlan::cycles`].
    pub fn new(units: Vec<BuildUnit>, dependencies: &BTreeMap<String, Vec<String>>) -> Self {
        let known: BTreeSet<&str> = units.iter().map(|u| u.name.as_str()).collect();
        for (unit, deps) in dependencies {
            if !known.contains(unit.as_str()) {
                warn!("Ignoring dependencies of unknown unit {}", unit);
                continue;
            }
            for dep in deps.iter().filter(|d| !known.contains(d.as_str())) {
                warn!("Unit {} depends on unknown unit {}, ignoring it", unit, dep);
            }
        }

        let mut graph = DependencyGraph::new();
        for unit in &units {
            let deps: Vec<String> = dependencies
                .get(&unit.name)
                .map(|deps| {
                    deps.iter()
                        .filter(|d| known.contains(d.as_str()))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            graph.add_node(unit.name.clone(), deps);
        }

        let resolution = graph.resolve();
        Self {
            units,
            graph,
            order: resolution.order,
            cycles: resolution.cycles,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn unit(&self, name: &str) -> Option<&BuildUnit> {
        self.units.iter().find(|u| u.name == name)
    }

    /// Units in dependency order (best effort when cyclic)
    pub fn ordered_units(&self) -> impl Iterator<Item = &BuildUnit> {
        self.order.iter().filter_map(|name| self.unit(name))
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    /// Batches of units that can run concurrently
    pub fn waves(&self) -> Vec<Vec<String>> {
        self.graph.build_waves()
    }

    /// Units `name` directly depends on
    pub fn dependencies(&self, name: &str) -> &[String] {
        self.graph.dependencies(name)
    }

    /// Cache keys of the units `name` directly depends on
    pub fn dependency_keys(&self, name: &str) -> Vec<String> {
        self.dependencies(name)
            .iter()
            .map(|dep| unit_cache_key(dep))
            .collect()
    }
}

/// Combine detected units with user-defined ones.
///
/// A user unit replaces a detected unit of the same name; other user units
/// are appended in name order.
pub fn merge_units(native: Vec<BuildUnit>, user: &BTreeMap<String, UnitConfig>) -> Vec<BuildUnit> {
    let mut units: Vec<BuildUnit> = native
        .into_iter()
        .map(|unit| match user.get(&unit.name) {
            Some(custom) => BuildUnit {
                commands: custom.commands.clone(),
                ..unit
            },
            None => unit,
        })
        .collect();

    for (name, custom) in user {
        if !units.iter().any(|u| &u.name == name) {
            units.push(BuildUnit::new(name.clone(), custom.commands.clone()));
        }
    }

    units.retain(|u| !u.commands.is_empty());
    units
}
