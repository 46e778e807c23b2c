//! Build order computation for installed packages

use crate::installed::InstalledPackage;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildOrderError {
    #[error("Circular dependency detected between: {}", .0.join(", "))]
    CircularDependency(Vec<String>),
}

pub type BuildOrderResult<T> = Result<T, BuildOrderError>;

/// Topological sorter emitting dependencies before their dependents
pub struct HierarchyFinder {
    /// Dependency graph: package -> dependencies inside the graph
    graph: BTreeMap<String, BTreeSet<String>>,
}

impl HierarchyFinder {
    /// Graph of the installed packages; dependencies outside the set are ignored
    pub fn new(installed: &[InstalledPackage]) -> Self {
        Self::from_graph(
            installed
                .iter()
                .map(|p| (p.name.clone(), p.dependencies()))
                .collect(),
        )
    }

    /// Create from a raw dependency graph
    pub fn from_graph(graph: HashMap<String, Vec<String>>) -> Self {
        let graph = graph
            .iter()
            .map(|(package, deps)| {
                let deps = deps
                    .iter()
                    .filter(|d| graph.contains_key(*d))
                    .cloned()
                    .collect();
                (package.clone(), deps)
            })
            .collect();

        Self { graph }
    }

    /// Build order of the installed packages
    pub fn sort(installed: &[InstalledPackage]) -> BuildOrderResult<Vec<String>> {
        Self::new(installed).build_order()
    }

    /// Kahn's algorithm, always emitting the smallest ready name first
    pub fn build_order(&self) -> BuildOrderResult<Vec<String>> {
        let mut remaining = self.graph.clone();
        let mut result = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let ready = remaining
                .iter()
                .find(|(_, deps)| deps.is_empty())
                .map(|(package, _)| package.clone());

            let Some(package) = ready else {
                return Err(BuildOrderError::CircularDependency(cycle_members(
                    &remaining,
                )));
            };

            remaining.remove(&package);
            for deps in remaining.values_mut() {
                deps.remove(&package);
            }
            result.push(package);
        }

        Ok(result)
    }

    /// Groups of packages that can be built in parallel, in build order
    pub fn build_groups(&self) -> BuildOrderResult<Vec<Vec<String>>> {
        let mut groups = Vec::new();
        let mut built = BTreeSet::new();

        while built.len() < self.graph.len() {
            let group: Vec<String> = self
                .graph
                .iter()
                .filter(|(package, deps)| {
                    !built.contains(*package) && deps.iter().all(|d| built.contains(d))
                })
                .map(|(package, _)| package.clone())
                .collect();

            if group.is_empty() {
                let stuck: BTreeMap<String, BTreeSet<String>> = self
                    .graph
                    .iter()
                    .filter(|(p, _)| !built.contains(*p))
                    .map(|(p, deps)| (p.clone(), deps.difference(&built).cloned().collect()))
                    .collect();
                return Err(BuildOrderError::CircularDependency(cycle_members(&stuck)));
            }

            built.extend(group.iter().cloned());
            groups.push(group);
        }

        Ok(groups)
    }

    /// Get dependencies for a specific package
    pub fn get_dependencies(&self, package: &str) -> Option<&BTreeSet<String>> {
        self.graph.get(package)
    }

    /// All packages in the graph, sorted
    pub fn packages(&self) -> Vec<String> {
        self.graph.keys().cloned().collect()
    }

    pub fn package_count(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }
}

/// Packages of a stalled graph that can reach themselves. Packages that
/// only depend on a cycle are left out.
fn cycle_members(stuck: &BTreeMap<String, BTreeSet<String>>) -> Vec<String> {
    stuck
        .keys()
        .filter(|package| {
            let mut seen = BTreeSet::new();
            let mut pending: Vec<&String> = stuck[*package].iter().collect();
            while let Some(next) = pending.pop() {
                if next == *package {
                    return true;
                }
                if seen.insert(next) {
                    if let Some(deps) = stuck.get(next) {
                        pending.extend(deps.iter());
                    }
                }
            }
            false
        })
        .cloned()
        .collect()
}
