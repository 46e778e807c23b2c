//! One candidate assignment of versions explored by the resolver

use crate::manifest::{DependencyEdge, Linking};
use crate::repository::RemotePackage;
use indexmap::IndexMap;
use semver::Version;
use std::collections::BTreeMap;

/// Version range requested for a package, with whoever requested it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub range: String,
    /// Root project name, or `"<package> <version>"` for nested requirements
    pub required_by: String,
}

/// Package version picked in a state
#[derive(Debug, Clone)]
pub struct Assignment {
    pub version: Version,
    pub package: RemotePackage,
}

/// Assignments plus the constraints that led to them.
///
/// States are plain values: the resolver clones one per candidate version,
/// and clones never share storage.
#[derive(Debug, Clone, Default)]
pub struct ResolutionState {
    assignments: IndexMap<String, Assignment>,
    constraints: IndexMap<String, Vec<Requirement>>,
    linking: IndexMap<String, Vec<Linking>>,
}

impl ResolutionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State constrained by the root edges only
    pub fn seeded(edges: &[DependencyEdge], required_by: &str) -> Self {
        let mut state = Self::new();
        for edge in edges {
            state.require(edge, required_by);
        }
        state
    }

    /// Append an edge's range and narrow the accepted linking types
    pub fn require(&mut self, edge: &DependencyEdge, required_by: &str) {
        self.constraints
            .entry(edge.name.clone())
            .or_default()
            .push(Requirement {
                range: edge.constraint.clone(),
                required_by: required_by.to_string(),
            });

        let accepted = self
            .linking
            .entry(edge.name.clone())
            .or_insert_with(|| Linking::ALL.to_vec());
        accepted.retain(|l| edge.linking.contains(l));
    }

    /// Accumulated range for a package, `*` when unconstrained
    pub fn constraint(&self, name: &str) -> String {
        match self.constraints.get(name) {
            Some(requirements) if !requirements.is_empty() => requirements
                .iter()
                .map(|r| r.range.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            _ => "*".to_string(),
        }
    }

    pub fn requirements(&self, name: &str) -> &[Requirement] {
        self.constraints.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Linking types every requirement on the package accepts
    pub fn accepted_linking(&self, name: &str) -> Vec<Linking> {
        self.linking
            .get(name)
            .cloned()
            .unwrap_or_else(|| Linking::ALL.to_vec())
    }

    /// Record (or replace) the chosen version of a package
    pub fn assign(&mut self, name: &str, version: Version, package: RemotePackage) {
        self.assignments
            .insert(name.to_string(), Assignment { version, package });
    }

    /// Copy of this state with one more assignment
    pub fn with_assignment(&self, name: &str, version: Version, package: RemotePackage) -> Self {
        let mut state = self.clone();
        state.assign(name, version, package);
        state
    }

    pub fn assignment(&self, name: &str) -> Option<&Assignment> {
        self.assignments.get(name)
    }

    pub fn version(&self, name: &str) -> Option<&Version> {
        self.assignments.get(name).map(|a| &a.version)
    }

    /// Assignments in resolution order
    pub fn assignments(&self) -> impl Iterator<Item = (&String, &Assignment)> {
        self.assignments.iter()
    }

    /// Chosen versions keyed by package name
    pub fn versions(&self) -> BTreeMap<String, Version> {
        self.assignments
            .iter()
            .map(|(name, a)| (name.clone(), a.version.clone()))
            .collect()
    }

    /// Constrained packages without an assignment, sorted
    pub fn unresolved(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .constraints
            .keys()
            .filter(|name| !self.assignments.contains_key(*name))
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Every constrained package has been assigned a version
    pub fn is_complete(&self) -> bool {
        self.constraints
            .keys()
            .all(|name| self.assignments.contains_key(name))
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}
