//! Backtracking dependency tree resolver
//!
//! Every candidate version of a dependency forks the current state; the
//! candidate's own dependencies are then folded into the fork. States
//! that run out of candidates are dropped. The surviving states are
//! ordered newest versions first, so `states[0]` is the preferred answer.

use crate::downloader::DownloadError;
use crate::manifest::{DependencyEdge, PackageManifest};
use crate::repository::{RemotePackage, RepositoryCollection, RepositoryError};
use crate::version::{VersionComparator, VersionError};
use chrono::{DateTime, Utc};
use semver::Version;
use std::collections::HashMap;
use thiserror::Error;

pub mod conflict;
mod state;

pub use conflict::{Conflict, ConflictingConstraint};
pub use state::{Assignment, Requirement, ResolutionState};

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("Dependencies loop detected: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    #[error("Cannot resolve dependencies tree: {}", .0.summary())]
    Conflict(Box<Conflict>),

    #[error("Package '{package}' not found in any of {searched} configured repositories")]
    PackageNotFound { package: String, searched: usize },

    #[error("Invalid version constraint: {0}")]
    InvalidConstraint(#[from] VersionError),

    #[error("Cannot fetch details of '{package}' ({version}): {source}")]
    Details {
        package: String,
        version: Version,
        #[source]
        source: DownloadError,
    },

    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ResolverError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::PackageNotFound { package, searched } => {
                ResolverError::PackageNotFound { package, searched }
            }
            RepositoryError::Version(e) => ResolverError::InvalidConstraint(e),
            other => ResolverError::Repository(other),
        }
    }
}

pub type ResolverResult<T> = Result<T, ResolverError>;

/// Result of one resolve pass
#[derive(Debug, Clone)]
pub struct ResolutionSnapshot {
    states: Vec<ResolutionState>,
    taken_at: DateTime<Utc>,
}

impl ResolutionSnapshot {
    /// All surviving states, preferred first
    pub fn states(&self) -> &[ResolutionState] {
        &self.states
    }

    /// The newest-versions-possible state
    pub fn best(&self) -> &ResolutionState {
        // Snapshots are only built from non-empty state lists
        &self.states[0]
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

/// Resolver walking the dependency tree of a root manifest
pub struct DependencyTreeResolver {
    /// Repositories consulted for every package
    repositories: RepositoryCollection,

    /// Package handles found during the current pass
    packages: HashMap<String, RemotePackage>,

    /// Manifests fetched during the current pass
    details: HashMap<(String, Version), PackageManifest>,

    /// Most recent state that ran out of candidates
    dead_end: Option<Conflict>,

    snapshot: Option<ResolutionSnapshot>,
}

impl DependencyTreeResolver {
    pub fn new(repositories: RepositoryCollection) -> Self {
        Self {
            repositories,
            packages: HashMap::new(),
            details: HashMap::new(),
            dead_end: None,
            snapshot: None,
        }
    }

    pub fn repositories(&self) -> &RepositoryCollection {
        &self.repositories
    }

    /// Resolve the manifest and keep the result as the current snapshot
    pub fn snapshot(
        &mut self,
        manifest: &PackageManifest,
        include_dev: bool,
    ) -> ResolverResult<&ResolutionSnapshot> {
        let states = self.resolve(manifest, include_dev)?;
        Ok(self.snapshot.insert(ResolutionSnapshot {
            states,
            taken_at: Utc::now(),
        }))
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn resolved(&self) -> Option<&ResolutionSnapshot> {
        self.snapshot.as_ref()
    }

    /// Resolve the dependencies of a root manifest
    pub fn resolve(
        &mut self,
        manifest: &PackageManifest,
        include_dev: bool,
    ) -> ResolverResult<Vec<ResolutionState>> {
        self.resolve_edges(&manifest.name, &manifest.edges(include_dev))
    }

    /// Resolve root edges required by `root`.
    ///
    /// Fails with a conflict when no state survives.
    pub fn resolve_edges(
        &mut self,
        root: &str,
        edges: &[DependencyEdge],
    ) -> ResolverResult<Vec<ResolutionState>> {
        self.packages.clear();
        self.details.clear();

        let mut states = vec![ResolutionState::seeded(edges, root)];

        for edge in edges {
            self.dead_end = None;
            let next = self.resolve_unit(edge, &states, &[])?;

            if next.is_empty() {
                let conflict = self.dead_end.take().unwrap_or_else(|| {
                    Conflict::from_state(&edge.name, &states[0], Vec::new())
                });
                log::debug!("Resolution failed at {}:\n{}", edge.name, conflict.report());
                return Err(ResolverError::Conflict(Box::new(conflict)));
            }

            log::debug!("{} yields {} state(s)", edge.name, next.len());
            states = next;
        }

        Ok(states)
    }

    /// Expand every state with each candidate version of `edge`
    fn resolve_unit(
        &mut self,
        edge: &DependencyEdge,
        states: &[ResolutionState],
        ancestors: &[String],
    ) -> ResolverResult<Vec<ResolutionState>> {
        let mut chain = ancestors.to_vec();
        chain.push(edge.name.clone());
        if ancestors.contains(&edge.name) {
            return Err(ResolverError::Cycle { chain });
        }

        let mut resolved = Vec::new();

        for state in states {
            let package = self.find(&edge.name)?;
            let range = state.constraint(&edge.name);
            let candidates =
                VersionComparator::sort_descending(package.finder().satisfied_by(&range)?);
            let accepted = state.accepted_linking(&edge.name);

            let mut viable = 0;
            for version in candidates {
                let manifest = self.fetch_details(&package, &version)?;
                if !accepted.iter().any(|l| manifest.supports_linking(*l)) {
                    log::debug!(
                        "Skipping {} {}: no accepted linking type available",
                        edge.name,
                        version
                    );
                    continue;
                }
                viable += 1;

                let required_by = format!("{} {}", edge.name, version);
                let nested = manifest.edges(false);

                let mut next = state.with_assignment(&edge.name, version, package.clone());
                for nested_edge in &nested {
                    next.require(nested_edge, &required_by);
                }

                // Nested edges are folded like root edges
                let mut layer = vec![next];
                for nested_edge in &nested {
                    layer = self.resolve_unit(nested_edge, &layer, &chain)?;
                    if layer.is_empty() {
                        break;
                    }
                }

                resolved.extend(layer);
            }

            if viable == 0 {
                let available = VersionComparator::sort_descending(
                    package.finder().available_versions()?,
                );
                self.dead_end = Some(Conflict::from_state(&edge.name, state, available));
            }
        }

        Ok(resolved)
    }

    /// Repository handle for a package, looked up once per pass
    fn find(&mut self, name: &str) -> ResolverResult<RemotePackage> {
        if let Some(package) = self.packages.get(name) {
            return Ok(package.clone());
        }

        let package = self.repositories.find(name)?;
        self.packages.insert(name.to_string(), package.clone());
        Ok(package)
    }

    /// Manifest of one candidate version, fetched once per pass
    fn fetch_details(
        &mut self,
        package: &RemotePackage,
        version: &Version,
    ) -> ResolverResult<PackageManifest> {
        let key = (package.name().to_string(), version.clone());
        if let Some(manifest) = self.details.get(&key) {
            return Ok(manifest.clone());
        }

        let manifest =
            package
                .request_details(version)
                .map_err(|source| ResolverError::Details {
                    package: package.name().to_string(),
                    version: version.clone(),
                    source,
                })?;
        self.details.insert(key, manifest.clone());
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Linking;
    use crate::repository::MemoryRepository;
    use pretty_assertions::assert_eq;

    fn repository(packages: &[(&str, &str, &[(&str, &str)])]) -> RepositoryCollection {
        let mut memory = MemoryRepository::new("memory");
        for (name, version, deps) in packages {
            let mut manifest = PackageManifest::new(*name).with_version(*version);
            for (dep, spec) in deps.iter() {
                manifest = manifest.with_dependency(dep, spec).unwrap();
            }
            memory.publish(manifest).unwrap();
        }

        let mut collection = RepositoryCollection::new();
        collection.add(memory);
        collection
    }

    fn root(deps: &[(&str, &str)]) -> PackageManifest {
        let mut manifest = PackageManifest::new("org/app");
        for (dep, spec) in deps {
            manifest = manifest.with_dependency(dep, spec).unwrap();
        }
        manifest
    }

    fn v(s: &str) -> Version {
        crate::version::parse_version(s).unwrap()
    }

    #[test]
    fn test_newest_version_is_preferred() {
        let mut resolver = DependencyTreeResolver::new(repository(&[
            ("basic/p", "1.0.0", &[]),
            ("basic/p", "1.2.0", &[]),
            ("basic/p", "1.1.0", &[]),
        ]));

        let states = resolver.resolve(&root(&[("basic/p", "*")]), false).unwrap();
        assert_eq!(states.len(), 3);
        assert_eq!(states[0].version("basic/p"), Some(&v("1.2.0")));
        assert_eq!(states[2].version("basic/p"), Some(&v("1.0.0")));
    }

    #[test]
    fn test_nested_constraints_narrow_the_range() {
        let mut resolver = DependencyTreeResolver::new(repository(&[
            ("basic/p", "1.0.5", &[]),
            ("basic/p", "1.1.0", &[]),
            ("basic/p", "2.0.0", &[]),
            ("basic/a", "1.0.0", &[("basic/p", ">=1.1.0")]),
        ]));

        let states = resolver
            .resolve(&root(&[("basic/p", "^1.0.0"), ("basic/a", "*")]), false)
            .unwrap();

        for state in &states {
            let p = state.version("basic/p").unwrap();
            assert!(VersionComparator::satisfies(p, "^1.0.0 >=1.1.0").unwrap());
            assert!(state.is_complete());
        }
        assert_eq!(states[0].version("basic/p"), Some(&v("1.1.0")));
    }

    #[test]
    fn test_incompatible_ranges_conflict() {
        let mut resolver = DependencyTreeResolver::new(repository(&[
            ("basic/p", "1.0.0", &[]),
            ("basic/p", "2.0.0", &[]),
            ("basic/a", "1.0.0", &[("basic/p", "^2.0.0")]),
        ]));

        let err = resolver
            .resolve(&root(&[("basic/p", "^1.0.0"), ("basic/a", "*")]), false)
            .unwrap_err();

        match err {
            ResolverError::Conflict(conflict) => {
                assert_eq!(conflict.package, "basic/p");
                assert_eq!(conflict.constraint_count(), 2);
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        assert!(!resolver.has_snapshot());
    }

    #[test]
    fn test_cycle_reports_full_chain() {
        let mut resolver = DependencyTreeResolver::new(repository(&[
            ("basic/a", "1.0.0", &[("basic/b", "*")]),
            ("basic/b", "1.0.0", &[("basic/a", "*")]),
        ]));

        let err = resolver.resolve(&root(&[("basic/a", "*")]), false).unwrap_err();
        match err {
            ResolverError::Cycle { ref chain } => {
                assert_eq!(chain, &vec!["basic/a", "basic/b", "basic/a"]);
            }
            ref other => panic!("expected cycle, got {:?}", other),
        }
        assert_eq!(
            err.to_string(),
            "Dependencies loop detected: basic/a -> basic/b -> basic/a"
        );
    }

    #[test]
    fn test_unknown_package() {
        let mut resolver = DependencyTreeResolver::new(repository(&[]));

        let err = resolver
            .resolve(&root(&[("basic/missing", "*")]), false)
            .unwrap_err();
        assert!(matches!(
            err,
            ResolverError::PackageNotFound { ref package, .. } if package == "basic/missing"
        ));
    }

    #[test]
    fn test_linking_constraint_filters_candidates() {
        let mut memory = MemoryRepository::new("memory");
        let mut dynamic_only = PackageManifest::new("basic/p").with_version("2.0.0");
        dynamic_only.linking = vec![Linking::Dynamic];
        memory.publish(dynamic_only).unwrap();
        memory
            .publish(PackageManifest::new("basic/p").with_version("1.0.0"))
            .unwrap();

        let mut collection = RepositoryCollection::new();
        collection.add(memory);
        let mut resolver = DependencyTreeResolver::new(collection);

        let states = resolver
            .resolve(&root(&[("basic/p", "*:static")]), false)
            .unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].version("basic/p"), Some(&v("1.0.0")));
    }

    #[test]
    fn test_dev_dependencies_are_optional() {
        let mut resolver = DependencyTreeResolver::new(repository(&[
            ("basic/p", "1.0.0", &[]),
            ("testing/unit", "1.0.0", &[]),
        ]));
        let manifest = root(&[("basic/p", "*")])
            .with_dev_dependency("testing/unit", "*")
            .unwrap();

        let without = resolver.resolve(&manifest, false).unwrap();
        assert_eq!(without[0].version("testing/unit"), None);

        let with = resolver.resolve(&manifest, true).unwrap();
        assert_eq!(with[0].version("testing/unit"), Some(&v("1.0.0")));
    }

    #[test]
    fn test_snapshot_records_states() {
        let mut resolver = DependencyTreeResolver::new(repository(&[("basic/p", "1.0.0", &[])]));
        assert!(!resolver.has_snapshot());

        let snapshot = resolver.snapshot(&root(&[("basic/p", "*")]), false).unwrap();
        assert_eq!(snapshot.best().version("basic/p"), Some(&v("1.0.0")));
        assert!(resolver.has_snapshot());
    }
}
