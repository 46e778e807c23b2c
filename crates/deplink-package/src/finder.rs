//! Candidate version enumeration per package

use crate::manifest::PackageManifest;
use crate::repository::RepositoryResult;
use crate::version::{parse_version, VersionComparator};
use semver::Version;
use std::sync::OnceLock;

/// Version reported by local packages that declare none.
///
/// Local sources always look newer than what is installed, so an
/// unpublished package gets re-synchronised on every install.
pub const DEFAULT_LOCAL_VERSION: &str = "0.1.0";

/// Lists the versions a source offers for one package
pub trait VersionFinder: Send + Sync {
    /// Versions in source order (not sorted)
    fn available_versions(&self) -> RepositoryResult<Vec<Version>>;

    /// Versions matching a range expression, in source order
    fn satisfied_by(&self, range: &str) -> RepositoryResult<Vec<Version>> {
        let versions = self.available_versions()?;
        Ok(VersionComparator::satisfied_by(&versions, range)?)
    }

    fn has(&self, version: &Version) -> RepositoryResult<bool> {
        Ok(self
            .available_versions()?
            .iter()
            .any(|v| VersionComparator::equal(v, version)))
    }

    /// Versions newer than the given one, in source order
    fn greater_than(&self, version: &Version) -> RepositoryResult<Vec<Version>> {
        Ok(self
            .available_versions()?
            .into_iter()
            .filter(|v| VersionComparator::greater_than(v, version))
            .collect())
    }

    /// Newest stable version, falling back to the newest pre-release
    fn latest(&self) -> RepositoryResult<Option<Version>> {
        let sorted = VersionComparator::sort_descending(self.available_versions()?);
        let stable = sorted.iter().find(|v| VersionComparator::is_stable(v)).cloned();
        Ok(stable.or_else(|| sorted.first().cloned()))
    }
}

/// Finder for a package read straight from disk (exactly one version)
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVersionFinder {
    version: Version,
}

impl LocalVersionFinder {
    pub fn new(version: Version) -> Self {
        Self { version }
    }

    /// Use the manifest version, or the local default when it declares none
    pub fn from_manifest(manifest: &PackageManifest) -> RepositoryResult<Self> {
        let version = match manifest.parsed_version()? {
            Some(version) => version,
            None => parse_version(DEFAULT_LOCAL_VERSION)?,
        };
        Ok(Self::new(version))
    }
}

impl VersionFinder for LocalVersionFinder {
    fn available_versions(&self) -> RepositoryResult<Vec<Version>> {
        Ok(vec![self.version.clone()])
    }
}

/// Finder over a fixed version list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticVersionFinder {
    versions: Vec<Version>,
}

impl StaticVersionFinder {
    pub fn new(versions: Vec<Version>) -> Self {
        Self { versions }
    }
}

impl VersionFinder for StaticVersionFinder {
    fn available_versions(&self) -> RepositoryResult<Vec<Version>> {
        Ok(self.versions.clone())
    }
}

/// Finder that fetches the version list once and reuses it afterwards
pub struct CachedVersionFinder<F> {
    fetch: F,
    cache: OnceLock<Vec<Version>>,
}

impl<F> CachedVersionFinder<F>
where
    F: Fn() -> RepositoryResult<Vec<Version>> + Send + Sync,
{
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            cache: OnceLock::new(),
        }
    }
}

impl<F> VersionFinder for CachedVersionFinder<F>
where
    F: Fn() -> RepositoryResult<Vec<Version>> + Send + Sync,
{
    fn available_versions(&self) -> RepositoryResult<Vec<Version>> {
        if let Some(versions) = self.cache.get() {
            return Ok(versions.clone());
        }

        let versions = (self.fetch)()?;
        // Another thread may have filled the cache meanwhile, both lists are equal
        let _ = self.cache.set(versions.clone());
        Ok(versions)
    }
}
