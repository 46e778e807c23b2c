//! Repository holding package manifests in memory

use super::{RemotePackage, Repository, RepositoryError, RepositoryResult};
use crate::downloader::MemoryDownloader;
use crate::finder::{StaticVersionFinder, DEFAULT_LOCAL_VERSION};
use crate::manifest::PackageManifest;
use crate::version::parse_version;
use semver::Version;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct MemoryPackage {
    /// Published versions, in publishing order
    versions: Vec<Version>,
    downloader: MemoryDownloader,
}

/// Repository for packages whose metadata is already at hand
#[derive(Debug, Clone)]
pub struct MemoryRepository {
    id: String,
    packages: BTreeMap<String, MemoryPackage>,
}

impl MemoryRepository {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            packages: BTreeMap::new(),
        }
    }

    /// Publish one version of a package, described by its manifest
    pub fn publish(&mut self, manifest: PackageManifest) -> RepositoryResult<&mut Self> {
        let version = match manifest.parsed_version()? {
            Some(version) => version,
            None => parse_version(DEFAULT_LOCAL_VERSION)?,
        };

        let name = manifest.name.clone();
        let package = self
            .packages
            .entry(name.clone())
            .or_insert_with(|| MemoryPackage {
                versions: Vec::new(),
                downloader: MemoryDownloader::new(name),
            });

        if !package.versions.contains(&version) {
            package.versions.push(version.clone());
        }
        package.downloader = package.downloader.clone().with_manifest(version, manifest);
        Ok(self)
    }

    /// Attach a file to every downloaded copy of the package
    pub fn add_file(&mut self, name: &str, path: &str, content: &str) -> RepositoryResult<&mut Self> {
        let package = self.package_mut(name)?;
        package.downloader = package.downloader.clone().with_file(path, content);
        Ok(self)
    }

    /// Make downloads of the package fail
    pub fn break_downloads(&mut self, name: &str) -> RepositoryResult<&mut Self> {
        let package = self.package_mut(name)?;
        package.downloader = package.downloader.clone().broken();
        Ok(self)
    }

    fn package_mut(&mut self, name: &str) -> RepositoryResult<&mut MemoryPackage> {
        self.packages
            .get_mut(name)
            .ok_or_else(|| RepositoryError::PackageNotFound {
                package: name.to_string(),
                searched: 1,
            })
    }
}

impl Repository for MemoryRepository {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn has(&self, name: &str) -> RepositoryResult<bool> {
        Ok(self.packages.contains_key(name))
    }

    fn get(&self, name: &str) -> RepositoryResult<RemotePackage> {
        let package = self
            .packages
            .get(name)
            .ok_or_else(|| RepositoryError::PackageNotFound {
                package: name.to_string(),
                searched: 1,
            })?;

        Ok(RemotePackage::new(
            name,
            self.id(),
            Arc::new(StaticVersionFinder::new(package.versions.clone())),
            Arc::new(package.downloader.clone()),
        ))
    }
}
