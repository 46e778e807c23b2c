//! Package repositories and the ordered repository collection

use crate::downloader::{DownloadResult, Downloader};
use crate::finder::VersionFinder;
use crate::manifest::{ManifestError, PackageManifest, RepositorySpec};
use crate::version::VersionError;
use semver::Version;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

mod local;
mod memory;
mod remote;

pub use local::LocalRepository;
pub use memory::MemoryRepository;
pub use remote::RemoteRepository;

/// Repository used when a project declares none of its own
pub const DEFAULT_REMOTE_URL: &str = "https://repo.deplink.org";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Package '{package}' not found in any of {searched} configured repositories")]
    PackageNotFound { package: String, searched: usize },

    #[error("Unknown repository type '{0}', expected 'local' or 'remote'")]
    UnknownType(String),

    #[error("Accessing remote repository endpoint {url} failed: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid version data: {0}")]
    Version(#[from] VersionError),

    #[error("Invalid package manifest: {0}")]
    Manifest(#[from] ManifestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Source of packages
pub trait Repository: Send + Sync {
    /// Identifier used in logs and diagnostics
    fn id(&self) -> String;

    /// Check whether this repository serves the package
    fn has(&self, name: &str) -> RepositoryResult<bool>;

    /// Handle to a package served by this repository
    fn get(&self, name: &str) -> RepositoryResult<RemotePackage>;
}

/// Handle to a package inside a repository.
///
/// Cloning is cheap; clones share the finder and its cached versions.
#[derive(Clone)]
pub struct RemotePackage {
    name: String,
    repository: String,
    finder: Arc<dyn VersionFinder>,
    downloader: Arc<dyn Downloader>,
}

impl RemotePackage {
    pub fn new(
        name: impl Into<String>,
        repository: impl Into<String>,
        finder: Arc<dyn VersionFinder>,
        downloader: Arc<dyn Downloader>,
    ) -> Self {
        Self {
            name: name.into(),
            repository: repository.into(),
            finder,
            downloader,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the repository serving this package
    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn finder(&self) -> &dyn VersionFinder {
        self.finder.as_ref()
    }

    pub fn downloader(&self) -> &dyn Downloader {
        self.downloader.as_ref()
    }

    /// Manifest of one version, without downloading the package
    pub fn request_details(&self, version: &Version) -> DownloadResult<PackageManifest> {
        self.downloader.request_details(version)
    }
}

impl fmt::Debug for RemotePackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemotePackage")
            .field("name", &self.name)
            .field("repository", &self.repository)
            .field("source", &self.downloader.source())
            .finish()
    }
}

/// Ordered list of repositories, first match wins
#[derive(Default)]
pub struct RepositoryCollection {
    repositories: Vec<Box<dyn Repository>>,
}

impl RepositoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, repository: impl Repository + 'static) -> &mut Self {
        self.repositories.push(Box::new(repository));
        self
    }

    pub fn push(&mut self, repository: Box<dyn Repository>) -> &mut Self {
        self.repositories.push(repository);
        self
    }

    /// Check whether any repository serves the package
    pub fn has(&self, name: &str) -> RepositoryResult<bool> {
        for repository in &self.repositories {
            if repository.has(name)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Handle from the first repository serving the package
    pub fn find(&self, name: &str) -> RepositoryResult<RemotePackage> {
        for repository in &self.repositories {
            if repository.has(name)? {
                log::debug!("Package {} found in {}", name, repository.id());
                return repository.get(name);
            }
        }

        Err(RepositoryError::PackageNotFound {
            package: name.to_string(),
            searched: self.repositories.len(),
        })
    }

    pub fn ids(&self) -> Vec<String> {
        self.repositories.iter().map(|r| r.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

/// Builds repositories from manifest declarations
#[derive(Debug, Clone)]
pub struct RepositoryFactory {
    /// Directory relative local repository paths are resolved against
    base_dir: PathBuf,
    /// Root of the downloaded archive cache
    cache_dir: PathBuf,
    client: reqwest::blocking::Client,
}

impl RepositoryFactory {
    pub fn new(base_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            cache_dir: cache_dir.into(),
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Create a single repository from its declaration
    pub fn make(&self, spec: &RepositorySpec) -> RepositoryResult<Box<dyn Repository>> {
        match spec.kind.as_str() {
            "local" => Ok(Box::new(LocalRepository::new(self.base_dir.join(&spec.src)))),
            "remote" => Ok(Box::new(RemoteRepository::with_client(
                self.client.clone(),
                &spec.src,
                &self.cache_dir,
            ))),
            other => Err(RepositoryError::UnknownType(other.to_string())),
        }
    }

    /// Project repositories first, then the configured defaults
    pub fn collection(
        &self,
        project: &[RepositorySpec],
        defaults: &[RepositorySpec],
    ) -> RepositoryResult<RepositoryCollection> {
        let mut collection = RepositoryCollection::new();
        for spec in project.iter().chain(defaults) {
            collection.push(self.make(spec)?);
        }
        Ok(collection)
    }
}
