//! Deplink package management
//!
//! Dependency resolution and installation for native C/C++ packages:
//! deplink.json manifests, version ranges, repositories, the backtracking
//! resolver, the installer and the build order of installed packages.

pub mod build_order;
pub mod downloader;
pub mod finder;
pub mod installed;
pub mod installer;
pub mod lockfile;
pub mod manifest;
pub mod repository;
pub mod resolver;
pub mod version;

pub use build_order::{BuildOrderError, HierarchyFinder};
pub use downloader::{
    DownloadError, DownloadProgress, Downloader, LocalDownloader, MemoryDownloader,
    RemoteDownloader,
};
pub use finder::{CachedVersionFinder, LocalVersionFinder, StaticVersionFinder, VersionFinder};
pub use installed::{InstalledError, InstalledPackage, InstalledPackagesManager, INSTALL_DIR};
pub use installer::{
    merge_installed, InstallError, InstallPlan, InstallProgress, Installer, MissingPackage,
    NoProgress, OutdatedPackage,
};
pub use lockfile::{LockFile, LockfileError};
pub use manifest::{
    DependencyEdge, DependencySpec, Linking, ManifestError, PackageManifest, PackageType,
    RepositorySpec, MANIFEST_FILE,
};
pub use repository::{
    LocalRepository, MemoryRepository, RemotePackage, RemoteRepository, Repository,
    RepositoryCollection, RepositoryError, RepositoryFactory,
};
pub use resolver::{
    Conflict, DependencyTreeResolver, ResolutionSnapshot, ResolutionState, ResolverError,
};
pub use version::{parse_version, VersionComparator, VersionError, VersionRange};

/// Package management errors
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Lockfile(#[from] LockfileError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    Installed(#[from] InstalledError),

    #[error(transparent)]
    BuildOrder(#[from] BuildOrderError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PackageError>;
