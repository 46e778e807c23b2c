//! Package transport: manifest lookups and package downloads

use crate::manifest::{ManifestError, PackageManifest};
use semver::Version;
use std::path::{Path, PathBuf};
use thiserror::Error;

mod local;
mod memory;
pub(crate) mod remote;

pub use local::LocalDownloader;
pub use memory::MemoryDownloader;
pub use remote::{archive_cache_dir, RemoteDownloader};

pub type DownloadResult<T> = Result<T, DownloadError>;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Cannot point to local package '{0}' (directory does not exist)")]
    SourceMissing(PathBuf),

    #[error("Version {version} of package '{package}' is not available")]
    Unavailable { package: String, version: String },

    #[error("Accessing remote repository endpoint {url} failed: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid package manifest: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Invalid package archive {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    #[error("Failed to traverse package directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl DownloadError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    pub fn unreachable(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unreachable {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Receives download progress in percent (0-100)
pub trait DownloadProgress {
    fn progress(&mut self, percent: u8);
}

impl<F: FnMut(u8)> DownloadProgress for F {
    fn progress(&mut self, percent: u8) {
        self(percent)
    }
}

/// Fetches package metadata and files from one source
pub trait Downloader: Send + Sync {
    /// Human readable origin (directory or URL)
    fn source(&self) -> String;

    /// Fetch only the manifest of the given version
    fn request_details(&self, version: &Version) -> DownloadResult<PackageManifest>;

    /// Place the package files into `dest` and return it
    fn download(
        &self,
        version: &Version,
        dest: &Path,
        progress: &mut dyn DownloadProgress,
    ) -> DownloadResult<PathBuf>;
}

/// Percentage of `done` out of `total`, scaled into `[from, to]`
pub(crate) fn scaled_percent(done: usize, total: usize, from: u8, to: u8) -> u8 {
    if total == 0 {
        return to;
    }
    let span = usize::from(to.saturating_sub(from));
    let scaled = usize::from(from) + done.min(total) * span / total;
    u8::try_from(scaled).unwrap_or(to)
}
