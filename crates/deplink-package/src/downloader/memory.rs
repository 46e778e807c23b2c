//! Serves packages from manifests held in memory

use super::{DownloadError, DownloadProgress, DownloadResult, Downloader};
use crate::manifest::{PackageManifest, MANIFEST_FILE};
use semver::Version;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Downloader backed by one manifest per version.
///
/// `download` materialises the manifest plus any registered files.
#[derive(Debug, Clone, Default)]
pub struct MemoryDownloader {
    package: String,
    manifests: BTreeMap<Version, PackageManifest>,
    files: BTreeMap<String, String>,
    broken: bool,
}

impl MemoryDownloader {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Default::default()
        }
    }

    pub fn with_manifest(mut self, version: Version, manifest: PackageManifest) -> Self {
        self.manifests.insert(version, manifest);
        self
    }

    /// Extra file written on download, path relative to the package root
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Make every download fail while metadata stays available
    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    fn manifest(&self, version: &Version) -> DownloadResult<&PackageManifest> {
        self.manifests
            .get(version)
            .ok_or_else(|| DownloadError::Unavailable {
                package: self.package.clone(),
                version: version.to_string(),
            })
    }
}

impl Downloader for MemoryDownloader {
    fn source(&self) -> String {
        format!("memory:{}", self.package)
    }

    fn request_details(&self, version: &Version) -> DownloadResult<PackageManifest> {
        self.manifest(version).cloned()
    }

    fn download(
        &self,
        version: &Version,
        dest: &Path,
        progress: &mut dyn DownloadProgress,
    ) -> DownloadResult<PathBuf> {
        let manifest = self.manifest(version)?;
        if self.broken {
            return Err(DownloadError::unreachable(self.source(), "download refused"));
        }

        fs::create_dir_all(dest).map_err(|e| DownloadError::io(dest, e))?;
        progress.progress(0);

        let manifest_path = dest.join(MANIFEST_FILE);
        let json = manifest.to_string()?;
        fs::write(&manifest_path, json).map_err(|e| DownloadError::io(&manifest_path, e))?;

        for (relative, content) in &self.files {
            let path = dest.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| DownloadError::io(parent, e))?;
            }
            fs::write(&path, content).map_err(|e| DownloadError::io(&path, e))?;
        }

        progress.progress(100);
        Ok(dest.to_path_buf())
    }
}
