//! Copies packages from a directory on disk

use super::{scaled_percent, DownloadError, DownloadProgress, DownloadResult, Downloader};
use crate::installed::INSTALL_DIR;
use crate::manifest::PackageManifest;
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Downloader for a package living in a local repository
#[derive(Debug, Clone)]
pub struct LocalDownloader {
    src: PathBuf,
}

impl LocalDownloader {
    pub fn new(src: impl Into<PathBuf>) -> Self {
        Self { src: src.into() }
    }

    /// Files to copy, relative to the package root
    fn list_files(&self) -> DownloadResult<Vec<PathBuf>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(&self.src)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            // Dependencies installed inside the source package are not part of it
            .filter_entry(|e| !(e.depth() == 1 && e.file_name() == INSTALL_DIR));

        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() {
                if let Ok(relative) = entry.path().strip_prefix(&self.src) {
                    files.push(relative.to_path_buf());
                }
            }
        }

        Ok(files)
    }
}

impl Downloader for LocalDownloader {
    fn source(&self) -> String {
        self.src.display().to_string()
    }

    fn request_details(&self, _version: &Version) -> DownloadResult<PackageManifest> {
        if !self.src.is_dir() {
            return Err(DownloadError::SourceMissing(self.src.clone()));
        }
        Ok(PackageManifest::from_dir(&self.src)?)
    }

    fn download(
        &self,
        _version: &Version,
        dest: &Path,
        progress: &mut dyn DownloadProgress,
    ) -> DownloadResult<PathBuf> {
        if !self.src.is_dir() {
            return Err(DownloadError::SourceMissing(self.src.clone()));
        }

        let files = self.list_files()?;
        fs::create_dir_all(dest).map_err(|e| DownloadError::io(dest, e))?;

        for (copied, file) in files.iter().enumerate() {
            progress.progress(scaled_percent(copied, files.len(), 0, 100));

            let from = self.src.join(file);
            let to = dest.join(file);
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent).map_err(|e| DownloadError::io(parent, e))?;
            }
            fs::copy(&from, &to).map_err(|e| DownloadError::io(&from, e))?;
        }

        progress.progress(100);
        Ok(dest.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_request_details_reads_manifest() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("deplink.json"),
            r#"{"name": "basic/hello", "version": "1.0.0"}"#,
        );

        let downloader = LocalDownloader::new(dir.path());
        let manifest = downloader.request_details(&Version::new(1, 0, 0)).unwrap();
        assert_eq!(manifest.name, "basic/hello");
    }

    #[test]
    fn test_download_copies_files_and_skips_installed_dependencies() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write(&src.path().join("deplink.json"), r#"{"name": "basic/hello"}"#);
        write(&src.path().join("include/hello.h"), "#pragma once");
        write(&src.path().join("src/hello.c"), "int main() {}");
        write(&src.path().join("deplinks/other/dep/deplink.json"), "{}");

        let target = dest.path().join("basic/hello");
        let mut reported = Vec::new();
        let result = LocalDownloader::new(src.path())
            .download(&Version::new(0, 1, 0), &target, &mut |p: u8| reported.push(p))
            .unwrap();

        assert_eq!(result, target);
        assert!(target.join("include/hello.h").is_file());
        assert!(target.join("src/hello.c").is_file());
        assert!(!target.join("deplinks").exists());
        assert_eq!(reported.last(), Some(&100));
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let dir = TempDir::new().unwrap();
        let downloader = LocalDownloader::new(dir.path().join("missing"));

        let err = downloader
            .download(&Version::new(0, 1, 0), dir.path(), &mut |_: u8| {})
            .unwrap_err();
        assert!(matches!(err, DownloadError::SourceMissing(_)));
    }
}
