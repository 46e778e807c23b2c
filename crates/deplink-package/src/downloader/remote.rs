//! Fetches packages from a remote repository over HTTP

use super::{scaled_percent, DownloadError, DownloadProgress, DownloadResult, Downloader};
use crate::manifest::{PackageManifest, MANIFEST_FILE};
use flate2::read::GzDecoder;
use semver::Version;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tar::Archive;

/// Share of the progress bar spent on the transfer, the rest is extraction
const TRANSFER_SHARE: u8 = 80;

/// `{"data": ...}` envelope used by every repository endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub data: T,
}

/// Cache directory for the archives of one package from one repository
pub fn archive_cache_dir(cache_root: &Path, base_url: &str, package: &str) -> PathBuf {
    let digest = Sha256::digest(base_url.as_bytes());
    let key = format!("{:x}", digest);
    cache_root.join("remote").join(package).join(&key[..16])
}

/// Downloader for a package served by a remote repository
#[derive(Debug, Clone)]
pub struct RemoteDownloader {
    client: reqwest::blocking::Client,
    base_url: String,
    package: String,
    cache_dir: PathBuf,
}

impl RemoteDownloader {
    pub fn new(
        client: reqwest::blocking::Client,
        base_url: &str,
        package: &str,
        cache_root: &Path,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            package: package.to_string(),
            cache_dir: archive_cache_dir(cache_root, base_url.trim_end_matches('/'), package),
        }
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!("{}/api/v1/@{}/{}", self.base_url, self.package, suffix)
    }

    /// Location of the cached archive for a version
    pub fn archive_path(&self, version: &Version) -> PathBuf {
        self.cache_dir.join(format!("{}.tar.gz", version))
    }

    /// Read the manifest out of an already cached archive
    fn cached_details(&self, version: &Version) -> Option<PackageManifest> {
        let path = self.archive_path(version);
        if !path.is_file() {
            return None;
        }

        match read_archive_manifest(&path) {
            Ok(manifest) => manifest,
            Err(e) => {
                log::debug!("Ignoring cached archive {}: {}", path.display(), e);
                None
            }
        }
    }

    fn fetch_archive(
        &self,
        version: &Version,
        progress: &mut dyn DownloadProgress,
    ) -> DownloadResult<PathBuf> {
        let archive = self.archive_path(version);
        if archive.is_file() {
            progress.progress(TRANSFER_SHARE);
            return Ok(archive);
        }

        let url = self.endpoint(&format!("{}/download", version));
        log::info!("Downloading {} {} from {}", self.package, version, url);

        let mut response = self.client.get(&url).send()?;
        if !response.status().is_success() {
            return Err(DownloadError::unreachable(
                &url,
                format!("status code {}, 200 expected", response.status()),
            ));
        }

        fs::create_dir_all(&self.cache_dir).map_err(|e| DownloadError::io(&self.cache_dir, e))?;
        let partial = archive.with_extension("part");
        let mut file = File::create(&partial).map_err(|e| DownloadError::io(&partial, e))?;

        let total = response
            .content_length()
            .and_then(|len| usize::try_from(len).ok())
            .unwrap_or(0);
        let mut received = 0usize;
        let mut buffer = [0u8; 8192];

        loop {
            let read = response
                .read(&mut buffer)
                .map_err(|e| DownloadError::unreachable(&url, e))?;
            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read])
                .map_err(|e| DownloadError::io(&partial, e))?;
            received += read;
            if total > 0 {
                progress.progress(scaled_percent(received, total, 0, TRANSFER_SHARE));
            }
        }

        drop(file);
        fs::rename(&partial, &archive).map_err(|e| DownloadError::io(&archive, e))?;
        Ok(archive)
    }
}

impl Downloader for RemoteDownloader {
    fn source(&self) -> String {
        self.endpoint("download")
    }

    fn request_details(&self, version: &Version) -> DownloadResult<PackageManifest> {
        if let Some(manifest) = self.cached_details(version) {
            return Ok(manifest);
        }

        let url = self.endpoint(&format!("{}/{}", version, MANIFEST_FILE));
        let response = self.client.get(&url).send()?;
        if !response.status().is_success() {
            return Err(DownloadError::unreachable(
                &url,
                format!("status code {}, 200 expected", response.status()),
            ));
        }

        let body = response.text()?;
        let parsed: ApiResponse<PackageManifest> = serde_json::from_str(&body)
            .map_err(|e| DownloadError::unreachable(&url, format!("cannot parse body: {}", e)))?;
        parsed.data.validate()?;
        Ok(parsed.data)
    }

    fn download(
        &self,
        version: &Version,
        dest: &Path,
        progress: &mut dyn DownloadProgress,
    ) -> DownloadResult<PathBuf> {
        let archive = self.fetch_archive(version, progress)?;
        extract_archive(&archive, dest, progress)?;
        progress.progress(100);
        Ok(dest.to_path_buf())
    }
}

fn open_archive(path: &Path) -> DownloadResult<Archive<GzDecoder<File>>> {
    let file = File::open(path).map_err(|e| DownloadError::io(path, e))?;
    Ok(Archive::new(GzDecoder::new(file)))
}

fn archive_error(path: &Path, error: impl ToString) -> DownloadError {
    DownloadError::Archive {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}

fn read_archive_manifest(path: &Path) -> DownloadResult<Option<PackageManifest>> {
    let mut archive = open_archive(path)?;
    let entries = archive.entries().map_err(|e| archive_error(path, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| archive_error(path, e))?;
        let entry_path = entry.path().map_err(|e| archive_error(path, e))?.into_owned();
        if entry_path.strip_prefix(".").unwrap_or(&entry_path) == Path::new(MANIFEST_FILE) {
            let mut content = String::new();
            entry
                .read_to_string(&mut content)
                .map_err(|e| archive_error(path, e))?;
            return Ok(Some(PackageManifest::from_str(&content)?));
        }
    }

    Ok(None)
}

/// Unpack a `.tar.gz` archive, reporting the last fifth of the progress
fn extract_archive(
    path: &Path,
    dest: &Path,
    progress: &mut dyn DownloadProgress,
) -> DownloadResult<()> {
    let total = open_archive(path)?
        .entries()
        .map_err(|e| archive_error(path, e))?
        .count();

    fs::create_dir_all(dest).map_err(|e| DownloadError::io(dest, e))?;

    let mut archive = open_archive(path)?;
    let entries = archive.entries().map_err(|e| archive_error(path, e))?;
    for (index, entry) in entries.enumerate() {
        progress.progress(scaled_percent(index, total, TRANSFER_SHARE, 100));
        let mut entry = entry.map_err(|e| archive_error(path, e))?;
        entry.unpack_in(dest).map_err(|e| archive_error(path, e))?;
    }

    Ok(())
}
