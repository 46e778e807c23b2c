//! Repository served over the deplink HTTP API

use super::{RemotePackage, Repository, RepositoryError, RepositoryResult};
use crate::downloader::remote::ApiResponse;
use crate::downloader::RemoteDownloader;
use crate::finder::CachedVersionFinder;
use crate::version::parse_version;
use semver::Version;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct PackageExists {
    exists: bool,
}

#[derive(Debug, Clone)]
pub struct RemoteRepository {
    client: reqwest::blocking::Client,
    base_url: String,
    cache_dir: PathBuf,
}

impl RemoteRepository {
    pub fn new(base_url: &str, cache_dir: &Path) -> Self {
        Self::with_client(reqwest::blocking::Client::new(), base_url, cache_dir)
    }

    pub fn with_client(client: reqwest::blocking::Client, base_url: &str, cache_dir: &Path) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn package_url(&self, name: &str) -> String {
        package_url(&self.base_url, name)
    }
}

fn package_url(base_url: &str, name: &str) -> String {
    format!("{}/api/v1/@{}", base_url, name)
}

fn unreachable(url: &str, reason: impl ToString) -> RepositoryError {
    RepositoryError::Unreachable {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

/// Fetch the published versions of a package
fn fetch_versions(
    client: &reqwest::blocking::Client,
    base_url: &str,
    name: &str,
) -> RepositoryResult<Vec<Version>> {
    let url = format!("{}/versions", package_url(base_url, name));
    let response = client.get(&url).send()?;
    if !response.status().is_success() {
        return Err(unreachable(
            &url,
            format!("status code {}, 200 expected", response.status()),
        ));
    }

    let body = response.text()?;
    let parsed: ApiResponse<Vec<String>> = serde_json::from_str(&body)
        .map_err(|e| unreachable(&url, format!("cannot parse body: {}", e)))?;

    let mut versions = Vec::with_capacity(parsed.data.len());
    for raw in &parsed.data {
        match parse_version(raw) {
            Ok(version) => versions.push(version),
            Err(e) => log::warn!("Skipping version '{}' of {}: {}", raw, name, e),
        }
    }
    Ok(versions)
}

impl Repository for RemoteRepository {
    fn id(&self) -> String {
        format!("remote:{}", self.base_url)
    }

    fn has(&self, name: &str) -> RepositoryResult<bool> {
        let url = self.package_url(name);
        let response = self
            .client
            .request(reqwest::Method::OPTIONS, &url)
            .send()?;

        if !response.status().is_success() {
            return Err(unreachable(
                &url,
                format!("status code {}, 200 expected", response.status()),
            ));
        }

        let body = response.text()?;
        let parsed: ApiResponse<PackageExists> = serde_json::from_str(&body)
            .map_err(|e| unreachable(&url, format!("cannot parse body: {}", e)))?;
        Ok(parsed.data.exists)
    }

    fn get(&self, name: &str) -> RepositoryResult<RemotePackage> {
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let package = name.to_string();
        let finder = CachedVersionFinder::new(move || fetch_versions(&client, &base_url, &package));

        let downloader =
            RemoteDownloader::new(self.client.clone(), &self.base_url, name, &self.cache_dir);

        Ok(RemotePackage::new(
            name,
            self.id(),
            Arc::new(finder),
            Arc::new(downloader),
        ))
    }
}
