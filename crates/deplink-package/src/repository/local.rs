//! Repository laid out as `<root>/<org>/<package>/deplink.json`

use super::{RemotePackage, Repository, RepositoryError, RepositoryResult};
use crate::downloader::LocalDownloader;
use crate::finder::LocalVersionFinder;
use crate::manifest::{PackageManifest, MANIFEST_FILE};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn package_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Repository for LocalRepository {
    fn id(&self) -> String {
        format!("local:{}", self.root.display())
    }

    fn has(&self, name: &str) -> RepositoryResult<bool> {
        Ok(self.package_dir(name).join(MANIFEST_FILE).is_file())
    }

    fn get(&self, name: &str) -> RepositoryResult<RemotePackage> {
        let dir = self.package_dir(name);
        if !dir.join(MANIFEST_FILE).is_file() {
            return Err(RepositoryError::PackageNotFound {
                package: name.to_string(),
                searched: 1,
            });
        }

        // The manifest is re-read on every get so edits to in-progress packages show up
        let manifest = PackageManifest::from_dir(&dir)?;
        let finder = LocalVersionFinder::from_manifest(&manifest)?;

        Ok(RemotePackage::new(
            name,
            self.id(),
            Arc::new(finder),
            Arc::new(LocalDownloader::new(dir)),
        ))
    }
}
