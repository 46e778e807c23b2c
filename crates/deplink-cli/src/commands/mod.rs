//! Command implementations

pub mod init;
pub mod install;
pub mod list;
pub mod order;

use anyhow::{bail, Context, Result};
use deplink_config::{Config, ConfigLoader};
use deplink_package::{
    DependencyTreeResolver, PackageManifest, RepositoryCollection, RepositoryFactory,
    RepositorySpec, MANIFEST_FILE,
};
use std::path::{Path, PathBuf};

/// Project located from a working directory
#[derive(Debug)]
pub struct Project {
    /// Directory holding deplink.json
    pub dir: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: PackageManifest,
}

impl Project {
    /// Find and parse the closest deplink.json
    pub fn open(start_dir: &Path) -> Result<Self> {
        let manifest_path = find_manifest(start_dir)?;
        let manifest = PackageManifest::from_file(&manifest_path)
            .with_context(|| format!("Failed to read {}", manifest_path.display()))?;
        let dir = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        log::debug!("Using manifest {}", manifest_path.display());
        Ok(Self {
            dir,
            manifest_path,
            manifest,
        })
    }

    /// Project repositories followed by the configured defaults
    pub fn repositories(&self, config: &Config) -> Result<RepositoryCollection> {
        let defaults: Vec<RepositorySpec> = config
            .repositories
            .iter()
            .map(|r| RepositorySpec::new(&r.kind, &r.src))
            .collect();

        let collection = RepositoryFactory::new(&self.dir, &config.cache_dir)
            .collection(&self.manifest.repositories, &defaults)
            .context("Invalid repository declaration")?;

        log::debug!("Repositories: {}", collection.ids().join(", "));
        Ok(collection)
    }

    pub fn resolver(&self, config: &Config) -> Result<DependencyTreeResolver> {
        Ok(DependencyTreeResolver::new(self.repositories(config)?))
    }
}

/// Load the user configuration
pub fn load_config() -> Result<Config> {
    ConfigLoader::new()
        .load()
        .context("Failed to load ~/.deplink/config.toml")
}

/// Walk up from `start_dir` looking for deplink.json
pub fn find_manifest(start_dir: &Path) -> Result<PathBuf> {
    let mut current = start_dir
        .canonicalize()
        .unwrap_or_else(|_| start_dir.to_path_buf());

    loop {
        let manifest_path = current.join(MANIFEST_FILE);
        if manifest_path.exists() {
            return Ok(manifest_path);
        }

        if !current.pop() {
            break;
        }
    }

    bail!(
        "Could not find {} in {} or any parent directory",
        MANIFEST_FILE,
        start_dir.display()
    )
}

/// Green checkmark
pub fn green_check() -> &'static str {
    "\u{2713}"
}
