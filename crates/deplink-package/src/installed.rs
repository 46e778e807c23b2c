//! Snapshot of the packages installed under `deplinks/`

use crate::lockfile::{LockFile, LockfileError};
use crate::manifest::{PackageManifest, MANIFEST_FILE};
use crate::repository::RemotePackage;
use crate::version::parse_version;
use semver::Version;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Directory holding installed dependencies, relative to the project
pub const INSTALL_DIR: &str = "deplinks";

/// Lock file recording installed versions, inside [`INSTALL_DIR`]
pub const INSTALLED_LOCK: &str = "installed.lock";

#[derive(Debug, Error)]
pub enum InstalledError {
    #[error("Cannot read installed packages lock: {0}")]
    Lock(#[from] LockfileError),

    #[error("Failed to scan installed packages: {0}")]
    Walk(#[from] walkdir::Error),
}

pub type InstalledResult<T> = Result<T, InstalledError>;

/// Package present both on disk and in the installed lock
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub name: String,
    pub version: Version,
    /// Installation directory
    pub path: PathBuf,
    /// Parsed `deplink.json`, when the package ships a readable one
    pub manifest: Option<PackageManifest>,
    /// Repository handle, set for packages installed during this run
    pub remote: Option<RemotePackage>,
}

impl InstalledPackage {
    /// Runtime dependency names declared by the package
    pub fn dependencies(&self) -> Vec<String> {
        self.manifest
            .as_ref()
            .map(PackageManifest::dependency_names)
            .unwrap_or_default()
    }

    /// Absolute include directories
    pub fn include_dirs(&self) -> Vec<PathBuf> {
        match &self.manifest {
            Some(manifest) => manifest.include.iter().map(|dir| self.path.join(dir)).collect(),
            None => vec![self.path.join("include")],
        }
    }
}

#[derive(Debug, Clone)]
struct InstalledSnapshot {
    installed: Vec<InstalledPackage>,
    ambiguous: Vec<String>,
}

/// Reconciles the installed lock with the installation directory
#[derive(Debug, Clone)]
pub struct InstalledPackagesManager {
    project_dir: PathBuf,
    snapshot: Option<InstalledSnapshot>,
}

impl InstalledPackagesManager {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            snapshot: None,
        }
    }

    pub fn install_dir(&self) -> PathBuf {
        self.project_dir.join(INSTALL_DIR)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.install_dir().join(INSTALLED_LOCK)
    }

    /// Installation directory of one package
    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.install_dir().join(name)
    }

    /// Re-read the lock and rescan the installation directory
    pub fn snapshot(&mut self) -> InstalledResult<()> {
        let lock = LockFile::from_file_or_empty(&self.lock_path())?;
        let on_disk = scan_package_dirs(&self.install_dir())?;

        let mut installed = Vec::new();
        let mut ambiguous = BTreeSet::new();

        for (name, raw_version) in lock.packages() {
            if !on_disk.contains(name) {
                log::warn!("Package {} is locked but missing on disk", name);
                ambiguous.insert(name.clone());
                continue;
            }

            let version = match parse_version(raw_version) {
                Ok(version) => version,
                Err(e) => {
                    log::warn!("Package {} has an unreadable locked version: {}", name, e);
                    ambiguous.insert(name.clone());
                    continue;
                }
            };

            let path = self.package_dir(name);
            installed.push(InstalledPackage {
                name: name.clone(),
                version,
                manifest: read_manifest(&path),
                path,
                remote: None,
            });
        }

        for name in on_disk.iter().filter(|name| !lock.contains(name)) {
            log::warn!("Package {} is installed but not locked", name);
            ambiguous.insert(name.clone());
        }

        installed.sort_by(|a, b| a.name.cmp(&b.name));

        self.snapshot = Some(InstalledSnapshot {
            installed,
            ambiguous: ambiguous.into_iter().collect(),
        });
        Ok(())
    }

    /// Take a snapshot unless one exists already
    pub fn ensure_snapshot(&mut self) -> InstalledResult<()> {
        if self.snapshot.is_none() {
            self.snapshot()?;
        }
        Ok(())
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Installed packages sorted by name
    pub fn installed(&self) -> &[InstalledPackage] {
        self.snapshot
            .as_ref()
            .map(|s| s.installed.as_slice())
            .unwrap_or(&[])
    }

    /// Names found in only one of the lock and the installation directory
    pub fn ambiguous(&self) -> &[String] {
        self.snapshot
            .as_ref()
            .map(|s| s.ambiguous.as_slice())
            .unwrap_or(&[])
    }

    pub fn get(&self, name: &str) -> Option<&InstalledPackage> {
        self.installed().iter().find(|p| p.name == name)
    }

    pub fn has_installed(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.ambiguous().iter().any(|n| n == name)
    }
}

/// `org/package` names of the directories two levels below `dir`
fn scan_package_dirs(dir: &Path) -> InstalledResult<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    if !dir.is_dir() {
        return Ok(names);
    }

    for entry in WalkDir::new(dir).min_depth(2).max_depth(2) {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }

        if let Ok(relative) = entry.path().strip_prefix(dir) {
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            names.insert(parts.join("/"));
        }
    }

    Ok(names)
}

pub(crate) fn read_manifest(dir: &Path) -> Option<PackageManifest> {
    let path = dir.join(MANIFEST_FILE);
    if !path.is_file() {
        return None;
    }

    match PackageManifest::from_file(&path) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            log::warn!("Ignoring unreadable manifest {}: {}", path.display(), e);
            None
        }
    }
}
