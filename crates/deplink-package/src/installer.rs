//! Installation of resolved dependencies into `deplinks/`
//!
//! The installer compares the preferred resolution state with the
//! installed snapshot and then removes ambiguous packages, updates
//! outdated ones and downloads the missing ones, in that order.

use crate::downloader::DownloadError;
use crate::installed::{read_manifest, InstalledError, InstalledPackage, InstalledPackagesManager};
use crate::lockfile::{LockFile, LockfileError};
use crate::manifest::PackageManifest;
use crate::repository::RemotePackage;
use crate::resolver::{DependencyTreeResolver, ResolutionState, ResolverError};
use crate::version::VersionComparator;
use semver::Version;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

/// Header including every public header of the installed packages
pub const AUTOLOAD_HEADER: &str = "autoload.h";

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Installation cancelled")]
    Cancelled,

    #[error("Failed to download '{package}' ({}): {source}", version_change(.from, .to))]
    Download {
        package: String,
        from: Option<Version>,
        to: Version,
        #[source]
        source: DownloadError,
    },

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    Installed(#[from] InstalledError),

    #[error("Cannot write installed packages lock: {0}")]
    Lock(#[from] LockfileError),

    #[error("Failed to scan include directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl InstallError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }
}

fn version_change(from: &Option<Version>, to: &Version) -> String {
    match from {
        Some(from) => format!("{} -> {}", from, to),
        None => to.to_string(),
    }
}

pub type InstallResult<T> = Result<T, InstallError>;

/// Resolved package absent from the installed set
#[derive(Debug, Clone)]
pub struct MissingPackage {
    pub name: String,
    pub version: Version,
    pub remote: RemotePackage,
}

/// Installed package whose resolved version differs
#[derive(Debug, Clone)]
pub struct OutdatedPackage {
    pub name: String,
    pub from: Version,
    pub to: Version,
    pub remote: RemotePackage,
}

/// Work needed to bring `deplinks/` in line with a resolution.
///
/// Each list is sorted by package name.
#[derive(Debug, Clone, Default)]
pub struct InstallPlan {
    pub installs: Vec<MissingPackage>,
    pub updates: Vec<OutdatedPackage>,
    pub removals: Vec<String>,
}

impl InstallPlan {
    /// Classify the resolved packages against the installed ones.
    ///
    /// Only ambiguous packages are removed; an installed package missing
    /// from the resolution is left alone.
    pub fn classify(
        resolved: &ResolutionState,
        installed: &[InstalledPackage],
        ambiguous: &[String],
    ) -> Self {
        let installed: BTreeMap<&str, &Version> = installed
            .iter()
            .map(|p| (p.name.as_str(), &p.version))
            .collect();

        let mut plan = InstallPlan {
            removals: ambiguous.to_vec(),
            ..Default::default()
        };

        for (name, assignment) in resolved.assignments() {
            match installed.get(name.as_str()) {
                Some(current) if VersionComparator::equal(current, &assignment.version) => {}
                Some(current) => plan.updates.push(OutdatedPackage {
                    name: name.clone(),
                    from: (*current).clone(),
                    to: assignment.version.clone(),
                    remote: assignment.package.clone(),
                }),
                None => plan.installs.push(MissingPackage {
                    name: name.clone(),
                    version: assignment.version.clone(),
                    remote: assignment.package.clone(),
                }),
            }
        }

        plan.installs.sort_by(|a, b| a.name.cmp(&b.name));
        plan.updates.sort_by(|a, b| a.name.cmp(&b.name));
        plan.removals.sort();
        plan.removals.dedup();
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.installs.is_empty() && self.updates.is_empty() && self.removals.is_empty()
    }
}

/// Receives installation events.
///
/// Every method defaults to doing nothing.
#[allow(unused_variables)]
pub trait InstallProgress {
    fn before_installation(&mut self, installs: usize, updates: usize, removals: usize) {}

    fn removing_started(&mut self, name: &str) {}
    fn removing_progress(&mut self, name: &str, percent: u8) {}
    fn removing_succeed(&mut self, name: &str) {}
    fn removing_failed(&mut self, name: &str, error: &InstallError) {}

    fn updating_started(&mut self, name: &str, from: &Version, to: &Version) {}
    fn updating_progress(&mut self, name: &str, from: &Version, to: &Version, percent: u8) {}
    fn updating_succeed(&mut self, name: &str, from: &Version, to: &Version) {}
    fn updating_failed(&mut self, name: &str, from: &Version, to: &Version, error: &InstallError) {}

    fn installing_started(&mut self, name: &str, version: &Version) {}
    fn installing_progress(&mut self, name: &str, version: &Version, percent: u8) {}
    fn installing_succeed(&mut self, name: &str, version: &Version) {}
    fn installing_failed(&mut self, name: &str, version: &Version, error: &InstallError) {}

    fn after_installation(&mut self) {}
}

/// Progress sink ignoring every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl InstallProgress for NoProgress {}

/// Drives one installation of a project's dependencies
pub struct Installer {
    resolver: DependencyTreeResolver,
    installed: InstalledPackagesManager,
    manifest: PackageManifest,
    include_dev: bool,
    cancelled: Arc<AtomicBool>,
}

impl Installer {
    pub fn new(
        resolver: DependencyTreeResolver,
        installed: InstalledPackagesManager,
        manifest: PackageManifest,
        include_dev: bool,
    ) -> Self {
        Self {
            resolver,
            installed,
            manifest,
            include_dev,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the installation before the next package once set
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn resolver(&self) -> &DependencyTreeResolver {
        &self.resolver
    }

    pub fn installed(&self) -> &InstalledPackagesManager {
        &self.installed
    }

    /// Run the missing snapshots and classify the dependencies
    pub fn plan(&mut self) -> InstallResult<InstallPlan> {
        if !self.resolver.has_snapshot() {
            self.resolver.snapshot(&self.manifest, self.include_dev)?;
        }
        self.installed.ensure_snapshot()?;

        let resolved = match self.resolver.resolved() {
            Some(snapshot) => snapshot.best(),
            None => return Ok(InstallPlan::default()),
        };

        Ok(InstallPlan::classify(
            resolved,
            self.installed.installed(),
            self.installed.ambiguous(),
        ))
    }

    /// Execute the plan; returns the newly installed and updated packages
    pub fn install(
        &mut self,
        progress: &mut dyn InstallProgress,
    ) -> InstallResult<Vec<InstalledPackage>> {
        let plan = self.plan()?;
        log::info!(
            "Installing {} package(s), updating {}, removing {}",
            plan.installs.len(),
            plan.updates.len(),
            plan.removals.len()
        );
        progress.before_installation(plan.installs.len(), plan.updates.len(), plan.removals.len());

        for name in &plan.removals {
            self.check_cancelled()?;
            self.remove_package(name, progress)?;
        }

        for update in &plan.updates {
            self.check_cancelled()?;
            self.update_package(update, progress)?;
        }

        for install in &plan.installs {
            self.check_cancelled()?;
            self.install_package(install, progress)?;
        }

        progress.after_installation();

        let installs = plan
            .installs
            .iter()
            .map(|p| self.installed_package(&p.name, &p.version, &p.remote));
        let updates = plan
            .updates
            .iter()
            .map(|p| self.installed_package(&p.name, &p.to, &p.remote));
        Ok(installs.chain(updates).collect())
    }

    fn check_cancelled(&self) -> InstallResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            log::info!("Installation cancelled");
            return Err(InstallError::Cancelled);
        }
        Ok(())
    }

    fn remove_package(&self, name: &str, progress: &mut dyn InstallProgress) -> InstallResult<()> {
        progress.removing_started(name);
        log::info!("Removing {}", name);

        if let Err(error) = remove_dir(&self.installed.package_dir(name)) {
            progress.removing_failed(name, &error);
            return Err(error);
        }

        progress.removing_progress(name, 100);
        progress.removing_succeed(name);
        Ok(())
    }

    fn update_package(
        &self,
        update: &OutdatedPackage,
        progress: &mut dyn InstallProgress,
    ) -> InstallResult<()> {
        let (name, from, to) = (update.name.as_str(), &update.from, &update.to);
        progress.updating_started(name, from, to);
        log::info!("Updating {} ({} -> {})", name, from, to);

        let dir = self.installed.package_dir(name);
        let result = remove_dir(&dir).and_then(|()| {
            let mut forward = |percent: u8| progress.updating_progress(name, from, to, percent);
            update
                .remote
                .downloader()
                .download(to, &dir, &mut forward)
                .map_err(|source| InstallError::Download {
                    package: name.to_string(),
                    from: Some(from.clone()),
                    to: to.clone(),
                    source,
                })
        });

        match result {
            Ok(_) => {
                progress.updating_succeed(name, from, to);
                Ok(())
            }
            Err(error) => {
                progress.updating_failed(name, from, to, &error);
                Err(error)
            }
        }
    }

    fn install_package(
        &self,
        install: &MissingPackage,
        progress: &mut dyn InstallProgress,
    ) -> InstallResult<()> {
        let (name, version) = (install.name.as_str(), &install.version);
        progress.installing_started(name, version);
        log::info!("Installing {} ({})", name, version);

        let dir = self.installed.package_dir(name);
        let mut forward = |percent: u8| progress.installing_progress(name, version, percent);
        let result = install
            .remote
            .downloader()
            .download(version, &dir, &mut forward)
            .map_err(|source| InstallError::Download {
                package: name.to_string(),
                from: None,
                to: version.clone(),
                source,
            });

        match result {
            Ok(_) => {
                progress.installing_succeed(name, version);
                Ok(())
            }
            Err(error) => {
                progress.installing_failed(name, version, &error);
                Err(error)
            }
        }
    }

    fn installed_package(
        &self,
        name: &str,
        version: &Version,
        remote: &RemotePackage,
    ) -> InstalledPackage {
        let path = self.installed.package_dir(name);
        InstalledPackage {
            name: name.to_string(),
            version: version.clone(),
            manifest: read_manifest(&path),
            path,
            remote: Some(remote.clone()),
        }
    }

    /// Record the given packages in `deplinks/installed.lock`
    pub fn write_installed_lock(&self, packages: &[InstalledPackage]) -> InstallResult<LockFile> {
        let mut lock = LockFile::new();
        for package in packages {
            lock.add(&package.name, &package.version.to_string())?;
        }

        lock.write_to_file(&self.installed.lock_path())?;
        Ok(lock)
    }

    /// Write `deplinks/autoload.h` including the headers of the given packages
    pub fn write_autoload_header(&self, packages: &[InstalledPackage]) -> InstallResult<PathBuf> {
        let install_dir = self.installed.install_dir();
        let includes = collect_headers(&install_dir, packages)?;

        let path = install_dir.join(AUTOLOAD_HEADER);
        fs::create_dir_all(&install_dir).map_err(|e| InstallError::io(&install_dir, e))?;
        fs::write(&path, render_autoload_header(&includes))
            .map_err(|e| InstallError::io(&path, e))?;
        Ok(path)
    }
}

/// Packages installed before a run, with the run's results replacing them
pub fn merge_installed(
    previous: &[InstalledPackage],
    new: Vec<InstalledPackage>,
) -> Vec<InstalledPackage> {
    let mut merged: BTreeMap<String, InstalledPackage> = previous
        .iter()
        .map(|p| (p.name.clone(), p.clone()))
        .collect();
    for package in new {
        merged.insert(package.name.clone(), package);
    }
    merged.into_values().collect()
}

/// Header paths relative to `install_dir`, sorted and deduplicated
fn collect_headers(
    install_dir: &Path,
    packages: &[InstalledPackage],
) -> InstallResult<BTreeSet<String>> {
    let mut includes = BTreeSet::new();

    for package in packages {
        for dir in package.include_dirs() {
            if !dir.is_dir() {
                continue;
            }

            for entry in WalkDir::new(&dir) {
                let entry = entry?;
                let is_header = entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == "h" || ext == "hpp");
                if !entry.file_type().is_file() || !is_header {
                    continue;
                }

                if let Ok(relative) = entry.path().strip_prefix(install_dir) {
                    let parts: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    includes.insert(parts.join("/"));
                }
            }
        }
    }

    Ok(includes)
}

/// Content of `autoload.h` for the given include paths
pub fn render_autoload_header<'a>(includes: impl IntoIterator<Item = &'a String>) -> String {
    let mut header = String::from("#pragma once\n\n");
    for include in includes {
        header.push_str(&format!("#include \"{}\"\n", include));
    }
    header
}

fn remove_dir(dir: &Path) -> InstallResult<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| InstallError::io(dir, e))?;
    }
    Ok(())
}
