//! List resolved dependencies command (deplink list)

use super::{load_config, Project};
use anyhow::Result;
use colored::Colorize;
use deplink_package::{InstalledPackagesManager, VersionComparator};
use semver::Version;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Arguments for the list command
#[derive(Debug, Clone)]
pub struct ListArgs {
    pub project_dir: PathBuf,
    /// Skip dev-dependencies of the project
    pub no_dev: bool,
}

/// State of a resolved package on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageStatus {
    UpToDate,
    /// Installed at another version, or not installed at all
    OutOfDate,
    /// Present in deplinks/ but missing from installed.lock (or the reverse)
    Ambiguous,
}

/// Run the list command
pub fn run(args: ListArgs) -> Result<()> {
    let config = load_config()?;
    let project = Project::open(&args.project_dir)?;

    let mut installed = InstalledPackagesManager::new(&project.dir);
    installed.snapshot()?;

    let mut resolver = project.resolver(&config)?;
    let include_dev = !args.no_dev && config.install_dev();
    let resolved = resolver.snapshot(&project.manifest, include_dev)?.best().versions();

    if resolved.is_empty() {
        println!("No dependencies.");
        return Ok(());
    }

    for (name, version, status) in statuses(&resolved, &installed) {
        let line = format!("{} ({})", name.green(), format!("v{}", version).yellow());
        match status {
            PackageStatus::UpToDate => println!("{}", line),
            PackageStatus::OutOfDate => println!("{} - {}", line, "out-of-date".red()),
            PackageStatus::Ambiguous => println!("{} - {}", line, "ambiguous".red()),
        }
    }

    Ok(())
}

/// Compare resolved versions with the installed snapshot
pub fn statuses<'a>(
    resolved: &'a BTreeMap<String, Version>,
    installed: &InstalledPackagesManager,
) -> Vec<(&'a str, &'a Version, PackageStatus)> {
    resolved
        .iter()
        .map(|(name, version)| {
            let status = if installed.is_ambiguous(name) {
                PackageStatus::Ambiguous
            } else {
                match installed.get(name) {
                    Some(package) if VersionComparator::equal(&package.version, version) => {
                        PackageStatus::UpToDate
                    }
                    _ => PackageStatus::OutOfDate,
                }
            };
            (name.as_str(), version, status)
        })
        .collect()
}
