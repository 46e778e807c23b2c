//! Print the build order of installed packages (deplink order)

use super::Project;
use anyhow::{Context, Result};
use colored::Colorize;
use deplink_package::{HierarchyFinder, InstalledPackagesManager};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct OrderArgs {
    pub project_dir: PathBuf,
    /// Print packages that can be built in parallel on one line
    pub groups: bool,
}

pub fn run(args: OrderArgs) -> Result<()> {
    let project = Project::open(&args.project_dir)?;

    let mut installed = InstalledPackagesManager::new(&project.dir);
    installed.snapshot()?;
    for name in installed.ambiguous() {
        eprintln!(
            "{} {} is ambiguous, run 'deplink install' first",
            "warning:".yellow().bold(),
            name
        );
    }

    let finder = HierarchyFinder::new(installed.installed());
    if args.groups {
        let groups = finder
            .build_groups()
            .context("Cannot order installed packages")?;
        for (index, group) in groups.iter().enumerate() {
            println!("{}. {}", index + 1, group.join(" "));
        }
    } else {
        let order = finder
            .build_order()
            .context("Cannot order installed packages")?;
        for name in order {
            println!("{}", name);
        }
    }

    Ok(())
}
