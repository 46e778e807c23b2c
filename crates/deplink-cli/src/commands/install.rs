//! Install dependencies command (deplink install)

use super::{find_manifest, green_check, load_config, Project};
use crate::progress::{installing_line, removing_line, updating_line, InstallationReporter};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use deplink_config::Config;
use deplink_package::manifest::validate_package_name;
use deplink_package::{
    merge_installed, DependencySpec, InstallError, InstallPlan, InstalledPackagesManager,
    Installer, PackageManifest, ResolverError,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Arguments for the install command
#[derive(Debug, Clone)]
pub struct InstallArgs {
    /// Packages to add before installing, as `org/name[@range[:linking]]`
    pub packages: Vec<String>,
    /// Add the given packages as dev-dependencies
    pub dev: bool,
    /// Skip dev-dependencies of the project
    pub no_dev: bool,
    /// Draw download progress bars
    pub show_progress: bool,
    /// Project directory (defaults to current)
    pub project_dir: PathBuf,
    /// Dry run (don't actually install)
    pub dry_run: bool,
}

impl Default for InstallArgs {
    fn default() -> Self {
        Self {
            packages: Vec::new(),
            dev: false,
            no_dev: false,
            show_progress: true,
            project_dir: PathBuf::from("."),
            dry_run: false,
        }
    }
}

/// Run the install command
///
/// deplink.json is restored to its previous content when anything fails
/// after new packages were added to it.
pub fn run(args: InstallArgs) -> Result<()> {
    let config = load_config()?;
    let manifest_path = find_manifest(&args.project_dir)?;
    let backup = fs::read_to_string(&manifest_path)
        .with_context(|| format!("Failed to read {}", manifest_path.display()))?;

    let result = install(&args, &config);
    if result.is_err() && !args.packages.is_empty() && !args.dry_run {
        log::info!("Restoring {}", manifest_path.display());
        if let Err(e) = fs::write(&manifest_path, &backup) {
            log::error!("Cannot restore {}: {}", manifest_path.display(), e);
        }
    }

    result
}

fn install(args: &InstallArgs, config: &Config) -> Result<()> {
    let mut project = Project::open(&args.project_dir)?;

    if !args.packages.is_empty() {
        add_packages(&mut project.manifest, &args.packages, args.dev)?;
        if !args.dry_run {
            project
                .manifest
                .write_to_file(&project.manifest_path)
                .context("Failed to update deplink.json")?;
        }
    }

    let include_dev = !args.no_dev && config.install_dev();
    let mut installer = Installer::new(
        project.resolver(config)?,
        InstalledPackagesManager::new(&project.dir),
        project.manifest.clone(),
        include_dev,
    );

    let spinner = spinner(args.show_progress);
    if let Some(ref pb) = spinner {
        pb.set_message("Resolving dependencies tree...");
    }

    let planned = installer.plan();
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let plan = planned.map_err(explain)?;
    println!("Resolving dependencies tree... {}", "OK".green());

    if args.dry_run {
        print_plan(&plan);
        return Ok(());
    }

    let mut reporter = InstallationReporter::new(args.show_progress);
    let new = installer.install(&mut reporter).map_err(explain)?;

    let all = merge_installed(installer.installed().installed(), new);
    installer.write_installed_lock(&all)?;
    let header = installer.write_autoload_header(&all)?;
    log::debug!("Wrote {}", header.display());

    print_summary(&plan);
    Ok(())
}

/// Add `org/name[@range[:linking]]` requirements to the manifest
fn add_packages(manifest: &mut PackageManifest, packages: &[String], dev: bool) -> Result<()> {
    for package in packages {
        let (name, constraint) = package.split_once('@').unwrap_or((package.as_str(), "*"));
        validate_package_name(name)?;

        if manifest.dependencies.contains_key(name) || manifest.dev_dependencies.contains_key(name)
        {
            bail!("Package '{}' is already a dependency of {}", name, manifest.name);
        }

        let spec = DependencySpec::parse(name, constraint)?;
        let target = if dev {
            &mut manifest.dev_dependencies
        } else {
            &mut manifest.dependencies
        };
        target.insert(name.to_string(), spec);
    }

    Ok(())
}

/// Turn a resolution conflict into its full report
fn explain(error: InstallError) -> anyhow::Error {
    match error {
        InstallError::Resolver(ResolverError::Conflict(conflict)) => {
            anyhow::anyhow!("Cannot resolve dependencies tree\n\n{}", conflict.report())
        }
        other => other.into(),
    }
}

fn spinner(enabled: bool) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(80));
    Some(pb)
}

fn print_plan(plan: &InstallPlan) {
    if plan.is_empty() {
        println!("\n[Dry run] Nothing to install, update or remove");
        return;
    }

    println!("\n[Dry run] Would apply:");
    for name in &plan.removals {
        println!("  - {}", removing_line(name));
    }
    for update in &plan.updates {
        println!("  - {}", updating_line(&update.name, &update.from, &update.to));
    }
    for missing in &plan.installs {
        println!("  - {}", installing_line(&missing.name, &missing.version));
    }
}

/// Print installation summary
fn print_summary(plan: &InstallPlan) {
    println!();

    if plan.is_empty() {
        println!("{} Dependencies are up to date", green_check().green());
        return;
    }

    let mut parts = Vec::new();
    if !plan.installs.is_empty() {
        parts.push(format!("{} installed", plan.installs.len()));
    }
    if !plan.updates.is_empty() {
        parts.push(format!("{} updated", plan.updates.len()));
    }
    if !plan.removals.is_empty() {
        parts.push(format!("{} removed", plan.removals.len()));
    }

    println!("{} {}", green_check().green(), parts.join(", "));
}
