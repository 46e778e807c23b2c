//! Package initialization command (deplink init)

use super::green_check;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use deplink_package::manifest::validate_package_name;
use deplink_package::{PackageManifest, PackageType, MANIFEST_FILE};
use std::fs;
use std::path::{Path, PathBuf};

/// Arguments for the init command
#[derive(Debug, Clone)]
pub struct InitArgs {
    /// Package name (defaults to `<parent-dir>/<dir>`)
    pub name: Option<String>,
    pub package_type: PackageType,
    /// Directory to create deplink.json in
    pub path: PathBuf,
}

impl Default for InitArgs {
    fn default() -> Self {
        Self {
            name: None,
            package_type: PackageType::Project,
            path: PathBuf::from("."),
        }
    }
}

/// Run the init command
pub fn run(args: InitArgs) -> Result<()> {
    let path = args
        .path
        .canonicalize()
        .with_context(|| format!("Directory {} does not exist", args.path.display()))?;

    let name = match args.name {
        Some(name) => name,
        None => name_from_dir(&path),
    };
    validate_package_name(&name)?;

    if path.join(MANIFEST_FILE).exists() {
        bail!("Package already exists in given directory");
    }
    if fs::read_dir(&path)?.next().is_some() {
        bail!("Cannot initialize package in non-empty directory");
    }

    let mut manifest = PackageManifest::new(&name);
    manifest.kind = args.package_type;
    manifest
        .write_to_file(&path.join(MANIFEST_FILE))
        .context("Failed to write deplink.json")?;

    println!(
        "{} Created {} package {}",
        green_check().green(),
        match manifest.kind {
            PackageType::Project => "project",
            PackageType::Library => "library",
        },
        name.green()
    );
    Ok(())
}

/// `<parent>/<dir>` normalized to a valid package name
fn name_from_dir(path: &Path) -> String {
    let mut parts = path
        .components()
        .rev()
        .map(|c| sanitize(&c.as_os_str().to_string_lossy()));

    let package = parts.next().filter(|p| !p.is_empty());
    let org = parts.next().filter(|o| !o.is_empty());

    format!(
        "{}/{}",
        org.unwrap_or_else(|| "org".to_string()),
        package.unwrap_or_else(|| "package".to_string())
    )
}

fn sanitize(part: &str) -> String {
    let mapped: String = part
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    mapped.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_name_from_dir() {
        assert_eq!(name_from_dir(Path::new("/home/acme/net_utils")), "acme/net-utils");
        assert_eq!(name_from_dir(Path::new("/My Org/.Lib.")), "my-org/lib");
        assert_eq!(name_from_dir(Path::new("/")), "org/package");
    }

    #[test]
    fn test_init_writes_project_manifest() {
        let temp = TempDir::new().unwrap();
        run(InitArgs {
            name: Some("acme/app".to_string()),
            path: temp.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        let manifest = PackageManifest::from_dir(temp.path()).unwrap();
        assert_eq!(manifest.name, "acme/app");
        assert_eq!(manifest.kind, PackageType::Project);
        assert!(manifest.dependencies.is_empty());
    }

    #[test]
    fn test_init_library() {
        let temp = TempDir::new().unwrap();
        run(InitArgs {
            name: Some("acme/lib".to_string()),
            package_type: PackageType::Library,
            path: temp.path().to_path_buf(),
        })
        .unwrap();

        let manifest = PackageManifest::from_dir(temp.path()).unwrap();
        assert_eq!(manifest.kind, PackageType::Library);
    }

    #[test]
    fn test_init_existing_package_fails() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(MANIFEST_FILE), "{}").unwrap();

        let err = run(InitArgs {
            name: Some("acme/app".to_string()),
            path: temp.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Package already exists in given directory");
    }

    #[test]
    fn test_init_non_empty_directory_fails() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("main.c"), "int main(void) { return 0; }").unwrap();

        let err = run(InitArgs {
            name: Some("acme/app".to_string()),
            path: temp.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Cannot initialize package in non-empty directory");
    }

    #[test]
    fn test_init_rejects_invalid_name() {
        let temp = TempDir::new().unwrap();
        let result = run(InitArgs {
            name: Some("NoSlash".to_string()),
            path: temp.path().to_path_buf(),
            ..Default::default()
        });
        assert!(result.is_err());
        assert!(!temp.path().join(MANIFEST_FILE).exists());
    }
}
