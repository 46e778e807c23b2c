//! Deplink CLI Integration Tests
//!
//! Every test works against a local repository inside a temporary
//! directory, the public repository is disabled.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

struct Workspace {
    temp: TempDir,
}

impl Workspace {
    /// Local repository with basic/hello -> basic/world and an empty app project
    fn new(dependencies: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");

        write(
            &repo.join("basic/hello/deplink.json"),
            r#"{"name": "basic/hello", "version": "1.0.0", "dependencies": {"basic/world": "^2.0"}}"#,
        );
        write(&repo.join("basic/hello/include/hello.h"), "#pragma once\n");
        write(
            &repo.join("basic/world/deplink.json"),
            r#"{"name": "basic/world", "version": "2.1.0"}"#,
        );
        write(&repo.join("basic/world/include/world.h"), "#pragma once\n");

        write(
            &temp.path().join("app/deplink.json"),
            &format!(
                r#"{{"name": "acme/app", "type": "project", "dependencies": {{{}}}, "repositories": [{{"type": "local", "src": "../repo"}}]}}"#,
                dependencies
            ),
        );

        Self { temp }
    }

    fn app(&self) -> PathBuf {
        self.temp.path().join("app")
    }

    fn deplink(&self) -> Command {
        let mut cmd = Command::cargo_bin("deplink").unwrap();
        cmd.current_dir(self.app())
            .env("DEPLINK_HOME", self.temp.path().join("home"))
            .env("DEPLINK_NO_DEFAULT_REPOSITORY", "1")
            .env("DEPLINK_NO_PROGRESS", "1")
            .env("NO_COLOR", "1")
            .env_remove("DEPLINK_CACHE_DIR")
            .env_remove("RUST_LOG");
        cmd
    }

    fn manifest(&self) -> String {
        fs::read_to_string(self.app().join("deplink.json")).unwrap()
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

// ============================================================================
// Install Command Tests
// ============================================================================

#[test]
fn test_install_resolves_and_installs() {
    let ws = Workspace::new(r#""basic/hello": "*""#);

    ws.deplink()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resolving dependencies tree... OK"))
        .stdout(predicate::str::contains(
            "Dependencies: 2 installs, 0 updates, 0 removals",
        ))
        .stdout(predicate::str::contains("Installing basic/hello (v1.0.0)"))
        .stdout(predicate::str::contains("Installing basic/world (v2.1.0)"));

    let deplinks = ws.app().join("deplinks");
    assert!(deplinks.join("basic/hello/include/hello.h").is_file());
    assert!(deplinks.join("basic/world/include/world.h").is_file());

    let lock = fs::read_to_string(deplinks.join("installed.lock")).unwrap();
    assert!(lock.contains("basic/hello"));
    assert!(lock.contains("2.1.0"));

    let autoload = fs::read_to_string(deplinks.join("autoload.h")).unwrap();
    assert!(autoload.starts_with("#pragma once"));
    assert!(autoload.contains("#include \"basic/world/include/world.h\""));
}

#[test]
fn test_second_install_is_up_to_date() {
    let ws = Workspace::new(r#""basic/world": "^2.0""#);

    ws.deplink().arg("install").assert().success();
    ws.deplink()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Dependencies: 0 installs, 0 updates, 0 removals",
        ))
        .stdout(predicate::str::contains("Dependencies are up to date"));
}

#[test]
fn test_install_removes_ambiguous_packages() {
    let ws = Workspace::new(r#""basic/world": "*""#);
    fs::create_dir_all(ws.app().join("deplinks/basic/stray")).unwrap();

    ws.deplink()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removing basic/stray"));

    assert!(!ws.app().join("deplinks/basic/stray").exists());
}

#[test]
fn test_install_adds_package_to_manifest() {
    let ws = Workspace::new("");

    ws.deplink()
        .args(["install", "basic/world@^2.0:static"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installing basic/world (v2.1.0)"));

    assert!(ws.manifest().contains(r#""basic/world": "^2.0:static""#));
}

#[test]
fn test_install_dry_run_changes_nothing() {
    let ws = Workspace::new("");
    let before = ws.manifest();

    ws.deplink()
        .args(["install", "basic/hello", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[Dry run] Would apply:"))
        .stdout(predicate::str::contains("Installing basic/world (v2.1.0)"));

    assert_eq!(ws.manifest(), before);
    assert!(!ws.app().join("deplinks").exists());
}

#[test]
fn test_failed_install_restores_manifest() {
    let ws = Workspace::new("");
    let before = ws.manifest();

    ws.deplink()
        .args(["install", "basic/missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("basic/missing"));

    assert_eq!(ws.manifest(), before);
}

#[test]
fn test_install_existing_dependency_fails() {
    let ws = Workspace::new(r#""basic/world": "^2.0""#);

    ws.deplink()
        .args(["install", "basic/world@^2.1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already a dependency"));

    assert!(ws.manifest().contains(r#""basic/world": "^2.0""#));
}

#[test]
fn test_install_reports_conflict() {
    let ws = Workspace::new(r#""basic/world": "^1.0""#);

    ws.deplink()
        .arg("install")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot resolve dependencies tree"))
        .stderr(predicate::str::contains("basic/world"));
}

#[test]
fn test_install_without_manifest_fails() {
    let ws = Workspace::new("");
    let empty = ws.temp.path().join("elsewhere");
    fs::create_dir_all(&empty).unwrap();

    ws.deplink()
        .args(["install", "-d"])
        .arg(&empty)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not find deplink.json"));
}

// ============================================================================
// List and Order Command Tests
// ============================================================================

#[test]
fn test_list_marks_out_of_date_packages() {
    let ws = Workspace::new(r#""basic/hello": "*""#);

    ws.deplink()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("basic/hello (v1.0.0) - out-of-date"))
        .stdout(predicate::str::contains("basic/world (v2.1.0) - out-of-date"));

    ws.deplink().arg("install").assert().success();

    ws.deplink()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("basic/hello (v1.0.0)"))
        .stdout(predicate::str::contains("out-of-date").not());
}

#[test]
fn test_order_prints_dependencies_first() {
    let ws = Workspace::new(r#""basic/hello": "*""#);
    ws.deplink().arg("install").assert().success();

    ws.deplink()
        .arg("order")
        .assert()
        .success()
        .stdout("basic/world\nbasic/hello\n");

    ws.deplink()
        .args(["order", "--groups"])
        .assert()
        .success()
        .stdout("1. basic/world\n2. basic/hello\n");
}

// ============================================================================
// Init Command Tests
// ============================================================================

#[test]
fn test_init_names_package_after_directories() {
    let ws = Workspace::new("");
    let dir = ws.temp.path().join("acme").join("net_tools");
    fs::create_dir_all(&dir).unwrap();

    ws.deplink()
        .args(["init", "-d"])
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created project package acme/net-tools"));

    let manifest = fs::read_to_string(dir.join("deplink.json")).unwrap();
    assert!(manifest.contains(r#""name": "acme/net-tools""#));
    assert!(manifest.contains(r#""type": "project""#));
}

#[test]
fn test_init_in_existing_package_fails() {
    let ws = Workspace::new("");

    ws.deplink()
        .args(["init", "acme/other"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Package already exists in given directory",
        ));
}

#[test]
fn test_version_flag() {
    let ws = Workspace::new("");

    ws.deplink()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("deplink"));
}
