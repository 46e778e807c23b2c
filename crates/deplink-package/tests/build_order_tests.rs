//! Build order tests over installed package snapshots

use deplink_package::installed::INSTALLED_LOCK;
use deplink_package::{BuildOrderError, HierarchyFinder, InstalledPackagesManager, LockFile};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// Test helper: install packages with the given dependencies into a project
fn make_project(root: &Path, packages: &[(&str, &[&str])]) -> InstalledPackagesManager {
    let mut lock = LockFile::new();

    for (name, deps) in packages {
        let dir = root.join("deplinks").join(name);
        fs::create_dir_all(&dir).unwrap();

        let deps: Vec<String> = deps.iter().map(|d| format!("\"{}\": \"*\"", d)).collect();
        fs::write(
            dir.join("deplink.json"),
            format!(
                r#"{{"name": "{}", "version": "1.0.0", "dependencies": {{{}}}}}"#,
                name,
                deps.join(", ")
            ),
        )
        .unwrap();
        lock.add(name, "1.0.0").unwrap();
    }

    lock.write_to_file(&root.join("deplinks").join(INSTALLED_LOCK))
        .unwrap();

    let mut manager = InstalledPackagesManager::new(root);
    manager.snapshot().unwrap();
    manager
}

#[rstest]
#[case::independent(&[("basic/b", &[][..]), ("basic/a", &[][..])], &["basic/a", "basic/b"])]
#[case::chain(
    &[("basic/app", &["basic/core"][..]), ("basic/core", &["basic/zlib"][..]), ("basic/zlib", &[][..])],
    &["basic/zlib", "basic/core", "basic/app"]
)]
#[case::diamond(
    &[
        ("basic/top", &["basic/left", "basic/right"][..]),
        ("basic/left", &["basic/base"][..]),
        ("basic/right", &["basic/base"][..]),
        ("basic/base", &[][..]),
    ],
    &["basic/base", "basic/left", "basic/right", "basic/top"]
)]
fn test_build_order(#[case] packages: &[(&str, &[&str])], #[case] expected: &[&str]) {
    let dir = TempDir::new().unwrap();
    let manager = make_project(dir.path(), packages);

    assert_eq!(HierarchyFinder::sort(manager.installed()).unwrap(), expected);
}

#[test]
fn test_dependencies_come_first() {
    let dir = TempDir::new().unwrap();
    let manager = make_project(
        dir.path(),
        &[
            ("org/e", &["org/a", "org/d"]),
            ("org/d", &["org/c"]),
            ("org/c", &[]),
            ("org/b", &["org/c"]),
            ("org/a", &["org/b"]),
        ],
    );

    let order = HierarchyFinder::sort(manager.installed()).unwrap();
    for package in manager.installed() {
        let position = order.iter().position(|p| *p == package.name).unwrap();
        for dependency in package.dependencies() {
            let dep_position = order.iter().position(|p| *p == dependency).unwrap();
            assert!(dep_position < position, "{} before {}", dependency, package.name);
        }
    }
}

#[test]
fn test_missing_dependency_does_not_block() {
    let dir = TempDir::new().unwrap();
    let manager = make_project(dir.path(), &[("basic/a", &["basic/not-installed"])]);

    assert_eq!(
        HierarchyFinder::sort(manager.installed()).unwrap(),
        vec!["basic/a"]
    );
}

#[test]
fn test_cycle_between_installed_packages() {
    let dir = TempDir::new().unwrap();
    let manager = make_project(
        dir.path(),
        &[("basic/a", &["basic/b"]), ("basic/b", &["basic/a"]), ("basic/c", &[])],
    );

    let err = HierarchyFinder::sort(manager.installed()).unwrap_err();
    assert_eq!(
        err,
        BuildOrderError::CircularDependency(vec!["basic/a".to_string(), "basic/b".to_string()])
    );
    assert_eq!(
        err.to_string(),
        "Circular dependency detected between: basic/a, basic/b"
    );
}
