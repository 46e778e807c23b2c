use deplink_package::*;
use pretty_assertions::assert_eq;
use semver::Version;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn v(s: &str) -> Version {
    parse_version(s).unwrap()
}

fn memory_repository(packages: &[(&str, &str, &[(&str, &str)])]) -> RepositoryCollection {
    let mut memory = MemoryRepository::new("memory");
    for (name, version, deps) in packages {
        let mut manifest = PackageManifest::new(*name).with_version(*version);
        for (dep, spec) in deps.iter() {
            manifest = manifest.with_dependency(dep, spec).unwrap();
        }
        memory.publish(manifest).unwrap();
    }

    let mut collection = RepositoryCollection::new();
    collection.add(memory);
    collection
}

fn project(deps: &[(&str, &str)]) -> PackageManifest {
    let mut manifest = PackageManifest::new("org/app");
    manifest.kind = PackageType::Project;
    for (dep, spec) in deps {
        manifest = manifest.with_dependency(dep, spec).unwrap();
    }
    manifest
}

mod resolution {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolution_is_idempotent() {
        let packages: &[(&str, &str, &[(&str, &str)])] = &[
            ("basic/p", "1.0.0", &[]),
            ("basic/p", "1.4.2", &[]),
            ("basic/q", "0.3.0", &[("basic/p", "^1.2")]),
            ("basic/q", "0.2.0", &[("basic/p", "*")]),
        ];
        let manifest = project(&[("basic/q", "*"), ("basic/p", "*")]);

        let mut first = DependencyTreeResolver::new(memory_repository(packages));
        let mut second = DependencyTreeResolver::new(memory_repository(packages));

        let a = first.resolve(&manifest, false).unwrap();
        let b = second.resolve(&manifest, false).unwrap();
        assert_eq!(a[0].versions(), b[0].versions());

        let again = first.resolve(&manifest, false).unwrap();
        assert_eq!(a[0].versions(), again[0].versions());
    }

    #[test]
    fn test_newest_first_selection() {
        let mut resolver = DependencyTreeResolver::new(memory_repository(&[
            ("basic/p", "1.0.0", &[]),
            ("basic/p", "1.2.0", &[]),
            ("basic/p", "1.1.0", &[]),
        ]));

        let states = resolver.resolve(&project(&[("basic/p", "*")]), false).unwrap();
        assert_eq!(states[0].version("basic/p"), Some(&v("1.2.0")));
    }

    #[test]
    fn test_transitive_range_narrowing() {
        let mut resolver = DependencyTreeResolver::new(memory_repository(&[
            ("basic/p", "1.0.5", &[]),
            ("basic/p", "1.1.0", &[]),
            ("basic/p", "1.3.0", &[]),
            ("basic/p", "2.0.0", &[]),
            ("basic/mid", "1.0.0", &[("basic/p", ">=1.1.0")]),
        ]));

        let states = resolver
            .resolve(&project(&[("basic/p", "^1.0.0"), ("basic/mid", "*")]), false)
            .unwrap();

        let picked: Vec<Version> = states
            .iter()
            .filter_map(|s| s.version("basic/p").cloned())
            .collect();
        assert!(!picked.contains(&v("1.0.5")));
        assert!(!picked.contains(&v("2.0.0")));
        assert_eq!(picked[0], v("1.3.0"));
    }

    #[test]
    fn test_transitive_conflict_fails() {
        let mut resolver = DependencyTreeResolver::new(memory_repository(&[
            ("basic/p", "1.0.0", &[]),
            ("basic/p", "2.0.0", &[]),
            ("basic/mid", "1.0.0", &[("basic/p", "^2.0.0")]),
        ]));

        let err = resolver
            .resolve(&project(&[("basic/p", "^1.0.0"), ("basic/mid", "*")]), false)
            .unwrap_err();
        assert!(matches!(err, ResolverError::Conflict(_)));
    }

    #[test]
    fn test_malformed_range_is_reported() {
        let manifest = PackageManifest::from_str(
            r#"{"name": "org/app", "dependencies": {"basic/p": ">=1.0 || <0.5"}}"#,
        );
        assert!(manifest.is_err());
    }
}

mod lock_file {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip_is_byte_identical() {
        let mut lock = LockFile::new();
        lock.add("x", "1.2.3").unwrap();

        let first = lock.to_string().unwrap();
        let second = LockFile::from_str(&first).unwrap().to_string().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_entry() {
        let mut lock = LockFile::new();
        lock.add("x", "1.0.0").unwrap();

        let err = lock.add("x", "1.0.0").unwrap_err();
        assert!(matches!(err, LockfileError::DuplicateEntry { .. }));
    }
}

mod installation {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// Local repository with `basic/hello` depending on `basic/world`
    fn local_repository(root: &Path) {
        write(
            &root.join("basic/hello/deplink.json"),
            r#"{"name": "basic/hello", "version": "1.0.0", "dependencies": {"basic/world": "^2.0"}}"#,
        );
        write(&root.join("basic/hello/include/hello.h"), "#pragma once\n");
        write(&root.join("basic/hello/src/hello.c"), "int hello(void) { return 0; }\n");

        write(
            &root.join("basic/world/deplink.json"),
            r#"{"name": "basic/world", "version": "2.1.0"}"#,
        );
        write(&root.join("basic/world/include/world.h"), "#pragma once\n");
    }

    #[test]
    fn test_install_from_local_repository() {
        let dir = TempDir::new().unwrap();
        local_repository(&dir.path().join("repo"));

        let project_dir = dir.path().join("app");
        fs::create_dir_all(&project_dir).unwrap();
        let mut manifest = project(&[("basic/hello", "*")]);
        manifest
            .repositories
            .push(RepositorySpec::new("local", "../repo"));

        let factory = repository::RepositoryFactory::new(&project_dir, dir.path().join("cache"));
        let repositories = factory.collection(&manifest.repositories, &[]).unwrap();

        let mut installer = Installer::new(
            DependencyTreeResolver::new(repositories),
            InstalledPackagesManager::new(&project_dir),
            manifest,
            false,
        );
        let new = installer.install(&mut NoProgress).unwrap();
        let all = merge_installed(installer.installed().installed(), new);
        installer.write_installed_lock(&all).unwrap();
        installer.write_autoload_header(&all).unwrap();

        let mut manager = InstalledPackagesManager::new(&project_dir);
        manager.snapshot().unwrap();
        assert!(manager.ambiguous().is_empty());
        assert_eq!(manager.get("basic/world").unwrap().version, v("2.1.0"));
        assert_eq!(
            HierarchyFinder::sort(manager.installed()).unwrap(),
            vec!["basic/world", "basic/hello"]
        );

        let header = fs::read_to_string(project_dir.join("deplinks/autoload.h")).unwrap();
        assert!(header.contains("#include \"basic/hello/include/hello.h\""));
        assert!(header.contains("#include \"basic/world/include/world.h\""));
    }

    #[test]
    fn test_second_install_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        local_repository(&dir.path().join("repo"));
        let project_dir = dir.path().join("app");
        fs::create_dir_all(&project_dir).unwrap();

        let run = || {
            let mut manifest = project(&[("basic/world", "*")]);
            manifest
                .repositories
                .push(RepositorySpec::new("local", "../repo"));
            let factory =
                repository::RepositoryFactory::new(&project_dir, dir.path().join("cache"));
            let repositories = factory.collection(&manifest.repositories, &[]).unwrap();

            let mut installer = Installer::new(
                DependencyTreeResolver::new(repositories),
                InstalledPackagesManager::new(&project_dir),
                manifest,
                false,
            );
            let plan = installer.plan().unwrap();
            let new = installer.install(&mut NoProgress).unwrap();
            let all = merge_installed(installer.installed().installed(), new);
            installer.write_installed_lock(&all).unwrap();
            plan
        };

        let first = run();
        assert_eq!(first.installs.len(), 1);

        let second = run();
        assert!(second.is_empty());
    }
}
