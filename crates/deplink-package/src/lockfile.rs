//! Package lock files (deplink.lock, deplinks/installed.lock)

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockfileError {
    #[error("Package '{package}' ({version}) already locked with version {locked}")]
    DuplicateEntry {
        package: String,
        version: String,
        locked: String,
    },

    #[error("Package '{0}' is not locked")]
    NotFound(String),

    #[error("Failed to parse lock file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LockfileResult<T> = Result<T, LockfileError>;

/// Flat `name -> version` record, kept in insertion order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockFile {
    #[serde(default)]
    dependencies: IndexMap<String, String>,
}

impl LockFile {
    /// Create new empty lock file
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse lock file from JSON string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> LockfileResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load lock file from disk
    pub fn from_file(path: &Path) -> LockfileResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load lock file, treating a missing file as empty
    pub fn from_file_or_empty(path: &Path) -> LockfileResult<Self> {
        if path.is_file() {
            Self::from_file(path)
        } else {
            Ok(Self::new())
        }
    }

    /// Serialize to pretty JSON
    pub fn to_string(&self) -> LockfileResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write lock file, creating parent directories
    pub fn write_to_file(&self, path: &Path) -> LockfileResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_string()?)?;
        Ok(())
    }

    /// Lock a package version, failing if the package is already locked
    pub fn add(&mut self, name: &str, version: &str) -> LockfileResult<()> {
        if let Some(locked) = self.dependencies.get(name) {
            return Err(LockfileError::DuplicateEntry {
                package: name.to_string(),
                version: version.to_string(),
                locked: locked.clone(),
            });
        }

        self.dependencies
            .insert(name.to_string(), version.to_string());
        Ok(())
    }

    /// Remove a locked package
    pub fn remove(&mut self, name: &str) -> LockfileResult<String> {
        self.dependencies
            .shift_remove(name)
            .ok_or_else(|| LockfileError::NotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.dependencies.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }

    /// Locked packages in insertion order
    pub fn packages(&self) -> &IndexMap<String, String> {
        &self.dependencies
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_add_and_get() {
        let mut lock = LockFile::new();
        lock.add("basic/hello", "1.2.3").unwrap();

        assert_eq!(lock.get("basic/hello"), Some("1.2.3"));
        assert!(lock.contains("basic/hello"));
        assert_eq!(lock.len(), 1);
    }

    #[test]
    fn test_duplicate_entry_is_rejected() {
        let mut lock = LockFile::new();
        lock.add("x", "1.0.0").unwrap();

        let err = lock.add("x", "1.0.0").unwrap_err();
        assert!(matches!(err, LockfileError::DuplicateEntry { .. }));
        assert_eq!(
            err.to_string(),
            "Package 'x' (1.0.0) already locked with version 1.0.0"
        );
        assert_eq!(lock.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut lock = LockFile::new();
        lock.add("basic/hello", "1.0.0").unwrap();

        assert_eq!(lock.remove("basic/hello").unwrap(), "1.0.0");
        assert!(lock.is_empty());
        assert!(matches!(
            lock.remove("basic/hello"),
            Err(LockfileError::NotFound(_))
        ));
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut lock = LockFile::new();
        lock.add("zeta/last", "1.0.0").unwrap();
        lock.add("alpha/first", "2.0.0").unwrap();
        lock.add("mid/middle", "3.0.0").unwrap();
        lock.remove("alpha/first").unwrap();

        let names: Vec<&String> = lock.packages().keys().collect();
        assert_eq!(names, vec!["zeta/last", "mid/middle"]);
    }

    #[test]
    fn test_serialized_format() {
        let mut lock = LockFile::new();
        lock.add("basic/world", "0.1.0").unwrap();
        lock.add("basic/hello", "1.2.3").unwrap();

        insta::assert_snapshot!(lock.to_string().unwrap(), @r###"
{
  "dependencies": {
    "basic/world": "0.1.0",
    "basic/hello": "1.2.3"
  }
}
"###);
    }

    #[test]
    fn test_round_trip_is_byte_stable() {
        let mut lock = LockFile::new();
        lock.add("x", "1.2.3").unwrap();

        let first = lock.to_string().unwrap();
        let second = LockFile::from_str(&first).unwrap().to_string().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_dependencies_key_parses_as_empty() {
        let lock = LockFile::from_str("{}").unwrap();
        assert!(lock.is_empty());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deplinks").join("installed.lock");

        assert!(LockFile::from_file_or_empty(&path).unwrap().is_empty());

        let mut lock = LockFile::new();
        lock.add("basic/hello", "1.0.0").unwrap();
        lock.write_to_file(&path).unwrap();

        assert_eq!(LockFile::from_file(&path).unwrap(), lock);
    }
}
