//! Package manifest parsing and types (deplink.json)

use crate::version::{parse_version, VersionError, VersionRange};
use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Manifest file name inside every package and project directory
pub const MANIFEST_FILE: &str = "deplink.json";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid package name '{0}', expected 'org/package' using [a-z0-9-]")]
    InvalidName(String),

    #[error("Linking constraint for the '{package}' package must be either 'static' or 'dynamic', given '{given}'")]
    InvalidLinking { package: String, given: String },

    #[error("Invalid version constraint: {0}")]
    InvalidConstraint(#[from] VersionError),
}

pub type ManifestResult<T> = Result<T, ManifestError>;

/// Validate an `org/package` name
pub fn validate_package_name(name: &str) -> ManifestResult<()> {
    let valid_part =
        |part: &str| !part.is_empty() && part.chars().all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-'));

    match name.split_once('/') {
        Some((org, package)) if valid_part(org) && valid_part(package) => Ok(()),
        _ => Err(ManifestError::InvalidName(name.to_string())),
    }
}

/// Package manifest (deplink.json)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageManifest {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: PackageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, DependencySpec>,
    #[serde(default, rename = "dev-dependencies", skip_serializing_if = "IndexMap::is_empty")]
    pub dev_dependencies: IndexMap<String, DependencySpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<RepositorySpec>,
    #[serde(default = "default_linking")]
    pub linking: Vec<Linking>,
    #[serde(default = "default_arch")]
    pub arch: Vec<String>,
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    #[serde(default = "default_source")]
    pub source: Vec<String>,
}

fn default_linking() -> Vec<Linking> {
    Linking::ALL.to_vec()
}

fn default_arch() -> Vec<String> {
    vec!["x86".to_string(), "x64".to_string()]
}

fn default_include() -> Vec<String> {
    vec!["include".to_string()]
}

fn default_source() -> Vec<String> {
    vec!["src".to_string()]
}

impl PackageManifest {
    /// Create a library manifest with default settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PackageType::default(),
            version: None,
            dependencies: IndexMap::new(),
            dev_dependencies: IndexMap::new(),
            repositories: Vec::new(),
            linking: default_linking(),
            arch: default_arch(),
            include: default_include(),
            source: default_source(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Add a dependency written as `"<range>[:static|dynamic]"`
    pub fn with_dependency(mut self, name: &str, spec: &str) -> ManifestResult<Self> {
        self.dependencies
            .insert(name.to_string(), DependencySpec::parse(name, spec)?);
        Ok(self)
    }

    pub fn with_dev_dependency(mut self, name: &str, spec: &str) -> ManifestResult<Self> {
        self.dev_dependencies
            .insert(name.to_string(), DependencySpec::parse(name, spec)?);
        Ok(self)
    }

    /// Parse manifest from JSON string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> ManifestResult<Self> {
        let manifest: Self = serde_json::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load manifest from file
    pub fn from_file(path: &Path) -> ManifestResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load `deplink.json` from a package directory
    pub fn from_dir(dir: &Path) -> ManifestResult<Self> {
        Self::from_file(&dir.join(MANIFEST_FILE))
    }

    /// Serialize to pretty JSON
    pub fn to_string(&self) -> ManifestResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to_file(&self, path: &Path) -> ManifestResult<()> {
        std::fs::write(path, self.to_string()?)?;
        Ok(())
    }

    /// Check names and the declared version
    pub fn validate(&self) -> ManifestResult<()> {
        validate_package_name(&self.name)?;

        for name in self.dependencies.keys().chain(self.dev_dependencies.keys()) {
            validate_package_name(name)?;
        }

        self.parsed_version()?;
        Ok(())
    }

    /// Declared version, if any
    pub fn parsed_version(&self) -> ManifestResult<Option<Version>> {
        match &self.version {
            Some(version) => Ok(Some(parse_version(version)?)),
            None => Ok(None),
        }
    }

    /// Dependency edges declared by this manifest, dev edges optional
    pub fn edges(&self, include_dev: bool) -> Vec<DependencyEdge> {
        let mut edges: Vec<DependencyEdge> = self
            .dependencies
            .iter()
            .map(|(name, spec)| DependencyEdge::new(name, spec))
            .collect();

        if include_dev {
            edges.extend(
                self.dev_dependencies
                    .iter()
                    .map(|(name, spec)| DependencyEdge::new(name, spec)),
            );
        }

        edges
    }

    /// Names of the runtime dependencies
    pub fn dependency_names(&self) -> Vec<String> {
        self.dependencies.keys().cloned().collect()
    }

    /// Check whether the package can be consumed with the given linking type
    pub fn supports_linking(&self, linking: Linking) -> bool {
        self.linking.contains(&linking)
    }
}

/// Package type
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    /// Top level application, never consumed as a dependency
    Project,
    #[default]
    Library,
}

/// Library linking type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Linking {
    Static,
    Dynamic,
}

impl Linking {
    pub const ALL: [Linking; 2] = [Linking::Static, Linking::Dynamic];
}

impl fmt::Display for Linking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Linking::Static => f.write_str("static"),
            Linking::Dynamic => f.write_str("dynamic"),
        }
    }
}

impl FromStr for Linking {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(Linking::Static),
            "dynamic" => Ok(Linking::Dynamic),
            other => Err(other.to_string()),
        }
    }
}

/// Dependency entry value: `"<range>[:static|dynamic]"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DependencySpec {
    pub constraint: String,
    /// Accepted linking types, both when unspecified
    pub linking: Vec<Linking>,
}

impl DependencySpec {
    /// Parse a dependency value declared for `package`
    pub fn parse(package: &str, value: &str) -> ManifestResult<Self> {
        let (range, linking) = match value.rsplit_once(':') {
            Some((range, linking)) => {
                let linking = linking
                    .trim()
                    .parse::<Linking>()
                    .map_err(|given| ManifestError::InvalidLinking {
                        package: package.to_string(),
                        given,
                    })?;
                (range, vec![linking])
            }
            None => (value, Linking::ALL.to_vec()),
        };

        let range = VersionRange::parse(range)?;

        Ok(Self {
            constraint: range.as_str().to_string(),
            linking,
        })
    }
}

impl TryFrom<String> for DependencySpec {
    type Error = ManifestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        // Serde has no access to the map key here
        Self::parse("<dependency>", &value)
    }
}

impl From<DependencySpec> for String {
    fn from(spec: DependencySpec) -> Self {
        if spec.linking.len() == 1 {
            format!("{}:{}", spec.constraint, spec.linking[0])
        } else {
            spec.constraint
        }
    }
}

/// Repository declared in a manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositorySpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub src: String,
}

impl RepositorySpec {
    pub fn new(kind: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            src: src.into(),
        }
    }
}

/// A single `name -> constraint` requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub name: String,
    pub constraint: String,
    pub linking: Vec<Linking>,
}

impl DependencyEdge {
    pub fn new(name: &str, spec: &DependencySpec) -> Self {
        Self {
            name: name.to_string(),
            constraint: spec.constraint.clone(),
            linking: spec.linking.clone(),
        }
    }
}
