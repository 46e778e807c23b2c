//! Semantic version ordering and range matching

use semver::{Comparator, Op, Prerelease, Version, VersionReq};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VersionError {
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("Invalid version range '{range}': {reason}")]
    InvalidRange { range: String, reason: String },
}

pub type VersionResult<T> = Result<T, VersionError>;

/// Operators that may be written apart from their version (`>= 1.2.0`)
const OPERATORS: &[&str] = &["=", ">", ">=", "<", "<=", "^", "~"];

/// Parse a version, filling missing minor/patch components with zero.
///
/// Accepts `1`, `1.2`, `1.2.3`, an optional `v` prefix and the usual
/// pre-release/build suffixes (`1.2.3-beta.1+build`).
pub fn parse_version(input: &str) -> VersionResult<Version> {
    let invalid = |reason: &str| VersionError::InvalidVersion {
        version: input.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix('.').unwrap_or(trimmed);

    if trimmed.is_empty() {
        return Err(invalid("empty version"));
    }

    let split_at = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split_at);

    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3 {
        return Err(invalid("expected at most three numeric components"));
    }

    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("components must be numeric"));
        }
        *slot = part.parse().map_err(|_| invalid("component out of range"))?;
    }

    let normalized = format!("{}.{}.{}{}", numbers[0], numbers[1], numbers[2], suffix);
    Version::parse(&normalized).map_err(|e| invalid(&e.to_string()))
}

/// Conjunction of version comparators (`^1.2 >=1.2.5`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    expr: String,
    requirement: VersionReq,
}

impl VersionRange {
    /// Range matching every released version
    pub fn any() -> Self {
        Self {
            expr: "*".to_string(),
            requirement: VersionReq::STAR,
        }
    }

    /// Parse a whitespace (or comma) separated conjunction of comparators.
    ///
    /// A bare version means an exact match. Alternatives (`||`) are rejected.
    pub fn parse(expr: &str) -> VersionResult<Self> {
        let trimmed = expr.trim();
        let invalid = |reason: &str| VersionError::InvalidRange {
            range: expr.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("empty range expression"));
        }
        if trimmed.contains("||") {
            return Err(invalid("alternatives (||) are not supported"));
        }

        let mut comparators = Vec::new();
        let mut pending_op: Option<&str> = None;

        let tokens = trimmed
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty());

        for token in tokens {
            if OPERATORS.contains(&token) {
                if pending_op.is_some() {
                    return Err(invalid("operator is not followed by a version"));
                }
                pending_op = Some(token);
                continue;
            }

            let token = match pending_op.take() {
                Some(op) => format!("{}{}", op, token),
                None => token.to_string(),
            };
            comparators.extend(parse_comparator(&token).map_err(|reason| invalid(&reason))?);
        }

        if pending_op.is_some() {
            return Err(invalid("operator is not followed by a version"));
        }

        Ok(Self {
            expr: trimmed.to_string(),
            requirement: VersionReq { comparators },
        })
    }

    /// Check whether the version lies inside the range
    pub fn matches(&self, version: &Version) -> bool {
        self.requirement.matches(version)
    }

    /// The range as written
    pub fn as_str(&self) -> &str {
        &self.expr
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

fn is_wildcard(token: &str) -> bool {
    matches!(token, "*" | "x" | "X")
}

fn parse_comparator(token: &str) -> Result<Vec<Comparator>, String> {
    if is_wildcard(token) {
        return Ok(Vec::new());
    }

    let starts_with_digit = token.chars().next().is_some_and(|c| c.is_ascii_digit());
    let has_wildcard = token.contains(['*', 'x', 'X']);

    if (starts_with_digit || token.starts_with('v')) && !has_wildcard {
        // Bare versions pin exactly, unlike cargo's implicit caret
        let version = parse_version(token).map_err(|e| e.to_string())?;
        return Ok(vec![Comparator {
            op: Op::Exact,
            major: version.major,
            minor: Some(version.minor),
            patch: Some(version.patch),
            pre: version.pre,
        }]);
    }

    if let Some(comparators) = parse_minor_tilde(token)? {
        return Ok(comparators);
    }

    let requirement = VersionReq::parse(token).map_err(|e| e.to_string())?;
    Ok(requirement.comparators)
}

/// `~X.Y` allows any later minor release: `>=X.Y.0, <(X+1).0.0`.
///
/// Other tilde forms (`~X`, `~X.Y.Z`) already match cargo's meaning.
fn parse_minor_tilde(token: &str) -> Result<Option<Vec<Comparator>>, String> {
    let Some(rest) = token.strip_prefix('~') else {
        return Ok(None);
    };

    let core_len = rest.find(['-', '+']).unwrap_or(rest.len());
    let parts: Vec<&str> = rest[..core_len].split('.').collect();
    let numeric = parts
        .iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    if parts.len() != 2 || !numeric {
        return Ok(None);
    }

    let lower = parse_version(rest).map_err(|e| e.to_string())?;
    Ok(Some(vec![
        Comparator {
            op: Op::GreaterEq,
            major: lower.major,
            minor: Some(lower.minor),
            patch: Some(0),
            pre: lower.pre,
        },
        Comparator {
            op: Op::Less,
            major: lower.major + 1,
            minor: Some(0),
            patch: Some(0),
            pre: Prerelease::EMPTY,
        },
    ]))
}

/// Version comparison and range predicates
pub struct VersionComparator;

impl VersionComparator {
    /// Order two versions by precedence (build metadata is ignored)
    pub fn compare(a: &Version, b: &Version) -> Ordering {
        a.cmp_precedence(b)
    }

    /// Versions are equal when they have the same precedence
    pub fn equal(a: &Version, b: &Version) -> bool {
        Self::compare(a, b) == Ordering::Equal
    }

    pub fn greater_than(a: &Version, b: &Version) -> bool {
        Self::compare(a, b) == Ordering::Greater
    }

    /// Check a version against a range expression
    pub fn satisfies(version: &Version, range: &str) -> VersionResult<bool> {
        Ok(VersionRange::parse(range)?.matches(version))
    }

    /// Filter versions by a range expression, preserving input order
    pub fn satisfied_by(versions: &[Version], range: &str) -> VersionResult<Vec<Version>> {
        let range = VersionRange::parse(range)?;
        Ok(versions
            .iter()
            .filter(|v| range.matches(v))
            .cloned()
            .collect())
    }

    pub fn sort_ascending(mut versions: Vec<Version>) -> Vec<Version> {
        versions.sort_by(Self::compare);
        versions
    }

    /// Newest first
    pub fn sort_descending(mut versions: Vec<Version>) -> Vec<Version> {
        versions.sort_by(|a, b| Self::compare(b, a));
        versions
    }

    /// True when the version carries no pre-release tag
    pub fn is_stable(version: &Version) -> bool {
        version.pre == Prerelease::EMPTY
    }
}
