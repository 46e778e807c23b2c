//! Conflict reporting for failed resolutions

use super::state::{Requirement, ResolutionState};
use crate::manifest::Linking;
use semver::Version;

/// Conflict information for reporting
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub package: String,
    pub constraints: Vec<ConflictingConstraint>,
    /// Linking types still accepted when the search gave up
    pub linking: Vec<Linking>,
    /// Versions the repository offers, newest first
    pub available: Vec<Version>,
}

/// A single conflicting constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictingConstraint {
    pub requirement: String,
    pub source: String, // Which package imposed this constraint
}

impl Conflict {
    /// Conflict on `package` as seen from one dead-end state
    pub fn from_state(package: &str, state: &ResolutionState, available: Vec<Version>) -> Self {
        let constraints = state
            .requirements(package)
            .iter()
            .map(ConflictingConstraint::from_requirement)
            .collect();

        Self {
            package: package.to_string(),
            constraints,
            linking: state.accepted_linking(package),
            available,
        }
    }

    /// One line summary
    pub fn summary(&self) -> String {
        if self.linking.is_empty() {
            return format!(
                "requirements on '{}' disagree on static/dynamic linking",
                self.package
            );
        }
        if self.constraints.is_empty() {
            return format!("no installable version of '{}'", self.package);
        }

        let ranges: Vec<&str> = self
            .constraints
            .iter()
            .map(|c| c.requirement.as_str())
            .collect();
        format!(
            "no version of '{}' satisfies '{}'",
            self.package,
            ranges.join(" ")
        )
    }

    /// Generate human-readable conflict report
    pub fn report(&self) -> String {
        let mut report = format!("Version conflict for package '{}':\n", self.package);

        for constraint in &self.constraints {
            report.push_str(&format!(
                "  {} requires {}\n",
                constraint.source, constraint.requirement
            ));
        }

        if self.linking.is_empty() {
            report.push_str("  requirements disagree on static/dynamic linking\n");
        } else if self.linking.len() < Linking::ALL.len() {
            let linking: Vec<String> = self.linking.iter().map(|l| l.to_string()).collect();
            report.push_str(&format!("  linking restricted to {}\n", linking.join(", ")));
        }

        if self.available.is_empty() {
            report.push_str("  no versions available\n");
        } else {
            let available: Vec<String> = self.available.iter().map(|v| v.to_string()).collect();
            report.push_str(&format!("  available: {}\n", available.join(", ")));
        }

        report.push_str("\nPossible solutions:\n");
        report.push_str("  1. Update dependencies to compatible versions\n");
        report.push_str("  2. Relax the version or linking constraints in deplink.json\n");
        report.push_str("  3. Check for alternative packages\n");

        report
    }

    /// Get the number of conflicting constraints
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}

impl ConflictingConstraint {
    /// Create from a state requirement
    pub fn from_requirement(requirement: &Requirement) -> Self {
        Self {
            requirement: requirement.range.clone(),
            source: requirement.required_by.clone(),
        }
    }
}
