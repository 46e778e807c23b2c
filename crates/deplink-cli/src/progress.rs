//! Terminal reporting of installation events

use colored::Colorize;
use deplink_package::{InstallError, InstallProgress};
use indicatif::{ProgressBar, ProgressStyle};
use semver::Version;

/// Prints one line per package and draws a download bar while it runs
pub struct InstallationReporter {
    show_progress: bool,
    bar: Option<ProgressBar>,
}

impl InstallationReporter {
    pub fn new(show_progress: bool) -> Self {
        Self {
            show_progress,
            bar: None,
        }
    }

    fn start(&mut self, line: String) {
        if !self.show_progress {
            return;
        }

        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("  - {msg} [{bar:30.green/white}] {pos:>3}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message(line);
        self.bar = Some(bar);
    }

    fn advance(&mut self, percent: u8) {
        if let Some(bar) = &self.bar {
            bar.set_position(u64::from(percent.min(100)));
        }
    }

    fn succeed(&mut self, line: String) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        println!("  - {}", line);
    }

    fn fail(&mut self, line: String, error: &InstallError) {
        if let Some(bar) = self.bar.take() {
            bar.abandon();
        }
        eprintln!("  - {} {}", line, "failed".red().bold());
        log::debug!("{:?}", error);
    }
}

impl InstallProgress for InstallationReporter {
    fn before_installation(&mut self, installs: usize, updates: usize, removals: usize) {
        println!(
            "{}",
            dependencies_line(installs, updates, removals).bold()
        );
    }

    fn removing_started(&mut self, name: &str) {
        self.start(removing_line(name));
    }

    fn removing_progress(&mut self, _name: &str, percent: u8) {
        self.advance(percent);
    }

    fn removing_succeed(&mut self, name: &str) {
        self.succeed(removing_line(name));
    }

    fn removing_failed(&mut self, name: &str, error: &InstallError) {
        self.fail(removing_line(name), error);
    }

    fn updating_started(&mut self, name: &str, from: &Version, to: &Version) {
        self.start(updating_line(name, from, to));
    }

    fn updating_progress(&mut self, _name: &str, _from: &Version, _to: &Version, percent: u8) {
        self.advance(percent);
    }

    fn updating_succeed(&mut self, name: &str, from: &Version, to: &Version) {
        self.succeed(updating_line(name, from, to));
    }

    fn updating_failed(&mut self, name: &str, from: &Version, to: &Version, error: &InstallError) {
        self.fail(updating_line(name, from, to), error);
    }

    fn installing_started(&mut self, name: &str, version: &Version) {
        self.start(installing_line(name, version));
    }

    fn installing_progress(&mut self, _name: &str, _version: &Version, percent: u8) {
        self.advance(percent);
    }

    fn installing_succeed(&mut self, name: &str, version: &Version) {
        self.succeed(installing_line(name, version));
    }

    fn installing_failed(&mut self, name: &str, version: &Version, error: &InstallError) {
        self.fail(installing_line(name, version), error);
    }
}

pub fn dependencies_line(installs: usize, updates: usize, removals: usize) -> String {
    format!(
        "Dependencies: {} {}, {} {}, {} {}",
        installs,
        plural(installs, "install", "installs"),
        updates,
        plural(updates, "update", "updates"),
        removals,
        plural(removals, "removal", "removals"),
    )
}

pub fn installing_line(name: &str, version: &Version) -> String {
    format!("Installing {} ({})", name.green(), format!("v{}", version).yellow())
}

pub fn updating_line(name: &str, from: &Version, to: &Version) -> String {
    format!(
        "Updating {} ({} -> {})",
        name.green(),
        format!("v{}", from).yellow(),
        format!("v{}", to).yellow()
    )
}

pub fn removing_line(name: &str) -> String {
    format!("Removing {}", name.green())
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        one
    } else {
        many
    }
}
