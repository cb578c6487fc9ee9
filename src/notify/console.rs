//! Colored console output for scan reports.

use crate::types::{Outcome, Result, ScanEntry, ScanReport};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Console output handler with colors and formatting.
#[derive(Debug, Clone)]
pub struct ConsoleOutput {
    verbose: bool,
    json_mode: bool,
    quiet: bool,
}

impl ConsoleOutput {
    /// Create a new console output handler.
    pub fn new(verbose: bool, json_mode: bool, quiet: bool) -> Self {
        Self { verbose, json_mode, quiet }
    }

    /// Print scan start message.
    pub fn print_scan_start(&self, package_count: usize, registry_url: &str) {
        if self.json_mode || self.quiet {
            return;
        }

        println!(
            "{} Checking {} packages against {}",
            "[*]".bright_blue(),
            package_count.to_string().bright_white(),
            registry_url.bright_white()
        );
    }

    /// Print one package line. Quiet mode only shows confused packages.
    pub fn print_entry(&self, entry: &ScanEntry) {
        if self.json_mode || (self.quiet && entry.outcome != Outcome::Confused) {
            return;
        }

        let record = &entry.record;
        println!(
            "  {} {}  installed: {}  registry: {}",
            format_outcome(entry.outcome),
            record.name.bright_white().bold(),
            record.local_version.as_deref().unwrap_or("-"),
            record.registry_version.as_deref().unwrap_or("-"),
        );

        if self.verbose {
            for note in &record.notes {
                println!("        {}", note.dimmed());
            }
        }
    }

    /// Print every entry followed by the summary.
    pub fn print_report(&self, report: &ScanReport) {
        if self.json_mode {
            return;
        }

        for entry in &report.entries {
            self.print_entry(entry);
        }

        if self.quiet && !report.has_vulnerabilities {
            return;
        }

        println!();
        println!("{}", "=== Scan Summary ===".bright_cyan());
        println!("  Packages:        {}", report.entries.len());
        println!("  Duration:        {:.2}s", report.duration_secs);
        println!("  Up to date:      {}", report.count(Outcome::UpToDate));
        println!("  Not on registry: {}", report.count(Outcome::NotOnRegistry));
        println!("  Unparseable:     {}", report.count(Outcome::Unparseable));
        println!("  Lookup failed:   {}", report.count(Outcome::LookupFailed));

        if report.has_vulnerabilities {
            println!();
            println!(
                "{}",
                "Potential Dependency Confusion Vulnerabilities Found:".red().bold()
            );
            for entry in report.vulnerable() {
                println!(
                    "  - Package: {}, Installed Version: {}, Registry Version: {}",
                    entry.record.name,
                    entry.record.local_version.as_deref().unwrap_or("-"),
                    entry.record.registry_version.as_deref().unwrap_or("-"),
                );
            }
        } else {
            println!(
                "  {}",
                "No potential dependency confusion vulnerabilities found.".green()
            );
        }

        println!();
    }

    /// Create a progress bar.
    pub fn create_progress_bar(&self, total: u64, message: &str) -> Option<ProgressBar> {
        if self.json_mode || self.quiet {
            return None;
        }

        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .ok()?
            .progress_chars("#>-");
        let pb = ProgressBar::new(total);
        pb.set_style(style);
        pb.set_message(message.to_string());
        Some(pb)
    }
}

/// Format an outcome label with color.
fn format_outcome(outcome: Outcome) -> colored::ColoredString {
    let label = format!("[{}]", outcome.label());
    match outcome {
        Outcome::Confused => label.on_red().white().bold(),
        Outcome::UpToDate => label.green(),
        Outcome::NotOnRegistry => label.blue(),
        Outcome::Unparseable => label.yellow(),
        Outcome::LookupFailed => label.yellow().dimmed(),
    }
}

/// Serialize the report as pretty JSON to `path`, or stdout when `None`.
pub fn write_json_report(report: &ScanReport, path: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match path {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{}", json),
    }
    Ok(())
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(false, false, false)
    }
}
