//! depconfuse - dependency confusion detector.
//!
//! CLI entry point.

use clap::Parser;
use depconfuse::config::fill_installed_versions;
use depconfuse::discovery::InstalledPackages;
use depconfuse::notify::{write_json_report, ConsoleOutput};
use depconfuse::{Config, PypiRegistry, ScanReport, Scanner, Targets};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status for runs that could not produce a report.
const EXIT_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Set up logging
    let filter = if config.verbose {
        EnvFilter::new("depconfuse=debug,info")
    } else {
        EnvFilter::new("depconfuse=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&config).await {
        Ok(report) => ExitCode::from(report.exit_code()),
        Err(code) => code,
    }
}

async fn run(config: &Config) -> Result<ScanReport, ExitCode> {
    let targets = resolve_targets(config).await?;
    let console = ConsoleOutput::new(config.verbose, config.json, config.quiet);

    let report = if targets.is_empty() {
        warn!("No packages found to check.");
        ScanReport::default()
    } else {
        let registry = match PypiRegistry::new(
            &config.registry_url,
            &config.http_config(),
            config.rate_limit,
        ) {
            Ok(r) => r.with_prereleases(config.include_prereleases),
            Err(e) => {
                error!("Failed to create registry client: {}", e);
                return Err(ExitCode::from(EXIT_ERROR));
            }
        };

        console.print_scan_start(targets.len(), &config.registry_url);
        Scanner::new(config.parallel, console.clone())
            .run(&targets, &registry)
            .await
    };

    console.print_report(&report);

    if config.json || config.output.is_some() {
        let path = config.output.as_deref();
        if let Err(e) = write_json_report(&report, path) {
            error!("Failed to write output file: {}", e);
            return Err(ExitCode::from(EXIT_ERROR));
        }
        if let Some(path) = path {
            info!("Results written to: {:?}", path);
        }
    }

    Ok(report)
}

/// Explicit targets with installed versions filled in, or every installed package.
async fn resolve_targets(config: &Config) -> Result<Targets, ExitCode> {
    let installed = InstalledPackages::new(config.site_packages.clone(), config.python.clone());

    if !config.has_explicit_targets() {
        return Ok(installed.enumerate().await);
    }

    let mut targets = match config.load_targets() {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to load targets: {}", e);
            return Err(ExitCode::from(EXIT_ERROR));
        }
    };

    if targets.values().any(|t| t.local_version.is_none()) {
        fill_installed_versions(&mut targets, &installed.enumerate().await);
    }

    Ok(targets)
}
