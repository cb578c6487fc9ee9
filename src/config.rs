//! Configuration handling for the detector.

use crate::discovery::{add_target, parse_target_spec};
use crate::registry::pypi::DEFAULT_REGISTRY_URL;
use crate::types::{DepconfuseError, HttpConfig, Result, Targets};
use clap::Parser;
use std::path::PathBuf;

/// Identifies potential dependency confusion in installed Python packages.
#[derive(Parser, Debug, Clone)]
#[command(name = "depconfuse")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Package to check, as `name` or `name==version` (repeatable).
    /// Without any, all installed packages are checked.
    #[arg(short, long = "package")]
    pub packages: Vec<String>,

    /// File of packages to check (one `name[==version]` per line)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Base URL of the registry JSON API
    #[arg(short, long, env = "DEPCONFUSE_REGISTRY_URL", default_value = DEFAULT_REGISTRY_URL)]
    pub registry_url: String,

    /// site-packages directory to enumerate instead of asking the interpreter (repeatable)
    #[arg(long)]
    pub site_packages: Vec<PathBuf>,

    /// Python interpreter used to locate site-packages
    #[arg(long, default_value = "python3")]
    pub python: String,

    /// Compare against the newest release including pre-releases
    #[arg(long)]
    pub include_prereleases: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Output file path for the JSON report (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Quiet mode: only show confused packages
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Maximum retries for failed requests
    #[arg(long, default_value = "3")]
    pub max_retries: u32,

    /// Rate limit (requests per second)
    #[arg(long, default_value = "10")]
    pub rate_limit: u32,

    /// Number of registry lookups in flight
    #[arg(long, default_value = "8")]
    pub parallel: usize,

    /// Custom User-Agent string
    #[arg(long)]
    pub user_agent: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            packages: Vec::new(),
            file: None,
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            site_packages: Vec::new(),
            python: "python3".to_string(),
            include_prereleases: false,
            verbose: false,
            json: false,
            output: None,
            quiet: false,
            timeout: 30,
            max_retries: 3,
            rate_limit: 10,
            parallel: 8,
            user_agent: None,
        }
    }
}

impl Config {
    /// Get HTTP configuration from the command line.
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            timeout_secs: self.timeout,
            max_retries: self.max_retries,
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| format!("depconfuse/{}", env!("CARGO_PKG_VERSION"))),
        }
    }

    /// True when packages were named explicitly rather than enumerated.
    pub fn has_explicit_targets(&self) -> bool {
        !self.packages.is_empty() || self.file.is_some()
    }

    /// Load explicit targets from `--package` and `--file`, in that order.
    pub fn load_targets(&self) -> Result<Targets> {
        let mut specs = self.packages.clone();

        if let Some(ref file_path) = self.file {
            let content = std::fs::read_to_string(file_path)?;
            for line in content.lines() {
                let trimmed = line.trim();
                if !trimmed.is_empty() && !trimmed.starts_with('#') {
                    specs.push(trimmed.to_string());
                }
            }
        }

        let mut targets = Targets::new();
        for spec in specs {
            let (name, version) = parse_target_spec(&spec)
                .ok_or_else(|| DepconfuseError::ConfigError(format!("invalid package spec '{}'", spec)))?;
            add_target(&mut targets, &name, version);
        }

        Ok(targets)
    }
}

/// Fill in versions for explicit targets that were given without one.
pub fn fill_installed_versions(targets: &mut Targets, installed: &Targets) {
    for (canonical, target) in targets.iter_mut() {
        if target.local_version.is_none() {
            target.local_version = installed
                .get(canonical)
                .and_then(|t| t.local_version.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Target;

    #[test]
    fn test_parse_cli() {
        let config = Config::parse_from([
            "depconfuse",
            "-p",
            "foo==2.0.0",
            "--package",
            "bar",
            "-r",
            "https://mirror.example.com/pypi/",
            "-v",
        ]);
        assert_eq!(config.packages, vec!["foo==2.0.0", "bar"]);
        assert_eq!(config.registry_url, "https://mirror.example.com/pypi/");
        assert!(config.verbose);
        assert!(config.has_explicit_targets());
    }

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["depconfuse"]);
        assert!(config.packages.is_empty());
        assert!(!config.has_explicit_targets());
        assert_eq!(config.parallel, 8);
        assert_eq!(config.http_config().max_retries, 3);
    }

    #[test]
    fn test_load_targets_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packages.txt");
        std::fs::write(&path, "# internal packages\ninternal-lib==3.1.0\n\nFoo\nfoo==9.0\n").unwrap();

        let config = Config {
            packages: vec!["first".to_string()],
            file: Some(path),
            ..Config::default()
        };
        let targets = config.load_targets().unwrap();

        let names: Vec<&str> = targets.values().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["first", "internal-lib", "Foo"]);
        assert_eq!(targets["internal-lib"].local_version.as_deref(), Some("3.1.0"));
        assert_eq!(targets["foo"].local_version, None);
    }

    #[test]
    fn test_load_targets_rejects_bad_spec() {
        let config = Config {
            packages: vec!["==1.0".to_string()],
            ..Config::default()
        };
        assert!(matches!(
            config.load_targets(),
            Err(DepconfuseError::ConfigError(_))
        ));
    }

    #[test]
    fn test_fill_installed_versions() {
        let mut targets = Targets::new();
        add_target(&mut targets, "Requests", None);
        add_target(&mut targets, "pinned", Some("1.0".to_string()));
        add_target(&mut targets, "missing", None);

        let mut installed = Targets::new();
        installed.insert(
            "requests".to_string(),
            Target {
                name: "requests".to_string(),
                local_version: Some("2.32.3".to_string()),
            },
        );
        installed.insert(
            "pinned".to_string(),
            Target {
                name: "pinned".to_string(),
                local_version: Some("5.0".to_string()),
            },
        );

        fill_installed_versions(&mut targets, &installed);

        assert_eq!(targets["requests"].local_version.as_deref(), Some("2.32.3"));
        assert_eq!(targets["pinned"].local_version.as_deref(), Some("1.0"));
        assert_eq!(targets["missing"].local_version, None);
    }
}
