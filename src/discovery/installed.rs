//! Installed distribution enumeration from site-packages metadata.

use crate::discovery::canonicalize_name;
use crate::types::{DepconfuseError, Result, Target, Targets};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, trace, warn};

/// Prints one `sys.path` entry per line.
const SYS_PATH_SCRIPT: &str = "import sys\nfor p in sys.path:\n    print(p)";

/// Enumerates installed Python distributions.
#[derive(Debug, Clone)]
pub struct InstalledPackages {
    site_dirs: Vec<PathBuf>,
    python: String,
}

impl InstalledPackages {
    /// `site_dirs` overrides interpreter discovery when non-empty.
    pub fn new(site_dirs: Vec<PathBuf>, python: impl Into<String>) -> Self {
        Self {
            site_dirs,
            python: python.into(),
        }
    }

    /// List installed packages. Any failure is logged and yields an empty set.
    pub async fn enumerate(&self) -> Targets {
        let dirs = if self.site_dirs.is_empty() {
            match self.interpreter_paths().await {
                Ok(dirs) => dirs,
                Err(e) => {
                    warn!("Error getting installed packages: {}", e);
                    return Targets::new();
                }
            }
        } else {
            self.site_dirs.clone()
        };

        debug!("Scanning {} site directories", dirs.len());
        scan_site_dirs(&dirs)
    }

    /// Ask the interpreter for its import path.
    async fn interpreter_paths(&self) -> Result<Vec<PathBuf>> {
        let output = Command::new(&self.python)
            .args(["-c", SYS_PATH_SCRIPT])
            .output()
            .await
            .map_err(|e| DepconfuseError::InterpreterError(format!("{}: {}", self.python, e)))?;

        if !output.status.success() {
            return Err(DepconfuseError::InterpreterError(format!(
                "{} exited with {}: {}",
                self.python,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .filter(|p| p.is_dir())
            .collect())
    }
}

/// Scan site directories for `*.dist-info` and `*.egg-info` metadata.
///
/// Earlier directories shadow later ones, as on the interpreter path. The
/// result is ordered by canonical name.
pub fn scan_site_dirs(dirs: &[PathBuf]) -> Targets {
    let mut found = Targets::new();

    for dir in dirs {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Skipping {}: {}", dir.display(), e);
                continue;
            }
        };

        let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        paths.sort();

        for path in paths {
            let Some((name, version)) = read_distribution(&path) else {
                continue;
            };
            let canonical = canonicalize_name(&name);
            if found.contains_key(&canonical) {
                trace!("Shadowed distribution {} at {}", name, path.display());
                continue;
            }
            found.insert(
                canonical,
                Target {
                    name,
                    local_version: version,
                },
            );
        }
    }

    found.sort_keys();
    found
}

/// Read name and version for one metadata entry, if it is one.
fn read_distribution(path: &Path) -> Option<(String, Option<String>)> {
    let file_name = path.file_name()?.to_str()?;
    let (stem, metadata_file) = if let Some(stem) = file_name.strip_suffix(".dist-info") {
        (stem, path.join("METADATA"))
    } else if let Some(stem) = file_name.strip_suffix(".egg-info") {
        if path.is_dir() {
            (stem, path.join("PKG-INFO"))
        } else {
            (stem, path.to_path_buf())
        }
    } else {
        return None;
    };

    let (fallback_name, fallback_version) = split_dist_stem(stem);

    let (name, version) = match fs::read_to_string(&metadata_file) {
        Ok(content) => parse_metadata(&content),
        Err(e) => {
            debug!("No readable metadata at {}: {}", metadata_file.display(), e);
            (None, None)
        }
    };

    let name = name.or(fallback_name)?;
    Some((name, version.or(fallback_version)))
}

/// Extract `Name:` and `Version:` from the header block of core metadata.
pub fn parse_metadata(content: &str) -> (Option<String>, Option<String>) {
    let mut name = None;
    let mut version = None;

    for line in content.lines() {
        if line.trim().is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.trim().to_ascii_lowercase().as_str() {
                "name" if name.is_none() => name = Some(value.to_string()),
                "version" if version.is_none() => version = Some(value.to_string()),
                _ => {}
            }
        }
    }

    (name, version)
}

/// `foo_bar-1.2.0` or `foo_bar-1.2.0-py3.11` into name and version.
fn split_dist_stem(stem: &str) -> (Option<String>, Option<String>) {
    let mut parts = stem.splitn(3, '-');
    let name = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
    let version = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
    (name, version)
}
