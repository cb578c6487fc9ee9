//! Core types and errors for the dependency confusion detector.

use crate::version::VersionState;
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

/// Errors that can stop a run before or after the scan itself.
#[derive(Error, Debug)]
pub enum DepconfuseError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Interpreter query failed: {0}")]
    InterpreterError(String),
}

pub type Result<T> = std::result::Result<T, DepconfuseError>;

/// Failure of a single registry lookup. Never aborts a scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("registry returned HTTP {0}")]
    Status(u16),

    #[error("rate limited by registry")]
    RateLimited,

    #[error("invalid registry response: {0}")]
    InvalidResponse(String),
}

/// What the registry knows about a package name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RegistryStatus {
    /// No package of that name is published.
    NotPresent,
    /// Published; `version` is the one to compare against, if the registry gave one.
    Present { version: Option<String> },
}

/// Terminal classification of a checked package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Name is not published on the registry (possibly a private package).
    NotOnRegistry,
    /// Local version is newer than the registry version.
    Confused,
    /// Local version is equal to or older than the registry version.
    UpToDate,
    /// One side's version is missing or could not be parsed.
    Unparseable,
    /// Registry lookup failed.
    LookupFailed,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::NotOnRegistry => "not on registry",
            Outcome::Confused => "CONFUSED",
            Outcome::UpToDate => "up to date",
            Outcome::Unparseable => "unparseable",
            Outcome::LookupFailed => "lookup failed",
        }
    }
}

/// A package to check: display name plus the locally installed version, if known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub local_version: Option<String>,
}

/// Packages to check, keyed by canonical name, in caller order.
pub type Targets = IndexMap<String, Target>;

/// Everything learned about one package during a scan.
#[derive(Debug, Clone, Serialize)]
pub struct PackageRecord {
    /// Name as given by the caller.
    pub name: String,
    /// Normalized name, used as the package identity.
    pub canonical_name: String,
    pub local_version: Option<String>,
    pub registry_present: bool,
    pub registry_version: Option<String>,
    /// Why a version could not be used, or why the lookup failed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(skip)]
    pub local: VersionState,
    #[serde(skip)]
    pub registry: VersionState,
}

/// A record together with its outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ScanEntry {
    #[serde(flatten)]
    pub record: PackageRecord,
    pub outcome: Outcome,
}

/// Ordered result of a scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub entries: Vec<ScanEntry>,
    pub has_vulnerabilities: bool,
    /// Scan duration in seconds.
    pub duration_secs: f64,
}

impl ScanReport {
    /// Build a report, deriving `has_vulnerabilities` from the entries.
    pub fn new(entries: Vec<ScanEntry>, duration_secs: f64) -> Self {
        let has_vulnerabilities = entries.iter().any(|e| e.outcome == Outcome::Confused);
        Self {
            entries,
            has_vulnerabilities,
            duration_secs,
        }
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }

    pub fn vulnerable(&self) -> impl Iterator<Item = &ScanEntry> {
        self.entries
            .iter()
            .filter(|e| e.outcome == Outcome::Confused)
    }

    /// Process exit code for this report: 0 when clean, 1 when anything is confused.
    pub fn exit_code(&self) -> u8 {
        if self.has_vulnerabilities {
            1
        } else {
            0
        }
    }
}

/// Configuration for HTTP requests.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            user_agent: "depconfuse/0.1".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, outcome: Outcome) -> ScanEntry {
        ScanEntry {
            record: PackageRecord {
                name: name.to_string(),
                canonical_name: name.to_string(),
                local_version: None,
                registry_present: false,
                registry_version: None,
                notes: Vec::new(),
                local: VersionState::Unknown,
                registry: VersionState::Unknown,
            },
            outcome,
        }
    }

    #[test]
    fn test_exit_code_clean_report() {
        let report = ScanReport::new(
            vec![
                entry("a", Outcome::NotOnRegistry),
                entry("b", Outcome::Unparseable),
                entry("c", Outcome::LookupFailed),
                entry("d", Outcome::UpToDate),
            ],
            0.0,
        );
        assert!(!report.has_vulnerabilities);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_exit_code_with_confused() {
        let report = ScanReport::new(
            vec![
                entry("a", Outcome::NotOnRegistry),
                entry("b", Outcome::Confused),
            ],
            0.0,
        );
        assert!(report.has_vulnerabilities);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.count(Outcome::Confused), 1);
        assert_eq!(report.vulnerable().count(), 1);
    }

    #[test]
    fn test_empty_report() {
        let report = ScanReport::default();
        assert!(report.entries.is_empty());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_report_serializes_outcome_snake_case() {
        let report = ScanReport::new(vec![entry("foo", Outcome::NotOnRegistry)], 0.0);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entries"][0]["outcome"], "not_on_registry");
        assert_eq!(json["entries"][0]["name"], "foo");
        assert!(json["entries"][0].get("notes").is_none());
    }
}
