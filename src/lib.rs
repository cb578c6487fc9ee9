//! depconfuse - dependency confusion detector for Python packages.
//!
//! Flags installed packages whose version is greater than the version
//! published under the same name on a public registry. Such a name is likely
//! internal, and anyone can register it publicly with an even higher version.
//!
//! # Example
//!
//! ```no_run
//! use depconfuse::config::Config;
//! use depconfuse::notify::ConsoleOutput;
//! use depconfuse::registry::PypiRegistry;
//! use depconfuse::scanner::Scanner;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let registry = PypiRegistry::new(&config.registry_url, &config.http_config(), 10).unwrap();
//!     let targets = config.load_targets().unwrap();
//!     let report = Scanner::new(8, ConsoleOutput::default()).run(&targets, &registry).await;
//!     println!("vulnerable: {}", report.has_vulnerabilities);
//! }
//! ```

pub mod classify;
pub mod config;
pub mod discovery;
pub mod notify;
pub mod registry;
pub mod scanner;
pub mod types;
pub mod version;

pub use classify::classify;
pub use config::Config;
pub use registry::{PypiRegistry, RegistryLookup};
pub use scanner::Scanner;
pub use types::{
    DepconfuseError, LookupError, Outcome, PackageRecord, RegistryStatus, Result, ScanEntry,
    ScanReport, Target, Targets,
};
pub use version::{Version, VersionError, VersionState};
