//! Report output.
//!
//! This module handles:
//! - Colored console output
//! - Lookup progress bars
//! - JSON report serialization

pub mod console;

pub use console::{write_json_report, ConsoleOutput};
