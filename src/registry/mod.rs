//! Registry lookups.
//!
//! The scanner only sees the [`RegistryLookup`] trait, so any transport can
//! sit behind it. [`PypiRegistry`] talks to the PyPI JSON API.

pub mod pypi;

use crate::types::{LookupError, RegistryStatus};
use async_trait::async_trait;

pub use pypi::PypiRegistry;

/// Source of published package versions.
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    /// Look up `package_name`, returning whether it is published and at which version.
    async fn lookup(&self, package_name: &str) -> Result<RegistryStatus, LookupError>;
}
