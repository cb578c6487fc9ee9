//! Target discovery.
//!
//! This module handles:
//! - Package name canonicalization (case-insensitive identity)
//! - Building the ordered target set
//! - Enumerating installed distributions from site-packages

pub mod installed;

pub use installed::InstalledPackages;

use crate::types::{Target, Targets};
use tracing::warn;

/// Normalize a package name: lowercase, with runs of `-`, `_` and `.` collapsed to `-`.
pub fn canonicalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .fold(String::with_capacity(name.len()), |mut out, c| {
            if matches!(c, '-' | '_' | '.') {
                if !out.ends_with('-') {
                    out.push('-');
                }
            } else {
                out.extend(c.to_lowercase());
            }
            out
        })
}

/// Add a target unless a package with the same canonical name is already present.
///
/// Returns false when the name was a duplicate.
pub fn add_target(targets: &mut Targets, name: &str, local_version: Option<String>) -> bool {
    let canonical = canonicalize_name(name);
    if targets.contains_key(&canonical) {
        warn!("Duplicate package '{}' ignored", name);
        return false;
    }
    targets.insert(
        canonical,
        Target {
            name: name.trim().to_string(),
            local_version,
        },
    );
    true
}

/// Split a `name==version` spec. A bare name has no version.
pub fn parse_target_spec(spec: &str) -> Option<(String, Option<String>)> {
    let spec = spec.trim();
    let (name, version) = match spec.split_once("==") {
        Some((name, version)) => (name.trim(), Some(version.trim().to_string())),
        None => (spec, None),
    };
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), version.filter(|v| !v.is_empty())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_name() {
        assert_eq!(canonicalize_name("Requests"), "requests");
        assert_eq!(canonicalize_name("my_internal.Lib"), "my-internal-lib");
        assert_eq!(canonicalize_name("zope..interface"), "zope-interface");
        assert_eq!(canonicalize_name(" foo-_-bar "), "foo-bar");
    }

    #[test]
    fn test_add_target_dedupes_case_insensitively() {
        let mut targets = Targets::new();
        assert!(add_target(&mut targets, "Foo_Bar", Some("1.0".to_string())));
        assert!(!add_target(&mut targets, "foo-bar", Some("2.0".to_string())));
        assert!(add_target(&mut targets, "baz", None));

        assert_eq!(targets.len(), 2);
        let first = &targets["foo-bar"];
        assert_eq!(first.name, "Foo_Bar");
        assert_eq!(first.local_version.as_deref(), Some("1.0"));
        assert_eq!(targets.get_index(1).map(|(k, _)| k.as_str()), Some("baz"));
    }

    #[test]
    fn test_parse_target_spec() {
        assert_eq!(
            parse_target_spec("foo==2.0.0"),
            Some(("foo".to_string(), Some("2.0.0".to_string())))
        );
        assert_eq!(parse_target_spec("  bar "), Some(("bar".to_string(), None)));
        assert_eq!(parse_target_spec("baz=="), Some(("baz".to_string(), None)));
        assert_eq!(parse_target_spec("==1.0"), None);
        assert_eq!(parse_target_spec(""), None);
    }
}
