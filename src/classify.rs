//! Confusion classification: decides one outcome per package.

use crate::types::Outcome;
use crate::version::VersionState;

/// Classify a package from its local version and what the registry reported.
///
/// Rules, first match wins:
/// 1. not on the registry => `NotOnRegistry`
/// 2. either side missing or unparseable => `Unparseable`
/// 3. local newer than registry => `Confused`
/// 4. otherwise => `UpToDate`
pub fn classify(local: &VersionState, registry_present: bool, registry: &VersionState) -> Outcome {
    if !registry_present {
        return Outcome::NotOnRegistry;
    }

    match (local, registry) {
        (VersionState::Parsed(local), VersionState::Parsed(registry)) => {
            if local > registry {
                Outcome::Confused
            } else {
                Outcome::UpToDate
            }
        }
        _ => Outcome::Unparseable,
    }
}
