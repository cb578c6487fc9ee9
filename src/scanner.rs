//! Scan orchestration: lookup, parse and classify every target.

use crate::classify::classify;
use crate::notify::ConsoleOutput;
use crate::registry::RegistryLookup;
use crate::types::{Outcome, PackageRecord, RegistryStatus, ScanEntry, ScanReport, Target, Targets};
use crate::version::VersionState;
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs a scan over a target set against a registry.
pub struct Scanner {
    parallel: usize,
    console: ConsoleOutput,
}

impl Scanner {
    /// `parallel` bounds the number of lookups in flight.
    pub fn new(parallel: usize, console: ConsoleOutput) -> Self {
        Self {
            parallel: parallel.max(1),
            console,
        }
    }

    /// Check every target. Always produces a report; lookup failures become
    /// `LookupFailed` entries and never stop the scan.
    pub async fn run<L>(&self, targets: &Targets, lookup: &L) -> ScanReport
    where
        L: RegistryLookup + ?Sized,
    {
        let start_time = Instant::now();

        if targets.is_empty() {
            info!("No packages found to check");
            return ScanReport::default();
        }

        let progress = self
            .console
            .create_progress_bar(targets.len() as u64, "checking registry");

        // Lookups complete in any order; the index restores the input order
        let mut indexed: Vec<(usize, ScanEntry)> = stream::iter(targets.iter().enumerate())
            .map(|(index, (canonical, target))| {
                let progress = progress.as_ref();
                async move {
                    let entry = check_target(canonical, target, lookup).await;
                    if let Some(pb) = progress {
                        pb.inc(1);
                    }
                    (index, entry)
                }
            })
            .buffer_unordered(self.parallel)
            .collect()
            .await;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        indexed.sort_by_key(|(index, _)| *index);
        let entries = indexed.into_iter().map(|(_, entry)| entry).collect();

        ScanReport::new(entries, start_time.elapsed().as_secs_f64())
    }
}

/// Look up, parse and classify a single target.
async fn check_target<L>(canonical: &str, target: &Target, lookup: &L) -> ScanEntry
where
    L: RegistryLookup + ?Sized,
{
    let local = VersionState::from_raw(target.local_version.as_deref());
    let mut record = PackageRecord {
        name: target.name.clone(),
        canonical_name: canonical.to_string(),
        local_version: target.local_version.clone(),
        registry_present: false,
        registry_version: None,
        notes: Vec::new(),
        local,
        registry: VersionState::Unknown,
    };

    let status = match lookup.lookup(&target.name).await {
        Ok(status) => status,
        Err(e) => {
            warn!("Failed to check package '{}'. Skipping...", target.name);
            record.notes.push(e.to_string());
            return ScanEntry {
                record,
                outcome: Outcome::LookupFailed,
            };
        }
    };

    if let RegistryStatus::Present { version } = status {
        record.registry_present = true;
        record.registry = VersionState::from_raw(version.as_deref());
        record.registry_version = version;
    }

    let outcome = classify(&record.local, record.registry_present, &record.registry);
    if outcome == Outcome::Unparseable {
        record.notes.extend(unparseable_notes(&record));
    }

    match outcome {
        Outcome::Confused => warn!(
            "Potential dependency confusion: installed version '{}' of '{}' is newer than registry version '{}'",
            record.local_version.as_deref().unwrap_or("?"),
            record.name,
            record.registry_version.as_deref().unwrap_or("?"),
        ),
        Outcome::NotOnRegistry => debug!("Package '{}' not found on registry", record.name),
        other => debug!("Package '{}': {}", record.name, other.label()),
    }

    ScanEntry { record, outcome }
}

fn unparseable_notes(record: &PackageRecord) -> Vec<String> {
    let mut notes = Vec::new();
    for (side, state) in [("installed", &record.local), ("registry", &record.registry)] {
        match state {
            VersionState::Unknown => notes.push(format!("{} version unknown", side)),
            VersionState::Invalid { reason, .. } => {
                notes.push(format!("{} version unparseable: {}", side, reason))
            }
            VersionState::Parsed(_) => {}
        }
    }
    notes
}
