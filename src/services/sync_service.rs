use std::collections::HashSet;

use crate::domain::{Candidate, LocalAsset};
use crate::errors::{FeederError, FeederResult};
use crate::services::asset_service::{AssetFetcher, AssetService};
use crate::sources::CandidateSource;
use crate::storage::FeedStore;

/// Candidates whose identifier is not in `existing`, in discovery order.
/// A repeated identifier within the batch keeps only its first occurrence.
pub fn select_new(candidates: Vec<Candidate>, existing: &HashSet<String>) -> Vec<Candidate> {
    let mut seen: HashSet<String> = HashSet::new();

    candidates
        .into_iter()
        .filter(|c| {
            if existing.contains(&c.identifier) {
                return false;
            }
            if !seen.insert(c.identifier.clone()) {
                tracing::debug!(
                    identifier = %c.identifier,
                    "identifier listed more than once, keeping the first"
                );
                return false;
            }
            true
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Report what would be added without downloading or writing
    pub dry_run: bool,
    /// Write all new items in one rewrite at the end of the run
    pub batch: bool,
}

/// Progress notifications emitted while a run advances
#[derive(Debug)]
pub enum SyncEvent<'a> {
    Discovered { source: &'a str, count: usize },
    Existing { count: usize },
    Selected { count: usize },
    Processing { candidate: &'a Candidate },
    Downloaded { asset: &'a LocalAsset },
    Reused { asset: &'a LocalAsset },
    Appended { identifier: &'a str },
    /// The store already held this guid and wrote nothing
    Skipped { identifier: &'a str },
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub discovered: usize,
    pub existing: usize,
    /// New candidates, in the order they were (or would be) processed
    pub selected: Vec<Candidate>,
    pub appended: Vec<String>,
    pub downloaded: usize,
    pub reused: usize,
}

pub struct SyncService<S: CandidateSource, F: AssetFetcher, T: FeedStore> {
    source: S,
    assets: AssetService<F>,
    store: T,
}

impl<S: CandidateSource, F: AssetFetcher, T: FeedStore> SyncService<S, F, T> {
    pub fn new(source: S, assets: AssetService<F>, store: T) -> Self {
        Self {
            source,
            assets,
            store,
        }
    }

    /// List, deduplicate, download and append. Items appended before a
    /// failure stay in the feed; the failing item is named in the error.
    pub fn run<E>(&self, options: SyncOptions, mut on_event: E) -> FeederResult<SyncReport>
    where
        E: FnMut(SyncEvent<'_>),
    {
        let mut report = SyncReport::default();

        let candidates = self.source.list_candidates()?;
        report.discovered = candidates.len();
        on_event(SyncEvent::Discovered {
            source: self.source.name(),
            count: report.discovered,
        });

        let existing = self.store.existing_identifiers()?;
        report.existing = existing.len();
        on_event(SyncEvent::Existing {
            count: report.existing,
        });

        let selected = select_new(candidates, &existing);
        on_event(SyncEvent::Selected {
            count: selected.len(),
        });

        if options.dry_run || selected.is_empty() {
            report.selected = selected;
            return Ok(report);
        }

        let mut pending = Vec::new();

        for candidate in &selected {
            on_event(SyncEvent::Processing { candidate });

            let asset = self
                .assets
                .ensure_local(candidate)
                .map_err(|e| FeederError::for_item(&candidate.identifier, e))?;

            if asset.reused {
                report.reused += 1;
                on_event(SyncEvent::Reused { asset: &asset });
            } else {
                report.downloaded += 1;
                on_event(SyncEvent::Downloaded { asset: &asset });
            }

            if options.batch {
                pending.push((candidate.clone(), asset));
                continue;
            }

            let written = self
                .store
                .append_entry(candidate, &asset)
                .map_err(|e| FeederError::for_item(&candidate.identifier, e))?;

            let identifier = candidate.identifier.as_str();
            if written {
                report.appended.push(identifier.to_string());
                on_event(SyncEvent::Appended { identifier });
            } else {
                on_event(SyncEvent::Skipped { identifier });
            }
        }

        if !pending.is_empty() {
            let written = self.store.append_entries(&pending)?;
            for (candidate, _) in &pending {
                let identifier = candidate.identifier.as_str();
                if written.iter().any(|id| id == identifier) {
                    report.appended.push(identifier.to_string());
                    on_event(SyncEvent::Appended { identifier });
                } else {
                    on_event(SyncEvent::Skipped { identifier });
                }
            }
        }

        report.selected = selected;
        Ok(report)
    }
}
