use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{Candidate, EntrySummary, FeedEntry, LocalAsset};
use crate::errors::{FeederError, FeederResult};
use crate::storage::atomic::write_atomic;
use crate::storage::feed_document::FeedDocument;
use crate::storage::traits::FeedStore;

/// Feed store backed by an RSS file on disk. Every append re-reads the
/// file and atomically replaces it.
pub struct XmlFeedStore {
    path: PathBuf,
    base_url: String,
}

impl XmlFeedStore {
    pub fn new<P: Into<PathBuf>>(path: P, base_url: &str) -> Self {
        Self {
            path: path.into(),
            base_url: base_url.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> FeederResult<FeedDocument> {
        let xml = fs::read_to_string(&self.path).map_err(|e| {
            FeederError::MalformedDocument(format!("{}: {}", self.path.display(), e))
        })?;

        FeedDocument::parse(&xml).map_err(|e| match e {
            FeederError::MalformedDocument(msg) => {
                FeederError::MalformedDocument(format!("{}: {}", self.path.display(), msg))
            }
            other => other,
        })
    }

    /// The item written for `candidate` once its audio is at `asset`
    pub fn entry_for(&self, candidate: &Candidate, asset: &LocalAsset) -> FeedEntry {
        FeedEntry::from_candidate(candidate, &self.base_url, &asset.file_name, asset.length)
    }
}

impl FeedStore for XmlFeedStore {
    fn existing_identifiers(&self) -> FeederResult<HashSet<String>> {
        Ok(self.load()?.identifiers())
    }

    fn entries(&self) -> FeederResult<Vec<EntrySummary>> {
        Ok(self.load()?.entries().to_vec())
    }

    fn append_entry(&self, candidate: &Candidate, asset: &LocalAsset) -> FeederResult<bool> {
        let written = self.append_entries(&[(candidate.clone(), asset.clone())])?;
        Ok(!written.is_empty())
    }

    fn append_entries(&self, items: &[(Candidate, LocalAsset)]) -> FeederResult<Vec<String>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let document = self.load()?;
        let mut seen = document.identifiers();

        let mut entries = Vec::with_capacity(items.len());
        for (candidate, asset) in items {
            if !seen.insert(candidate.identifier.clone()) {
                tracing::warn!(
                    guid = %candidate.identifier,
                    "feed already has an item with this guid, not appending"
                );
                continue;
            }
            entries.push(self.entry_for(candidate, asset));
        }

        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let bytes = document.render(&entries)?;
        write_atomic(&self.path, &bytes)?;

        tracing::debug!(
            path = %self.path.display(),
            appended = entries.len(),
            "feed document rewritten"
        );

        Ok(entries.into_iter().map(|entry| entry.guid).collect())
    }
}
