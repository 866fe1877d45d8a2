use std::collections::HashSet;

use crate::domain::{Candidate, EntrySummary, LocalAsset};
use crate::errors::FeederResult;

#[cfg_attr(test, mockall::automock)]
pub trait FeedStore {
    /// GUIDs of every item already in the feed
    fn existing_identifiers(&self) -> FeederResult<HashSet<String>>;

    /// Every item in document order
    fn entries(&self) -> FeederResult<Vec<EntrySummary>>;

    /// Append one item as a single atomic rewrite of the document.
    /// Returns false when the guid was already present and nothing was written.
    fn append_entry(&self, candidate: &Candidate, asset: &LocalAsset) -> FeederResult<bool>;

    /// Append many items in one read-modify-write cycle, returning the
    /// guids actually written
    fn append_entries(&self, items: &[(Candidate, LocalAsset)]) -> FeederResult<Vec<String>>;
}
