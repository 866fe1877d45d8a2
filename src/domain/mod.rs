pub mod asset;
pub mod candidate;
pub mod entry;

pub use asset::LocalAsset;
pub use candidate::{Ambiguity, Candidate};
pub use entry::{Enclosure, EntrySummary, FeedEntry};
