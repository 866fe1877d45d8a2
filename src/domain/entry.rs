use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Candidate;

pub const AUDIO_MIME_TYPE: &str = "audio/mpeg";
pub const ITUNES_NAMESPACE: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    pub length: u64,
    pub mime_type: String,
}

/// A fully-formed `<item>` ready to be appended to the feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub guid: String,
    pub title: String,
    pub enclosure: Enclosure,
    pub pub_date: String,
    pub description: String,
    pub explicit: bool,
}

impl FeedEntry {
    /// Build the entry for a candidate whose audio now lives at
    /// `{base_url}/{asset_name}` and is `length` bytes long.
    pub fn from_candidate(
        candidate: &Candidate,
        base_url: &str,
        asset_name: &str,
        length: u64,
    ) -> Self {
        Self {
            guid: candidate.identifier.clone(),
            title: format!("{} – {}", candidate.identifier, candidate.title),
            enclosure: Enclosure {
                url: enclosure_url(base_url, asset_name),
                length,
                mime_type: AUDIO_MIME_TYPE.to_string(),
            },
            pub_date: format_pub_date(&candidate.timestamp),
            description: format!(
                "Oral argument for docket {}: {}.",
                candidate.identifier, candidate.title
            ),
            explicit: false,
        }
    }
}

/// What the store reads back from an existing `<item>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub guid: Option<String>,
    pub title: Option<String>,
    pub enclosure_url: Option<String>,
}

pub fn enclosure_url(base_url: &str, asset_name: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        asset_name.trim_start_matches('/')
    )
}

/// RFC 2822 date with a zero-padded day, always in UTC
pub fn format_pub_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}
