use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Which extraction heuristic fell back to a guess
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ambiguity {
    /// No docket number found; the filename stands in as identifier
    Identifier,
    /// No date found in the filename; the discovery time stands in
    Date,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub identifier: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub resource_url: String,
    pub ambiguities: Vec<Ambiguity>,
}

impl Candidate {
    pub fn new(
        identifier: String,
        title: String,
        timestamp: DateTime<Utc>,
        resource_url: String,
    ) -> Self {
        let title = if title.trim().is_empty() {
            identifier.clone()
        } else {
            title.trim().to_string()
        };

        Self {
            identifier,
            title,
            timestamp,
            resource_url,
            ambiguities: Vec::new(),
        }
    }

    pub fn with_ambiguity(mut self, ambiguity: Ambiguity) -> Self {
        if !self.ambiguities.contains(&ambiguity) {
            self.ambiguities.push(ambiguity);
        }
        self
    }

    pub fn is_ambiguous(&self, ambiguity: Ambiguity) -> bool {
        self.ambiguities.contains(&ambiguity)
    }

    /// Local filename of the re-hosted audio file.
    ///
    /// Identifiers made only of `[A-Za-z0-9._-]` map to `{identifier}.mp3`.
    /// Anything else is escaped and suffixed with `~` plus a digest of the
    /// raw identifier, so distinct identifiers never share a file. The
    /// result is safe both as a filename and as a URL path segment.
    pub fn asset_filename(&self) -> String {
        let is_safe = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');

        if !self.identifier.is_empty() && self.identifier.chars().all(is_safe) {
            return format!("{}.mp3", self.identifier);
        }

        let stem: String = self
            .identifier
            .chars()
            .map(|c| if is_safe(c) { c } else { '_' })
            .collect();

        format!("{}~{}.mp3", stem, identifier_digest(&self.identifier))
    }
}

fn identifier_digest(identifier: &str) -> String {
    let digest = Sha256::digest(identifier.as_bytes());
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
