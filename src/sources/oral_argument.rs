use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use reqwest::blocking::Client;
use scraper::{Html, Selector};
use url::Url;

use crate::domain::{Ambiguity, Candidate};
use crate::errors::{FeederError, FeederResult};
use crate::sources::traits::CandidateSource;

/// Federal Circuit docket numbers, e.g. `2024-1002`
static DOCKET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4}-\d{3,5})\b").unwrap());

/// Argument dates embedded in recording filenames, `MM-DD-YYYY`
static DATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2})-(\d{2})-(\d{4})").unwrap());

/// Scrapes the court's "listen to oral arguments" page for `.mp3` links
pub struct OralArgumentIndex {
    client: Client,
    index_url: Url,
    strict: bool,
}

impl OralArgumentIndex {
    pub fn new(client: Client, index_url: &str, strict: bool) -> FeederResult<Self> {
        let index_url =
            Url::parse(index_url).map_err(|e| FeederError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            client,
            index_url,
            strict,
        })
    }

    fn fetch_html(&self) -> FeederResult<String> {
        let response = self
            .client
            .get(self.index_url.clone())
            .send()?
            .error_for_status()?;

        Ok(response.text()?)
    }

    /// Extract candidates from the index page. `now` stands in for links
    /// whose filename carries no date.
    pub fn parse_index(html: &str, base_url: &Url, now: DateTime<Utc>) -> Vec<Candidate> {
        let document = Html::parse_document(html);
        let link_selector = Selector::parse("a[href]").unwrap();

        let mut candidates = Vec::new();

        for link in document.select(&link_selector) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            if !href.to_lowercase().ends_with(".mp3") {
                continue;
            }

            let resource_url = match base_url.join(href) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(href, error = %e, "skipping audio link with invalid URL");
                    continue;
                }
            };

            let text = link.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            let filename = href.rsplit('/').next().unwrap_or(href);

            candidates.push(Self::candidate_from_link(
                filename,
                &text,
                resource_url.to_string(),
                now,
            ));
        }

        candidates
    }

    fn candidate_from_link(
        filename: &str,
        text: &str,
        resource_url: String,
        now: DateTime<Utc>,
    ) -> Candidate {
        let haystack = format!("{} {}", filename, text);
        let docket = DOCKET_REGEX
            .captures(&haystack)
            .map(|caps| caps[1].to_string());
        let date = parse_filename_date(filename);

        let identifier = docket.clone().unwrap_or_else(|| filename.to_string());
        let title = if text.is_empty() { identifier.clone() } else { text.to_string() };

        let mut candidate = Candidate::new(
            identifier,
            title,
            date.unwrap_or(now),
            resource_url,
        );

        if docket.is_none() {
            tracing::warn!(
                filename,
                "no docket number in audio link, using the filename as identifier"
            );
            candidate = candidate.with_ambiguity(Ambiguity::Identifier);
        }
        if date.is_none() {
            tracing::warn!(
                filename,
                "no argument date in audio filename, using the current time"
            );
            candidate = candidate.with_ambiguity(Ambiguity::Date);
        }

        candidate
    }
}

impl CandidateSource for OralArgumentIndex {
    fn name(&self) -> &str {
        self.index_url.as_str()
    }

    fn list_candidates(&self) -> FeederResult<Vec<Candidate>> {
        let html = self.fetch_html()?;
        let candidates = Self::parse_index(&html, &self.index_url, Utc::now());

        if !self.strict {
            return Ok(candidates);
        }

        Ok(drop_unidentified(candidates))
    }
}

/// Strict extraction: keep only candidates whose docket number was found
pub fn drop_unidentified(candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| {
            let keep = !c.is_ambiguous(Ambiguity::Identifier);
            if !keep {
                tracing::warn!(
                    identifier = %c.identifier,
                    "strict extraction: skipping link without a docket number"
                );
            }
            keep
        })
        .collect()
}

fn parse_filename_date(filename: &str) -> Option<DateTime<Utc>> {
    let caps = DATE_REGEX.captures(filename)?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}
