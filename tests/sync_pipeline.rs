use std::fs;
use std::path::Path;
use std::sync::Mutex;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use cafc_feeder::domain::Candidate;
use cafc_feeder::errors::{FeederError, FeederResult};
use cafc_feeder::services::{AssetFetcher, AssetService, SyncOptions, SyncReport, SyncService};
use cafc_feeder::sources::CandidateSource;
use cafc_feeder::storage::{FeedStore, XmlFeedStore};

const BASE_URL: &str = "https://podcast.example.com/Federal-Circuit";

const STARTING_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>Federal Circuit Oral Arguments</title>
    <description>Unofficial mirror</description>
    <language>en-us</language>
    <item>
      <title>2024-1001 – Acme v. Widget</title>
      <enclosure url="https://podcast.example.com/Federal-Circuit/2024-1001.mp3" length="1234" type="audio/mpeg"/>
      <guid isPermaLink="false">2024-1001</guid>
      <pubDate>Thu, 29 Feb 2024 00:00:00 +0000</pubDate>
      <description>Oral argument for docket 2024-1001: Acme v. Widget.</description>
      <itunes:explicit>no</itunes:explicit>
    </item>
  </channel>
</rss>
"#;

struct FixedSource(Vec<Candidate>);

impl CandidateSource for FixedSource {
    fn name(&self) -> &str {
        "fixture"
    }

    fn list_candidates(&self) -> FeederResult<Vec<Candidate>> {
        Ok(self.0.clone())
    }
}

/// Writes a fixed payload, or fails for one URL
struct FakeFetcher {
    payload: Vec<u8>,
    fail_url: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    fn new(payload: &[u8]) -> Self {
        Self {
            payload: payload.to_vec(),
            fail_url: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing_on(mut self, url: &str) -> Self {
        self.fail_url = Some(url.to_string());
        self
    }
}

impl AssetFetcher for &FakeFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> FeederResult<u64> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.fail_url.as_deref() == Some(url) {
            return Err(FeederError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }
        fs::write(dest, &self.payload)?;
        Ok(self.payload.len() as u64)
    }
}

fn candidate(identifier: &str, title: &str, day: u32) -> Candidate {
    Candidate::new(
        identifier.to_string(),
        title.to_string(),
        Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap(),
        format!("https://x/{}.mp3", identifier),
    )
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("feed.xml"), STARTING_FEED).unwrap();
        Self { dir }
    }

    fn feed_path(&self) -> std::path::PathBuf {
        self.dir.path().join("feed.xml")
    }

    fn store(&self) -> XmlFeedStore {
        XmlFeedStore::new(self.feed_path(), BASE_URL)
    }

    fn feed(&self) -> String {
        fs::read_to_string(self.feed_path()).unwrap()
    }

    fn run(
        &self,
        candidates: Vec<Candidate>,
        fetcher: &FakeFetcher,
        options: SyncOptions,
    ) -> FeederResult<SyncReport> {
        let service = SyncService::new(
            FixedSource(candidates),
            AssetService::new(fetcher, self.dir.path()),
            self.store(),
        );
        service.run(options, |_| {})
    }
}

fn guids(store: &XmlFeedStore) -> Vec<String> {
    store
        .entries()
        .unwrap()
        .into_iter()
        .filter_map(|e| e.guid)
        .collect()
}

#[test]
fn test_only_unknown_docket_is_added() {
    let workspace = Workspace::new();
    let fetcher = FakeFetcher::new(b"ID3 audio bytes");

    let report = workspace
        .run(
            vec![
                candidate("2024-1001", "Acme v. Widget", 1),
                candidate("2024-1002", "Smith v. Jones", 1),
            ],
            &fetcher,
            SyncOptions::default(),
        )
        .unwrap();

    assert_eq!(report.appended, vec!["2024-1002"]);
    assert_eq!(*fetcher.calls.lock().unwrap(), vec!["https://x/2024-1002.mp3"]);
    assert_eq!(guids(&workspace.store()), vec!["2024-1001", "2024-1002"]);

    let feed = workspace.feed();
    assert!(feed.contains("<guid isPermaLink=\"false\">2024-1002</guid>"));
    assert!(feed.contains("<pubDate>Fri, 01 Mar 2024 00:00:00 +0000</pubDate>"));
    assert!(feed.contains(
        "<enclosure url=\"https://podcast.example.com/Federal-Circuit/2024-1002.mp3\" length=\"15\" type=\"audio/mpeg\"/>"
    ));
    assert!(feed.contains("<language>en-us</language>"));
}

#[test]
fn test_second_run_is_a_no_op() {
    let workspace = Workspace::new();
    let fetcher = FakeFetcher::new(b"audio");
    let candidates = vec![
        candidate("2024-1002", "Smith v. Jones", 1),
        candidate("2024-1003", "Doe v. Roe", 2),
    ];

    workspace
        .run(candidates.clone(), &fetcher, SyncOptions::default())
        .unwrap();
    let after_first = workspace.feed();

    let report = workspace
        .run(candidates, &fetcher, SyncOptions::default())
        .unwrap();

    assert!(report.selected.is_empty());
    assert!(report.appended.is_empty());
    assert_eq!(workspace.feed(), after_first);
    assert_eq!(fetcher.calls.lock().unwrap().len(), 2);
}

#[test]
fn test_failed_download_leaves_feed_unchanged() {
    let workspace = Workspace::new();
    let fetcher = FakeFetcher::new(b"audio").failing_on("https://x/2024-1002.mp3");

    let err = workspace
        .run(
            vec![candidate("2024-1002", "Smith v. Jones", 1)],
            &fetcher,
            SyncOptions::default(),
        )
        .unwrap_err();

    match &err {
        FeederError::ItemFailed { identifier, .. } => assert_eq!(identifier, "2024-1002"),
        other => panic!("unexpected error: {}", other),
    }
    assert!(err.to_string().contains("2024-1002"));
    assert_eq!(workspace.feed(), STARTING_FEED);
    assert_eq!(guids(&workspace.store()), vec!["2024-1001"]);
}

#[test]
fn test_items_before_a_failure_are_kept() {
    let workspace = Workspace::new();
    let fetcher = FakeFetcher::new(b"audio").failing_on("https://x/2024-1003.mp3");

    let result = workspace.run(
        vec![
            candidate("2024-1002", "Smith v. Jones", 1),
            candidate("2024-1003", "Doe v. Roe", 2),
            candidate("2024-1004", "Never reached", 3),
        ],
        &fetcher,
        SyncOptions::default(),
    );

    assert!(result.is_err());
    assert_eq!(guids(&workspace.store()), vec!["2024-1001", "2024-1002"]);
}

#[test]
fn test_existing_local_file_is_not_downloaded_again() {
    let workspace = Workspace::new();
    fs::write(workspace.dir.path().join("2024-1002.mp3"), vec![7u8; 4096]).unwrap();
    let fetcher = FakeFetcher::new(b"should not be used");

    let report = workspace
        .run(
            vec![candidate("2024-1002", "Smith v. Jones", 1)],
            &fetcher,
            SyncOptions::default(),
        )
        .unwrap();

    assert!(fetcher.calls.lock().unwrap().is_empty());
    assert_eq!(report.reused, 1);
    assert_eq!(report.appended, vec!["2024-1002"]);
    assert!(workspace.feed().contains("length=\"4096\""));
}

#[test]
fn test_duplicate_listing_is_added_once() {
    let workspace = Workspace::new();
    let fetcher = FakeFetcher::new(b"audio");

    workspace
        .run(
            vec![
                candidate("2024-1002", "Smith v. Jones", 1),
                candidate("2024-1002", "Smith v. Jones (again)", 1),
            ],
            &fetcher,
            SyncOptions::default(),
        )
        .unwrap();

    assert_eq!(guids(&workspace.store()), vec!["2024-1001", "2024-1002"]);
}

#[test]
fn test_batch_run_matches_per_item_run() {
    let per_item = Workspace::new();
    let batched = Workspace::new();
    let candidates = vec![
        candidate("2024-1002", "Smith v. Jones", 1),
        candidate("2024-1003", "Doe v. Roe", 2),
    ];

    per_item
        .run(candidates.clone(), &FakeFetcher::new(b"audio"), SyncOptions::default())
        .unwrap();
    batched
        .run(
            candidates,
            &FakeFetcher::new(b"audio"),
            SyncOptions {
                batch: true,
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(per_item.feed(), batched.feed());
}

#[test]
fn test_dry_run_touches_nothing() {
    let workspace = Workspace::new();
    let fetcher = FakeFetcher::new(b"audio");

    let report = workspace
        .run(
            vec![candidate("2024-1002", "Smith v. Jones", 1)],
            &fetcher,
            SyncOptions {
                dry_run: true,
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(report.selected.len(), 1);
    assert!(fetcher.calls.lock().unwrap().is_empty());
    assert_eq!(workspace.feed(), STARTING_FEED);
    assert!(!workspace.dir.path().join("2024-1002.mp3").exists());
}

#[test]
fn test_lookalike_identifiers_get_their_own_audio() {
    let workspace = Workspace::new();
    let fetcher = FakeFetcher::new(b"audio");

    let report = workspace
        .run(
            vec![
                candidate("oral arg.mp3", "Spaced", 1),
                candidate("oral_arg.mp3", "Underscored", 2),
            ],
            &fetcher,
            SyncOptions::default(),
        )
        .unwrap();

    assert_eq!(report.downloaded, 2);
    assert_eq!(report.reused, 0);
    assert_eq!(fetcher.calls.lock().unwrap().len(), 2);

    let urls: Vec<String> = workspace
        .store()
        .entries()
        .unwrap()
        .into_iter()
        .skip(1)
        .filter_map(|e| e.enclosure_url)
        .collect();
    assert_eq!(urls.len(), 2);
    assert_ne!(urls[0], urls[1]);
    assert_eq!(urls[1], format!("{}/oral_arg.mp3.mp3", BASE_URL));
}
