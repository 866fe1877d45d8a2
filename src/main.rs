use std::io::{self, Write};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cafc_feeder::cli::{Cli, Commands};
use cafc_feeder::config::Config;
use cafc_feeder::errors::{FeederError, FeederResult};
use cafc_feeder::http_client;
use cafc_feeder::services::{
    AssetService, HttpAssetFetcher, SyncEvent, SyncOptions, SyncService,
};
use cafc_feeder::sources::OralArgumentIndex;
use cafc_feeder::storage::{FeedStore, XmlFeedStore};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> FeederResult<()> {
    let cli = Cli::parse();

    // Load configuration (also picks up RUST_LOG from .env)
    let config = Config::from_env()?;
    init_tracing();

    let store = XmlFeedStore::new(config.feed_path.clone(), &config.base_url);

    match cli.command {
        Commands::Run { dry_run, batch } => cmd_run(&config, store, dry_run, batch),
        Commands::List { json } => cmd_list(store, json),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn cmd_run(config: &Config, store: XmlFeedStore, dry_run: bool, batch: bool) -> FeederResult<()> {
    let page_client = http_client::build(config, http_client::PAGE_TIMEOUT)?;
    let download_client = http_client::build(config, http_client::DOWNLOAD_TIMEOUT)?;

    let source = OralArgumentIndex::new(page_client, &config.index_url, config.strict_extraction)?;
    let assets = AssetService::new(HttpAssetFetcher::new(download_client), config.asset_dir.clone());
    let feed_path = store.path().display().to_string();
    let service = SyncService::new(source, assets, store);

    println!("Discovering recordings...");

    let options = SyncOptions { dry_run, batch };
    let report = service.run(options, |event| match event {
        SyncEvent::Discovered { source, count } => {
            println!("Found {} audio links on {}.", count, source);
            println!("Loading existing GUIDs from {}...", feed_path);
        }
        SyncEvent::Existing { count } => println!("Existing GUIDs in feed: {}", count),
        SyncEvent::Selected { count } => println!("New recordings to add: {}\n", count),
        SyncEvent::Processing { candidate } => {
            print!("  {} ({})... ", candidate.identifier, candidate.title);
            io::stdout().flush().ok();
        }
        SyncEvent::Downloaded { asset } => {
            print!("downloaded {} bytes, ", asset.length);
            finish_fetch_line(batch);
        }
        SyncEvent::Reused { asset } => {
            print!("{} already present ({} bytes), ", asset.file_name, asset.length);
            finish_fetch_line(batch);
        }
        SyncEvent::Appended { identifier } => {
            if batch {
                println!("  + {}", identifier);
            } else {
                println!("added");
            }
        }
        SyncEvent::Skipped { identifier } => {
            if batch {
                println!("  = {} (already in feed)", identifier);
            } else {
                println!("already in feed");
            }
        }
    });

    let report = match report {
        Ok(report) => report,
        Err(e @ FeederError::ItemFailed { .. }) => {
            println!("FAILED");
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    if report.selected.is_empty() {
        println!("No new recordings. Feed is up to date.");
        return Ok(());
    }

    if dry_run {
        for candidate in &report.selected {
            println!("  [DRY RUN] {} - {}", candidate.identifier, candidate.title);
            println!("    {}", candidate.resource_url);
        }
        println!(
            "\nDry run complete. Would add {} recordings.",
            report.selected.len()
        );
        return Ok(());
    }

    println!(
        "\nAdded {} recordings ({} downloaded, {} already on disk).",
        report.appended.len(),
        report.downloaded,
        report.reused
    );

    Ok(())
}

/// In batch mode items are only queued here and written at the end
fn finish_fetch_line(batch: bool) {
    if batch {
        println!("queued");
    } else {
        io::stdout().flush().ok();
    }
}

fn cmd_list(store: XmlFeedStore, json: bool) -> FeederResult<()> {
    let entries = store.entries()?;

    if json {
        let output = serde_json::to_string_pretty(&entries).map_err(io::Error::from)?;
        println!("{}", output);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No items in {}.", store.path().display());
        return Ok(());
    }

    println!("Items in {}:\n", store.path().display());
    for entry in entries {
        println!(
            "  {} [{}]",
            entry.title.as_deref().unwrap_or("(untitled)"),
            entry.guid.as_deref().unwrap_or("no guid")
        );
        if let Some(url) = entry.enclosure_url {
            println!("    {}", url);
        }
    }

    Ok(())
}
