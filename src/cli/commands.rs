use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cafc-feeder")]
#[command(about = "Mirrors Federal Circuit oral-argument audio into a podcast RSS feed")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scrape the argument index, download new recordings and append them to the feed
    Run {
        /// Dry run - only show which recordings would be added
        #[arg(long)]
        dry_run: bool,

        /// Rewrite the feed once at the end instead of after every recording
        #[arg(long)]
        batch: bool,
    },

    /// List the items already in the feed
    List {
        /// Print the items as a JSON array
        #[arg(long)]
        json: bool,
    },
}
