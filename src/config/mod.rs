use std::path::PathBuf;

use url::Url;

use crate::errors::{FeederError, FeederResult};

pub const DEFAULT_INDEX_URL: &str =
    "https://cafc.uscourts.gov/home/oral-argument/listen-to-oral-arguments/";
pub const DEFAULT_BASE_URL: &str = "https://sneha-s2003.github.io/Federal-Circuit";
pub const DEFAULT_USER_AGENT: &str = "Federal-Circuit-Podcast-Bot/1.0";

#[derive(Debug, Clone)]
pub struct Config {
    /// RSS document that receives new items
    pub feed_path: PathBuf,
    /// Directory holding the re-hosted audio files
    pub asset_dir: PathBuf,
    pub index_url: String,
    /// Public URL the asset directory is served from
    pub base_url: String,
    pub user_agent: String,
    /// Skip links without a docket number instead of keying them by filename
    pub strict_extraction: bool,
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    pub fn from_env() -> FeederResult<Self> {
        // Try to load .env from executable's directory first
        if let Some(dir) = Self::exe_dir() {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        // Fall back to current directory
        dotenvy::dotenv().ok();

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> FeederResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let index_url = var("FEED_INDEX_URL", DEFAULT_INDEX_URL);
        Url::parse(&index_url)
            .map_err(|e| FeederError::Config(format!("FEED_INDEX_URL: {}", e)))?;

        let base_url = var("FEED_BASE_URL", DEFAULT_BASE_URL);
        Url::parse(&base_url)
            .map_err(|e| FeederError::Config(format!("FEED_BASE_URL: {}", e)))?;

        let strict_extraction = parse_bool(&var("FEED_STRICT_EXTRACTION", "false"))
            .ok_or_else(|| {
                FeederError::Config("FEED_STRICT_EXTRACTION must be true or false".to_string())
            })?;

        Ok(Self {
            feed_path: PathBuf::from(var("FEED_PATH", "feed.xml")),
            asset_dir: PathBuf::from(var("FEED_ASSET_DIR", ".")),
            index_url,
            base_url,
            user_agent: var("FEED_USER_AGENT", DEFAULT_USER_AGENT),
            strict_extraction,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
