use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::Config;
use crate::errors::FeederResult;

/// Connect/read bound for the index page
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(30);
/// Whole-request bound for audio downloads
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// The one client every request of a run goes through, carrying the
/// configured user agent
pub fn build(config: &Config, timeout: Duration) -> FeederResult<Client> {
    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(PAGE_TIMEOUT)
        .timeout(timeout)
        .build()?;

    Ok(client)
}
