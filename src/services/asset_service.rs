use std::fs;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;

use crate::domain::{Candidate, LocalAsset};
use crate::errors::FeederResult;
use crate::storage::atomic::write_atomic_with;

#[cfg_attr(test, mockall::automock)]
pub trait AssetFetcher: Send + Sync {
    /// Download `url` to `dest` and return the number of bytes stored
    fn fetch(&self, url: &str, dest: &Path) -> FeederResult<u64>;
}

pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl AssetFetcher for HttpAssetFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> FeederResult<u64> {
        let mut response = self.client.get(url).send()?.error_for_status()?;

        // Streamed into a sibling temp file so an interrupted download
        // never leaves a truncated file under the final name
        write_atomic_with(dest, |file| {
            response.copy_to(file)?;
            Ok(())
        })?;

        Ok(fs::metadata(dest)?.len())
    }
}

/// Makes sure a candidate's audio is present in the asset directory
pub struct AssetService<F: AssetFetcher> {
    fetcher: F,
    asset_dir: PathBuf,
}

impl<F: AssetFetcher> AssetService<F> {
    pub fn new<P: Into<PathBuf>>(fetcher: F, asset_dir: P) -> Self {
        Self {
            fetcher,
            asset_dir: asset_dir.into(),
        }
    }

    pub fn local_path(&self, candidate: &Candidate) -> PathBuf {
        self.asset_dir.join(candidate.asset_filename())
    }

    /// Reuse the local file when it exists, otherwise download it
    pub fn ensure_local(&self, candidate: &Candidate) -> FeederResult<LocalAsset> {
        let file_name = candidate.asset_filename();
        let path = self.local_path(candidate);

        if path.is_file() {
            let length = fs::metadata(&path)?.len();
            tracing::debug!(path = %path.display(), length, "reusing local asset");
            return Ok(LocalAsset::reused(file_name, length));
        }

        tracing::debug!(url = %candidate.resource_url, path = %path.display(), "downloading asset");
        let length = self.fetcher.fetch(&candidate.resource_url, &path)?;

        Ok(LocalAsset::downloaded(file_name, length))
    }
}
