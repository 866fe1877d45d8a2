pub mod asset_service;
pub mod sync_service;

pub use asset_service::{AssetFetcher, AssetService, HttpAssetFetcher};
pub use sync_service::{select_new, SyncEvent, SyncOptions, SyncReport, SyncService};
