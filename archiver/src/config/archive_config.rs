//! ArchiveConfig: API credentials, archive root, logging, store and paging knobs. Loaded from env.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use storage::{ArchiveLayout, StoreOptions};

use crate::sync::{SyncOptions, DEFAULT_PAGE_SIZE};

#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// TELEGRAM_API_ID; 0 when unset.
    pub api_id: i64,
    /// TELEGRAM_API_HASH
    pub api_hash: String,
    /// Archive root (OUTPUT_FOLDER)
    pub output_folder: String,
    /// Log file path
    pub log_file: String,
    /// Attempts to open a busy store before giving up (STORE_BUSY_RETRIES)
    pub store_busy_retries: u32,
    /// Backoff unit between busy retries, in seconds (STORE_BACKOFF_SECS)
    pub store_backoff_secs: u64,
    /// Messages requested per page (SYNC_PAGE_SIZE)
    pub page_size: usize,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .with_context(|| format!("{} is not a valid number: {}", name, value)),
        _ => Ok(default),
    }
}

impl ArchiveConfig {
    /// Load from environment variables. Call validate() before connecting.
    pub fn load() -> Result<Self> {
        let api_id = parse_var("TELEGRAM_API_ID", 0i64)?;
        let api_hash = env::var("TELEGRAM_API_HASH").unwrap_or_default();
        let output_folder =
            env::var("OUTPUT_FOLDER").unwrap_or_else(|_| "telegram_backups".to_string());
        let log_file =
            env::var("LOG_FILE").unwrap_or_else(|_| "logs/tg-archive.log".to_string());
        let store_busy_retries = parse_var("STORE_BUSY_RETRIES", 3u32)?;
        let store_backoff_secs = parse_var("STORE_BACKOFF_SECS", 5u64)?;
        let page_size = parse_var("SYNC_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;

        Ok(Self {
            api_id,
            api_hash,
            output_folder,
            log_file,
            store_busy_retries,
            store_backoff_secs,
            page_size,
        })
    }

    /// Fails when the API credentials are missing.
    pub fn validate(&self) -> Result<()> {
        if self.api_id == 0 {
            anyhow::bail!("TELEGRAM_API_ID is not set (expected a non-zero integer)");
        }
        if self.api_hash.trim().is_empty() {
            anyhow::bail!("TELEGRAM_API_HASH is not set");
        }
        if self.store_busy_retries == 0 {
            anyhow::bail!("STORE_BUSY_RETRIES must be at least 1");
        }
        Ok(())
    }

    pub fn layout(&self) -> ArchiveLayout {
        ArchiveLayout::new(&self.output_folder)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            busy_retries: self.store_busy_retries,
            backoff_unit: Duration::from_secs(self.store_backoff_secs),
            ..StoreOptions::default()
        }
    }

    /// Sync options with the configured page size.
    pub fn sync_options(&self, limit: Option<usize>, download_media: bool) -> SyncOptions {
        SyncOptions {
            limit,
            download_media,
            page_size: self.page_size,
            ..SyncOptions::default()
        }
    }
}
