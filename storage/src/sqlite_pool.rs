//! SQLite connection setup for archive stores, with bounded retry while the file is busy.

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::SqlitePool;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{Result, StorageError};

/// How a store is opened and how long to keep trying while another process holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Total attempts before giving up on a busy store.
    pub busy_retries: u32,
    /// Delay before attempt `n + 1` is `backoff_unit * n`.
    pub backoff_unit: Duration,
    /// SQLite busy timeout applied to the connection itself.
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_retries: 3,
            backoff_unit: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(30),
        }
    }
}

impl StoreOptions {
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt
    }
}

/// True for SQLITE_BUSY / SQLITE_LOCKED (and their extended codes) or a "locked" message.
pub fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            let code_busy = matches!(
                db.code().as_deref(),
                Some("5") | Some("6") | Some("261") | Some("262") | Some("517")
            );
            code_busy || db.message().to_ascii_lowercase().contains("locked")
        }
        _ => false,
    }
}

/// Runs `op` until it succeeds, fails with a non-busy error, or `options.busy_retries` attempts
/// have been spent on busy errors.
pub async fn retry_on_busy<T, F, Fut>(options: &StoreOptions, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    let max_attempts = options.busy_retries.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_busy(&e) && attempt < max_attempts => {
                let delay = options.backoff_delay(attempt);
                warn!(
                    what,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Store is locked, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) if is_busy(&e) => {
                warn!(what, attempts = attempt, error = %e, "Store still locked, giving up");
                return Err(StorageError::Busy { attempts: attempt });
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Opens a single-connection pool on `path`, creating the file if missing.
pub async fn connect(path: &Path, options: &StoreOptions) -> std::result::Result<SqlitePool, sqlx::Error> {
    info!(path = %path.display(), "Opening SQLite store");

    let connect_options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(options.busy_timeout)
        .pragma("temp_store", "memory")
        .pragma("mmap_size", "268435456");

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options)
        .await
}
