//! Storage error types.
//!
//! Used by [`ArchiveStore`](crate::ArchiveStore) and callers of storage APIs.

use thiserror::Error;

/// Errors that can occur when using storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store stayed busy (locked by another process) through every retry.
    #[error("Store busy after {attempts} attempts")]
    Busy { attempts: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;
