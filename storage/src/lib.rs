//! Storage crate: per-entity SQLite archive stores.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`layout`] – ArchiveLayout, file naming under the archive root
//! - [`models`] – MessageRecord, ButtonRecord, ReplyRecord, ReactionRecord, NormalizedMessage
//! - [`schema`] – table creation and additive migration
//! - [`archive_store`] – ArchiveStore (open, commit, queries)
//! - [`sqlite_pool`] – connection setup and busy retry
//! - [`user_id`] – sender reference parsing

mod archive_store;
mod error;
mod layout;
mod models;
mod schema;
mod sqlite_pool;
mod user_id;

pub use archive_store::{ArchiveStore, StoredMedia};
pub use error::{Result, StorageError};
pub use layout::{sanitize_filename, ArchiveLayout};
pub use models::{ButtonRecord, MessageRecord, NormalizedMessage, ReactionRecord, ReplyRecord};
pub use schema::{table_columns, MigrationReport};
pub use sqlite_pool::{is_busy, retry_on_busy, StoreOptions};
pub use user_id::extract_user_id;
