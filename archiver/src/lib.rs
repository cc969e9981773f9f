//! # archiver
//!
//! Archives conversations of a messaging account into per-entity SQLite stores and renders
//! browsable HTML digests.
//!
//! - [`catalog`] – classify the dialog list into entities with a stable index
//! - [`normalizer`] – turn a raw message into the records committed for it
//! - [`media`] – download media once, reuse it while the file exists
//! - [`sync`] – backfill and update passes
//! - [`digest`] – day-grouped digest and the HTML template
//! - [`export`] – CSV listings of entities and contacts
//! - [`offline`] – message source reading an export directory
//! - [`config`] – environment configuration

pub mod catalog;
pub mod config;
pub mod digest;
pub mod error;
pub mod export;
pub mod media;
pub mod normalizer;
pub mod offline;
pub mod sync;

pub use catalog::{classify, EntityCatalog};
pub use config::ArchiveConfig;
pub use digest::{
    day_label, escape_html, DayGroup, Digest, DigestMessage, DigestRenderer, DigestTemplate,
    HtmlTemplate,
};
pub use error::{DigestError, ExportError, SyncError};
pub use export::{contact_rows, write_contacts, write_entity_listing, ContactRow};
pub use media::{hash_file, should_fetch, MediaDecision, MediaDedup};
pub use normalizer::{ForwardDescriptor, MessageShape, Normalizer};
pub use offline::{ExportSource, PeerEntry};
pub use sync::{
    BatchSummary, PassOutcome, SyncController, SyncMode, SyncOptions, SyncReport, SyncState,
};
