//! # archive-core
//!
//! Core types for the archive: [`Entity`], the raw message model ([`RawMessage`] and friends),
//! the [`MessageSource`] transport trait, shared errors and tracing initialization.
//! Transport-agnostic; used by storage, archiver and the CLI.

pub mod error;
pub mod logger;
pub mod message;
pub mod source;
pub mod types;

pub use error::{FallbackReason, Lookup, SourceError, SourceResult};
pub use logger::init_tracing;
pub use message::{
    DocumentAttribute, ForwardHeader, KeyboardButton, Media, RawMessage, Reaction, ReactionCount,
    ReplyHeader, Sender, ServiceAction, WebPage, WebPreview,
};
pub use source::{Contact, ContactUser, Dialog, MessageSource};
pub use types::{join_name, Entity, EntityKind, PeerRef, ResolvedPeer};
