//! The upstream transport seen as a black box: dialogs, contacts, pages of messages, lookups.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::SourceResult;
use crate::message::RawMessage;
use crate::types::{join_name, Entity, PeerRef, ResolvedPeer};

/// One entry of the account's dialog list, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Dialog {
    User {
        id: i64,
        first_name: Option<String>,
        last_name: Option<String>,
    },
    Channel {
        id: i64,
        title: String,
        #[serde(default)]
        broadcast: bool,
    },
    Chat {
        id: i64,
        title: String,
    },
    ChannelForbidden {
        id: i64,
        title: Option<String>,
    },
    Unknown {
        id: i64,
    },
}

impl Dialog {
    pub fn id(&self) -> i64 {
        match self {
            Dialog::User { id, .. }
            | Dialog::Channel { id, .. }
            | Dialog::Chat { id, .. }
            | Dialog::ChannelForbidden { id, .. }
            | Dialog::Unknown { id } => *id,
        }
    }
}

/// Address-book entry; `user` is `None` when the account behind it was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub user_id: i64,
    pub user: Option<ContactUser>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub username: Option<String>,
}

impl ContactUser {
    pub fn full_name(&self) -> Option<String> {
        join_name(self.first_name.as_deref(), self.last_name.as_deref())
    }
}

/// Abstraction over the messaging transport. Implementations map to a concrete client
/// (live API session, offline export, test double).
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// The account's dialog list.
    async fn dialogs(&self) -> SourceResult<Vec<Dialog>>;

    /// The account's contacts.
    async fn contacts(&self) -> SourceResult<Vec<Contact>>;

    /// Up to `limit` messages of `entity`, newest first, strictly older than `offset_id`
    /// (from the newest message when `None`). An empty page means the history is exhausted.
    async fn fetch_page(
        &self,
        entity: &Entity,
        offset_id: Option<i64>,
        limit: usize,
    ) -> SourceResult<Vec<RawMessage>>;

    /// Looks up a user by id.
    async fn resolve_user(&self, user_id: i64) -> SourceResult<ResolvedPeer>;

    /// Looks up any peer (user, channel, chat).
    async fn resolve_peer(&self, peer: &PeerRef) -> SourceResult<ResolvedPeer>;

    /// Downloads the message's media into `dir`; returns the written path, or `None` when the
    /// media has no downloadable payload.
    async fn download_media(&self, message: &RawMessage, dir: &Path)
        -> SourceResult<Option<PathBuf>>;
}
