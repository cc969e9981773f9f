//! Core identity types: archived entities and peer references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bucket an entity is listed under in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    User,
    Channel,
    Supergroup,
    Group,
    Unknown,
}

impl EntityKind {
    /// Catalog order of the buckets.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::User,
        EntityKind::Channel,
        EntityKind::Supergroup,
        EntityKind::Group,
        EntityKind::Unknown,
    ];

    /// Plural label used in listings (`Users`, `Channels`, ...).
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::User => "Users",
            EntityKind::Channel => "Channels",
            EntityKind::Supergroup => "Supergroups",
            EntityKind::Group => "Groups",
            EntityKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A conversation target. Immutable for the run; `id` is the join key in every store table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: i64,
    pub display_name: String,
    pub kind: EntityKind,
    pub accessible: bool,
}

impl Entity {
    pub fn new(id: i64, display_name: impl Into<String>, kind: EntityKind, accessible: bool) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            kind,
            accessible,
        }
    }

    /// `<id>_<display_name>`, the unsanitized stem of the store and digest file names.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.id, self.display_name)
    }
}

/// Reference to a user, channel or basic group as carried on messages.
///
/// The `Display` form (`PeerUser(user_id=42)`) is what gets stored in `messages.from_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum PeerRef {
    User(i64),
    Channel(i64),
    Chat(i64),
}

impl PeerRef {
    pub fn id(&self) -> i64 {
        match self {
            PeerRef::User(id) | PeerRef::Channel(id) | PeerRef::Chat(id) => *id,
        }
    }
}

impl fmt::Display for PeerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerRef::User(id) => write!(f, "PeerUser(user_id={})", id),
            PeerRef::Channel(id) => write!(f, "PeerChannel(channel_id={})", id),
            PeerRef::Chat(id) => write!(f, "PeerChat(chat_id={})", id),
        }
    }
}

/// Display data for a peer resolved through the message source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPeer {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
}

impl ResolvedPeer {
    /// `first [last]` when a first name is present.
    pub fn full_name(&self) -> Option<String> {
        join_name(self.first_name.as_deref(), self.last_name.as_deref())
    }
}

/// Joins first and last name; `None` when there is no non-empty first name.
pub fn join_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let first = first.filter(|s| !s.is_empty())?;
    match last.filter(|s| !s.is_empty()) {
        Some(last) => Some(format!("{} {}", first, last)),
        None => Some(first.to_string()),
    }
}
