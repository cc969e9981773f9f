//! Raw message model as delivered by a [`MessageSource`](crate::MessageSource).
//!
//! Every optional part of an upstream message is an explicit field or enum variant, so the
//! normalizer never probes for attributes at runtime. The model is serde-friendly because the
//! offline export source reads it straight from JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{join_name, PeerRef};

/// One message as fetched from the upstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub text: Option<String>,
    /// Structured sender reference.
    pub from_id: Option<PeerRef>,
    /// Sender profile, when the source could attach it.
    pub sender: Option<Sender>,
    /// The conversation the message was posted to.
    pub peer_id: Option<PeerRef>,
    pub views: Option<i64>,
    #[serde(default)]
    pub pinned: bool,
    pub reply_to: Option<ReplyHeader>,
    pub fwd_from: Option<ForwardHeader>,
    pub media: Option<Media>,
    pub web_preview: Option<WebPreview>,
    #[serde(default)]
    pub reactions: Vec<ReactionCount>,
    /// Native inline keyboard, row-major.
    #[serde(default)]
    pub buttons: Vec<Vec<KeyboardButton>>,
    pub action: Option<ServiceAction>,
}

impl RawMessage {
    /// Plain text message with no optional parts; handy for sources and tests.
    pub fn text(id: i64, date: DateTime<Utc>, text: impl Into<String>) -> Self {
        Self {
            id,
            date,
            text: Some(text.into()),
            from_id: None,
            sender: None,
            peer_id: None,
            views: None,
            pinned: false,
            reply_to: None,
            fwd_from: None,
            media: None,
            web_preview: None,
            reactions: Vec::new(),
            buttons: Vec::new(),
            action: None,
        }
    }

    pub fn reply_to_msg_id(&self) -> Option<i64> {
        self.reply_to.as_ref().and_then(|r| r.reply_to_msg_id)
    }
}

/// Sender profile attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Sender {
    User {
        id: i64,
        first_name: Option<String>,
        last_name: Option<String>,
    },
    Channel {
        id: i64,
        title: Option<String>,
    },
    Chat {
        id: i64,
        title: Option<String>,
    },
}

impl Sender {
    pub fn full_name(&self) -> Option<String> {
        match self {
            Sender::User {
                first_name,
                last_name,
                ..
            } => join_name(first_name.as_deref(), last_name.as_deref()),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Sender::Channel { title, .. } | Sender::Chat { title, .. } => {
                title.as_deref().filter(|t| !t.is_empty())
            }
            Sender::User { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyHeader {
    pub reply_to_msg_id: Option<i64>,
    pub quote_text: Option<String>,
}

/// Origin of a forwarded message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardHeader {
    pub date: Option<DateTime<Utc>>,
    pub from_id: Option<PeerRef>,
    pub from_name: Option<String>,
    pub channel_post: Option<i64>,
}

impl ForwardHeader {
    /// Origin channel id when the forward came from a channel.
    pub fn channel_id(&self) -> Option<i64> {
        match self.from_id {
            Some(PeerRef::Channel(id)) => Some(id),
            _ => None,
        }
    }
}

/// Media attachment. `type_name` is what gets recorded as `messages.media_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Media {
    Photo {
        file_name: Option<String>,
    },
    Document {
        file_name: Option<String>,
        mime_type: Option<String>,
        #[serde(default)]
        attributes: Vec<DocumentAttribute>,
    },
    WebPage {
        webpage: Option<WebPage>,
    },
    Geo,
    Contact,
    Poll,
    Other {
        kind: String,
    },
}

impl Media {
    pub fn type_name(&self) -> &str {
        match self {
            Media::Photo { .. } => "MessageMediaPhoto",
            Media::Document { .. } => "MessageMediaDocument",
            Media::WebPage { .. } => "MessageMediaWebPage",
            Media::Geo => "MessageMediaGeo",
            Media::Contact => "MessageMediaContact",
            Media::Poll => "MessageMediaPoll",
            Media::Other { kind } => kind,
        }
    }

    /// File name the source stores the payload under, if the media carries a file.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Media::Photo { file_name } | Media::Document { file_name, .. } => file_name.as_deref(),
            _ => None,
        }
    }

    /// True for a document with an audio attribute flagged as voice.
    pub fn is_voice(&self) -> bool {
        match self {
            Media::Document { attributes, .. } => attributes
                .iter()
                .any(|a| matches!(a, DocumentAttribute::Audio { voice: true, .. })),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentAttribute {
    Audio {
        #[serde(default)]
        voice: bool,
        duration: Option<i64>,
    },
    Video {
        duration: Option<i64>,
    },
    Filename {
        file_name: String,
    },
    Sticker,
    Animated,
}

/// Page metadata embedded as web-page media.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebPage {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub site_name: Option<String>,
    #[serde(default)]
    pub has_photo: bool,
}

/// Dedicated link-preview field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebPreview {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub site_name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCount {
    pub reaction: Reaction,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reaction {
    Emoji { emoticon: String },
    CustomEmoji { document_id: i64 },
    Nested { reaction: Box<Reaction> },
    Raw { value: String },
    /// Reaction the source could not decode; `detail` says why.
    Unresolvable { detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardButton {
    pub text: String,
    pub data: Option<String>,
    pub url: Option<String>,
}

/// Structural action carried by service messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ServiceAction {
    #[serde(rename = "MessageActionChatAddUser")]
    ChatAddUser {
        #[serde(default)]
        users: Vec<i64>,
    },
    #[serde(rename = "MessageActionChatDeleteUser")]
    ChatDeleteUser { user_id: Option<i64> },
    #[serde(rename = "MessageActionChatJoinedByLink")]
    ChatJoinedByLink,
    #[serde(rename = "MessageActionChannelCreate")]
    ChannelCreate { title: Option<String> },
    #[serde(rename = "MessageActionChatCreate")]
    ChatCreate { title: Option<String> },
    #[serde(rename = "MessageActionGroupCall")]
    GroupCall { duration: Option<i64> },
    #[serde(rename = "MessageActionChatEditTitle")]
    ChatEditTitle { title: Option<String> },
    /// Any action kind without a dedicated rendering.
    #[serde(rename = "Other")]
    Other { name: String },
}

impl ServiceAction {
    /// Upstream action kind name.
    pub fn kind(&self) -> &str {
        match self {
            ServiceAction::ChatAddUser { .. } => "MessageActionChatAddUser",
            ServiceAction::ChatDeleteUser { .. } => "MessageActionChatDeleteUser",
            ServiceAction::ChatJoinedByLink => "MessageActionChatJoinedByLink",
            ServiceAction::ChannelCreate { .. } => "MessageActionChannelCreate",
            ServiceAction::ChatCreate { .. } => "MessageActionChatCreate",
            ServiceAction::GroupCall { .. } => "MessageActionGroupCall",
            ServiceAction::ChatEditTitle { .. } => "MessageActionChatEditTitle",
            ServiceAction::Other { name } => name,
        }
    }
}
