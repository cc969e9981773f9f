//! Message record model for persistence.
//!
//! Maps to the `messages` table. Write-once: the first committed version of a message wins.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageRecord {
    pub id: i64,
    pub entity_id: i64,
    /// RFC 3339 timestamp of the message.
    pub date: String,
    pub text: Option<String>,
    pub media_type: Option<String>,
    pub media_file: Option<String>,
    pub media_hash: Option<String>,
    /// JSON descriptor of the forward origin.
    pub forwarded: Option<String>,
    /// Structured sender reference, e.g. `PeerUser(user_id=42)`.
    pub from_id: Option<String>,
    pub views: i64,
    pub sender_name: Option<String>,
    pub reply_to_msg_id: Option<i64>,
    /// JSON list of `{emoji, count}`.
    pub reactions: Option<String>,
    /// JSON object of the link preview.
    pub web_preview: Option<String>,
    pub extraction_time: String,
    pub is_service_message: bool,
    pub is_voice_message: bool,
    pub is_pinned: bool,
    /// Numeric id recovered from `from_id`.
    pub user_id: Option<String>,
}

impl MessageRecord {
    /// A bare record with only the key, date and extraction time set.
    pub fn new(id: i64, entity_id: i64, date: impl Into<String>, extraction_time: impl Into<String>) -> Self {
        Self {
            id,
            entity_id,
            date: date.into(),
            text: None,
            media_type: None,
            media_file: None,
            media_hash: None,
            forwarded: None,
            from_id: None,
            views: 0,
            sender_name: None,
            reply_to_msg_id: None,
            reactions: None,
            web_preview: None,
            extraction_time: extraction_time.into(),
            is_service_message: false,
            is_voice_message: false,
            is_pinned: false,
            user_id: None,
        }
    }
}
