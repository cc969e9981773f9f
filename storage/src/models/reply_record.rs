use serde::{Deserialize, Serialize};

/// Row of the `replies` table. The only sub-record that may be updated after first write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReplyRecord {
    pub message_id: i64,
    pub entity_id: i64,
    pub reply_to_msg_id: i64,
    pub quote_text: Option<String>,
}
