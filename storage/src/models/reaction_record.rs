use serde::{Deserialize, Serialize};

/// Row of the `reactions` table, one per distinct emoji on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReactionRecord {
    pub message_id: i64,
    pub entity_id: i64,
    pub emoji: String,
    pub count: i64,
}
