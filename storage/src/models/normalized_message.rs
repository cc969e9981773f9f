//! Everything one upstream message turns into; committed to the store in a single transaction.

use super::{ButtonRecord, MessageRecord, ReactionRecord, ReplyRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMessage {
    pub message: MessageRecord,
    pub buttons: Vec<ButtonRecord>,
    pub reply: Option<ReplyRecord>,
    pub reactions: Vec<ReactionRecord>,
}

impl NormalizedMessage {
    pub fn new(message: MessageRecord) -> Self {
        Self {
            message,
            buttons: Vec::new(),
            reply: None,
            reactions: Vec::new(),
        }
    }
}
