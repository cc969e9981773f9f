//! Reaction emoji resolution and the per-message reaction summary.

use std::collections::HashSet;

use archive_core::{FallbackReason, Lookup, RawMessage, Reaction};
use serde::{Deserialize, Serialize};
use storage::ReactionRecord;
use tracing::warn;

/// Emoji used when a reaction cannot be resolved.
pub const UNKNOWN_EMOJI: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub emoji: String,
    pub count: i64,
}

/// String form of a reaction: the emoticon, `CustomEmoji:<id>`, the wrapped reaction, or the raw value.
pub fn emoji_string(reaction: &Reaction) -> Lookup<String> {
    match reaction {
        Reaction::Emoji { emoticon } => Ok(emoticon.clone()),
        Reaction::CustomEmoji { document_id } => Ok(format!("CustomEmoji:{}", document_id)),
        Reaction::Nested { reaction } => emoji_string(reaction),
        Reaction::Raw { value } => Ok(value.clone()),
        Reaction::Unresolvable { detail } => Err(FallbackReason::Malformed(detail.clone())),
    }
}

/// One record per distinct emoji (first occurrence wins) plus the JSON summary of all entries.
pub fn extract_reactions(message: &RawMessage, entity_id: i64) -> (Vec<ReactionRecord>, Option<String>) {
    if message.reactions.is_empty() {
        return (Vec::new(), None);
    }

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    let mut summary = Vec::with_capacity(message.reactions.len());

    for entry in &message.reactions {
        let emoji = emoji_string(&entry.reaction).unwrap_or_else(|reason| {
            warn!(message_id = message.id, %reason, "Error processing reaction");
            UNKNOWN_EMOJI.to_string()
        });
        summary.push(ReactionSummary {
            emoji: emoji.clone(),
            count: entry.count,
        });
        if seen.insert(emoji.clone()) {
            records.push(ReactionRecord {
                message_id: message.id,
                entity_id,
                emoji,
                count: entry.count,
            });
        }
    }

    let json = match serde_json::to_string(&summary) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(message_id = message.id, error = %e, "Failed to serialize reactions");
            None
        }
    };
    (records, json)
}
