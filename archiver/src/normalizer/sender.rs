//! Sender display name: profile name, then titles, then forward origin.

use archive_core::{FallbackReason, Lookup, MessageSource, PeerRef, RawMessage};
use tracing::warn;

/// Title of a peer resolved through the source.
pub async fn resolve_title(source: &dyn MessageSource, peer: &PeerRef) -> Lookup<String> {
    let resolved = source.resolve_peer(peer).await?;
    resolved
        .title
        .filter(|t| !t.is_empty())
        .ok_or(FallbackReason::Unnamed)
}

fn log_fallback(message_id: i64, what: &str, reason: &FallbackReason) {
    if !matches!(reason, FallbackReason::Unnamed) {
        warn!(message_id, what, %reason, "Error determining message sender");
    }
}

/// Best display name for whoever posted `message`; `None` when nothing resolves.
///
/// Order: sender first+last name, sender title, title of the conversation the message was
/// posted to, forward `from_name`, forward origin channel title (suffixed ` (forwarded)`).
pub async fn sender_name(source: &dyn MessageSource, message: &RawMessage) -> Option<String> {
    if let Some(sender) = &message.sender {
        if let Some(name) = sender.full_name() {
            return Some(name);
        }
        if let Some(title) = sender.title() {
            return Some(title.to_string());
        }
    }

    if let Some(peer) = &message.peer_id {
        match resolve_title(source, peer).await {
            Ok(title) => return Some(title),
            Err(reason) => log_fallback(message.id, "conversation title", &reason),
        }
    }

    let forward = message.fwd_from.as_ref()?;
    if let Some(name) = forward.from_name.as_deref().filter(|n| !n.is_empty()) {
        return Some(name.to_string());
    }
    let channel_id = forward.channel_id()?;
    match resolve_title(source, &PeerRef::Channel(channel_id)).await {
        Ok(title) => Some(format!("{} (forwarded)", title)),
        Err(reason) => {
            log_fallback(message.id, "forward origin", &reason);
            None
        }
    }
}
