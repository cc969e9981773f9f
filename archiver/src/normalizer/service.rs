//! Canonical text for service messages (member changes, creation, calls, renames).

use archive_core::{FallbackReason, Lookup, MessageSource, RawMessage, ServiceAction};
use tracing::{debug, warn};

/// Display name of a user resolved through the source.
pub async fn resolve_user_name(source: &dyn MessageSource, user_id: i64) -> Lookup<String> {
    let peer = source.resolve_user(user_id).await?;
    peer.full_name().ok_or(FallbackReason::Unnamed)
}

/// Resolved name of `user_id`, or `User <id>` when the lookup falls back.
async fn user_name_or_placeholder(source: &dyn MessageSource, user_id: i64) -> String {
    match resolve_user_name(source, user_id).await {
        Ok(name) => name,
        Err(FallbackReason::Unnamed) => {
            debug!(user_id, "User has no name, using placeholder");
            format!("User {}", user_id)
        }
        Err(reason) => {
            warn!(user_id, %reason, "Error getting user, using placeholder");
            format!("User {}", user_id)
        }
    }
}

/// Human-readable text for a service action.
pub async fn describe_action(
    source: &dyn MessageSource,
    message: &RawMessage,
    action: &ServiceAction,
) -> String {
    match action {
        ServiceAction::ChatAddUser { users } => {
            let mut names = Vec::with_capacity(users.len());
            for user_id in users {
                names.push(user_name_or_placeholder(source, *user_id).await);
            }
            format!("{} joined the group", names.join(", "))
        }
        ServiceAction::ChatDeleteUser { user_id } => {
            let name = match user_id {
                Some(id) => user_name_or_placeholder(source, *id).await,
                None => {
                    warn!(
                        message_id = message.id,
                        reason = %FallbackReason::Malformed("member-removed action without user id".into()),
                        "Malformed service action"
                    );
                    "Unknown user".to_string()
                }
            };
            format!("{} left the group", name)
        }
        ServiceAction::ChatJoinedByLink => {
            let name = message
                .sender
                .as_ref()
                .and_then(|s| s.full_name())
                .unwrap_or_else(|| "Someone".to_string());
            format!("{} joined the group via invite link", name)
        }
        ServiceAction::ChannelCreate { title } => format!(
            "Channel {} created",
            title.as_deref().unwrap_or("this channel")
        ),
        ServiceAction::ChatCreate { title } => {
            format!("Group {} created", title.as_deref().unwrap_or("this group"))
        }
        ServiceAction::GroupCall { duration } => {
            if duration.is_some_and(|d| d > 0) {
                "Group call ended".to_string()
            } else {
                "Group call started".to_string()
            }
        }
        ServiceAction::ChatEditTitle { title } => format!(
            "Group name changed to: {}",
            title.as_deref().unwrap_or("")
        ),
        ServiceAction::Other { name } => format!("Service message: {}", name),
    }
}
