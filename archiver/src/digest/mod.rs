//! Digest rendering: stored messages grouped by day, handed to a [`DigestTemplate`].

mod template;

pub use template::{escape_html, HtmlTemplate};

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use storage::{ArchiveLayout, ArchiveStore, ButtonRecord, MessageRecord, ReactionRecord};
use tracing::{debug, info};

use crate::error::DigestError;
use crate::normalizer::{ForwardDescriptor, PreviewSummary};

const REPLY_PREVIEW_CHARS: usize = 30;
pub const UNKNOWN_DATE: &str = "Unknown Date";

/// Stamps a [`Digest`] into a document.
pub trait DigestTemplate: Send + Sync {
    fn render(&self, digest: &Digest) -> Result<String, std::fmt::Error>;
}

/// One message with everything the template needs next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct DigestMessage {
    /// Stored row; `media_file` is relative to the archive root.
    pub record: MessageRecord,
    pub buttons: Vec<ButtonRecord>,
    pub reactions: Vec<ReactionRecord>,
    pub quote_text: Option<String>,
    pub forward: Option<ForwardDescriptor>,
    pub preview: Option<PreviewSummary>,
}

impl DigestMessage {
    pub fn forward_url(&self) -> Option<String> {
        self.forward.as_ref().and_then(ForwardDescriptor::url)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub label: String,
    pub messages: Vec<DigestMessage>,
}

#[derive(Debug, Clone)]
pub struct Digest {
    pub title: String,
    pub entity_id: Option<i64>,
    pub generated_at: String,
    pub groups: Vec<DayGroup>,
    index: HashMap<i64, (usize, usize)>,
}

impl Digest {
    pub fn new(title: impl Into<String>, entity_id: Option<i64>, groups: Vec<DayGroup>) -> Self {
        let mut index = HashMap::new();
        for (g, group) in groups.iter().enumerate() {
            for (m, message) in group.messages.iter().enumerate() {
                index.entry(message.record.id).or_insert((g, m));
            }
        }
        Self {
            title: title.into(),
            entity_id,
            generated_at: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            groups,
            index,
        }
    }

    pub fn message_count(&self) -> usize {
        self.groups.iter().map(|g| g.messages.len()).sum()
    }

    pub fn message_by_id(&self, id: i64) -> Option<&DigestMessage> {
        let (g, m) = *self.index.get(&id)?;
        self.groups.get(g)?.messages.get(m)
    }

    /// `"<sender>: <text>"` for a reply target, text cut to 30 characters.
    pub fn reply_preview(&self, id: i64) -> String {
        let Some(message) = self.message_by_id(id) else {
            return "Message not found".to_string();
        };
        let record = &message.record;
        let sender = record
            .sender_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown");
        let text = match record.text.as_deref().filter(|t| !t.is_empty()) {
            Some(text) => text,
            None if record.media_type.is_some() => "Media message",
            None if record.is_service_message => "Service message",
            None => "Empty message",
        };
        if text.chars().count() > REPLY_PREVIEW_CHARS {
            let cut: String = text.chars().take(REPLY_PREVIEW_CHARS).collect();
            format!("{}: {}...", sender, cut)
        } else {
            format!("{}: {}", sender, text)
        }
    }
}

/// Day heading for a stored timestamp: `March 01, 2024`, else the date part, else `Unknown Date`.
pub fn day_label(date: &str) -> String {
    let Some((day, _)) = date.split_once('T') else {
        return UNKNOWN_DATE.to_string();
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
        return parsed.format("%B %d, %Y").to_string();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.format("%B %d, %Y").to_string();
    }
    day.to_string()
}

/// Groups newest-first messages by day label, keeping first-seen group order.
pub fn group_by_day<F>(messages: Vec<DigestMessage>, label: F) -> Vec<DayGroup>
where
    F: Fn(&str) -> String,
{
    let mut groups: Vec<DayGroup> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for message in messages {
        let day = label(&message.record.date);
        match positions.get(&day) {
            Some(&i) => groups[i].messages.push(message),
            None => {
                positions.insert(day.clone(), groups.len());
                groups.push(DayGroup {
                    label: day,
                    messages: vec![message],
                });
            }
        }
    }
    groups
}

fn date_prefix(date: &str) -> String {
    match date.split_once('T') {
        Some((day, _)) => day.to_string(),
        None => UNKNOWN_DATE.to_string(),
    }
}

pub struct DigestRenderer {
    layout: ArchiveLayout,
    template: Box<dyn DigestTemplate>,
}

impl DigestRenderer {
    pub fn new(layout: ArchiveLayout) -> Self {
        Self::with_template(layout, HtmlTemplate)
    }

    pub fn with_template(layout: ArchiveLayout, template: impl DigestTemplate + 'static) -> Self {
        Self {
            layout,
            template: Box::new(template),
        }
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    /// Loads the digest of one entity, or of every entity in the store when `entity_id` is `None`.
    ///
    /// Single-entity digests are headed by formatted day; multi-entity digests by the date part
    /// of the stored timestamp.
    pub async fn render(
        &self,
        store: &ArchiveStore,
        title: &str,
        entity_id: Option<i64>,
    ) -> Result<Digest, DigestError> {
        let records = store.messages(entity_id).await?;

        let mut buttons: HashMap<(i64, i64), Vec<ButtonRecord>> = HashMap::new();
        for button in store.buttons(entity_id).await? {
            buttons
                .entry((button.entity_id, button.message_id))
                .or_default()
                .push(button);
        }
        let mut reactions: HashMap<(i64, i64), Vec<ReactionRecord>> = HashMap::new();
        for reaction in store.reactions(entity_id).await? {
            reactions
                .entry((reaction.entity_id, reaction.message_id))
                .or_default()
                .push(reaction);
        }
        let mut quotes: HashMap<(i64, i64), String> = HashMap::new();
        for reply in store.replies(entity_id).await? {
            if let Some(quote) = reply.quote_text {
                quotes.insert((reply.entity_id, reply.message_id), quote);
            }
        }

        let messages: Vec<DigestMessage> = records
            .into_iter()
            .map(|mut record| {
                let key = (record.entity_id, record.id);
                record.media_file = record
                    .media_file
                    .as_deref()
                    .map(|path| self.layout.relative_to_root(path));
                let forward = record.forwarded.as_deref().and_then(ForwardDescriptor::parse);
                let preview = record
                    .web_preview
                    .as_deref()
                    .and_then(|json| serde_json::from_str(json).ok());
                DigestMessage {
                    buttons: buttons.remove(&key).unwrap_or_default(),
                    reactions: reactions.remove(&key).unwrap_or_default(),
                    quote_text: quotes.remove(&key),
                    forward,
                    preview,
                    record,
                }
            })
            .collect();

        let groups = if entity_id.is_some() {
            group_by_day(messages, day_label)
        } else {
            group_by_day(messages, date_prefix)
        };
        let digest = Digest::new(title, entity_id, groups);
        debug!(
            title,
            messages = digest.message_count(),
            days = digest.groups.len(),
            "Built digest"
        );
        Ok(digest)
    }

    pub fn render_html(&self, digest: &Digest) -> Result<String, DigestError> {
        Ok(self.template.render(digest)?)
    }

    /// Renders the digest and writes it to `path`.
    pub async fn render_to_file(
        &self,
        store: &ArchiveStore,
        title: &str,
        entity_id: Option<i64>,
        path: &Path,
    ) -> Result<Digest, DigestError> {
        let digest = self.render(store, title, entity_id).await?;
        let html = self.render_html(&digest)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, html).await?;
        info!(
            path = %path.display(),
            messages = digest.message_count(),
            "HTML digest written"
        );
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: i64, date: &str) -> DigestMessage {
        DigestMessage {
            record: MessageRecord::new(id, 1, date, "2024-03-05T00:00:00+00:00"),
            buttons: Vec::new(),
            reactions: Vec::new(),
            quote_text: None,
            forward: None,
            preview: None,
        }
    }

    #[test]
    fn test_day_label() {
        assert_eq!(day_label("2024-03-01T10:00:00+00:00"), "March 01, 2024");
        assert_eq!(day_label("2024-03-01T10:00:00"), "March 01, 2024");
        assert_eq!(day_label("2024-13-45Tgarbage"), "2024-13-45");
        assert_eq!(day_label("yesterday"), UNKNOWN_DATE);
        assert_eq!(day_label(""), UNKNOWN_DATE);
    }

    #[test]
    fn test_group_by_day_keeps_first_seen_order() {
        let groups = group_by_day(
            vec![
                message(5, "2024-03-03T09:00:00+00:00"),
                message(4, "2024-03-02T18:00:00+00:00"),
                message(3, "2024-03-02T08:00:00+00:00"),
                message(2, "2024-03-01T12:00:00+00:00"),
            ],
            day_label,
        );
        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, ["March 03, 2024", "March 02, 2024", "March 01, 2024"]);
        let ids: Vec<i64> = groups[1].messages.iter().map(|m| m.record.id).collect();
        assert_eq!(ids, [4, 3]);
    }

    #[test]
    fn test_reply_preview_fallbacks() {
        let mut long = message(1, "2024-03-01T10:00:00+00:00");
        long.record.sender_name = Some("Ada".into());
        long.record.text = Some("a".repeat(40));
        let mut media = message(2, "2024-03-01T10:00:00+00:00");
        media.record.media_type = Some("MessageMediaPhoto".into());
        let mut service = message(3, "2024-03-01T10:00:00+00:00");
        service.record.is_service_message = true;
        let empty = message(4, "2024-03-01T10:00:00+00:00");

        let digest = Digest::new(
            "Chat",
            Some(1),
            group_by_day(vec![long, media, service, empty], day_label),
        );
        assert_eq!(digest.reply_preview(1), format!("Ada: {}...", "a".repeat(30)));
        assert_eq!(digest.reply_preview(2), "Unknown: Media message");
        assert_eq!(digest.reply_preview(3), "Unknown: Service message");
        assert_eq!(digest.reply_preview(4), "Unknown: Empty message");
        assert_eq!(digest.reply_preview(99), "Message not found");
    }
}
