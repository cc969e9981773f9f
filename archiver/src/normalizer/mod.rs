//! Message normalization: one raw message into the records committed for it.
//!
//! The raw message is resolved once into a [`MessageShape`]; each shape is handled
//! exhaustively. Lookups that fail degrade to fallback values and are logged, so
//! [`Normalizer::normalize`] never fails.

mod forward;
mod links;
mod preview;
mod reactions;
mod sender;
mod service;

pub use forward::ForwardDescriptor;
pub use links::{anchors, keyboard_buttons, link_buttons, Anchor};
pub use preview::{preview_summary, web_preview_json, PreviewSummary, WEB_PREVIEW_PHOTO};
pub use reactions::{emoji_string, extract_reactions, ReactionSummary, UNKNOWN_EMOJI};
pub use sender::{resolve_title, sender_name};
pub use service::{describe_action, resolve_user_name};

use archive_core::{ForwardHeader, Media, MessageSource, RawMessage, ServiceAction};
use chrono::Utc;
use storage::{
    extract_user_id, ArchiveLayout, ArchiveStore, MessageRecord, NormalizedMessage, ReplyRecord,
    StoredMedia,
};
use tracing::{trace, warn};

use crate::media::MediaDedup;

/// What kind of message this is, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MessageShape<'m> {
    Service(&'m ServiceAction),
    Forwarded {
        header: &'m ForwardHeader,
        media: Option<&'m Media>,
    },
    Media(&'m Media),
    Plain,
}

impl<'m> MessageShape<'m> {
    pub fn of(message: &'m RawMessage) -> Self {
        if let Some(action) = &message.action {
            return MessageShape::Service(action);
        }
        if let Some(header) = &message.fwd_from {
            return MessageShape::Forwarded {
                header,
                media: message.media.as_ref(),
            };
        }
        match &message.media {
            Some(media) => MessageShape::Media(media),
            None => MessageShape::Plain,
        }
    }
}

pub struct Normalizer<'a> {
    source: &'a dyn MessageSource,
    media: MediaDedup<'a>,
    download_media: bool,
    extraction_time: String,
}

impl<'a> Normalizer<'a> {
    /// Stamps every record with the current time as its extraction time.
    pub fn new(source: &'a dyn MessageSource, layout: &'a ArchiveLayout, download_media: bool) -> Self {
        Self {
            source,
            media: MediaDedup::new(source, layout),
            download_media,
            extraction_time: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_extraction_time(mut self, extraction_time: impl Into<String>) -> Self {
        self.extraction_time = extraction_time.into();
        self
    }

    pub async fn normalize(
        &self,
        raw: &RawMessage,
        entity_id: i64,
        store: &ArchiveStore,
    ) -> NormalizedMessage {
        let mut record = MessageRecord::new(
            raw.id,
            entity_id,
            raw.date.to_rfc3339(),
            self.extraction_time.clone(),
        );
        record.from_id = raw.from_id.map(|p| p.to_string());
        record.user_id = record.from_id.as_deref().and_then(extract_user_id);
        record.views = raw.views.unwrap_or(0);
        record.is_pinned = raw.pinned;
        record.reply_to_msg_id = raw.reply_to_msg_id();
        record.web_preview = web_preview_json(raw);
        record.sender_name = sender_name(self.source, raw).await;

        let mut buttons = keyboard_buttons(raw, entity_id);

        match MessageShape::of(raw) {
            MessageShape::Service(action) => {
                record.text = Some(describe_action(self.source, raw, action).await);
                record.is_service_message = true;
            }
            MessageShape::Forwarded { header, media } => {
                record.forwarded = forward_json(raw.id, header);
                record.text = raw.text.clone();
                if let Some(media) = media {
                    self.attach_media(&mut record, raw, media, store).await;
                }
            }
            MessageShape::Media(media) => {
                record.text = raw.text.clone();
                self.attach_media(&mut record, raw, media, store).await;
            }
            MessageShape::Plain => {
                record.text = raw.text.clone();
            }
        }

        if !record.is_service_message {
            if let Some(text) = record.text.as_deref() {
                buttons.extend(link_buttons(raw, entity_id, text));
            }
        }

        let (reactions, summary) = extract_reactions(raw, entity_id);
        record.reactions = summary;

        let reply = raw.reply_to.as_ref().and_then(|header| {
            Some(ReplyRecord {
                message_id: raw.id,
                entity_id,
                reply_to_msg_id: header.reply_to_msg_id?,
                quote_text: header.quote_text.clone(),
            })
        });

        trace!(message_id = raw.id, entity_id, "Normalized message");
        NormalizedMessage {
            message: record,
            buttons,
            reply,
            reactions,
        }
    }

    async fn attach_media(
        &self,
        record: &mut MessageRecord,
        raw: &RawMessage,
        media: &Media,
        store: &ArchiveStore,
    ) {
        let media_type = media.type_name();
        record.media_type = Some(media_type.to_string());
        record.is_voice_message = media.is_voice();
        if self.download_media {
            let StoredMedia { path, hash } = self
                .media
                .acquire(store, raw, record.entity_id, media_type)
                .await;
            record.media_file = path;
            record.media_hash = hash;
        }
    }
}

fn forward_json(message_id: i64, header: &ForwardHeader) -> Option<String> {
    match serde_json::to_string(&ForwardDescriptor::from_header(header)) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(message_id, error = %e, "Failed to serialize forward header");
            None
        }
    }
}
