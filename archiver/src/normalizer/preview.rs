//! Link-preview summary stored as JSON on the message.

use archive_core::{Media, RawMessage};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Image indicator recorded when a web-page media carries a photo.
pub const WEB_PREVIEW_PHOTO: &str = "web_preview_photo";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSummary {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub site_name: Option<String>,
    pub image_url: Option<String>,
}

impl PreviewSummary {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.url.is_none()
            && self.site_name.is_none()
            && self.image_url.is_none()
    }
}

/// Summary from the dedicated preview field, else from web-page media.
pub fn preview_summary(message: &RawMessage) -> PreviewSummary {
    if let Some(preview) = &message.web_preview {
        return PreviewSummary {
            title: preview.title.clone(),
            description: preview.description.clone(),
            url: preview.url.clone(),
            site_name: preview.site_name.clone(),
            image_url: preview.image.clone(),
        };
    }

    match &message.media {
        Some(Media::WebPage {
            webpage: Some(page),
        }) => PreviewSummary {
            title: page.title.clone(),
            description: page.description.clone(),
            url: page.url.clone(),
            site_name: page.site_name.clone(),
            image_url: page.has_photo.then(|| WEB_PREVIEW_PHOTO.to_string()),
        },
        _ => PreviewSummary::default(),
    }
}

/// Compact JSON of the preview, or `None` when no field is set.
pub fn web_preview_json(message: &RawMessage) -> Option<String> {
    let summary = preview_summary(message);
    if summary.is_empty() {
        return None;
    }
    match serde_json::to_string(&summary) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(message_id = message.id, error = %e, "Failed to serialize web preview");
            None
        }
    }
}
