//! Forward descriptor stored in `messages.forwarded`.

use archive_core::ForwardHeader;
use serde::{Deserialize, Serialize};

/// Origin of a forwarded message, serialized as JSON in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardDescriptor {
    pub date: Option<String>,
    /// Origin sender reference, e.g. `PeerChannel(channel_id=7)`.
    pub from_id: Option<String>,
    pub from_name: Option<String>,
    pub channel_id: Option<i64>,
    pub channel_post: Option<i64>,
}

impl ForwardDescriptor {
    pub fn from_header(header: &ForwardHeader) -> Self {
        Self {
            date: header.date.map(|d| d.to_rfc3339()),
            from_id: header.from_id.map(|p| p.to_string()),
            from_name: header.from_name.clone(),
            channel_id: header.channel_id(),
            channel_post: header.channel_post,
        }
    }

    /// Parses a stored descriptor; `None` for anything that is not one.
    pub fn parse(stored: &str) -> Option<Self> {
        serde_json::from_str(stored).ok()
    }

    /// Public link to the original post when both channel and post id are known.
    pub fn url(&self) -> Option<String> {
        match (self.channel_id, self.channel_post) {
            (Some(channel), Some(post)) => Some(format!("https://t.me/c/{}/{}", channel, post)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archive_core::PeerRef;

    #[test]
    fn test_channel_forward_has_url() {
        let header = ForwardHeader {
            date: None,
            from_id: Some(PeerRef::Channel(1234)),
            from_name: None,
            channel_post: Some(56),
        };
        let descriptor = ForwardDescriptor::from_header(&header);
        assert_eq!(descriptor.from_id.as_deref(), Some("PeerChannel(channel_id=1234)"));
        assert_eq!(descriptor.url().as_deref(), Some("https://t.me/c/1234/56"));

        let json = serde_json::to_string(&descriptor).unwrap();
        assert_eq!(ForwardDescriptor::parse(&json), Some(descriptor));
    }

    #[test]
    fn test_user_forward_has_no_url() {
        let header = ForwardHeader {
            date: None,
            from_id: Some(PeerRef::User(9)),
            from_name: Some("Ada".into()),
            channel_post: None,
        };
        assert_eq!(ForwardDescriptor::from_header(&header).url(), None);
        assert_eq!(ForwardDescriptor::parse("not json"), None);
    }
}
