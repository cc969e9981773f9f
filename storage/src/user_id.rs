//! Recovering the numeric id from a stored sender reference such as `PeerUser(user_id=42)`.

use regex::Regex;
use std::sync::LazyLock;

static REFERENCE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"user_id=(\d+)").expect("valid user_id pattern"),
        Regex::new(r"channel_id=(\d+)").expect("valid channel_id pattern"),
        Regex::new(r"chat_id=(\d+)").expect("valid chat_id pattern"),
    ]
});

/// Returns the first id found by probing user, channel, then chat patterns; falls back to the
/// whole input when it is purely numeric. `None` when nothing is recoverable.
pub fn extract_user_id(reference: &str) -> Option<String> {
    if reference.is_empty() {
        return None;
    }

    for pattern in REFERENCE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(reference) {
            return Some(caps[1].to_string());
        }
    }

    if reference.chars().all(|c| c.is_ascii_digit()) {
        return Some(reference.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_user_reference() {
        assert_eq!(extract_user_id("PeerUser(user_id=123456)").as_deref(), Some("123456"));
    }

    #[test]
    fn test_extract_channel_reference() {
        assert_eq!(extract_user_id("PeerChannel(channel_id=987)").as_deref(), Some("987"));
    }

    #[test]
    fn test_extract_chat_reference() {
        assert_eq!(extract_user_id("PeerChat(chat_id=55)").as_deref(), Some("55"));
    }

    #[test]
    fn test_user_pattern_wins_over_channel() {
        assert_eq!(
            extract_user_id("Fwd(channel_id=1, user_id=2)").as_deref(),
            Some("2")
        );
    }

    #[test]
    fn test_purely_numeric_input() {
        assert_eq!(extract_user_id("424242").as_deref(), Some("424242"));
    }

    #[test]
    fn test_unrecoverable_input() {
        assert_eq!(extract_user_id("None"), None);
        assert_eq!(extract_user_id(""), None);
        assert_eq!(extract_user_id("12ab"), None);
        assert_eq!(extract_user_id("user_id="), None);
    }
}
