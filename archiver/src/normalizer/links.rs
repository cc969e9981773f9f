//! Buttons: native inline keyboards plus hyperlinks harvested from message text.

use std::sync::LazyLock;

use archive_core::RawMessage;
use regex::Regex;
use storage::ButtonRecord;

/// Opening `<a ...>` tag; quoted attribute values may contain `>`.
static ANCHOR_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a(\s(?:[^>"']|"[^"]*"|'[^']*')*)?>"#).expect("valid anchor pattern")
});

/// End of an anchor label: its closing tag or the next opening anchor.
static ANCHOR_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)</a\s*>|<a[\s>]").expect("valid anchor end pattern"));

static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s=/]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("valid attribute pattern")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("valid tag pattern")
});

/// A hyperlink found in message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub label: String,
    pub href: String,
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn href_of(attributes: &str) -> Option<String> {
    ATTR.captures_iter(attributes).find_map(|caps| {
        if !caps[1].eq_ignore_ascii_case("href") {
            return None;
        }
        let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4))?;
        Some(decode_entities(value.as_str()))
    })
}

/// Every `<a href=...>` in `text`, in document order. Labels have inner tags stripped.
///
/// An anchor without `</a>` runs to the next anchor or the end of the text. Anchors without an
/// `href` are skipped.
pub fn anchors(text: &str) -> Vec<Anchor> {
    ANCHOR_OPEN
        .captures_iter(text)
        .filter_map(|caps| {
            let open = caps.get(0)?;
            let href = href_of(caps.get(1).map(|m| m.as_str()).unwrap_or_default())?;
            let rest = &text[open.end()..];
            let inner = match ANCHOR_END.find(rest) {
                Some(end) => &rest[..end.start()],
                None => rest,
            };
            Some(Anchor {
                label: decode_entities(&TAG.replace_all(inner, "")),
                href,
            })
        })
        .collect()
}

/// Native keyboard buttons at their own row/column.
pub fn keyboard_buttons(message: &RawMessage, entity_id: i64) -> Vec<ButtonRecord> {
    message
        .buttons
        .iter()
        .enumerate()
        .flat_map(|(row, buttons)| {
            buttons.iter().enumerate().map(move |(column, button)| ButtonRecord {
                message_id: message.id,
                entity_id,
                row: row as i64,
                column: column as i64,
                text: button.text.clone(),
                data: button.data.clone(),
                url: button.url.clone(),
            })
        })
        .collect()
}

/// Hyperlinks of `text` as row-0 buttons, numbered after the native row-0 buttons.
pub fn link_buttons(message: &RawMessage, entity_id: i64, text: &str) -> Vec<ButtonRecord> {
    let first_column = message.buttons.first().map(Vec::len).unwrap_or(0);
    anchors(text)
        .into_iter()
        .enumerate()
        .map(|(i, anchor)| ButtonRecord {
            message_id: message.id,
            entity_id,
            row: 0,
            column: (first_column + i) as i64,
            text: anchor.label,
            data: None,
            url: Some(anchor.href),
        })
        .collect()
}
