//! Built-in HTML template: one self-contained document, every value escaped.

use std::fmt::Write;

use chrono::DateTime;

use super::{DayGroup, Digest, DigestMessage, DigestTemplate};
use crate::normalizer::WEB_PREVIEW_PHOTO;

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; background: #e6ebee; margin: 0; }
header { background: #517da2; color: #fff; padding: 16px 24px; }
header h1 { margin: 0; font-size: 20px; }
header p { margin: 4px 0 0; font-size: 12px; opacity: .8; }
main { max-width: 760px; margin: 0 auto; padding: 16px; }
.day { text-align: center; margin: 20px 0 8px; }
.day span { background: rgba(0,0,0,.25); color: #fff; border-radius: 12px; padding: 3px 10px; font-size: 13px; }
.message { background: #fff; border-radius: 10px; padding: 8px 12px; margin: 6px 0; box-shadow: 0 1px 1px rgba(0,0,0,.1); }
.message.pinned { border-left: 3px solid #f2b600; }
.service { text-align: center; color: #555; font-size: 13px; margin: 8px 0; font-style: italic; }
.sender { color: #3a6d99; font-weight: 600; font-size: 14px; }
.forwarded, .reply { border-left: 2px solid #5a9bd5; padding-left: 8px; margin: 4px 0; font-size: 13px; color: #555; }
.reply a { color: inherit; text-decoration: none; }
.text { white-space: pre-wrap; word-wrap: break-word; margin: 4px 0; }
.media img, .media video { max-width: 100%; border-radius: 6px; }
.preview { border-left: 2px solid #8bc34a; padding-left: 8px; margin: 4px 0; font-size: 13px; }
.buttons a, .buttons span { display: inline-block; background: #eef3f7; border-radius: 6px; padding: 4px 10px; margin: 2px; font-size: 13px; color: #3a6d99; text-decoration: none; }
.reactions span { display: inline-block; background: #eef3f7; border-radius: 12px; padding: 1px 8px; margin: 2px; font-size: 13px; }
.meta { text-align: right; color: #999; font-size: 11px; }
"#;

const VIDEO_EXTENSIONS: [&str; 4] = [".mp4", ".webm", ".mov", ".mkv"];

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn time_of_day(date: &str) -> String {
    DateTime::parse_from_rfc3339(date)
        .map(|d| d.format("%H:%M").to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTemplate;

impl HtmlTemplate {
    fn write_group(&self, out: &mut String, digest: &Digest, group: &DayGroup) -> std::fmt::Result {
        writeln!(out, r#"<div class="day"><span>{}</span></div>"#, escape_html(&group.label))?;
        for message in &group.messages {
            if message.record.is_service_message {
                writeln!(
                    out,
                    r#"<div class="service" id="msg-{}">{}</div>"#,
                    message.record.id,
                    escape_html(message.record.text.as_deref().unwrap_or_default())
                )?;
            } else {
                self.write_message(out, digest, message)?;
            }
        }
        Ok(())
    }

    fn write_message(&self, out: &mut String, digest: &Digest, message: &DigestMessage) -> std::fmt::Result {
        let record = &message.record;
        let class = if record.is_pinned { "message pinned" } else { "message" };
        writeln!(out, r#"<div class="{}" id="msg-{}">"#, class, record.id)?;

        if let Some(sender) = &record.sender_name {
            writeln!(out, r#"<div class="sender">{}</div>"#, escape_html(sender))?;
        }

        if let Some(forward) = &message.forward {
            let origin = forward.from_name.as_deref().unwrap_or("another chat");
            match message.forward_url() {
                Some(url) => writeln!(
                    out,
                    r#"<div class="forwarded">Forwarded from <a href="{}">{}</a></div>"#,
                    escape_html(&url),
                    escape_html(origin)
                )?,
                None => writeln!(
                    out,
                    r#"<div class="forwarded">Forwarded from {}</div>"#,
                    escape_html(origin)
                )?,
            }
        }

        if let Some(target) = record.reply_to_msg_id {
            write!(
                out,
                r##"<div class="reply"><a href="#msg-{}">{}</a>"##,
                target,
                escape_html(&digest.reply_preview(target))
            )?;
            if let Some(quote) = &message.quote_text {
                write!(out, "<blockquote>{}</blockquote>", escape_html(quote))?;
            }
            writeln!(out, "</div>")?;
        }

        self.write_media(out, message)?;

        if let Some(text) = record.text.as_deref().filter(|t| !t.is_empty()) {
            writeln!(out, r#"<div class="text">{}</div>"#, escape_html(text))?;
        }

        if let Some(preview) = &message.preview {
            writeln!(out, r#"<div class="preview">"#)?;
            if let Some(site) = &preview.site_name {
                writeln!(out, "<div><small>{}</small></div>", escape_html(site))?;
            }
            match (&preview.title, &preview.url) {
                (Some(title), Some(url)) => writeln!(
                    out,
                    r#"<div><a href="{}"><b>{}</b></a></div>"#,
                    escape_html(url),
                    escape_html(title)
                )?,
                (Some(title), None) => writeln!(out, "<div><b>{}</b></div>", escape_html(title))?,
                (None, Some(url)) => writeln!(
                    out,
                    r#"<div><a href="{0}">{0}</a></div>"#,
                    escape_html(url)
                )?,
                (None, None) => {}
            }
            if let Some(description) = &preview.description {
                writeln!(out, "<div>{}</div>", escape_html(description))?;
            }
            if let Some(image) = preview.image_url.as_deref().filter(|i| *i != WEB_PREVIEW_PHOTO) {
                writeln!(out, r#"<img src="{}" alt="">"#, escape_html(image))?;
            }
            writeln!(out, "</div>")?;
        }

        if !message.buttons.is_empty() {
            write!(out, r#"<div class="buttons">"#)?;
            for button in &message.buttons {
                match &button.url {
                    Some(url) => write!(
                        out,
                        r#"<a href="{}">{}</a>"#,
                        escape_html(url),
                        escape_html(&button.text)
                    )?,
                    None => write!(out, "<span>{}</span>", escape_html(&button.text))?,
                }
            }
            writeln!(out, "</div>")?;
        }

        if !message.reactions.is_empty() {
            write!(out, r#"<div class="reactions">"#)?;
            for reaction in &message.reactions {
                write!(out, "<span>{} {}</span>", escape_html(&reaction.emoji), reaction.count)?;
            }
            writeln!(out, "</div>")?;
        }

        write!(out, r#"<div class="meta">"#)?;
        if record.is_pinned {
            write!(out, "pinned · ")?;
        }
        if record.views > 0 {
            write!(out, "{} views · ", record.views)?;
        }
        writeln!(out, "{}</div>", escape_html(&time_of_day(&record.date)))?;
        writeln!(out, "</div>")
    }

    fn write_media(&self, out: &mut String, message: &DigestMessage) -> std::fmt::Result {
        let record = &message.record;
        let Some(media_type) = record.media_type.as_deref() else {
            return Ok(());
        };
        let Some(file) = record.media_file.as_deref() else {
            return writeln!(out, r#"<div class="media"><i>[{}]</i></div>"#, escape_html(media_type));
        };
        let src = escape_html(file);
        let lower = file.to_ascii_lowercase();
        if record.is_voice_message {
            writeln!(out, r#"<div class="media"><audio controls src="{}"></audio></div>"#, src)
        } else if media_type == "MessageMediaPhoto" {
            writeln!(out, r#"<div class="media"><img src="{}" alt="photo"></div>"#, src)
        } else if VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            writeln!(out, r#"<div class="media"><video controls src="{}"></video></div>"#, src)
        } else {
            writeln!(out, r#"<div class="media"><a href="{0}">{0}</a></div>"#, src)
        }
    }
}

impl DigestTemplate for HtmlTemplate {
    fn render(&self, digest: &Digest) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        let title = escape_html(&digest.title);
        writeln!(out, "<!DOCTYPE html>")?;
        writeln!(out, r#"<html lang="en"><head><meta charset="utf-8">"#)?;
        writeln!(out, "<title>{}</title>", title)?;
        writeln!(out, "<style>{}</style></head><body>", STYLE)?;
        writeln!(
            out,
            "<header><h1>{}</h1><p>{} messages · generated {}</p></header>",
            title,
            digest.message_count(),
            escape_html(&digest.generated_at)
        )?;
        writeln!(out, "<main>")?;
        for group in &digest.groups {
            self.write_group(&mut out, digest, group)?;
        }
        writeln!(out, "</main></body></html>")?;
        Ok(out)
    }
}
