//! Reply threading and attachment heuristics over plain-text bodies.
//!
//! Bodies are plain text. Quoted history is recognised the way mail
//! clients write it: `>`-prefixed lines and `On <date>, <name> wrote:`
//! headers.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Utc};
use regex::Regex;
use serde::Serialize;

/// Marker line written into bodies when assets were sent straight to a
/// registered wallet.
pub const DIRECT_TRANSFER_MARKER: &str = "Assets have been transferred directly";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Text,
    Quote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    pub content: String,
}

fn is_quote_header(line: &str) -> bool {
    line.trim().starts_with("On ") && line.ends_with("wrote:")
}

/// Split a body into text and quote segments, oldest history first.
pub fn split_segments(body: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut kind = SegmentKind::Text;
    let mut lines: Vec<&str> = Vec::new();

    fn flush(segments: &mut Vec<Segment>, kind: SegmentKind, lines: &mut Vec<&str>) {
        if !lines.is_empty() {
            segments.push(Segment {
                kind,
                content: lines.join("\n").trim().to_string(),
            });
            lines.clear();
        }
    }

    for line in body.split('\n') {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix('>') {
            if kind != SegmentKind::Quote {
                flush(&mut segments, kind, &mut lines);
                kind = SegmentKind::Quote;
            }
            lines.push(rest.strip_prefix(char::is_whitespace).unwrap_or(rest));
        } else if is_quote_header(line) {
            if kind != SegmentKind::Quote {
                flush(&mut segments, kind, &mut lines);
                kind = SegmentKind::Quote;
            }
            lines.push(line);
        } else if kind == SegmentKind::Quote && !line.trim().is_empty() {
            flush(&mut segments, kind, &mut lines);
            kind = SegmentKind::Text;
            lines.push(line);
        } else {
            lines.push(line);
        }
    }
    flush(&mut segments, kind, &mut lines);

    segments.retain(|s| !s.content.is_empty());
    segments.reverse();
    segments
}

fn ordinal(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Long human date used in quote headers, e.g. `March 3rd, 2024 4:05 PM`.
pub fn display_date(date: DateTime<Utc>) -> String {
    format!(
        "{} {}{}, {}",
        date.format("%B"),
        date.day(),
        ordinal(date.day()),
        date.format("%Y %-I:%M %p")
    )
}

pub fn reply_subject(subject: &str) -> String {
    if subject.starts_with("Re:") {
        subject.to_string()
    } else {
        format!("Re: {subject}")
    }
}

/// Compose a reply: new text, a quote header, then the quoted original.
pub fn reply_body(reply: &str, original_date: DateTime<Utc>, original_name: &str, original_body: &str) -> String {
    format!(
        "{reply}\n\nOn {}, {original_name} wrote:\n> {}",
        display_date(original_date),
        original_body.replace('\n', "\n> ")
    )
}

pub fn forward_subject(subject: &str) -> String {
    if subject.starts_with("Fwd:") {
        subject.to_string()
    } else {
        format!("Fwd: {subject}")
    }
}

pub fn forward_body(
    original_name: &str,
    original_email: &str,
    original_date: DateTime<Utc>,
    original_subject: &str,
    original_body: &str,
) -> String {
    format!(
        "\n\n---------- Forwarded message ----------\nFrom: {original_name} <{original_email}>\nDate: {}\nSubject: {original_subject}\nTo: Me\n\n{original_body}",
        display_date(original_date)
    )
}

fn claim_code_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)Your Claim Code: (\d{3} \d{3})|claim code: (\d{6})").ok())
        .as_ref()
}

/// Pull a six-digit claim code out of a notification body.
pub fn extract_claim_code(body: &str) -> Option<String> {
    let captures = claim_code_pattern()?.captures(body)?;
    captures
        .get(1)
        .map(|m| m.as_str().replace(' ', ""))
        .or_else(|| captures.get(2).map(|m| m.as_str().to_string()))
}

pub fn is_direct_transfer(body: &str) -> bool {
    body.contains(DIRECT_TRANSFER_MARKER)
}

/// What to tell the reader about assets attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AttachmentNotice {
    /// Assets already sit in the recipient's wallet.
    DirectTransfer,
    /// Assets wait behind a claim code.
    Claimable { code: String },
    /// Crypto is attached but the body carries no usable hint.
    Generic,
    None,
}

pub fn attachment_notice(has_crypto_transfer: bool, body: &str) -> AttachmentNotice {
    if !has_crypto_transfer {
        return AttachmentNotice::None;
    }
    if is_direct_transfer(body) {
        AttachmentNotice::DirectTransfer
    } else if let Some(code) = extract_claim_code(body) {
        AttachmentNotice::Claimable { code }
    } else {
        AttachmentNotice::Generic
    }
}
