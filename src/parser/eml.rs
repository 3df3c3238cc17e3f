//! Parser for individual `.eml` files (RFC 5322 messages).
//!
//! Wraps `mail-parser` into a [`ParsedEml`] view exposing exactly the
//! fields the metadata extractor needs. Parsing is lenient: a message
//! that `mail-parser` rejects still yields a view with whatever can be
//! salvaged, and missing headers become empty fields. Only the date is
//! validated downstream.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use mail_parser::MessageParser;

use crate::model::address::EmailAddress;

/// Structured view of one parsed message.
#[derive(Debug, Clone, Default)]
pub struct ParsedEml {
    /// Sender from the `From:` header (fields empty when absent).
    pub sender: EmailAddress,
    /// Recipients from `To:` and `CC:`.
    pub recipients: Vec<EmailAddress>,
    /// Decoded subject (encoded-words resolved by `mail-parser`).
    pub subject: String,
    /// The `Message-ID` header value, angle brackets stripped.
    pub message_id: String,
    /// Message-IDs from the `References` header, in order.
    pub references: Vec<String>,
    /// Raw `Date:` header value (empty when the header is missing).
    pub date_raw: String,
    /// Parsed date, when the raw value was parseable.
    pub date: Option<DateTime<Utc>>,
    /// HTML body, if the message has one.
    pub body_html: Option<String>,
    /// Plain-text body, if the message has one.
    pub body_text: Option<String>,
}

/// Parse decoded message text into a [`ParsedEml`].
pub fn parse_eml(content: &str) -> ParsedEml {
    let parser = MessageParser::default();
    let Some(msg) = parser.parse(content.as_bytes()) else {
        // Salvage what we can: treat everything after the header block as text
        return ParsedEml {
            body_text: Some(body_fallback(content)),
            ..ParsedEml::default()
        };
    };

    let sender = msg
        .from()
        .and_then(|a| a.first())
        .map(addr_to_email)
        .unwrap_or_else(|| {
            // Structured parse failed; fall back to the raw header value
            msg.header_raw("From")
                .map(|raw| EmailAddress::parse(raw.trim()))
                .unwrap_or_else(EmailAddress::empty)
        });

    let mut recipients: Vec<EmailAddress> = Vec::new();
    for list in [msg.to(), msg.cc()].into_iter().flatten() {
        for addr in list.iter() {
            let email = addr_to_email(addr);
            if !email.address.is_empty() {
                recipients.push(email);
            }
        }
    }

    let references = msg
        .header_raw("References")
        .map(|raw| {
            raw.split_whitespace()
                .map(normalize_id)
                .filter(|id| !id.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let date_raw = msg
        .header_raw("Date")
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let date = parse_date(&date_raw);

    ParsedEml {
        sender,
        recipients,
        subject: msg.subject().unwrap_or_default().to_string(),
        message_id: msg.message_id().map(normalize_id).unwrap_or_default(),
        references,
        date_raw,
        date,
        // `body_html` synthesizes HTML from the text part when no real
        // HTML part exists; only expose it when one actually does
        body_html: msg
            .html_body
            .first()
            .and_then(|&id| msg.parts.get(id))
            .and_then(|p| match &p.body {
                mail_parser::PartType::Html(h) => Some(h.to_string()),
                _ => None,
            }),
        body_text: msg.body_text(0).map(|s| s.into_owned()),
    }
}

/// Convert a `mail-parser` address into our model type.
fn addr_to_email(addr: &mail_parser::Addr<'_>) -> EmailAddress {
    EmailAddress {
        display_name: addr.name().unwrap_or_default().trim().to_string(),
        address: addr.address().unwrap_or_default().trim().to_string(),
    }
}

/// Normalize a Message-ID by stripping angle brackets and whitespace.
pub fn normalize_id(id: &str) -> String {
    id.trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim()
        .to_string()
}

/// Everything after the first blank line, for messages `mail-parser` rejects.
fn body_fallback(content: &str) -> String {
    if let Some(pos) = content.find("\n\n") {
        content[pos + 2..].to_string()
    } else if let Some(pos) = content.find("\r\n\r\n") {
        content[pos + 4..].to_string()
    } else {
        String::new()
    }
}

/// Parse a date header value leniently.
///
/// Tries RFC 2822, RFC 3339, then a table of common non-standard formats
/// with and without the leading day-of-week.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Try chrono's RFC 2822
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    // Try ISO 8601 / RFC 3339
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    // Remove leading day-of-week: "Thu, " or "Thu "
    let no_dow = strip_day_of_week(trimmed);

    let formats = [
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M:%S",
        "%d %b %Y %H:%M",
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];

    for candidate in [trimmed, no_dow.as_str()] {
        for fmt in &formats {
            if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(ndt) = NaiveDateTime::parse_from_str(candidate, fmt) {
                return Some(Utc.from_utc_datetime(&ndt));
            }
        }
    }

    None
}

/// Strip a leading "Thu, " / "Thu " day-of-week token.
fn strip_day_of_week(s: &str) -> String {
    let days = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    for day in &days {
        if let Some(rest) = s.strip_prefix(day) {
            return rest.trim_start_matches(',').trim_start().to_string();
        }
    }
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "From: Alice Example <alice@x.com>\r\n\
        To: Bob <bob@y.com>, carol@z.org\r\n\
        Subject: Project kickoff\r\n\
        Date: Mon, 01 Jan 2024 10:00:00 +0000\r\n\
        Message-ID: <msg1@x.com>\r\n\
        References: <root@x.com> <mid@x.com>\r\n\
        Content-Type: text/plain\r\n\
        \r\n\
        Let's meet on Tuesday to plan the kickoff.\r\n";

    #[test]
    fn test_parse_eml_headers() {
        let parsed = parse_eml(SAMPLE);
        assert_eq!(parsed.sender.address, "alice@x.com");
        assert_eq!(parsed.sender.display_name, "Alice Example");
        assert_eq!(parsed.recipients.len(), 2);
        assert_eq!(parsed.recipients[1].address, "carol@z.org");
        assert_eq!(parsed.subject, "Project kickoff");
        assert_eq!(parsed.message_id, "msg1@x.com");
        assert_eq!(parsed.references, vec!["root@x.com", "mid@x.com"]);
        assert!(parsed.date.is_some());
    }

    #[test]
    fn test_parse_eml_body_text() {
        let parsed = parse_eml(SAMPLE);
        let text = parsed.body_text.expect("plain body");
        assert!(text.contains("meet on Tuesday"));
        assert!(parsed.body_html.is_none());
    }

    #[test]
    fn test_parse_eml_missing_headers() {
        let parsed = parse_eml("Subject: hi\r\n\r\nbody\r\n");
        assert!(parsed.sender.address.is_empty());
        assert!(parsed.references.is_empty());
        assert!(parsed.date.is_none());
        assert!(parsed.date_raw.is_empty());
    }

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id("<msg001@example.com>"), "msg001@example.com");
        assert_eq!(normalize_id("msg001@example.com"), "msg001@example.com");
        assert_eq!(normalize_id("  <msg@ex.com>  "), "msg@ex.com");
    }

    #[test]
    fn test_parse_date_rfc2822() {
        let dt = parse_date("Thu, 04 Jan 2024 12:30:00 +0100").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-04T11:30:00+00:00");
    }

    #[test]
    fn test_parse_date_iso() {
        assert!(parse_date("2024-01-04T12:30:00+01:00").is_some());
        assert!(parse_date("2024-01-04 12:30:00").is_some());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date("").is_none());
        assert!(parse_date("not a date").is_none());
    }
}
