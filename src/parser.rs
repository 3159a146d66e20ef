//! Decoding raw message content into a structured form.
//!
//! This is the content-decoder boundary: the watcher hands it the raw bytes of
//! one fetched message and gets back a [`ParsedMessage`] ready for a downstream
//! consumer. A decode failure is scoped to that single message; the watcher
//! logs it and moves on to the next one.

use chrono::{DateTime, TimeZone, Utc};
use mailparse::{parse_mail, MailHeaderMap};

use crate::error::{Error, Result};

/// A decoded message, ready for rendering or forwarding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    /// The `Subject` header, empty if absent.
    pub subject: String,
    /// The raw `From` header value, if present.
    pub from: Option<String>,
    /// The raw `To` header value, if present.
    pub to: Option<String>,
    /// The `Date` header, if present and parseable.
    pub date: Option<DateTime<Utc>>,
    /// The message body text. Prefers `text/plain`, then `text/html`.
    pub body: String,
}

/// Parses the raw bytes of one message into a [`ParsedMessage`].
///
/// # Errors
///
/// Returns [`Error::ParseMessage`] if the message structure is malformed, or
/// [`Error::ExtractBody`] if no body text can be decoded from it.
///
/// # Example
///
/// ```
/// use mail_watch::parser::parse_message;
///
/// let raw = b"From: a@example.com\r\nSubject: hello\r\n\r\nhi there";
/// let message = parse_message(raw).unwrap();
/// assert_eq!(message.subject, "hello");
/// assert!(message.body.contains("hi there"));
/// ```
pub fn parse_message(raw: &[u8]) -> Result<ParsedMessage> {
    let parsed = parse_mail(raw).map_err(|source| Error::ParseMessage { source })?;

    let headers = parsed.get_headers();
    let subject = headers.get_first_value("Subject").unwrap_or_default();
    let from = headers.get_first_value("From");
    let to = headers.get_first_value("To");
    let date = headers
        .get_first_value("Date")
        .and_then(|value| mailparse::dateparse(&value).ok())
        .and_then(|seconds| Utc.timestamp_opt(seconds, 0).single());

    let body = extract_body_text(&parsed).map_err(|source| Error::ExtractBody { source })?;

    Ok(ParsedMessage {
        subject,
        from,
        to,
        date,
        body,
    })
}

/// Extracts text content from a parsed message, handling multipart messages.
fn extract_body_text(
    parsed: &mailparse::ParsedMail<'_>,
) -> std::result::Result<String, mailparse::MailParseError> {
    // If the message has subparts, try to find text content
    if !parsed.subparts.is_empty() {
        // Look for text/plain first, then text/html
        for wanted in ["text/plain", "text/html"] {
            for part in &parsed.subparts {
                if part.ctype.mimetype.eq_ignore_ascii_case(wanted) {
                    if let Ok(body) = part.get_body() {
                        return Ok(body);
                    }
                }
            }
        }

        // If no text parts found, recurse into the first subpart
        if let Some(first_part) = parsed.subparts.first() {
            return extract_body_text(first_part);
        }
    }

    // Single part message or fallback
    parsed.get_body()
}
