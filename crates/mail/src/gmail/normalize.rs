//! Gmail API response normalization
//!
//! Converts Gmail API responses to domain models.

use base64::prelude::*;

use super::api::{GmailMessage, MessagePart};
use crate::config::HtmlLookup;
use crate::models::{Message, MessageHeaders, MessageId};

const HTML_MIME_TYPE: &str = "text/html";

/// Normalize a Gmail API message to a domain Message
pub fn normalize_message(gmail_msg: GmailMessage, html_lookup: HtmlLookup) -> Message {
    let payload = gmail_msg.payload.unwrap_or_default();

    let plain_text_body = payload
        .body
        .as_ref()
        .and_then(|b| b.data.as_deref())
        .and_then(decode_base64_body);

    Message::builder(MessageId::new(gmail_msg.id))
        .headers(extract_headers(&payload))
        .snippet(gmail_msg.snippet)
        .plain_text_body(plain_text_body)
        .html_body(find_html_body(&payload, html_lookup))
        .label_ids(gmail_msg.label_ids.unwrap_or_default())
        .build()
}

/// Pick From / Date / Subject by exact header name
pub fn extract_headers(payload: &MessagePart) -> MessageHeaders {
    let mut headers = MessageHeaders::default();

    for header in payload.headers.iter().flatten() {
        match header.name.as_str() {
            "From" => headers.from = Some(header.value.clone()),
            "Date" => headers.date = Some(header.value.clone()),
            "Subject" => headers.subject = Some(header.value.clone()),
            _ => {}
        }
    }

    headers
}

/// Locate and decode the HTML body of a payload
///
/// Strict lookup only understands two shapes of top-level `parts`:
/// a single wrapper whose children are the alternatives, or the two
/// alternatives themselves. Anything else has no HTML body.
pub fn find_html_body(payload: &MessagePart, lookup: HtmlLookup) -> Option<String> {
    let part = match lookup {
        HtmlLookup::Strict => {
            let top = payload.parts.as_deref().unwrap_or_default();
            match top {
                [wrapper] => first_with_type(wrapper.parts.as_deref().unwrap_or_default()),
                [_, _] => first_with_type(top),
                _ => None,
            }
        }
        HtmlLookup::Recursive => find_html_part(payload),
    }?;

    part.body
        .as_ref()
        .and_then(|b| b.data.as_deref())
        .and_then(decode_base64_body)
}

fn is_html(part: &MessagePart) -> bool {
    part.mime_type.as_deref() == Some(HTML_MIME_TYPE)
}

fn first_with_type(parts: &[MessagePart]) -> Option<&MessagePart> {
    parts.iter().find(|p| is_html(p))
}

/// Depth-first search for the first text/html leaf
fn find_html_part(part: &MessagePart) -> Option<&MessagePart> {
    match &part.parts {
        Some(children) if !children.is_empty() => children.iter().find_map(find_html_part),
        _ => is_html(part).then_some(part),
    }
}

/// Decode base64url body data into text
///
/// Gmail uses the URL-safe alphabet; padding may or may not be present.
/// Bytes that are not valid UTF-8 are replaced rather than dropping the body.
pub fn decode_base64_body(data: &str) -> Option<String> {
    let trimmed = data.trim_end_matches('=');
    let decoded = BASE64_URL_SAFE_NO_PAD.decode(trimmed).ok()?;
    Some(String::from_utf8_lossy(&decoded).into_owned())
}
