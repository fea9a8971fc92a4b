//! Message model representing a fetched Gmail message

use super::LabelId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The headers picked out of a message; each is absent when the message lacks it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeaders {
    pub from: Option<String>,
    pub date: Option<String>,
    pub subject: Option<String>,
}

/// A message as returned by a single retrieval call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Gmail message ID
    pub id: MessageId,
    /// From / Date / Subject
    pub headers: MessageHeaders,
    /// Short plain-text preview provided by Gmail
    pub snippet: String,
    /// Decoded top-level body data (absent for multipart messages)
    pub plain_text_body: Option<String>,
    /// Decoded `text/html` part, when one was found
    pub html_body: Option<String>,
    /// Gmail label IDs (e.g., "INBOX", "UNREAD")
    pub label_ids: BTreeSet<LabelId>,
}

impl Message {
    /// Create a new message builder
    pub fn builder(id: MessageId) -> MessageBuilder {
        MessageBuilder::new(id)
    }

    /// Whether the message carries the given label id
    pub fn has_label(&self, label_id: &str) -> bool {
        self.label_ids.iter().any(|l| l.as_str() == label_id)
    }
}

/// Builder for creating Message instances
pub struct MessageBuilder {
    id: MessageId,
    headers: MessageHeaders,
    snippet: String,
    plain_text_body: Option<String>,
    html_body: Option<String>,
    label_ids: BTreeSet<LabelId>,
}

impl MessageBuilder {
    fn new(id: MessageId) -> Self {
        Self {
            id,
            headers: MessageHeaders::default(),
            snippet: String::new(),
            plain_text_body: None,
            html_body: None,
            label_ids: BTreeSet::new(),
        }
    }

    pub fn headers(mut self, headers: MessageHeaders) -> Self {
        self.headers = headers;
        self
    }

    pub fn snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    pub fn plain_text_body(mut self, body: Option<String>) -> Self {
        self.plain_text_body = body;
        self
    }

    pub fn html_body(mut self, body: Option<String>) -> Self {
        self.html_body = body;
        self
    }

    pub fn label_ids<I, L>(mut self, label_ids: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<LabelId>,
    {
        self.label_ids = label_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Message {
        Message {
            id: self.id,
            headers: self.headers,
            snippet: self.snippet,
            plain_text_body: self.plain_text_body,
            html_body: self.html_body,
            label_ids: self.label_ids,
        }
    }
}
