//! Gmail API integration
//!
//! This module provides:
//! - OAuth2 credential storage and the installed-app authorization flow
//! - A blocking HTTP transport for the Gmail REST API
//! - The mail client built on top of that transport
//! - Response normalization to domain models

mod auth;
mod client;
mod flow;
mod normalize;
mod transport;

pub use auth::{authorize, Credential, CredentialStore, OAuthFlow, EXPIRY_SKEW_SECS};
pub use client::{MailClient, DEFAULT_MAX_RESULTS, DEFAULT_QUERY};
pub use flow::InstalledAppFlow;
pub use normalize::{decode_base64_body, extract_headers, find_html_body, normalize_message};
pub use transport::{GmailApi, HttpTransport};

/// Gmail API response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from listing labels
    #[derive(Debug, Default, Deserialize)]
    pub struct ListLabelsResponse {
        pub labels: Option<Vec<GmailLabel>>,
    }

    /// Label record as returned by the labels endpoint
    #[derive(Debug, Clone, Deserialize)]
    pub struct GmailLabel {
        pub id: String,
        pub name: String,
    }

    /// Response from listing messages
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
    }

    /// Reference to a message as returned by the listing
    #[derive(Debug, Clone, Deserialize)]
    pub struct MessageRef {
        pub id: String,
    }

    /// Full message from Gmail API
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        pub label_ids: Option<Vec<String>>,
        #[serde(default)]
        pub snippet: String,
        pub payload: Option<MessagePart>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Clone, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Message body (base64url encoded when present)
    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct MessageBody {
        pub size: Option<u32>,
        pub data: Option<String>,
    }

    /// Node of the MIME tree; the top-level payload has the same shape
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        pub mime_type: Option<String>,
        pub headers: Option<Vec<Header>>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
    }

    /// Body of a `messages.modify` request
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ModifyMessageRequest {
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub add_label_ids: Vec<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub remove_label_ids: Vec<String>,
    }

    /// Token endpoint response
    #[derive(Debug, Deserialize)]
    pub struct TokenResponse {
        pub access_token: String,
        pub refresh_token: Option<String>,
        pub expires_in: Option<u64>,
    }
}
