//! Gmail mail client
//!
//! Lists labels and messages and changes message labels for the
//! authorized user. Every call blocks until the API answers.

use log::{debug, info};

use super::api::ModifyMessageRequest;
use super::auth::{CredentialStore, OAuthFlow};
use super::normalize::normalize_message;
use super::transport::{GmailApi, HttpTransport};
use crate::config::{HtmlLookup, Settings};
use crate::error::{Error, Result};
use crate::models::{find_by_name, Label, Message, MessageId};

/// Default search for [`MailClient::list_messages`]
pub const DEFAULT_QUERY: &str = "in:inbox is:unread";

/// Default result cap for [`MailClient::list_messages`]
pub const DEFAULT_MAX_RESULTS: usize = 3;

/// Gmail client over a transport
pub struct MailClient<T: GmailApi = HttpTransport> {
    transport: T,
    html_lookup: HtmlLookup,
}

impl MailClient<HttpTransport> {
    /// Authorize with `store`, then build an HTTP client from the resulting token
    pub fn connect<F: OAuthFlow>(store: &CredentialStore<F>, settings: &Settings) -> Result<Self> {
        let credential = store.authorize()?;
        let transport = HttpTransport::with_base_url(&credential, &settings.api_base_url)?;
        Ok(Self::new(transport).with_html_lookup(settings.html_lookup))
    }
}

impl<T: GmailApi> MailClient<T> {
    /// Create a client over an already-authorized transport
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            html_lookup: HtmlLookup::default(),
        }
    }

    /// Choose how HTML bodies are located
    pub fn with_html_lookup(mut self, html_lookup: HtmlLookup) -> Self {
        self.html_lookup = html_lookup;
        self
    }

    /// Access the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// List all labels in the mailbox, in API order
    pub fn list_labels(&self) -> Result<Vec<Label>> {
        let response = self.transport.list_labels()?;

        Ok(response
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(|l| Label::new(l.id, l.name))
            .collect())
    }

    /// Names of all labels, in API order
    pub fn label_names(&self) -> Result<Vec<String>> {
        Ok(self.list_labels()?.into_iter().map(|l| l.name).collect())
    }

    /// List up to `max` messages matching `query`, each fetched in full
    ///
    /// Messages are fetched one at a time in list order. The first failed
    /// fetch aborts the whole call.
    pub fn list_messages(&self, query: &str, max: usize) -> Result<Vec<Message>> {
        let list = self.transport.list_messages(query, max)?;
        let refs = list.messages.unwrap_or_default();
        debug!("Query {:?} matched {} message(s)", query, refs.len());

        refs.into_iter()
            .take(max)
            .map(|msg_ref| -> Result<Message> {
                let id = MessageId::new(msg_ref.id);
                let gmail_msg = self.transport.get_message(&id)?;
                Ok(normalize_message(gmail_msg, self.html_lookup))
            })
            .collect()
    }

    /// Unread inbox messages with the default cap
    pub fn list_recent_unread(&self) -> Result<Vec<Message>> {
        self.list_messages(DEFAULT_QUERY, DEFAULT_MAX_RESULTS)
    }

    /// Add the label named `label_name` to a message
    pub fn add_label(&self, message_id: &MessageId, label_name: &str) -> Result<()> {
        let label = self.resolve_label(label_name)?;
        info!("Adding label {} to message {}", label.id.as_str(), message_id);

        let request = ModifyMessageRequest {
            add_label_ids: vec![label.id.0],
            ..ModifyMessageRequest::default()
        };
        self.transport.modify_message(message_id, &request)
    }

    /// Remove the label named `label_name` from a message
    pub fn remove_label(&self, message_id: &MessageId, label_name: &str) -> Result<()> {
        let label = self.resolve_label(label_name)?;
        info!(
            "Removing label {} from message {}",
            label.id.as_str(),
            message_id
        );

        let request = ModifyMessageRequest {
            remove_label_ids: vec![label.id.0],
            ..ModifyMessageRequest::default()
        };
        self.transport.modify_message(message_id, &request)
    }

    fn resolve_label(&self, label_name: &str) -> Result<Label> {
        let labels = self.list_labels()?;
        find_by_name(&labels, label_name)
            .cloned()
            .ok_or_else(|| Error::NotFound("Label not found".to_string()))
    }
}
