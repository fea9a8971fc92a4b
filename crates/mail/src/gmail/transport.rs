//! Gmail API transport
//!
//! [`GmailApi`] is the seam between the mail client and the remote API.
//! [`HttpTransport`] implements it with blocking HTTP (ureq) and a bearer
//! token; tests substitute in-memory implementations.

use log::debug;
use std::time::Duration;

use super::api::{GmailMessage, ListLabelsResponse, ListMessagesResponse, ModifyMessageRequest};
use super::auth::Credential;
use crate::config::DEFAULT_API_BASE_URL;
use crate::error::{Error, Result};
use crate::models::MessageId;

/// The four remote calls the mail client needs, scoped to the authorized user
pub trait GmailApi {
    /// `users.labels.list`
    fn list_labels(&self) -> Result<ListLabelsResponse>;

    /// `users.messages.list` with a search query and result cap
    fn list_messages(&self, query: &str, max_results: usize) -> Result<ListMessagesResponse>;

    /// `users.messages.get` in full format
    fn get_message(&self, id: &MessageId) -> Result<GmailMessage>;

    /// `users.messages.modify`
    fn modify_message(&self, id: &MessageId, request: &ModifyMessageRequest) -> Result<()>;
}

/// Gmail REST transport holding the bearer token
pub struct HttpTransport {
    agent: ureq::Agent,
    base_url: String,
    authorization: String,
}

impl HttpTransport {
    /// Gmail caps `maxResults` for message listing
    const MAX_RESULTS_LIMIT: usize = 500;

    /// Create a transport against the public Gmail API
    ///
    /// Fails with `Error::Auth` if the access token is already past its expiry.
    pub fn new(credential: &Credential) -> Result<Self> {
        Self::with_base_url(credential, DEFAULT_API_BASE_URL)
    }

    /// Create a transport against a custom base URL (e.g. a local mock)
    pub fn with_base_url(credential: &Credential, base_url: impl Into<String>) -> Result<Self> {
        if credential.has_lapsed() {
            return Err(Error::Auth(
                "Access token is expired; authorize before calling the API".to_string(),
            ));
        }

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build()
            .into();

        Ok(Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            authorization: format!("Bearer {}", credential.access_token),
        })
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        context: &str,
    ) -> Result<T> {
        let mut response = self
            .agent
            .get(url)
            .header("Authorization", &self.authorization)
            .query_pairs(query.iter().copied())
            .call()
            .map_err(|e| Error::api(context, e))?;

        response
            .body_mut()
            .read_json()
            .map_err(|e| Error::api(context, e))
    }
}

impl GmailApi for HttpTransport {
    fn list_labels(&self) -> Result<ListLabelsResponse> {
        let url = format!("{}/users/me/labels", self.base_url);
        debug!("GET {}", url);
        self.get_json(&url, &[], "Failed to list labels")
    }

    fn list_messages(&self, query: &str, max_results: usize) -> Result<ListMessagesResponse> {
        let url = format!("{}/users/me/messages", self.base_url);
        let max_results = max_results.min(Self::MAX_RESULTS_LIMIT).to_string();
        debug!("GET {} q={:?} maxResults={}", url, query, max_results);
        self.get_json(
            &url,
            &[("q", query), ("maxResults", max_results.as_str())],
            "Failed to list messages",
        )
    }

    fn get_message(&self, id: &MessageId) -> Result<GmailMessage> {
        let url = format!(
            "{}/users/me/messages/{}",
            self.base_url,
            urlencoding::encode(id.as_str())
        );
        debug!("GET {}", url);
        self.get_json(
            &url,
            &[("format", "full")],
            &format!("Failed to fetch message {}", id),
        )
    }

    fn modify_message(&self, id: &MessageId, request: &ModifyMessageRequest) -> Result<()> {
        let url = format!(
            "{}/users/me/messages/{}/modify",
            self.base_url,
            urlencoding::encode(id.as_str())
        );
        debug!("POST {}", url);
        self.agent
            .post(&url)
            .header("Authorization", &self.authorization)
            .send_json(request)
            .map_err(|e| Error::api(format!("Failed to modify message {}", id), e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn credential() -> Credential {
        Credential {
            access_token: "test-token".to_string(),
            refresh_token: None,
            expires_at: Some(chrono::Utc::now().timestamp() + 3600),
        }
    }

    fn transport(server: &mockito::Server) -> HttpTransport {
        HttpTransport::with_base_url(&credential(), format!("{}/gmail/v1", server.url())).unwrap()
    }

    #[test]
    fn test_expired_credential_rejected() {
        let expired = Credential {
            expires_at: Some(0),
            ..credential()
        };
        assert!(matches!(HttpTransport::new(&expired), Err(Error::Auth(_))));
    }

    #[test]
    fn test_credential_within_refresh_window_accepted() {
        let expiring = Credential {
            expires_at: Some(chrono::Utc::now().timestamp() + 60),
            ..credential()
        };
        assert!(expiring.is_expired());
        assert!(HttpTransport::new(&expiring).is_ok());
    }

    #[test]
    fn test_list_labels_sends_bearer_token() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/gmail/v1/users/me/labels")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"labels": [{"id": "INBOX", "name": "INBOX", "type": "system"}]}"#)
            .create();

        let labels = transport(&server).list_labels().unwrap();

        mock.assert();
        let labels = labels.labels.unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].id, "INBOX");
    }

    #[test]
    fn test_list_messages_query_params() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/gmail/v1/users/me/messages")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "in:inbox is:unread".into()),
                Matcher::UrlEncoded("maxResults".into(), "3".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"messages": [{"id": "m1", "threadId": "t1"}], "resultSizeEstimate": 1}"#)
            .create();

        let list = transport(&server)
            .list_messages("in:inbox is:unread", 3)
            .unwrap();

        mock.assert();
        assert_eq!(list.messages.unwrap()[0].id, "m1");
    }

    #[test]
    fn test_list_messages_empty_mailbox() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/gmail/v1/users/me/messages")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"resultSizeEstimate": 0}"#)
            .create();

        let list = transport(&server).list_messages("label:none", 3).unwrap();
        assert!(list.messages.is_none());
    }

    #[test]
    fn test_get_message_error_names_message() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/gmail/v1/users/me/messages/missing")
            .match_query(Matcher::UrlEncoded("format".into(), "full".into()))
            .with_status(404)
            .with_body(r#"{"error": {"code": 404, "message": "Requested entity was not found."}}"#)
            .create();

        let err = transport(&server)
            .get_message(&MessageId::new("missing"))
            .unwrap_err();

        match err {
            Error::Api { context, .. } => assert!(context.contains("missing")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_modify_message_body() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/gmail/v1/users/me/messages/m1/modify")
            .match_header("authorization", "Bearer test-token")
            .match_body(Matcher::Json(serde_json::json!({"addLabelIds": ["Label_1"]})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "m1", "labelIds": ["INBOX", "Label_1"]}"#)
            .create();

        let request = ModifyMessageRequest {
            add_label_ids: vec!["Label_1".to_string()],
            remove_label_ids: Vec::new(),
        };
        transport(&server)
            .modify_message(&MessageId::new("m1"), &request)
            .unwrap();

        mock.assert();
    }

    #[test]
    fn test_unauthorized_is_api_error() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/gmail/v1/users/me/labels")
            .with_status(401)
            .create();

        assert!(matches!(
            transport(&server).list_labels(),
            Err(Error::Api { .. })
        ));
    }
}
