//! Error taxonomy for mail operations

/// Errors surfaced by the credential store and the mail client
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Secrets missing or invalid, OAuth exchange rejected, or the credential
    /// could not be persisted
    #[error("Authorization failed: {0}")]
    Auth(String),

    /// Non-success response from the Gmail API, or a network failure
    #[error("{context}: {message}")]
    Api { context: String, message: String },

    /// A label name did not resolve to a label id
    #[error("{0}")]
    NotFound(String),
}

impl Error {
    /// Build an `Api` error from an operation description and any displayable cause
    pub fn api(context: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Api {
            context: context.into(),
            message: cause.to_string(),
        }
    }

    /// Build an `Auth` error, keeping the full cause chain of an `anyhow` error
    pub(crate) fn auth(err: anyhow::Error) -> Self {
        Self::Auth(format!("{err:#}"))
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = Error::api("Failed to fetch message abc", "http status: 404");
        assert_eq!(err.to_string(), "Failed to fetch message abc: http status: 404");
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::NotFound("Label not found".to_string());
        assert_eq!(err.to_string(), "Label not found");
    }

    #[test]
    fn test_auth_keeps_context_chain() {
        let inner = anyhow::anyhow!("No such file").context("Failed to read config file: x.json");
        let err = Error::auth(inner);
        assert_eq!(
            err.to_string(),
            "Authorization failed: Failed to read config file: x.json: No such file"
        );
    }
}
