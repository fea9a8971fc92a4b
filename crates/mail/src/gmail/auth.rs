//! Gmail OAuth2 credential storage
//!
//! Resolves a usable access token for the Gmail API:
//! - a stored, unexpired credential is used as-is
//! - an expired credential with a refresh token is refreshed silently
//! - otherwise the interactive installed-app flow runs
//!
//! Any new credential is written back to the credentials file.

use anyhow::Context;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::api::TokenResponse;
use super::flow::InstalledAppFlow;
use crate::config::{ClientSecrets, Scope, Settings};
use crate::error::{Error, Result};

/// A credential expiring within this many seconds is treated as expired
pub const EXPIRY_SKEW_SECS: i64 = 300;

/// Delegated authority to call the Gmail API
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds) when the access token expires
    pub expires_at: Option<i64>,
}

impl Credential {
    /// Build a credential from a token endpoint response received at `now`
    pub fn from_token_response(token: TokenResponse, now: i64) -> Self {
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token.expires_in.map(|secs| now + secs as i64),
        }
    }

    /// Whether the access token is expired (or about to be)
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }

    /// A credential without an expiry never expires locally
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= now + EXPIRY_SKEW_SECS)
    }

    /// Whether the access token is past its expiry, ignoring the refresh skew
    pub fn has_lapsed(&self) -> bool {
        self.has_lapsed_at(chrono::Utc::now().timestamp())
    }

    pub fn has_lapsed_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The steps of OAuth that talk to the user or the token endpoint
pub trait OAuthFlow {
    /// Obtain a brand-new credential with the user's consent
    fn authorize_interactive(
        &self,
        secrets: &ClientSecrets,
        scope: Scope,
    ) -> anyhow::Result<Credential>;

    /// Exchange a refresh token for a new access token, without user interaction
    fn refresh(&self, secrets: &ClientSecrets, refresh_token: &str) -> anyhow::Result<Credential>;
}

/// File-backed credential cache
pub struct CredentialStore<F: OAuthFlow = InstalledAppFlow> {
    secrets_path: PathBuf,
    credentials_path: PathBuf,
    scope: Scope,
    flow: F,
}

impl<F: OAuthFlow> CredentialStore<F> {
    pub fn new(
        secrets_path: impl Into<PathBuf>,
        credentials_path: impl Into<PathBuf>,
        scope: Scope,
        flow: F,
    ) -> Self {
        Self {
            secrets_path: secrets_path.into(),
            credentials_path: credentials_path.into(),
            scope,
            flow,
        }
    }

    /// Create a store using the paths and scope from `settings`
    pub fn from_settings(settings: &Settings, flow: F) -> Self {
        Self::new(
            &settings.secrets_path,
            &settings.credentials_path,
            settings.scope,
            flow,
        )
    }

    /// Return a valid credential, refreshing or re-authorizing as needed
    pub fn authorize(&self) -> Result<Credential> {
        config::ensure_parent_dir(&self.credentials_path).map_err(Error::auth)?;

        match self.load() {
            Some(credential) if !credential.is_expired() => {
                debug!("Using stored credential");
                Ok(credential)
            }
            Some(Credential {
                refresh_token: Some(refresh_token),
                ..
            }) => {
                info!("Stored credential expired, refreshing access token");
                let secrets = self.load_secrets()?;
                let mut credential = self
                    .flow
                    .refresh(&secrets, &refresh_token)
                    .map_err(Error::auth)?;
                ensure_not_lapsed(&credential)?;

                // Google usually omits the refresh token on refresh
                if credential.refresh_token.is_none() {
                    credential.refresh_token = Some(refresh_token);
                }

                self.save(&credential)?;
                Ok(credential)
            }
            _ => {
                info!("No usable stored credential, starting authorization flow");
                let secrets = self.load_secrets()?;
                let credential = self
                    .flow
                    .authorize_interactive(&secrets, self.scope)
                    .map_err(Error::auth)?;
                ensure_not_lapsed(&credential)?;

                self.save(&credential)?;
                info!("Credentials saved to {}", self.credentials_path.display());
                Ok(credential)
            }
        }
    }

    /// Load the stored credential, if there is a readable one
    pub fn load(&self) -> Option<Credential> {
        let content = match fs::read_to_string(&self.credentials_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(
                    "Failed to read credentials file {}: {}",
                    self.credentials_path.display(),
                    e
                );
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(credential) => Some(credential),
            Err(e) => {
                warn!(
                    "Ignoring malformed credentials file {}: {}",
                    self.credentials_path.display(),
                    e
                );
                None
            }
        }
    }

    /// Remove the stored credential (logout)
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.credentials_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Auth(format!(
                "Failed to remove credentials file {}: {}",
                self.credentials_path.display(),
                e
            ))),
        }
    }

    fn load_secrets(&self) -> Result<ClientSecrets> {
        ClientSecrets::from_file(&self.secrets_path).map_err(Error::auth)
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        write_credential(&self.credentials_path, credential).map_err(Error::auth)
    }
}

/// A token that is already past its expiry is never returned or saved
fn ensure_not_lapsed(credential: &Credential) -> Result<()> {
    if credential.has_lapsed() {
        return Err(Error::Auth(
            "Token endpoint returned an access token that has already expired".to_string(),
        ));
    }
    Ok(())
}

/// Write via a sibling temp file so the target is never left half-written
fn write_credential(path: &Path, credential: &Credential) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(credential)?;

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(&tmp_path)
        .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    file.sync_all()?;

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to save credentials to {}", path.display()))?;
    Ok(())
}

/// Authorize with the real installed-app flow
pub fn authorize(
    secrets_path: impl Into<PathBuf>,
    credentials_path: impl Into<PathBuf>,
    scope: Scope,
) -> Result<Credential> {
    CredentialStore::new(
        secrets_path,
        credentials_path,
        scope,
        InstalledAppFlow::default(),
    )
    .authorize()
}
