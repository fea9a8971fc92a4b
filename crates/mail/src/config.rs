//! Configuration for the Gmail client
//!
//! Application secrets are read from a Google Cloud Console JSON file.
//! Runtime settings start from built-in defaults, then apply (in order):
//! 1. `settings.json` in the config directory, if present
//! 2. Environment variables

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings filename in the config directory
const SETTINGS_FILE: &str = "settings.json";

/// Gmail API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

/// OAuth client id/secret for the installed application
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Google Cloud Console credential file format (installed app)
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
}

impl ClientSecrets {
    /// Load secrets from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
    }

    /// Parse secrets from JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse client secrets JSON")?;
        Self::from_credential_file(creds)
    }

    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // Support both "installed" (desktop) and "web" credential types
        let installed = creds
            .installed
            .or(creds.web)
            .context("Client secrets file missing 'installed' or 'web' section")?;

        if installed.client_id.is_empty() || installed.client_secret.is_empty() {
            anyhow::bail!("Client secrets file has an empty client_id or client_secret");
        }

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
        })
    }
}

/// Permission level requested during authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Read messages and labels only
    #[default]
    ReadOnly,
    /// Read plus label changes
    Modify,
}

impl Scope {
    /// OAuth scope URL sent to the consent screen
    pub fn as_url(&self) -> &'static str {
        match self {
            Scope::ReadOnly => "https://www.googleapis.com/auth/gmail.readonly",
            Scope::Modify => "https://www.googleapis.com/auth/gmail.modify",
        }
    }

    /// Parse `readonly` / `modify` (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "readonly" | "read-only" => Some(Scope::ReadOnly),
            "modify" => Some(Scope::Modify),
            _ => None,
        }
    }
}

/// How the HTML body is located inside a message payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HtmlLookup {
    /// Only the two recognized shapes: one wrapper part holding the
    /// alternatives, or two top-level alternatives
    #[default]
    Strict,
    /// First `text/html` leaf anywhere in the part tree
    Recursive,
}

/// Runtime settings for the quickstart client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app_name: String,
    pub secrets_path: PathBuf,
    pub credentials_path: PathBuf,
    pub scope: Scope,
    pub html_lookup: HtmlLookup,
    pub api_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "Gmail API Rust Quickstart".to_string(),
            secrets_path: Path::new("config").join("client_secret.json"),
            credentials_path: Path::new("config")
                .join(".credentials")
                .join("gmail-quickstart.json"),
            scope: Scope::ReadOnly,
            html_lookup: HtmlLookup::Strict,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl Settings {
    /// Load settings: defaults, then the config-dir settings file, then the environment
    pub fn load() -> Result<Self> {
        let settings = if config::config_exists(SETTINGS_FILE) {
            config::load_json(SETTINGS_FILE)?
        } else {
            Self::default()
        };

        settings.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides using the given lookup
    ///
    /// Recognized keys: `GMAIL_SECRETS_PATH`, `GMAIL_CREDENTIALS_PATH`, `GMAIL_SCOPE`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("GMAIL_SECRETS_PATH") {
            self.secrets_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("GMAIL_CREDENTIALS_PATH") {
            self.credentials_path = PathBuf::from(path);
        }
        if let Some(scope) = lookup("GMAIL_SCOPE") {
            self.scope = Scope::parse(&scope)
                .with_context(|| format!("Invalid GMAIL_SCOPE value: {scope}"))?;
        }
        Ok(self)
    }
}
