//! Mail crate - Gmail access for a single account
//!
//! This crate provides:
//! - A file-backed OAuth2 credential store with silent refresh
//! - The installed-app authorization flow (browser + local callback)
//! - A blocking Gmail REST client: labels, messages, label changes
//! - Domain models (Label, Message) and MIME body extraction
//!
//! All I/O is synchronous; nothing here spawns threads.

pub mod config;
pub mod error;
pub mod gmail;
pub mod models;

pub use config::{ClientSecrets, HtmlLookup, Scope, Settings};
pub use error::{Error, Result};
pub use gmail::{
    authorize, Credential, CredentialStore, GmailApi, HttpTransport, InstalledAppFlow,
    MailClient, OAuthFlow, DEFAULT_MAX_RESULTS, DEFAULT_QUERY,
};
pub use models::{Label, LabelId, Message, MessageHeaders, MessageId};
