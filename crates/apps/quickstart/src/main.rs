//! Gmail quickstart - print the most recent unread inbox messages
//!
//! Authorizes (opening a browser the first time), then lists unread
//! messages in the inbox and exits.

use anyhow::{Context, Result};
use log::{error, info};
use mail::{CredentialStore, InstalledAppFlow, MailClient, Message, Settings};

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let settings = Settings::load().context("Failed to load settings")?;
    info!("Starting {}", settings.app_name);

    let store = CredentialStore::from_settings(&settings, InstalledAppFlow::default());
    let client = MailClient::connect(&store, &settings).with_context(|| {
        format!(
            "Could not connect to Gmail. Client secrets are read from {}",
            settings.secrets_path.display()
        )
    })?;

    let messages = client
        .list_recent_unread()
        .context("Failed to list unread messages")?;

    if messages.is_empty() {
        println!("No unread messages in the inbox.");
        return Ok(());
    }

    for message in &messages {
        print_message(message);
    }
    Ok(())
}

fn print_message(message: &Message) {
    let headers = &message.headers;
    println!("From:    {}", headers.from.as_deref().unwrap_or("-"));
    println!("Date:    {}", headers.date.as_deref().unwrap_or("-"));
    println!("Subject: {}", headers.subject.as_deref().unwrap_or("-"));
    println!("         {}", message.snippet);
    if message.html_body.is_some() {
        println!("         (has HTML body)");
    }
    println!();
}
