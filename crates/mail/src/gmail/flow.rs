//! Installed-app OAuth2 flow
//!
//! Implements the authorization code flow for desktop applications.
//! Uses a local HTTP server to receive the OAuth callback and synchronous
//! HTTP (ureq) for the token endpoint.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};

use super::api::TokenResponse;
use super::auth::{Credential, OAuthFlow};
use crate::config::{ClientSecrets, Scope};

/// Real browser + callback OAuth flow against Google's endpoints
#[derive(Debug, Clone)]
pub struct InstalledAppFlow {
    auth_url: String,
    token_url: String,
}

impl Default for InstalledAppFlow {
    fn default() -> Self {
        Self::with_endpoints(Self::AUTH_URL, Self::TOKEN_URL)
    }
}

impl InstalledAppFlow {
    /// Google OAuth2 endpoints
    pub const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    pub const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Port range to try for local OAuth callback server
    const PORT_RANGE_START: u16 = 8080;
    const PORT_RANGE_END: u16 = 8090;

    /// Use custom consent and token endpoints
    pub fn with_endpoints(auth_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        Self {
            auth_url: auth_url.into(),
            token_url: token_url.into(),
        }
    }

    /// Build the consent URL the user is sent to
    pub fn consent_url(&self, secrets: &ClientSecrets, scope: Scope, redirect_uri: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.auth_url,
            urlencoding::encode(&secrets.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(scope.as_url()),
        )
    }

    /// Start a local TCP server on an available port
    fn start_local_server(&self) -> Result<(TcpListener, u16)> {
        for port in Self::PORT_RANGE_START..=Self::PORT_RANGE_END {
            if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
                return Ok((listener, port));
            }
        }
        anyhow::bail!(
            "Could not bind to any port in range {}-{}",
            Self::PORT_RANGE_START,
            Self::PORT_RANGE_END
        )
    }

    /// Exchange an authorization code for tokens
    pub fn exchange_code(
        &self,
        secrets: &ClientSecrets,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Credential> {
        debug!("Exchanging authorization code at {}", self.token_url);
        let mut response = ureq::post(&self.token_url)
            .send_form([
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ])
            .context("Failed to exchange authorization code")?;

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse token response")?;

        Ok(Credential::from_token_response(
            token,
            chrono::Utc::now().timestamp(),
        ))
    }
}

impl OAuthFlow for InstalledAppFlow {
    fn authorize_interactive(&self, secrets: &ClientSecrets, scope: Scope) -> Result<Credential> {
        let (listener, port) = self.start_local_server()?;
        let redirect_uri = format!("http://localhost:{}", port);
        let consent_url = self.consent_url(secrets, scope, &redirect_uri);

        println!("\n=== Gmail Authorization Required ===");
        println!("Opening browser for authorization...");
        println!("If the browser doesn't open, visit: {}", consent_url);

        if let Err(e) = open::that(&consent_url) {
            warn!("Failed to open browser: {}. Please open the URL manually.", e);
        }

        println!("Waiting for authorization...");
        let (stream, _) = listener.accept().context("Failed to accept connection")?;
        let code = wait_for_callback(stream)?;

        let credential = self.exchange_code(secrets, &code, &redirect_uri)?;
        println!("Authorization successful!\n");
        Ok(credential)
    }

    fn refresh(&self, secrets: &ClientSecrets, refresh_token: &str) -> Result<Credential> {
        debug!("Refreshing access token at {}", self.token_url);
        let mut response = ureq::post(&self.token_url)
            .send_form([
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .context("Failed to refresh access token")?;

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse refresh token response")?;

        Ok(Credential::from_token_response(
            token,
            chrono::Utc::now().timestamp(),
        ))
    }
}

/// Read the browser's callback request, answer it, and return the code
fn wait_for_callback(mut stream: TcpStream) -> Result<String> {
    let mut request_line = String::new();
    BufReader::new(&stream)
        .read_line(&mut request_line)
        .context("Failed to read request")?;

    let outcome = parse_callback(&request_line);

    let (status, body) = if outcome.is_ok() {
        ("200 OK", "Authorization successful! You can close this window.")
    } else {
        ("400 Bad Request", "Authorization failed. Please try again.")
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
        status, body
    );
    stream.write_all(response.as_bytes()).ok();

    outcome
}

/// Pull `code` (or `error`) out of a request line like
/// `GET /?code=AUTH_CODE&scope=... HTTP/1.1`
fn parse_callback(request_line: &str) -> Result<String> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .context("Malformed callback request")?;

    let url = url::Url::parse("http://localhost")
        .and_then(|base| base.join(target))
        .context("Malformed callback request")?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => anyhow::bail!("OAuth error: {}", value),
            "code" => code = Some(value.into_owned()),
            _ => {}
        }
    }

    code.context("No authorization code received")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::io::Read;

    fn secrets() -> ClientSecrets {
        ClientSecrets {
            client_id: "client id".to_string(),
            client_secret: "shh".to_string(),
        }
    }

    #[test]
    fn test_consent_url_is_encoded() {
        let flow = InstalledAppFlow::default();
        let url = flow.consent_url(&secrets(), Scope::Modify, "http://localhost:8080");

        assert!(url.starts_with(InstalledAppFlow::AUTH_URL));
        assert!(url.contains("client_id=client%20id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080"));
        assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fgmail.modify"));
        assert!(url.contains("access_type=offline"));
        assert!(!url.contains("shh"));
    }

    #[test]
    fn test_parse_callback_code() {
        let code = parse_callback("GET /?code=4%2F0Abc&scope=x HTTP/1.1\r\n").unwrap();
        assert_eq!(code, "4/0Abc");
    }

    #[test]
    fn test_parse_callback_error() {
        let err = parse_callback("GET /?error=access_denied HTTP/1.1\r\n").unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[test]
    fn test_parse_callback_missing_code() {
        assert!(parse_callback("GET /favicon.ico HTTP/1.1\r\n").is_err());
        assert!(parse_callback("").is_err());
    }

    #[test]
    fn test_wait_for_callback_answers_browser() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let browser = std::thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream
                .write_all(b"GET /?code=abc123 HTTP/1.1\r\n")
                .unwrap();
            let mut reply = String::new();
            stream.read_to_string(&mut reply).unwrap();
            reply
        });

        let (stream, _) = listener.accept().unwrap();
        let code = wait_for_callback(stream).unwrap();
        let reply = browser.join().unwrap();

        assert_eq!(code, "abc123");
        assert!(reply.starts_with("HTTP/1.1 200 OK"));
    }

    #[test]
    fn test_exchange_code() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "abc123".into()),
                Matcher::UrlEncoded("client_id".into(), "client id".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"access_token": "ya29.new", "refresh_token": "1//r", "expires_in": 3599, "token_type": "Bearer"}"#,
            )
            .create();

        let flow = InstalledAppFlow::with_endpoints(
            format!("{}/auth", server.url()),
            format!("{}/token", server.url()),
        );
        let credential = flow
            .exchange_code(&secrets(), "abc123", "http://localhost:8080")
            .unwrap();

        mock.assert();
        assert_eq!(credential.access_token, "ya29.new");
        assert_eq!(credential.refresh_token.as_deref(), Some("1//r"));
        assert!(!credential.is_expired());
    }

    #[test]
    fn test_refresh() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "1//r".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "ya29.refreshed", "expires_in": 3599}"#)
            .create();

        let flow = InstalledAppFlow::with_endpoints(
            format!("{}/auth", server.url()),
            format!("{}/token", server.url()),
        );
        let credential = flow.refresh(&secrets(), "1//r").unwrap();

        mock.assert();
        assert_eq!(credential.access_token, "ya29.refreshed");
        assert_eq!(credential.refresh_token, None);
    }

    #[test]
    fn test_refresh_rejected() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create();

        let flow = InstalledAppFlow::with_endpoints(
            format!("{}/auth", server.url()),
            format!("{}/token", server.url()),
        );
        assert!(flow.refresh(&secrets(), "1//r").is_err());
    }
}
