//! Google OAuth for the Drive upload
//!
//! Tokens are kept in the authorized-user JSON layout Google's client
//! libraries write, so an existing `token.json` keeps working. A stored
//! token is reused while valid, refreshed when expired, and replaced by an
//! interactive installed-app consent (PKCE with a loopback redirect)
//! otherwise.

use chrono::{DateTime, Duration, Utc};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, RedirectUrl,
    RefreshToken, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use url::Url;

use crate::utils::error::UploadError;

/// Create files in Drive and edit the documents it creates
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/drive.file",
    "https://www.googleapis.com/auth/documents",
];

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// A token this close to expiry is treated as expired
const EXPIRY_SKEW_SECS: i64 = 60;

/// OAuth client from the Google Cloud console download
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,

    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// Placeholder printed instead of secret values
const REDACTED: &str = "<redacted>";

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        REDACTED
    }
}

impl fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The download nests the client under `installed` or `web`
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn from_json(content: &str) -> Result<Self, UploadError> {
        let file: ClientSecretsFile = serde_json::from_str(content)
            .map_err(|e| UploadError::CredentialFile(format!("client secrets: {e}")))?;

        file.installed.or(file.web).ok_or_else(|| {
            UploadError::CredentialFile(String::from(
                "client secrets have neither an installed nor a web section",
            ))
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, UploadError> {
        if !path.exists() {
            return Err(UploadError::MissingClientSecrets(path.display().to_string()));
        }
        let content = fs::read_to_string(path)
            .map_err(|e| UploadError::CredentialFile(format!("{}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    fn oauth_client(&self) -> Result<BasicClient, UploadError> {
        let auth_url = AuthUrl::new(self.auth_uri.clone())
            .map_err(|e| UploadError::Auth(format!("bad auth_uri: {e}")))?;
        let token_url = TokenUrl::new(self.token_uri.clone())
            .map_err(|e| UploadError::Auth(format!("bad token_uri: {e}")))?;

        Ok(BasicClient::new(
            ClientId::new(self.client_id.clone()),
            Some(ClientSecret::new(self.client_secret.clone())),
            auth_url,
            Some(token_url),
        ))
    }
}

/// Authorized-user token file
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    /// Access token
    pub token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default)]
    pub scopes: Vec<String>,

    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredToken")
            .field("token", &redact(&self.token))
            .field("refresh_token", &self.refresh_token.as_deref().map(redact))
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl StoredToken {
    pub fn load(path: &Path) -> Result<Option<Self>, UploadError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .map_err(|e| UploadError::CredentialFile(format!("{}: {e}", path.display())))?;
        let token = serde_json::from_str(&content)
            .map_err(|e| UploadError::CredentialFile(format!("{}: {e}", path.display())))?;
        Ok(Some(token))
    }

    pub fn save(&self, path: &Path) -> Result<(), UploadError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| UploadError::CredentialFile(e.to_string()))?;
        fs::write(path, json)
            .map_err(|e| UploadError::CredentialFile(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "Saved Google token");
        Ok(())
    }

    /// Usable at `now`; a token without an expiry is assumed valid
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty()
            && self
                .expiry
                .map_or(true, |exp| now + Duration::seconds(EXPIRY_SKEW_SECS) < exp)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Build from a token response, keeping `previous_refresh` when the
    /// response carries no new refresh token
    fn from_response(
        response: &BasicTokenResponse,
        secrets: &ClientSecrets,
        previous_refresh: Option<String>,
    ) -> Self {
        Self {
            token: response.access_token().secret().clone(),
            refresh_token: response
                .refresh_token()
                .map(|t| t.secret().clone())
                .or(previous_refresh),
            token_uri: secrets.token_uri.clone(),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
            expiry: response.expires_in().and_then(|d| {
                Duration::from_std(d).ok().map(|d| Utc::now() + d)
            }),
        }
    }

    /// Client identity recorded in the token file, for refreshes without a secrets file
    fn secrets(&self) -> ClientSecrets {
        ClientSecrets {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            auth_uri: default_auth_uri(),
            token_uri: self.token_uri.clone(),
        }
    }
}

/// Return a valid access token, refreshing or re-consenting as needed
///
/// The resulting token is written to `token_path`.
pub async fn authorize(
    secrets: Option<&ClientSecrets>,
    stored: Option<StoredToken>,
    token_path: &Path,
) -> Result<StoredToken, UploadError> {
    if let Some(token) = stored {
        if token.is_valid_at(Utc::now()) {
            tracing::debug!("Reusing stored Google token");
            return Ok(token);
        }

        if token.can_refresh() {
            let identity = secrets.cloned().unwrap_or_else(|| token.secrets());
            match refresh(&identity, &token).await {
                Ok(refreshed) => {
                    refreshed.save(token_path)?;
                    return Ok(refreshed);
                }
                Err(e) => tracing::warn!(error = %e, "Token refresh failed, asking for consent"),
            }
        }
    }

    let secrets = secrets.ok_or_else(|| {
        UploadError::Auth(String::from(
            "no usable token and no client secrets for interactive consent",
        ))
    })?;

    let token = interactive(secrets).await?;
    token.save(token_path)?;
    Ok(token)
}

/// Exchange the stored refresh token for a new access token
pub async fn refresh(secrets: &ClientSecrets, token: &StoredToken) -> Result<StoredToken, UploadError> {
    let refresh_token = token
        .refresh_token
        .clone()
        .ok_or_else(|| UploadError::Auth(String::from("no refresh token")))?;

    tracing::info!("Refreshing Google token");
    let response = secrets
        .oauth_client()?
        .exchange_refresh_token(&RefreshToken::new(refresh_token.clone()))
        .request_async(async_http_client)
        .await
        .map_err(|e| UploadError::Auth(e.to_string()))?;

    Ok(StoredToken::from_response(&response, secrets, Some(refresh_token)))
}

/// Installed-app consent with a one-shot loopback listener
async fn interactive(secrets: &ClientSecrets) -> Result<StoredToken, UploadError> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| UploadError::Auth(format!("cannot bind loopback listener: {e}")))?;
    let port = listener
        .local_addr()
        .map_err(|e| UploadError::Auth(e.to_string()))?
        .port();

    let redirect = RedirectUrl::new(format!("http://127.0.0.1:{port}"))
        .map_err(|e| UploadError::Auth(e.to_string()))?;
    let client = secrets.oauth_client()?.set_redirect_uri(redirect);

    let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
    let (auth_url, csrf) = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(SCOPES.iter().map(|s| Scope::new(s.to_string())))
        .add_extra_param("access_type", "offline")
        .add_extra_param("prompt", "consent")
        .set_pkce_challenge(challenge)
        .url();

    println!("Please visit this URL to authorize Google Drive access:\n\n{auth_url}\n");

    let (code, state) = wait_for_redirect(&listener).await?;
    if state.as_deref() != Some(csrf.secret().as_str()) {
        return Err(UploadError::Auth(String::from("state mismatch in redirect")));
    }

    let response = client
        .exchange_code(AuthorizationCode::new(code))
        .set_pkce_verifier(verifier)
        .request_async(async_http_client)
        .await
        .map_err(|e| UploadError::Auth(e.to_string()))?;

    tracing::info!("Google authorization complete");
    Ok(StoredToken::from_response(&response, secrets, None))
}

/// Accept the browser redirect and pull `code` and `state` from it
async fn wait_for_redirect(listener: &TcpListener) -> Result<(String, Option<String>), UploadError> {
    let (mut stream, _) = listener
        .accept()
        .await
        .map_err(|e| UploadError::Auth(e.to_string()))?;

    let mut request_line = String::new();
    {
        let mut reader = BufReader::new(&mut stream);
        reader
            .read_line(&mut request_line)
            .await
            .map_err(|e| UploadError::Auth(e.to_string()))?;
    }

    let parsed = parse_redirect(&request_line);
    let body = if parsed.is_ok() {
        "Authorization received. You can close this window."
    } else {
        "Authorization failed. Check the terminal."
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    // The browser page is cosmetic
    let _ = stream.write_all(response.as_bytes()).await;

    parsed
}

/// Parse `GET /?code=..&state=.. HTTP/1.1`
fn parse_redirect(request_line: &str) -> Result<(String, Option<String>), UploadError> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| UploadError::Auth(String::from("malformed redirect request")))?;

    let url = Url::parse(&format!("http://127.0.0.1{target}"))
        .map_err(|e| UploadError::Auth(e.to_string()))?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(UploadError::Auth(format!("consent denied: {error}")));
    }
    let code = code.ok_or_else(|| UploadError::Auth(String::from("redirect has no code")))?;
    Ok((code, state))
}
