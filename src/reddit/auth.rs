//! Application-only OAuth for the Reddit API
//!
//! Scripts that only read public data use the `client_credentials` grant:
//! the app id and secret are exchanged for a bearer token valid for about
//! an hour.

use chrono::{DateTime, Duration, Utc};
use reqwest::{header::USER_AGENT, Client, StatusCode};
use serde::Deserialize;

use crate::utils::error::{FetchError, RedditError};

/// Seconds shaved off the advertised lifetime so a token is never used at the edge
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,

    #[serde(default)]
    expires_in: Option<i64>,

    #[serde(default)]
    error: Option<String>,
}

/// Bearer token with its expiry
#[derive(Debug, Clone)]
pub struct AppToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AppToken {
    /// Whether the token can still be sent at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Request a new application-only token
///
/// # Errors
///
/// Returns `RedditError::Auth` when the credentials are rejected or the
/// response carries no token
pub async fn request_app_token(
    client: &Client,
    auth_base: &str,
    client_id: &str,
    client_secret: &str,
    user_agent: &str,
) -> Result<AppToken, RedditError> {
    let url = format!("{}/api/v1/access_token", auth_base.trim_end_matches('/'));

    tracing::debug!(url = %url, "Requesting Reddit application token");

    let response = client
        .post(&url)
        .basic_auth(client_id, Some(client_secret))
        .header(USER_AGENT, user_agent)
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await
        .map_err(FetchError::from_transport)?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(RedditError::Auth(format!(
            "token endpoint rejected credentials ({})",
            status.as_u16()
        )));
    }
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()).into());
    }

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| FetchError::Decode(e.to_string()))?;

    match (body.access_token, body.error) {
        (Some(token), _) if !token.is_empty() => {
            let lifetime = body.expires_in.unwrap_or(3600) - EXPIRY_MARGIN_SECS;
            Ok(AppToken {
                access_token: token,
                expires_at: Utc::now() + Duration::seconds(lifetime.max(0)),
            })
        }
        (_, Some(error)) => Err(RedditError::Auth(error)),
        _ => Err(RedditError::Auth(String::from("no access token in response"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_validity() {
        let now = Utc::now();
        let token = AppToken {
            access_token: "t".into(),
            expires_at: now + Duration::seconds(10),
        };
        assert!(token.is_valid_at(now));
        assert!(!token.is_valid_at(now + Duration::seconds(11)));
    }
}
