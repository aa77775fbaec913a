//! Reddit API client with rate limiting and retries
//!
//! This module implements the authenticated calls the digest needs:
//! subreddit lookup, ranked and newest listings, comment trees with their
//! `more` placeholders, and account creation times.

pub mod auth;
pub mod comments;
pub mod listing;
pub mod posts;

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{header::USER_AGENT, redirect::Policy, Client, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::models::Post;
use crate::utils::error::{FetchError, RedditError};
use crate::utils::retry::{with_retry_if, RetryConfig};

use self::auth::{request_app_token, AppToken};
use self::listing::{
    epoch_to_datetime, Envelope, Listing, MoreChildrenResponse, RawPost, Thing, UserAbout,
};

/// Largest page Reddit serves for a listing
pub const PAGE_LIMIT: usize = 100;

/// Largest id batch accepted by `morechildren`
pub const MORE_CHILDREN_BATCH: usize = 100;

/// Comments requested with the initial tree
const COMMENT_TREE_LIMIT: u32 = 500;

/// Application credentials
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

/// One page of posts
#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub after: Option<String>,
}

/// Authenticated Reddit API client
pub struct RedditClient {
    /// HTTP client; redirects are surfaced, not followed
    client: Client,

    credentials: RedditCredentials,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    retry: RetryConfig,

    api_base: String,
    auth_base: String,

    token: Mutex<Option<AppToken>>,
}

impl RedditClient {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(config: &Config) -> Result<Self, RedditError> {
        let credentials = RedditCredentials {
            client_id: config.reddit.client_id.clone(),
            client_secret: config.reddit.client_secret.clone(),
            user_agent: config.reddit.user_agent.clone(),
        };

        Self::with_base_urls(
            credentials,
            &config.reddit.api_base_url,
            &config.reddit.auth_base_url,
            config.http.requests_per_second,
            RetryConfig::new(config.http.max_retries),
            config.request_timeout(),
        )
    }

    /// Create a client against explicit hosts (used by tests with mock servers)
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_base_urls(
        credentials: RedditCredentials,
        api_base: &str,
        auth_base: &str,
        requests_per_second: u32,
        retry: RetryConfig,
        timeout: Duration,
    ) -> Result<Self, RedditError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .redirect(Policy::none())
            .build()
            .map_err(FetchError::Http)?;

        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            credentials,
            rate_limiter,
            retry,
            api_base: api_base.trim_end_matches('/').to_string(),
            auth_base: auth_base.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        })
    }

    /// Obtain a token now so bad credentials fail before any fetching
    ///
    /// # Errors
    ///
    /// Returns `RedditError::Auth` when the credentials are rejected
    pub async fn authenticate(&self) -> Result<(), RedditError> {
        self.bearer().await.map(|_| ())
    }

    /// Current bearer token, requesting a new one when missing or expired
    async fn bearer(&self) -> Result<String, RedditError> {
        let mut guard = self.token.lock().await;

        if let Some(token) = guard.as_ref() {
            if token.is_valid_at(chrono::Utc::now()) {
                return Ok(token.access_token.clone());
            }
        }

        let token = request_app_token(
            &self.client,
            &self.auth_base,
            &self.credentials.client_id,
            &self.credentials.client_secret,
            &self.credentials.user_agent,
        )
        .await?;

        tracing::debug!(expires_at = %token.expires_at, "Obtained Reddit token");
        let access = token.access_token.clone();
        *guard = Some(token);
        Ok(access)
    }

    /// GET an API path and decode its JSON body, with rate limiting and retries
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RedditError> {
        with_retry_if(
            &self.retry,
            || self.get_json_once(path, query),
            RedditError::is_retryable,
        )
        .await
    }

    async fn get_json_once<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RedditError> {
        self.rate_limiter.until_ready().await;

        let token = self.bearer().await?;
        let url = format!("{}{}", self.api_base, path);

        tracing::debug!(url = %url, "Fetching Reddit API path");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .header(USER_AGENT, &self.credentials.user_agent)
            .query(query)
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, path));
        }

        let bytes = response.bytes().await.map_err(FetchError::from_transport)?;
        serde_json::from_slice(&bytes).map_err(|e| RedditError::InvalidResponse {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Map a non-success status to the matching error
    ///
    /// Retry on 429 and 5xx; 401 means the token or app was rejected;
    /// a redirect is how Reddit answers for a subreddit that does not exist.
    fn status_error(status: StatusCode, path: &str) -> RedditError {
        match status.as_u16() {
            401 => RedditError::Auth(format!("unauthorized for {path}")),
            403 => RedditError::Forbidden(path.to_string()),
            404 => RedditError::NotFound(path.to_string()),
            300..=399 => RedditError::NotFound(path.to_string()),
            429 => RedditError::Fetch(FetchError::RateLimit),
            code => RedditError::Fetch(FetchError::Status(code)),
        }
    }

    /// Confirm a subreddit exists and is readable
    ///
    /// # Errors
    ///
    /// `SubredditNotFound` for unknown names, `Forbidden` for private ones
    pub async fn subreddit_about(&self, name: &str) -> Result<(), RedditError> {
        let path = format!("/r/{name}/about");
        match self.get_json::<Envelope<IgnoredAny>>(&path, &[]).await {
            Ok(about) if about.kind == "t5" => Ok(()),
            Ok(_) | Err(RedditError::NotFound(_)) => {
                Err(RedditError::SubredditNotFound(name.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch one page of the ranked listing for `window`
    pub async fn top_page(
        &self,
        subreddit: &str,
        window: &str,
        limit: usize,
        after: Option<&str>,
    ) -> Result<PostPage, RedditError> {
        let mut query = vec![
            ("t", window.to_string()),
            ("limit", limit.min(PAGE_LIMIT).to_string()),
        ];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        self.post_page(&format!("/r/{subreddit}/top"), &query).await
    }

    /// Fetch one page of the newest-first listing
    pub async fn new_page(
        &self,
        subreddit: &str,
        after: Option<&str>,
    ) -> Result<PostPage, RedditError> {
        let mut query = vec![("limit", PAGE_LIMIT.to_string())];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        self.post_page(&format!("/r/{subreddit}/new"), &query).await
    }

    async fn post_page(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<PostPage, RedditError> {
        let listing: Listing<Envelope<RawPost>> = self.get_json(path, query).await?;

        Ok(PostPage {
            posts: listing
                .data
                .children
                .into_iter()
                .map(|child| child.data.into_post())
                .collect(),
            after: listing.data.after.filter(|a| !a.is_empty()),
        })
    }

    /// Fetch the comment tree of a post
    pub async fn comment_tree(&self, post_id: &str) -> Result<Vec<Thing>, RedditError> {
        let path = format!("/comments/{post_id}");
        let query = [("limit", COMMENT_TREE_LIMIT.to_string())];
        let (_post, comments): (IgnoredAny, Listing<Thing>) = self.get_json(&path, &query).await?;
        Ok(comments.data.children)
    }

    /// Fetch the subtree rooted at `comment_id` ("continue this thread")
    pub async fn comment_thread(
        &self,
        post_id: &str,
        comment_id: &str,
    ) -> Result<Vec<Thing>, RedditError> {
        let path = format!("/comments/{post_id}");
        let query = [
            ("comment", comment_id.to_string()),
            ("limit", COMMENT_TREE_LIMIT.to_string()),
        ];
        let (_post, comments): (IgnoredAny, Listing<Thing>) = self.get_json(&path, &query).await?;
        Ok(comments.data.children)
    }

    /// Expand a batch of `more` ids (at most [`MORE_CHILDREN_BATCH`])
    pub async fn more_children(
        &self,
        post_id: &str,
        ids: &[String],
    ) -> Result<Vec<Thing>, RedditError> {
        let path = "/api/morechildren";
        let query = [
            ("api_type", String::from("json")),
            ("link_id", format!("t3_{post_id}")),
            ("children", ids.join(",")),
        ];

        let response: MoreChildrenResponse = self.get_json(path, &query).await?;
        if !response.json.errors.is_empty() {
            return Err(RedditError::InvalidResponse {
                path: path.to_string(),
                reason: format!("{:?}", response.json.errors),
            });
        }

        Ok(response.json.data.map(|d| d.things).unwrap_or_default())
    }

    /// Account creation time for a user
    ///
    /// Made once, without retries; the caller records any failure as an
    /// unknown age.
    ///
    /// # Errors
    ///
    /// `NotFound` for deleted accounts, `InvalidResponse` for suspended ones
    pub async fn user_created(
        &self,
        username: &str,
    ) -> Result<chrono::DateTime<chrono::Utc>, RedditError> {
        let path = format!("/user/{username}/about");
        let about: Envelope<UserAbout> = self.get_json_once(&path, &[]).await?;

        about
            .data
            .created_utc
            .map(epoch_to_datetime)
            .ok_or_else(|| RedditError::InvalidResponse {
                path,
                reason: String::from("account has no creation time"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> RedditClient {
        RedditClient::with_base_urls(
            RedditCredentials {
                client_id: "id".into(),
                client_secret: "secret".into(),
                user_agent: "test".into(),
            },
            "http://localhost:1/",
            "http://localhost:1",
            10,
            RetryConfig::new(0),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn test_base_urls_trimmed() {
        let client = test_client();
        assert_eq!(client.api_base, "http://localhost:1");
        assert_eq!(client.auth_base, "http://localhost:1");
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            RedditClient::status_error(StatusCode::UNAUTHORIZED, "/x"),
            RedditError::Auth(_)
        ));
        assert!(matches!(
            RedditClient::status_error(StatusCode::FORBIDDEN, "/x"),
            RedditError::Forbidden(_)
        ));
        assert!(matches!(
            RedditClient::status_error(StatusCode::FOUND, "/x"),
            RedditError::NotFound(_)
        ));
        assert!(matches!(
            RedditClient::status_error(StatusCode::TOO_MANY_REQUESTS, "/x"),
            RedditError::Fetch(FetchError::RateLimit)
        ));
        assert!(RedditClient::status_error(StatusCode::BAD_GATEWAY, "/x").is_retryable());
        assert!(!RedditClient::status_error(StatusCode::NOT_FOUND, "/x").is_retryable());
    }
}
