//! Common test utilities

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use redigest::reddit::{RedditClient, RedditCredentials};
use redigest::utils::retry::RetryConfig;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Client pointed at the mock server for both API and token endpoints
pub fn reddit_client(server: &MockServer) -> RedditClient {
    RedditClient::with_base_urls(
        RedditCredentials {
            client_id: "test-id".to_string(),
            client_secret: "test-secret".to_string(),
            user_agent: "redigest-tests/0.1".to_string(),
        },
        &server.uri(),
        &server.uri(),
        100,
        RetryConfig::with_delays(2, 1, 5),
        Duration::from_secs(5),
    )
    .unwrap()
}

/// Token endpoint answering with a one-hour token
pub async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "scope": "*"
        })))
        .mount(server)
        .await;
}

/// `/r/{name}/about` answering as an existing subreddit
pub async fn mount_subreddit(server: &MockServer, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/r/{name}/about")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "t5",
            "data": {"display_name": name}
        })))
        .mount(server)
        .await;
}

/// `/user/{name}/about` with the given creation time
pub async fn mount_user(server: &MockServer, name: &str, created: DateTime<Utc>, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/user/{name}/about")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "t2",
            "data": {"name": name, "created_utc": created.timestamp() as f64}
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub fn post_json(id: &str, title: &str, score: i64, created: DateTime<Utc>) -> Value {
    json!({
        "kind": "t3",
        "data": {
            "id": id,
            "name": format!("t3_{id}"),
            "title": title,
            "url": format!("https://example.com/{id}"),
            "permalink": format!("/r/rust/comments/{id}/slug/"),
            "score": score,
            "num_comments": 2,
            "created_utc": created.timestamp() as f64
        }
    })
}

pub fn listing(children: Vec<Value>, after: Option<&str>) -> Value {
    json!({
        "kind": "Listing",
        "data": {"after": after, "children": children}
    })
}

pub fn comment_json(id: &str, parent: &str, author: &str, body: &str, replies: Vec<Value>) -> Value {
    let replies = if replies.is_empty() {
        json!("")
    } else {
        listing(replies, None)
    };

    json!({
        "kind": "t1",
        "data": {
            "id": id,
            "name": format!("t1_{id}"),
            "parent_id": parent,
            "author": author,
            "body": body,
            "replies": replies
        }
    })
}

pub fn more_json(parent: &str, children: &[&str]) -> Value {
    json!({
        "kind": "more",
        "data": {
            "id": children.first().copied().unwrap_or("_"),
            "parent_id": parent,
            "count": children.len(),
            "children": children
        }
    })
}

/// `/comments/{id}` body: the post listing followed by the comment listing
pub fn comment_page(post_id: &str, comments: Vec<Value>) -> Value {
    json!([
        listing(vec![post_json(post_id, "post", 1, Utc::now())], None),
        listing(comments, None)
    ])
}
