//! End-to-end pipeline tests against wiremock servers

mod common;

use chrono::{Duration, Utc};
use common::{comment_json, comment_page, listing, mount_subreddit, mount_token, mount_user, post_json};
use redigest::cache::AuthorCache;
use redigest::config::{CliOverrides, Config, Location, RunSettings};
use redigest::digest::DigestPipeline;
use redigest::drive::{DriveClient, UploadedDocument};
use redigest::error::Error;
use redigest::reddit::RedditClient;
use redigest::utils::error::RedditError;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, dir: &Path) -> Config {
    let mut config = Config::default();
    config.reddit.client_id = "id".into();
    config.reddit.client_secret = "secret".into();
    config.reddit.api_base_url = server.uri();
    config.reddit.auth_base_url = server.uri();
    config.subreddits = vec!["rust".into()];
    config.output.local_dir = dir.join("out");
    config.cache_path = dir.join("author_cache.json");
    config.token_path = dir.join("token.json");
    config.http.requests_per_second = 100;
    config.http.max_retries = 0;
    config.http.author_lookup_delay_ms = 0;
    config.http.request_timeout_secs = 5;
    config
}

fn pipeline(config: Config, cli: CliOverrides) -> DigestPipeline {
    let settings = RunSettings::resolve(&config, &cli).unwrap();
    let reddit = RedditClient::new(&config).unwrap();
    let cache = AuthorCache::load(&config.cache_path).unwrap();
    DigestPipeline::new(config, settings, reddit, cache)
}

async fn mount_three_posts(server: &MockServer) {
    let now = Utc::now();
    Mock::given(method("GET"))
        .and(path("/r/rust/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(
            vec![
                post_json("a", "Five", 5, now - Duration::hours(1)),
                post_json("b", "Ten", 10, now - Duration::hours(2)),
                post_json("c", "One", 1, now - Duration::hours(3)),
            ],
            None,
        )))
        .mount(server)
        .await;
}

async fn mount_market_and_weather(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/query"))
        .and(query_param("function", "GLOBAL_QUOTE"))
        .and(query_param("symbol", "AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Global Quote": {"01. symbol": "AAPL", "05. price": "190.5000"}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/query"))
        .and(query_param("symbol", "MSFT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/XAU/USD"))
        .and(header("x-access-token", "gold-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metal": "XAU", "currency": "USD", "price": 2350.5
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "weather": [{"main": "Clouds", "description": "overcast clouds"}],
            "main": {"temp": 12.3, "humidity": 71},
            "wind": {"speed": 4.1}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_digest_run() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_subreddit(&server, "rust").await;
    mount_three_posts(&server).await;
    mount_market_and_weather(&server).await;

    Mock::given(method("GET"))
        .and(path("/comments/b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(comment_page(
            "b",
            vec![comment_json("k1", "t3_b", "alice", "See https://docs.rs/x", vec![])],
        )))
        .mount(&server)
        .await;

    // A broken comment page degrades to a post without comments
    Mock::given(method("GET"))
        .and(path("/comments/a"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    mount_user(&server, "alice", Utc::now() - Duration::days(1000), 1).await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = config_for(&server, temp_dir.path());
    config.stocks.enabled = true;
    config.stocks.symbols = vec!["AAPL".into(), "MSFT".into()];
    config.stocks.alpha_vantage.api_key = "av-key".into();
    config.stocks.alpha_vantage.base_url = server.uri();
    config.commodities.enabled = true;
    config.commodities.items = vec!["Gold".into()];
    config.commodities.goldapi.access_token = "gold-token".into();
    config.commodities.goldapi.base_url = server.uri();
    config.weather.enabled = true;
    config.weather.api_key = "ow-key".into();
    config.weather.location = Location {
        lat: Some(40.7),
        lon: Some(-74.0),
    };
    config.weather.base_url = server.uri();
    let cache_path = config.cache_path.clone();

    let cli = CliOverrides {
        hours: Some(5),
        top_n: Some(2),
        comments: true,
        no_drive: true,
        ..Default::default()
    };

    let mut pipeline = pipeline(config, cli);
    let outcome = pipeline.run(None).await.unwrap();
    assert!(outcome.document.is_none());

    let md = std::fs::read_to_string(&outcome.path).unwrap();
    assert!(md.starts_with("# Reddit Digest — Last 5h"));
    assert!(md.contains("- Condition: Overcast Clouds\n"));
    assert!(md.contains("- Temp: 12.3°C\n"));
    assert!(md.contains("- Humidity: 71%\n"));
    assert!(md.contains("- AAPL: 190.5\n"));
    assert!(md.contains("- MSFT: unavailable\n"));
    assert!(md.contains("- Gold: 2350.5\n"));
    assert!(md.contains("## r/rust — 2 of 3 posts"));
    assert!(md.contains("### 1. Ten\n"));
    assert!(md.contains("### 2. Five\n"));
    assert!(!md.contains("### 3."));
    assert!(!md.contains("One"));
    assert!(md.contains("1. **u/alice** (age:1000d): See https://docs.rs/x\n"));
    assert!(md.contains("   - 🔗 https://docs.rs/x\n"));
    assert_eq!(md.matches("#### Comments").count(), 1);

    let cache = AuthorCache::load(&cache_path).unwrap();
    assert!(cache.contains("alice"));
}

#[tokio::test]
async fn test_cache_saved_without_comments() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_subreddit(&server, "rust").await;
    mount_three_posts(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let config = config_for(&server, temp_dir.path());
    let cache_path = config.cache_path.clone();

    let mut pipeline = pipeline(config, CliOverrides::default());
    let outcome = pipeline.run(None).await.unwrap();

    let md = std::fs::read_to_string(&outcome.path).unwrap();
    assert!(md.contains("## r/rust — 3 of 3 posts"));
    assert!(!md.contains("#### Comments"));
    assert!(!md.contains("## Weather"));
    assert!(!md.contains("## Stock Prices"));
    assert!(cache_path.exists());
}

#[tokio::test]
async fn test_unknown_subreddit_aborts_before_writing() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/r/nosuchsub/about"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let config = config_for(&server, temp_dir.path());
    let out_dir = config.output.local_dir.clone();

    let cli = CliOverrides {
        subreddits: Some(vec!["nosuchsub".into()]),
        ..Default::default()
    };
    let mut pipeline = pipeline(config, cli);
    let err = pipeline.run(None).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Reddit(RedditError::SubredditNotFound(ref name)) if name == "nosuchsub"
    ));
    assert!(!out_dir.exists());
}

#[tokio::test]
async fn test_upload_to_dated_folder() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_subreddit(&server, "rust").await;
    mount_three_posts(&server).await;

    // Root folder exists, the dated folder does not
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param(
            "q",
            "mimeType='application/vnd.google-apps.folder' and name='Reddit Digests' and trashed=false",
        ))
        .and(header("authorization", "Bearer drive-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{"id": "root1", "name": "Reddit Digests"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": []})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .and(body_partial_json(json!({
            "mimeType": "application/vnd.google-apps.folder",
            "parents": ["root1"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "day1"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "documentId": "doc1", "title": "reddit_digest"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/documents/doc1:batchUpdate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"documentId": "doc1", "replies": [{}]})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/drive/v3/files/doc1"))
        .and(query_param("addParents", "day1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "doc1", "parents": ["day1"]})))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = config_for(&server, temp_dir.path());
    config.drive.enabled = true;
    config.drive.drive_base_url = server.uri();
    config.drive.docs_base_url = server.uri();

    let drive = DriveClient::new(&config.drive, "drive-token".into(), config.request_timeout()).unwrap();

    let mut pipeline = pipeline(config, CliOverrides::default());
    let outcome = pipeline.run(Some(&drive)).await.unwrap();

    let document = outcome.document.unwrap();
    assert_eq!(
        document,
        UploadedDocument {
            document_id: "doc1".into(),
            folder_id: "day1".into(),
        }
    );
    assert_eq!(document.url(), "https://docs.google.com/document/d/doc1/edit");
    assert!(outcome.path.exists());
}

#[tokio::test]
async fn test_upload_api_error_is_reported() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_subreddit(&server, "rust").await;
    mount_three_posts(&server).await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(403).set_body_string("insufficient scopes"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = config_for(&server, temp_dir.path());
    config.drive.drive_base_url = server.uri();
    config.drive.docs_base_url = server.uri();
    let out_dir = config.output.local_dir.clone();

    let drive = DriveClient::new(&config.drive, "drive-token".into(), config.request_timeout()).unwrap();
    let mut pipeline = pipeline(config, CliOverrides::default());
    let err = pipeline.run(Some(&drive)).await.unwrap_err();

    assert!(matches!(err, Error::Upload(_)));
    // The local digest is written before the upload starts
    assert_eq!(std::fs::read_dir(out_dir).unwrap().count(), 1);
}
