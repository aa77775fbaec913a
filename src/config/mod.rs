//! Configuration management for redigest
//!
//! This module handles loading and validating the JSON configuration file,
//! applying secret overrides from the environment, and merging command-line
//! overrides into the settings for a single run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::weather::Units;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reddit API credentials
    pub reddit: RedditConfig,

    /// Subreddits to include when none are given on the command line
    pub subreddits: Vec<String>,

    /// Default time window and top-N
    pub default: DefaultsConfig,

    /// Output directory and comment toggle
    pub output: OutputConfig,

    /// Comments by accounts younger than this many days are dropped
    pub comment_age_threshold_days: i64,

    /// Stock quotes
    pub stocks: StocksConfig,

    /// Precious metal prices
    pub commodities: CommoditiesConfig,

    /// Current weather
    pub weather: WeatherConfig,

    /// Google Drive upload
    pub drive: DriveConfig,

    /// HTTP client behavior
    pub http: HttpConfig,

    /// Persisted author cache file
    pub cache_path: PathBuf,

    /// Stored OAuth token for Google Drive
    pub token_path: PathBuf,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Reddit application credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,

    /// OAuth API host
    pub api_base_url: String,

    /// Token endpoint host
    pub auth_base_url: String,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            user_agent: format!("redigest/{}", env!("CARGO_PKG_VERSION")),
            api_base_url: String::from("https://oauth.reddit.com"),
            auth_base_url: String::from("https://www.reddit.com"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Hours to look back
    pub hours: u32,

    /// Number of top posts per subreddit (0 = all)
    pub top_posts: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            hours: 24,
            top_posts: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the markdown digest
    pub local_dir: PathBuf,

    /// Include comments and their links
    pub include_comments: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            local_dir: PathBuf::from("output"),
            include_comments: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StocksConfig {
    pub enabled: bool,
    pub symbols: Vec<String>,
    pub alpha_vantage: AlphaVantageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaVantageConfig {
    pub api_key: String,
    pub base_url: String,
}

impl Default for AlphaVantageConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: String::from("https://www.alphavantage.co"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommoditiesConfig {
    pub enabled: bool,

    /// Metal names, e.g. "Gold", "Silver"
    pub items: Vec<String>,

    pub goldapi: GoldApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoldApiConfig {
    pub access_token: String,
    pub base_url: String,
}

impl Default for GoldApiConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            base_url: String::from("https://www.goldapi.io"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub enabled: bool,
    pub api_key: String,
    pub location: Location,
    pub units: Units,
    pub base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            location: Location::default(),
            units: Units::default(),
            base_url: String::from("https://api.openweathermap.org"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Location {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub enabled: bool,

    /// OAuth client secrets downloaded from the Google Cloud console
    pub credentials_file: PathBuf,

    /// Top-level Drive folder holding one subfolder per day
    pub folder_name: String,

    pub drive_base_url: String,
    pub docs_base_url: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            credentials_file: PathBuf::from("credentials.json"),
            folder_name: String::from("Reddit Digests"),
            drive_base_url: String::from("https://www.googleapis.com"),
            docs_base_url: String::from("https://docs.googleapis.com"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Reddit requests per second
    pub requests_per_second: u32,

    /// Retries for 429/5xx responses
    pub max_retries: u32,

    /// Pause after each successful author lookup
    pub author_lookup_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            requests_per_second: 1,
            max_retries: 3,
            author_lookup_delay_ms: 200,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reddit: RedditConfig::default(),
            subreddits: Vec::new(),
            default: DefaultsConfig::default(),
            output: OutputConfig::default(),
            comment_age_threshold_days: 0,
            stocks: StocksConfig::default(),
            commodities: CommoditiesConfig::default(),
            weather: WeatherConfig::default(),
            drive: DriveConfig::default(),
            http: HttpConfig::default(),
            cache_path: PathBuf::from("author_cache.json"),
            token_path: PathBuf::from("token.json"),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_json(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Invalid JSON configuration")
    }

    /// Replace secrets with values from the environment when present
    ///
    /// Recognized variables: `REDDIT_CLIENT_ID`, `REDDIT_CLIENT_SECRET`,
    /// `ALPHA_VANTAGE_API_KEY`, `GOLDAPI_ACCESS_TOKEN`, `OPENWEATHER_API_KEY`.
    pub fn apply_env_overrides(&mut self) {
        fn env_non_empty(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|v| !v.trim().is_empty())
        }

        if let Some(v) = env_non_empty("REDDIT_CLIENT_ID") {
            self.reddit.client_id = v;
        }
        if let Some(v) = env_non_empty("REDDIT_CLIENT_SECRET") {
            self.reddit.client_secret = v;
        }
        if let Some(v) = env_non_empty("ALPHA_VANTAGE_API_KEY") {
            self.stocks.alpha_vantage.api_key = v;
        }
        if let Some(v) = env_non_empty("GOLDAPI_ACCESS_TOKEN") {
            self.commodities.goldapi.access_token = v;
        }
        if let Some(v) = env_non_empty("OPENWEATHER_API_KEY") {
            self.weather.api_key = v;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.reddit.client_id.trim().is_empty() || self.reddit.client_secret.trim().is_empty()
        {
            anyhow::bail!("reddit.client_id and reddit.client_secret are required");
        }

        if self.http.requests_per_second == 0 {
            anyhow::bail!("http.requests_per_second must be greater than 0");
        }

        if self.http.request_timeout_secs == 0 {
            anyhow::bail!("http.request_timeout_secs must be greater than 0");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    /// Get author lookup pause as Duration
    #[must_use]
    pub fn author_lookup_delay(&self) -> Duration {
        Duration::from_millis(self.http.author_lookup_delay_ms)
    }
}

/// Run parameters given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub subreddits: Option<Vec<String>>,
    pub hours: Option<u32>,
    pub top_n: Option<usize>,
    pub comments: bool,
    pub no_drive: bool,
}

/// Effective parameters for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub subreddits: Vec<String>,
    pub hours: u32,
    pub top_n: usize,
    pub include_comments: bool,

    /// Upload was not disabled on the command line
    pub drive: bool,
}

impl RunSettings {
    /// Merge CLI overrides over the config file over built-in defaults
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when neither source names a subreddit
    pub fn resolve(config: &Config, cli: &CliOverrides) -> crate::error::Result<Self> {
        let subreddits: Vec<String> = match &cli.subreddits {
            Some(subs) if !subs.is_empty() => subs.clone(),
            _ => config.subreddits.clone(),
        }
        .into_iter()
        .map(|s| s.trim().trim_start_matches("r/").to_string())
        .filter(|s| !s.is_empty())
        .collect();

        if subreddits.is_empty() {
            return Err(crate::error::Error::config("No subreddits specified"));
        }

        Ok(Self {
            subreddits,
            hours: cli.hours.unwrap_or(config.default.hours),
            top_n: cli.top_n.unwrap_or(config.default.top_posts),
            include_comments: cli.comments || config.output.include_comments,
            drive: !cli.no_drive,
        })
    }
}
