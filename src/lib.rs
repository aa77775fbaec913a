//! redigest - Reddit digest generator
//!
//! Collects recent top posts (optionally with filtered comment threads) from
//! a set of subreddits, adds stock, precious-metal and weather snapshots,
//! renders everything into one Markdown file, and can upload that file to
//! Google Drive as a Google Doc.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - JSON configuration, environment secrets and run settings
//! - [`reddit`] - Reddit API client, post selection and comment extraction
//! - [`cache`] - Persistent author account-age cache
//! - [`market`] - Stock and commodity prices
//! - [`weather`] - Current weather
//! - [`storage`] - Markdown rendering and file output
//! - [`drive`] - Google Drive and Docs upload
//! - [`digest`] - The single-run pipeline tying it together
//! - [`models`] - Core data structures and types
//! - [`utils`] - Text helpers, domain errors and retries
//!
//! # Example
//!
//! ```no_run
//! use redigest::cache::AuthorCache;
//! use redigest::config::{CliOverrides, Config, RunSettings};
//! use redigest::digest::DigestPipeline;
//! use redigest::reddit::RedditClient;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file(Path::new("config.json"))?;
//!     let settings = RunSettings::resolve(&config, &CliOverrides::default())?;
//!     let reddit = RedditClient::new(&config)?;
//!     let cache = AuthorCache::load(&config.cache_path)?;
//!
//!     let mut pipeline = DigestPipeline::new(config, settings, reddit, cache);
//!     let outcome = pipeline.run(None).await?;
//!     println!("{}", outcome.path.display());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod digest;
pub mod drive;
pub mod error;
pub mod market;
pub mod models;
pub mod reddit;
pub mod storage;
pub mod utils;
pub mod weather;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::AuthorCache;
    pub use crate::config::{CliOverrides, Config, RunSettings};
    pub use crate::digest::{DigestOutcome, DigestPipeline};
    pub use crate::error::{DigestErrorTrait, Error, ErrorCategory, Result};
    pub use crate::models::{Comment, MarketSnapshot, Post, SubredditDigest, WeatherSnapshot};
    pub use crate::reddit::RedditClient;
    pub use crate::storage::{Digest, DigestWriter};
}

// Direct re-exports for convenience
pub use models::{Comment, Post};
