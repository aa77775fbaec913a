// Core data structures for the digest

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a Reddit submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String, // Base36 id without the t3_ prefix
    pub title: String,
    pub url: String,
    pub permalink: String, // Path relative to reddit.com
    pub score: i64,
    pub num_comments: u64,
    pub created_utc: DateTime<Utc>,
}

impl Post {
    /// Absolute permalink
    pub fn permalink_url(&self) -> String {
        format!("https://reddit.com{}", self.permalink)
    }
}

/// A flattened comment ready for rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub depth: usize,
    pub author: String,
    pub author_created: Option<DateTime<Utc>>,
    pub body: String,
    pub links: Vec<String>,
}

impl Comment {
    /// Whole days between the author's account creation and `now`
    pub fn author_age_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.author_created
            .map(|created| account_age_days(created, now))
    }
}

/// Whole days elapsed since `created`, truncated toward zero
pub fn account_age_days(created: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created).num_days()
}

/// Everything fetched for a single subreddit
#[derive(Debug, Clone, PartialEq)]
pub struct SubredditDigest {
    pub name: String,
    /// Posts seen before top-N truncation
    pub total: usize,
    pub posts: Vec<(Post, Vec<Comment>)>,
}

/// Price for one symbol or commodity; `None` when the fetch failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub name: String,
    pub price: Option<f64>,
}

/// Ordered collection of price quotes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub quotes: Vec<PriceQuote>,
}

impl MarketSnapshot {
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Price for `name`, flattening "missing" and "failed" into `None`
    pub fn price(&self, name: &str) -> Option<f64> {
        self.quotes
            .iter()
            .find(|q| q.name == name)
            .and_then(|q| q.price)
    }

    pub fn push(&mut self, name: impl Into<String>, price: Option<f64>) {
        self.quotes.push(PriceQuote {
            name: name.into(),
            price,
        });
    }
}

/// Current conditions at the configured location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub summary: String,
    pub temp: f64,
    pub humidity: f64,
    pub wind: Option<f64>,
}
