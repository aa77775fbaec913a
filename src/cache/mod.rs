//! Persistent author cache
//!
//! Maps a Reddit username to the ISO-8601 creation time of the account, or to
//! an empty string when the lookup failed. The file is read once at startup
//! and written once after the digest is rendered, so repeated runs never look
//! the same author up twice.
//!
//! # Example
//!
//! ```rust,ignore
//! use redigest::cache::AuthorCache;
//!
//! let mut cache = AuthorCache::load("author_cache.json".as_ref())?;
//! cache.insert("spez", "2005-06-06T04:00:00+00:00");
//! cache.save()?;
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Cached account-creation lookups
#[derive(Debug, Clone)]
pub struct AuthorCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

/// What the cache knows about an author
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedAge {
    /// Never looked up
    Miss,
    /// Looked up before and failed
    Unknown,
    /// Known creation time
    Created(DateTime<Utc>),
}

impl AuthorCache {
    /// Empty cache that will be written to `path`
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the cache, starting empty when the file does not exist yet
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be read or is not a JSON object
    /// of strings
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No author cache yet, starting empty");
            return Ok(Self::new(path));
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read author cache: {}", path.display()))?;

        let entries: BTreeMap<String, String> = if content.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse author cache: {}", path.display()))?
        };

        tracing::info!(path = %path.display(), authors = entries.len(), "Loaded author cache");

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Write the cache back to its file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write author cache: {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), authors = self.entries.len(), "Saved author cache");
        Ok(())
    }

    /// Raw cached value
    pub fn get(&self, author: &str) -> Option<&str> {
        self.entries.get(author).map(String::as_str)
    }

    /// Cached value interpreted as a timestamp
    pub fn lookup(&self, author: &str) -> CachedAge {
        match self.entries.get(author) {
            None => CachedAge::Miss,
            Some(iso) => DateTime::parse_from_rfc3339(iso)
                .map(|dt| CachedAge::Created(dt.with_timezone(&Utc)))
                .unwrap_or(CachedAge::Unknown),
        }
    }

    pub fn contains(&self, author: &str) -> bool {
        self.entries.contains_key(author)
    }

    pub fn insert(&mut self, author: impl Into<String>, iso: impl Into<String>) {
        self.entries.insert(author.into(), iso.into());
    }

    /// Record a known creation time
    pub fn record_created(&mut self, author: &str, created: DateTime<Utc>) {
        self.insert(author, created.to_rfc3339());
    }

    /// Record a failed lookup so it is not retried
    pub fn record_unknown(&mut self, author: &str) {
        self.insert(author, String::new());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
