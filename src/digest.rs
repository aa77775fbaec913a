//! Single-run digest pipeline
//!
//! Control flows in one direction: market and weather snapshots, posts per
//! subreddit, comments per post, render and save, persist the author cache,
//! then the optional upload. Requests are awaited one at a time.

use chrono::{DateTime, Local, Utc};
use std::path::PathBuf;

use crate::cache::AuthorCache;
use crate::config::{Config, RunSettings};
use crate::drive::{DriveClient, UploadedDocument};
use crate::error::Result;
use crate::market::fetch_market;
use crate::models::{Comment, SubredditDigest};
use crate::reddit::comments::CommentExtractor;
use crate::reddit::posts::{FetchedPosts, PostFetcher};
use crate::reddit::RedditClient;
use crate::storage::{Digest, DigestWriter};
use crate::weather::WeatherClient;

/// What a run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestOutcome {
    /// Saved Markdown file
    pub path: PathBuf,

    /// Google Doc, when uploaded
    pub document: Option<UploadedDocument>,
}

/// Owns the clients and settings for one run
pub struct DigestPipeline {
    config: Config,
    settings: RunSettings,
    reddit: RedditClient,
    cache: AuthorCache,
}

impl DigestPipeline {
    pub fn new(config: Config, settings: RunSettings, reddit: RedditClient, cache: AuthorCache) -> Self {
        Self {
            config,
            settings,
            reddit,
            cache,
        }
    }

    /// Run the pipeline, uploading through `drive` when given
    ///
    /// # Errors
    ///
    /// Fatal Reddit errors (unknown or private subreddit, rejected
    /// credentials), failures to write the digest or the cache, and upload
    /// failures. Market, weather and author lookup failures only degrade
    /// the output.
    pub async fn run(&mut self, drive: Option<&DriveClient>) -> Result<DigestOutcome> {
        self.run_at(Utc::now(), drive).await
    }

    /// [`run`](Self::run) with an explicit clock
    pub async fn run_at(&mut self, now: DateTime<Utc>, drive: Option<&DriveClient>) -> Result<DigestOutcome> {
        let market = fetch_market(&self.config).await;

        let weather = match WeatherClient::from_config(&self.config.weather, self.config.request_timeout()) {
            Some(client) => client.current().await,
            None => None,
        };

        let fetched = self.fetch_posts(now).await?;
        let subreddits = self.attach_comments(fetched, now).await?;

        let digest = Digest {
            hours: self.settings.hours,
            weather,
            units: self.config.weather.units,
            stocks: market.stocks,
            commodities: market.commodities,
            subreddits,
            include_comments: self.settings.include_comments,
        };

        let writer = DigestWriter::new(&self.config.output.local_dir)?;
        let markdown = writer.render(&digest, now)?;
        let path = writer.write(&markdown, now)?;

        self.cache.save()?;

        let document = match drive {
            Some(client) => {
                let date = now.with_timezone(&Local).format("%Y-%m-%d").to_string();
                let uploaded = client
                    .upload_digest(&path, &markdown, &self.config.drive.folder_name, &date)
                    .await?;
                Some(uploaded)
            }
            None => None,
        };

        Ok(DigestOutcome { path, document })
    }

    /// Posts for every subreddit, in request order
    async fn fetch_posts(&self, now: DateTime<Utc>) -> Result<Vec<(String, FetchedPosts)>> {
        let fetcher = PostFetcher::new(&self.reddit);
        let mut fetched = Vec::with_capacity(self.settings.subreddits.len());

        for name in &self.settings.subreddits {
            let posts = fetcher
                .fetch(name, self.settings.hours, self.settings.top_n, now)
                .await?;
            fetched.push((name.clone(), posts));
        }

        Ok(fetched)
    }

    /// Pair each post with its filtered comments (empty when disabled)
    async fn attach_comments(
        &mut self,
        fetched: Vec<(String, FetchedPosts)>,
        now: DateTime<Utc>,
    ) -> Result<Vec<SubredditDigest>> {
        let mut extractor = CommentExtractor::new(
            &self.reddit,
            &mut self.cache,
            self.config.comment_age_threshold_days,
            self.config.author_lookup_delay(),
            now,
        );

        let mut subreddits = Vec::with_capacity(fetched.len());
        for (name, FetchedPosts { total, posts }) in fetched {
            let mut entries = Vec::with_capacity(posts.len());

            for post in posts {
                let comments: Vec<Comment> = if self.settings.include_comments {
                    match extractor.extract(&post).await {
                        Ok(comments) => comments,
                        Err(e) if e.is_fatal() => return Err(e.into()),
                        Err(e) => {
                            tracing::warn!(post = %post.id, error = %e, "Comment fetch failed, continuing without comments");
                            Vec::new()
                        }
                    }
                } else {
                    Vec::new()
                };
                entries.push((post, comments));
            }

            subreddits.push(SubredditDigest {
                name,
                total,
                posts: entries,
            });
        }

        if self.settings.include_comments {
            let stats = extractor.stats();
            tracing::info!(
                total = stats.total,
                kept = stats.kept,
                too_young = stats.too_young,
                author_lookups = stats.author_lookups,
                "Comment extraction finished"
            );
        }

        Ok(subreddits)
    }
}
