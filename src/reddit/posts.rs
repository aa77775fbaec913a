//! Windowed / top-N post retrieval
//!
//! A request is served from the ranked `top` listing when top-N is set and
//! the look-back matches one of Reddit's canonical windows. Every other
//! request scans the newest-first listing until a post falls before the
//! cutoff, then optionally keeps the N highest-scoring posts.

use chrono::{DateTime, Duration, Utc};

use crate::models::Post;
use crate::reddit::RedditClient;
use crate::utils::error::RedditError;

/// Safety cap on newest-first pages (Reddit stops serving around 1000 items)
pub const MAX_RECENT_PAGES: usize = 10;

/// Canonical window for the ranked listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeWindow {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 5] = [
        TimeWindow::Hour,
        TimeWindow::Day,
        TimeWindow::Week,
        TimeWindow::Month,
        TimeWindow::Year,
    ];

    /// Window whose length is exactly `hours`
    ///
    /// Only 1, 24, 168, 720 and 8760 map to a window. Any other value has no
    /// ranked equivalent and callers fall back to the cutoff-filtered scan.
    pub fn from_hours(hours: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.hours() == hours)
    }

    pub fn hours(self) -> u32 {
        match self {
            Self::Hour => 1,
            Self::Day => 24,
            Self::Week => 168,
            Self::Month => 720,
            Self::Year => 8760,
        }
    }

    /// Value of the `t` query parameter
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

/// How posts for a request will be retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPlan {
    /// Ranked listing for a canonical window
    Ranked { window: TimeWindow, limit: usize },

    /// Newest-first scan back to `now - hours`, then local top-N (0 = keep all)
    Recent { hours: u32, top_n: usize },
}

impl FetchPlan {
    pub fn for_request(hours: u32, top_n: usize) -> Self {
        match TimeWindow::from_hours(hours) {
            Some(window) if top_n > 0 => Self::Ranked {
                window,
                limit: top_n,
            },
            _ => Self::Recent { hours, top_n },
        }
    }
}

/// Posts kept for a subreddit and how many were seen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedPosts {
    pub total: usize,
    pub posts: Vec<Post>,
}

/// Oldest creation time still inside the window
///
/// Windows reaching past the representable range start at the earliest
/// representable instant.
pub fn cutoff_for(now: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::hours(i64::from(hours)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Keep the `top_n` highest-scoring posts, highest first
///
/// The sort is stable, so equal scores keep their listing order. `top_n == 0`
/// returns the posts untouched.
pub fn select_top(mut posts: Vec<Post>, top_n: usize) -> Vec<Post> {
    if top_n == 0 {
        return posts;
    }

    posts.sort_by(|a, b| b.score.cmp(&a.score));
    posts.truncate(top_n);
    posts
}

/// Take posts from a newest-first page until one predates `cutoff`
///
/// Returns `true` when the cutoff was reached.
fn take_until_cutoff(page: Vec<Post>, cutoff: DateTime<Utc>, out: &mut Vec<Post>) -> bool {
    for post in page {
        if post.created_utc < cutoff {
            return true;
        }
        out.push(post);
    }
    false
}

/// Post retrieval for one subreddit at a time
pub struct PostFetcher<'a> {
    client: &'a RedditClient,
}

impl<'a> PostFetcher<'a> {
    #[must_use]
    pub fn new(client: &'a RedditClient) -> Self {
        Self { client }
    }

    /// Fetch posts according to [`FetchPlan::for_request`]
    ///
    /// # Errors
    ///
    /// Fatal `SubredditNotFound`, `Forbidden` or `Auth` errors are returned
    /// as-is; the caller aborts the run on them.
    pub async fn fetch(
        &self,
        subreddit: &str,
        hours: u32,
        top_n: usize,
        now: DateTime<Utc>,
    ) -> Result<FetchedPosts, RedditError> {
        self.client.subreddit_about(subreddit).await?;

        let plan = FetchPlan::for_request(hours, top_n);
        tracing::info!(subreddit = %subreddit, plan = ?plan, "Fetching posts");

        let fetched = match plan {
            FetchPlan::Ranked { window, limit } => self.fetch_ranked(subreddit, window, limit).await?,
            FetchPlan::Recent { hours, top_n } => {
                self.fetch_recent(subreddit, cutoff_for(now, hours), top_n)
                    .await?
            }
        };

        tracing::info!(
            subreddit = %subreddit,
            total = fetched.total,
            kept = fetched.posts.len(),
            "Fetched posts"
        );
        Ok(fetched)
    }

    async fn fetch_ranked(
        &self,
        subreddit: &str,
        window: TimeWindow,
        limit: usize,
    ) -> Result<FetchedPosts, RedditError> {
        let mut posts = Vec::with_capacity(limit);
        let mut after: Option<String> = None;

        while posts.len() < limit {
            let remaining = limit - posts.len();
            let page = self
                .client
                .top_page(subreddit, window.as_str(), remaining, after.as_deref())
                .await?;

            let exhausted = page.posts.is_empty() || page.after.is_none();
            posts.extend(page.posts.into_iter().take(remaining));
            if exhausted {
                break;
            }
            after = page.after;
        }

        Ok(FetchedPosts {
            total: posts.len(),
            posts,
        })
    }

    async fn fetch_recent(
        &self,
        subreddit: &str,
        cutoff: DateTime<Utc>,
        top_n: usize,
    ) -> Result<FetchedPosts, RedditError> {
        let mut posts = Vec::new();
        let mut after: Option<String> = None;

        let mut pages = 0;
        loop {
            let page = self.client.new_page(subreddit, after.as_deref()).await?;
            pages += 1;
            let reached_cutoff = take_until_cutoff(page.posts, cutoff, &mut posts);

            match page.after {
                Some(next) if !reached_cutoff => {
                    if pages >= MAX_RECENT_PAGES {
                        tracing::warn!(
                            subreddit = %subreddit,
                            pages,
                            scanned = posts.len(),
                            "Stopped scanning new posts before reaching the window start"
                        );
                        break;
                    }
                    after = Some(next);
                }
                _ => break,
            }
        }

        Ok(FetchedPosts {
            total: posts.len(),
            posts: select_top(posts, top_n),
        })
    }
}
