//! Markdown digest rendering with Handlebars
//!
//! This module turns a [`Digest`] into the Markdown document and saves it
//! under a timestamped file name.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use handlebars::Handlebars;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::{Comment, MarketSnapshot, Post, SubredditDigest, WeatherSnapshot};
use crate::utils::format_number;
use crate::weather::Units;

/// Default digest template
const DEFAULT_TEMPLATE: &str = include_str!("../../templates/digest.hbs");

/// Shown in place of a price that could not be fetched
const UNAVAILABLE: &str = "unavailable";

/// Everything that goes into one digest
#[derive(Debug, Clone, Default)]
pub struct Digest {
    /// Look-back window shown in the title
    pub hours: u32,

    pub weather: Option<WeatherSnapshot>,
    pub units: Units,

    pub stocks: MarketSnapshot,
    pub commodities: MarketSnapshot,

    /// Subreddit sections in request order
    pub subreddits: Vec<SubredditDigest>,

    /// Render the comment blocks
    pub include_comments: bool,
}

/// Template data for rendering
#[derive(Debug, Serialize)]
struct DigestTemplateData {
    hours: u32,
    weather: Option<WeatherView>,
    stocks: Vec<PriceView>,
    commodities: Vec<PriceView>,
    subreddits: Vec<SubredditView>,
}

#[derive(Debug, Serialize)]
struct WeatherView {
    summary: String,
    temp: String,
    temp_unit: &'static str,
    humidity: String,
    wind: Option<String>,
    wind_unit: &'static str,
}

#[derive(Debug, Serialize)]
struct PriceView {
    name: String,
    price: String,
}

#[derive(Debug, Serialize)]
struct SubredditView {
    name: String,
    shown: usize,
    total: usize,
    posts: Vec<PostView>,
}

#[derive(Debug, Serialize)]
struct PostView {
    number: usize,
    title: String,
    url: String,
    permalink: String,
    score: i64,
    num_comments: u64,
    created: String,
    comments: Vec<CommentView>,
}

#[derive(Debug, Serialize)]
struct CommentView {
    indent: String,
    number: usize,
    author: String,
    age: String,
    body: String,
    link_lines: Vec<String>,
}

/// Humidity is a whole percentage in practice
fn format_percent(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

impl WeatherView {
    fn new(snapshot: &WeatherSnapshot, units: Units) -> Self {
        Self {
            summary: snapshot.summary.clone(),
            temp: format_number(snapshot.temp),
            temp_unit: units.temp_unit(),
            humidity: format_percent(snapshot.humidity),
            wind: snapshot.wind.map(format_number),
            wind_unit: units.wind_unit(),
        }
    }
}

fn price_views(snapshot: &MarketSnapshot) -> Vec<PriceView> {
    snapshot
        .quotes
        .iter()
        .map(|quote| PriceView {
            name: quote.name.clone(),
            price: quote
                .price
                .map(format_number)
                .unwrap_or_else(|| UNAVAILABLE.to_string()),
        })
        .collect()
}

impl CommentView {
    fn new(number: usize, comment: &Comment, now: DateTime<Utc>) -> Self {
        let indent = "  ".repeat(comment.depth);
        let link_lines = comment
            .links
            .iter()
            .map(|link| format!("{indent}   - 🔗 {link}"))
            .collect();

        Self {
            number,
            author: comment.author.clone(),
            age: comment
                .author_age_days(now)
                .map(|days| format!(" (age:{days}d)"))
                .unwrap_or_default(),
            body: comment.body.clone(),
            link_lines,
            indent,
        }
    }
}

impl PostView {
    fn new(number: usize, post: &Post, comments: &[Comment], now: DateTime<Utc>) -> Self {
        Self {
            number,
            title: post.title.clone(),
            url: post.url.clone(),
            permalink: post.permalink_url(),
            score: post.score,
            num_comments: post.num_comments,
            created: post.created_utc.to_rfc3339(),
            comments: comments
                .iter()
                .enumerate()
                .map(|(i, c)| CommentView::new(i + 1, c, now))
                .collect(),
        }
    }
}

impl DigestTemplateData {
    fn new(digest: &Digest, now: DateTime<Utc>) -> Self {
        let subreddits = digest
            .subreddits
            .iter()
            .map(|sub| SubredditView {
                name: sub.name.clone(),
                shown: sub.posts.len(),
                total: sub.total,
                posts: sub
                    .posts
                    .iter()
                    .enumerate()
                    .map(|(i, (post, comments))| {
                        let comments: &[Comment] = if digest.include_comments {
                            comments
                        } else {
                            &[]
                        };
                        PostView::new(i + 1, post, comments, now)
                    })
                    .collect(),
            })
            .collect();

        Self {
            hours: digest.hours,
            weather: digest
                .weather
                .as_ref()
                .map(|w| WeatherView::new(w, digest.units)),
            stocks: price_views(&digest.stocks),
            commodities: price_views(&digest.commodities),
            subreddits,
        }
    }
}

/// `reddit_digest_{YYYY-MM-DD_HH-MM-SS}.md` in local time
pub fn digest_filename(now: DateTime<Utc>) -> String {
    let local = now.with_timezone(&Local);
    format!("reddit_digest_{}.md", local.format("%Y-%m-%d_%H-%M-%S"))
}

/// Markdown writer with Handlebars template engine
pub struct DigestWriter<'a> {
    /// Handlebars template engine
    handlebars: Handlebars<'a>,

    /// Output directory
    output_dir: PathBuf,
}

impl<'a> DigestWriter<'a> {
    /// Create a writer with the built-in template
    ///
    /// # Example
    /// ```no_run
    /// use redigest::storage::DigestWriter;
    /// use std::path::Path;
    ///
    /// let writer = DigestWriter::new(Path::new("./output")).unwrap();
    /// ```
    pub fn new(output_dir: &Path) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars
            .register_template_string("digest", DEFAULT_TEMPLATE)
            .context("Failed to register digest template")?;

        Ok(Self {
            handlebars,
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Render the digest to a Markdown string
    ///
    /// Comment ages are computed against `now`.
    pub fn render(&self, digest: &Digest, now: DateTime<Utc>) -> Result<String> {
        let data = DigestTemplateData::new(digest, now);
        self.handlebars
            .render("digest", &data)
            .context("Failed to render digest template")
    }

    /// Write already rendered Markdown under the name for `now`
    pub fn write(&self, markdown: &str, now: DateTime<Utc>) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                self.output_dir.display()
            )
        })?;

        let filepath = self.output_dir.join(digest_filename(now));
        let mut file = File::create(&filepath)
            .with_context(|| format!("Failed to create file: {}", filepath.display()))?;

        file.write_all(markdown.as_bytes())
            .with_context(|| format!("Failed to write to file: {}", filepath.display()))?;

        tracing::info!(path = %filepath.display(), bytes = markdown.len(), "Saved digest");
        Ok(filepath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap()
    }

    fn post(id: &str, title: &str, score: i64) -> Post {
        Post {
            id: id.to_string(),
            title: title.to_string(),
            url: format!("https://example.com/{id}"),
            permalink: format!("/r/rust/comments/{id}/x/"),
            score,
            num_comments: 3,
            created_utc: Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap(),
        }
    }

    fn comments() -> Vec<Comment> {
        vec![
            Comment {
                depth: 0,
                author: "alice".into(),
                author_created: Some(now() - Duration::days(400)),
                body: "Top level with https://a.example/x".into(),
                links: vec!["https://a.example/x".into()],
            },
            Comment {
                depth: 1,
                author: "bob".into(),
                author_created: None,
                body: "A reply".into(),
                links: vec![],
            },
        ]
    }

    fn digest() -> Digest {
        let mut stocks = MarketSnapshot::default();
        stocks.push("AAPL", Some(190.5));
        stocks.push("MSFT", None);

        Digest {
            hours: 24,
            weather: Some(WeatherSnapshot {
                summary: "Clear Sky".into(),
                temp: 21.0,
                humidity: 40.0,
                wind: Some(3.5),
            }),
            units: Units::Metric,
            stocks,
            commodities: MarketSnapshot::default(),
            subreddits: vec![SubredditDigest {
                name: "rust".into(),
                total: 7,
                posts: vec![
                    (post("a1", "First & best", 10), comments()),
                    (post("b2", "Second", 5), vec![]),
                ],
            }],
            include_comments: true,
        }
    }

    #[test]
    fn test_render_sections_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let writer = DigestWriter::new(temp_dir.path()).unwrap();
        let md = writer.render(&digest(), now()).unwrap();

        assert!(md.starts_with("# Reddit Digest — Last 24h\n"));
        assert!(md.contains("- Condition: Clear Sky\n"));
        assert!(md.contains("- Temp: 21.0°C\n"));
        assert!(md.contains("- Humidity: 40%\n"));
        assert!(md.contains("- Wind: 3.5 m/s\n"));
        assert!(md.contains("- AAPL: 190.5\n"));
        assert!(md.contains("- MSFT: unavailable\n"));
        assert!(!md.contains("## Commodity Prices"));

        let weather = md.find("## Weather").unwrap();
        let stocks = md.find("## Stock Prices").unwrap();
        let section = md.find("## r/rust — 2 of 7 posts").unwrap();
        assert!(weather < stocks && stocks < section);
    }

    #[test]
    fn test_render_posts_and_comments() {
        let temp_dir = TempDir::new().unwrap();
        let writer = DigestWriter::new(temp_dir.path()).unwrap();
        let md = writer.render(&digest(), now()).unwrap();

        // HTML escaping is disabled
        assert!(md.contains("### 1. First & best\n"));
        assert!(md.contains("### 2. Second\n"));
        assert!(md.contains("- Permalink: https://reddit.com/r/rust/comments/a1/x/\n"));
        assert!(md.contains("- Score: 10 | Comments: 3 | Created (UTC): 2024-05-02T08:00:00+00:00\n"));
        assert!(md.contains("#### Comments\n"));
        assert!(md.contains("1. **u/alice** (age:400d): Top level with https://a.example/x\n"));
        assert!(md.contains("   - 🔗 https://a.example/x\n"));
        assert!(md.contains("  2. **u/bob**: A reply\n"));
        assert_eq!(md.matches("#### Comments").count(), 1);
    }

    #[test]
    fn test_render_without_comments() {
        let temp_dir = TempDir::new().unwrap();
        let writer = DigestWriter::new(temp_dir.path()).unwrap();
        let mut digest = digest();
        digest.include_comments = false;
        digest.weather = None;

        let md = writer.render(&digest, now()).unwrap();
        assert!(!md.contains("#### Comments"));
        assert!(!md.contains("## Weather"));
        assert!(md.contains("### 1. First & best"));
    }

    #[test]
    fn test_write_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("nested/out");
        let writer = DigestWriter::new(&out).unwrap();

        let markdown = writer.render(&digest(), now()).unwrap();
        let path = writer.write(&markdown, now()).unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), markdown);
        assert!(path.starts_with(&out));

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("reddit_digest_"));
        assert!(name.ends_with(".md"));
    }

    #[test]
    fn test_digest_filename_shape() {
        let name = digest_filename(now());
        // reddit_digest_YYYY-MM-DD_HH-MM-SS.md
        assert_eq!(name.len(), "reddit_digest_2024-05-02_12-00-00.md".len());
    }
}
