use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use redigest::cache::AuthorCache;
use redigest::config::{CliOverrides, Config, RunSettings};
use redigest::digest::DigestPipeline;
use redigest::drive::{auth, DriveAvailability, DriveClient};
use redigest::error::DigestErrorTrait;
use redigest::reddit::RedditClient;

#[derive(Parser)]
#[command(
    name = "redigest",
    version,
    about = "Build a Markdown digest of top Reddit posts with market and weather snapshots",
    long_about = None
)]
struct Cli {
    /// Subreddits to include (overrides the config list)
    #[arg(short, long, num_args = 1..)]
    subreddits: Option<Vec<String>>,

    /// Look-back window in hours
    #[arg(short = 'H', long)]
    hours: Option<u32>,

    /// Keep only the N highest-scoring posts per subreddit (0 = all)
    #[arg(short = 'n', long = "topn")]
    top_n: Option<usize>,

    /// Include filtered comment threads
    #[arg(short, long)]
    comments: bool,

    /// Skip the Google Drive upload
    #[arg(long)]
    no_drive: bool,

    /// Configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log format (text, json); defaults to the config value
    #[arg(long)]
    log_format: Option<String>,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            subreddits: self.subreddits.clone(),
            hours: self.hours,
            top_n: self.top_n,
            comments: self.comments,
            no_drive: self.no_drive,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_file(&cli.config)?;
    config.apply_env_overrides();

    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&format, &config.logging.level, cli.verbose)?;

    config.validate()?;
    let settings = RunSettings::resolve(&config, &cli.overrides())?;

    tracing::info!(
        subreddits = ?settings.subreddits,
        hours = settings.hours,
        top_n = settings.top_n,
        comments = settings.include_comments,
        "Starting redigest"
    );

    let drive = connect_drive(&config, settings.drive).await?;

    let reddit = RedditClient::new(&config)?;
    reddit.authenticate().await?;

    let cache = AuthorCache::load(&config.cache_path)?;

    let mut pipeline = DigestPipeline::new(config, settings, reddit, cache);
    let outcome = match pipeline.run(drive.as_ref()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(
                category = e.category().label(),
                recoverable = e.is_recoverable(),
                error = %e,
                "Digest run failed"
            );
            return Err(e.into());
        }
    };

    println!("Saved markdown to {}", outcome.path.display());
    if let Some(document) = outcome.document {
        println!("Created Google Doc: {}", document.url());
    }

    Ok(())
}

/// Authorize with Google before any fetching so consent happens up front
async fn connect_drive(config: &Config, drive_flag: bool) -> Result<Option<DriveClient>> {
    let credentials = match DriveAvailability::check(&config.drive, drive_flag, &config.token_path) {
        DriveAvailability::Ready(credentials) => credentials,
        other => {
            other.log_skip_reason();
            return Ok(None);
        }
    };

    let token = auth::authorize(
        credentials.secrets.as_ref(),
        credentials.stored,
        &credentials.token_path,
    )
    .await
    .context("Google Drive authorization failed")?;

    let client = DriveClient::new(&config.drive, token.token, config.request_timeout())?;
    Ok(Some(client))
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("redigest=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("redigest={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
