//! Stock and precious-metal prices
//!
//! Both fetchers degrade per item: a failed quote becomes a `None` price and
//! the run carries on. A feature that is disabled, lacks credentials or has
//! nothing configured yields an empty snapshot.

pub mod commodities;
pub mod stocks;

pub use commodities::CommodityFetcher;
pub use stocks::StockFetcher;

use reqwest::Client;
use std::time::Duration;

use crate::config::Config;
use crate::models::MarketSnapshot;

/// Shared HTTP client for the market endpoints
fn build_client(timeout: Duration) -> Option<Client> {
    match Client::builder().timeout(timeout).build() {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to build market HTTP client");
            None
        }
    }
}

/// Stock and commodity snapshots for one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketData {
    pub stocks: MarketSnapshot,
    pub commodities: MarketSnapshot,
}

/// Fetch every configured price, in configured order
pub async fn fetch_market(config: &Config) -> MarketData {
    let timeout = config.request_timeout();

    let stocks = match StockFetcher::from_config(&config.stocks, timeout) {
        Some(fetcher) => fetcher.fetch_all().await,
        None => MarketSnapshot::default(),
    };

    let commodities = match CommodityFetcher::from_config(&config.commodities, timeout) {
        Some(fetcher) => fetcher.fetch_all().await,
        None => MarketSnapshot::default(),
    };

    MarketData {
        stocks,
        commodities,
    }
}
