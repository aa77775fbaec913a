//! Alpha Vantage global quotes

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::config::StocksConfig;
use crate::models::MarketSnapshot;
use crate::utils::error::FetchError;

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "Global Quote", default)]
    quote: Option<GlobalQuote>,

    /// Throttling notice
    #[serde(rename = "Note", default)]
    note: Option<String>,

    #[serde(rename = "Information", default)]
    information: Option<String>,

    #[serde(rename = "Error Message", default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price", default)]
    price: Option<String>,
}

impl QuoteResponse {
    fn into_price(self) -> Result<f64, FetchError> {
        if let Some(message) = self.error.or(self.note).or(self.information) {
            return Err(FetchError::Decode(message));
        }

        let raw = self
            .quote
            .and_then(|q| q.price)
            .ok_or_else(|| FetchError::Decode(String::from("no price in quote")))?;

        raw.trim()
            .parse::<f64>()
            .map_err(|e| FetchError::Decode(format!("bad price {raw:?}: {e}")))
    }
}

/// Quotes for the configured symbols
pub struct StockFetcher {
    client: Client,
    base_url: String,
    api_key: String,
    symbols: Vec<String>,
}

impl StockFetcher {
    /// `None` when stocks are disabled, unkeyed or empty
    pub fn from_config(config: &StocksConfig, timeout: Duration) -> Option<Self> {
        if !config.enabled || config.symbols.is_empty() {
            return None;
        }
        if config.alpha_vantage.api_key.is_empty() {
            tracing::warn!("Stocks enabled without an Alpha Vantage key, skipping");
            return None;
        }

        Some(Self {
            client: super::build_client(timeout)?,
            base_url: config.alpha_vantage.base_url.trim_end_matches('/').to_string(),
            api_key: config.alpha_vantage.api_key.clone(),
            symbols: config.symbols.clone(),
        })
    }

    pub async fn fetch_all(&self) -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::default();
        for symbol in &self.symbols {
            let price = match self.quote(symbol).await {
                Ok(price) => Some(price),
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "Stock quote failed");
                    None
                }
            };
            snapshot.push(symbol.clone(), price);
        }
        snapshot
    }

    /// Latest price for one symbol
    pub async fn quote(&self, symbol: &str) -> Result<f64, FetchError> {
        let url = format!("{}/query", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: QuoteResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        body.into_price()
    }
}
