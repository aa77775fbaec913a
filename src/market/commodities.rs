//! Precious-metal spot prices from GoldAPI

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::config::CommoditiesConfig;
use crate::models::MarketSnapshot;
use crate::utils::error::FetchError;

/// Supported metals and their ISO 4217 codes
pub const METALS: [(&str, &str); 4] = [
    ("Gold", "XAU"),
    ("Silver", "XAG"),
    ("Platinum", "XPT"),
    ("Palladium", "XPD"),
];

/// Quote currency
const CURRENCY: &str = "USD";

/// ISO code for a metal name, ignoring case
pub fn metal_code(name: &str) -> Option<&'static str> {
    METALS
        .iter()
        .find(|(metal, _)| metal.eq_ignore_ascii_case(name.trim()))
        .map(|(_, code)| *code)
}

#[derive(Debug, Deserialize)]
struct SpotResponse {
    #[serde(default)]
    price: Option<f64>,

    #[serde(default)]
    error: Option<String>,
}

/// Prices for the configured metals
pub struct CommodityFetcher {
    client: Client,
    base_url: String,
    access_token: String,
    items: Vec<String>,
}

impl CommodityFetcher {
    /// `None` when commodities are disabled, unkeyed or empty
    pub fn from_config(config: &CommoditiesConfig, timeout: Duration) -> Option<Self> {
        if !config.enabled || config.items.is_empty() {
            return None;
        }
        if config.goldapi.access_token.is_empty() {
            tracing::warn!("Commodities enabled without a GoldAPI token, skipping");
            return None;
        }

        Some(Self {
            client: super::build_client(timeout)?,
            base_url: config.goldapi.base_url.trim_end_matches('/').to_string(),
            access_token: config.goldapi.access_token.clone(),
            items: config.items.clone(),
        })
    }

    pub async fn fetch_all(&self) -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::default();
        for item in &self.items {
            let price = match metal_code(item) {
                Some(code) => match self.spot(code).await {
                    Ok(price) => Some(price),
                    Err(e) => {
                        tracing::warn!(item = %item, error = %e, "Commodity quote failed");
                        None
                    }
                },
                None => {
                    tracing::warn!(item = %item, "Unknown commodity");
                    None
                }
            };
            snapshot.push(item.clone(), price);
        }
        snapshot
    }

    /// Spot price in USD for an ISO metal code
    pub async fn spot(&self, code: &str) -> Result<f64, FetchError> {
        let url = format!("{}/api/{}/{}", self.base_url, code, CURRENCY);
        let response = self
            .client
            .get(&url)
            .header("x-access-token", &self.access_token)
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: SpotResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        match (body.price, body.error) {
            (_, Some(error)) => Err(FetchError::Decode(error)),
            (Some(price), None) => Ok(price),
            (None, None) => Err(FetchError::Decode(String::from("no price in response"))),
        }
    }
}
