//! Current weather from OpenWeatherMap
//!
//! Weather is decoration for the digest: every failure is logged and the
//! section is simply left out.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::WeatherConfig;
use crate::models::WeatherSnapshot;
use crate::utils::error::FetchError;
use crate::utils::title_case;

/// Measurement system requested from the API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    /// Value of the `units` query parameter
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
            Self::Standard => "standard",
        }
    }

    pub fn temp_unit(self) -> &'static str {
        match self {
            Self::Metric => "°C",
            Self::Imperial => "°F",
            Self::Standard => "K",
        }
    }

    pub fn wind_unit(self) -> &'static str {
        match self {
            Self::Imperial => "mph",
            Self::Metric | Self::Standard => "m/s",
        }
    }
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    #[serde(default)]
    weather: Vec<Condition>,
    main: MainReadings,
    #[serde(default)]
    wind: Option<Wind>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: Option<f64>,
}

impl From<WeatherResponse> for WeatherSnapshot {
    fn from(response: WeatherResponse) -> Self {
        let summary = response
            .weather
            .first()
            .map(|c| title_case(&c.description))
            .unwrap_or_default();

        Self {
            summary,
            temp: response.main.temp,
            humidity: response.main.humidity,
            wind: response.wind.and_then(|w| w.speed),
        }
    }
}

/// Weather client for one location
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
    lat: f64,
    lon: f64,
    units: Units,
}

impl WeatherClient {
    /// Client for the configured location
    ///
    /// Returns `None` when weather is disabled, the key is missing or the
    /// location is incomplete.
    pub fn from_config(config: &WeatherConfig, timeout: Duration) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        if config.api_key.is_empty() {
            tracing::warn!("Weather enabled without an API key, skipping");
            return None;
        }
        let (Some(lat), Some(lon)) = (config.location.lat, config.location.lon) else {
            tracing::warn!("Weather enabled without lat/lon, skipping");
            return None;
        };

        let client = match Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build weather HTTP client");
                return None;
            }
        };

        Some(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            lat,
            lon,
            units: config.units,
        })
    }

    /// Current conditions, or `None` on any failure
    pub async fn current(&self) -> Option<WeatherSnapshot> {
        match self.fetch().await {
            Ok(snapshot) => {
                tracing::info!(summary = %snapshot.summary, temp = snapshot.temp, "Fetched weather");
                Some(snapshot)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Weather fetch failed");
                None
            }
        }
    }

    async fn fetch(&self) -> Result<WeatherSnapshot, FetchError> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", self.lat.to_string()),
                ("lon", self.lon.to_string()),
                ("units", self.units.as_str().to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: WeatherResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(body.into())
    }
}
