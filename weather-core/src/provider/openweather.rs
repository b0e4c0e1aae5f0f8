use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::debug;

use crate::{
    config::Config,
    error::WeatherError,
    model::{CurrentRecord, ForecastRecord, LocationSuggestion, WeatherQuery},
};

use super::{LocationSearch, WeatherProvider};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Provider-side cap on geocoding results; the search controller truncates again.
const GEOCODE_LIMIT: &str = "5";

/// OpenWeather client. Requests are made without a `units` parameter so every
/// value arrives in provider units (Kelvin, m/s, metres).
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, base_url: impl Into<String>) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Construct from config. A missing API key is a configuration error.
    pub fn from_config(config: &Config) -> Result<Self, WeatherError> {
        let api_key = config.require_api_key()?;
        Self::new(api_key, config.base_url.clone())
    }

    fn location_params(query: &WeatherQuery) -> Vec<(&'static str, String)> {
        match query {
            WeatherQuery::Coordinates(c) => {
                vec![("lat", c.lat.to_string()), ("lon", c.lon.to_string())]
            }
            WeatherQuery::City(city) => vec![("q", city.clone())],
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        mut params: Vec<(&'static str, String)>,
        what: &str,
    ) -> Result<T, WeatherError> {
        let url = format!("{}{}", self.base_url, path);
        params.push(("appid", self.api_key.clone()));

        debug!(%url, what, "requesting OpenWeather");

        let res = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| WeatherError::upstream(format!("Failed to send {what} request: {e}")))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| WeatherError::upstream(format!("Failed to read {what} response: {e}")))?;

        if !status.is_success() {
            return Err(WeatherError::upstream(format!(
                "OpenWeather {what} request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            WeatherError::upstream(format!("Failed to parse OpenWeather {what} JSON: {e}"))
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, query: &WeatherQuery) -> Result<CurrentRecord, WeatherError> {
        self.get_json("/data/2.5/weather", Self::location_params(query), "current weather")
            .await
    }

    async fn forecast(&self, query: &WeatherQuery) -> Result<ForecastRecord, WeatherError> {
        self.get_json("/data/2.5/forecast", Self::location_params(query), "5-day forecast")
            .await
    }
}

#[derive(Debug, Deserialize)]
struct OwGeocodeEntry {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    country: String,
    #[serde(default)]
    state: Option<String>,
}

impl From<OwGeocodeEntry> for LocationSuggestion {
    fn from(entry: OwGeocodeEntry) -> Self {
        Self {
            name: entry.name,
            region: entry.state.filter(|s| !s.is_empty()),
            country_code: entry.country,
            latitude: entry.lat,
            longitude: entry.lon,
        }
    }
}

#[async_trait]
impl LocationSearch for OpenWeatherProvider {
    async fn search(&self, text: &str) -> Result<Vec<LocationSuggestion>, WeatherError> {
        let params = vec![("q", text.to_string()), ("limit", GEOCODE_LIMIT.to_string())];
        let entries: Vec<OwGeocodeEntry> =
            self.get_json("/geo/1.0/direct", params, "geocoding").await?;

        Ok(entries.into_iter().map(LocationSuggestion::from).collect())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
