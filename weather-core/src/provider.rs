use async_trait::async_trait;
use std::fmt::Debug;
use tracing::{debug, warn};

use crate::{
    aggregate::ForecastAggregator,
    error::WeatherError,
    model::{
        Coordinates, CurrentRecord, ForecastRecord, LocationSuggestion, UvIndex, WeatherPayload,
        WeatherQuery, WeatherReport,
    },
};

pub mod openweather;

/// Source of raw current conditions and interval forecasts.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, query: &WeatherQuery) -> Result<CurrentRecord, WeatherError>;

    async fn forecast(&self, query: &WeatherQuery) -> Result<ForecastRecord, WeatherError>;
}

/// City-name geocoding used by search-as-you-type.
#[async_trait]
pub trait LocationSearch: Send + Sync + Debug {
    async fn search(&self, text: &str) -> Result<Vec<LocationSuggestion>, WeatherError>;
}

/// Optional UV index collaborator. `Ok(None)` means the source has no value.
#[async_trait]
pub trait UvIndexSource: Send + Sync + Debug {
    async fn uv_index(&self, at: Coordinates) -> Result<Option<f64>, WeatherError>;
}

/// UV source for deployments without one; always reports "unavailable".
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUvIndex;

#[async_trait]
impl UvIndexSource for NoUvIndex {
    async fn uv_index(&self, _at: Coordinates) -> Result<Option<f64>, WeatherError> {
        Ok(None)
    }
}

/// Issue the current and forecast requests concurrently and pair the results.
///
/// Either half failing fails the whole lookup; no partial payload is returned.
pub async fn fetch_payload(
    provider: &dyn WeatherProvider,
    query: &WeatherQuery,
) -> Result<WeatherPayload, WeatherError> {
    let (current, forecast) = tokio::join!(provider.current(query), provider.forecast(query));

    match (current, forecast) {
        (Ok(current), Ok(forecast)) => Ok(WeatherPayload { current, forecast }),
        (Err(current), Err(forecast)) => {
            debug!(%current, %forecast, "both weather requests failed");
            Err(current)
        }
        (Err(err), Ok(_)) => Err(WeatherError::PartialData(format!("current conditions: {err}"))),
        (Ok(_), Err(err)) => Err(WeatherError::PartialData(format!("forecast: {err}"))),
    }
}

/// Fetch both halves, look up the UV index and build the report.
///
/// A UV lookup failure only degrades the snapshot to [`UvIndex::Unavailable`].
pub async fn fetch_report(
    provider: &dyn WeatherProvider,
    uv_source: &dyn UvIndexSource,
    aggregator: &ForecastAggregator,
    query: &WeatherQuery,
) -> Result<WeatherReport, WeatherError> {
    let payload = fetch_payload(provider, query).await?;

    let uv_index = match uv_source.uv_index(payload.current.coord).await {
        Ok(Some(value)) => UvIndex::Available(value),
        Ok(None) => UvIndex::Unavailable,
        Err(err) => {
            warn!(error = %err, "UV index lookup failed");
            UvIndex::Unavailable
        }
    };

    Ok(aggregator.aggregate(&payload, uv_index))
}
