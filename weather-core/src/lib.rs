//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Unit conversion and condition-icon resolution
//! - Forecast normalization: current snapshot, hourly view, daily roll-up
//! - Debounced, sequence-guarded city search
//! - Configuration, the OpenWeather client and the weather session state
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod icon;
pub mod model;
pub mod provider;
pub mod search;
pub mod session;
pub mod units;

pub use aggregate::ForecastAggregator;
pub use config::{Config, ForecastConfig, SearchConfig};
pub use error::WeatherError;
pub use icon::IconCategory;
pub use model::{
    Coordinates, CurrentSnapshot, DailyAggregate, HourlyView, LocationSuggestion, UvIndex,
    WeatherQuery, WeatherReport,
};
pub use provider::{LocationSearch, UvIndexSource, WeatherProvider};
pub use search::{SearchController, SearchPhase, SuggestionSearch};
pub use session::{SessionView, WeatherService, WeatherSession};
