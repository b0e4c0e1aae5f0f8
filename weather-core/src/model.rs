use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::WeatherError, icon::IconCategory};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// What to fetch weather for.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherQuery {
    Coordinates(Coordinates),
    City(String),
}

impl WeatherQuery {
    /// Build a query from loosely supplied parts. Coordinates win over a city name
    /// when both are present; a lone latitude or longitude does not count.
    pub fn from_parts(
        lat: Option<f64>,
        lon: Option<f64>,
        city: Option<&str>,
    ) -> Result<Self, WeatherError> {
        if let (Some(lat), Some(lon)) = (lat, lon) {
            return Ok(Self::Coordinates(Coordinates { lat, lon }));
        }

        match city.map(str::trim) {
            Some(city) if !city.is_empty() => Ok(Self::City(city.to_string())),
            _ => Err(WeatherError::Input),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw provider payloads (OpenWeather shapes, provider units)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawCondition {
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawMain {
    pub temp: f64,
    pub feels_like: f64,
    pub pressure: u32,
    pub humidity: u8,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawWind {
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawSys {
    #[serde(default)]
    pub country: Option<String>,
    pub sunrise: i64,
    pub sunset: i64,
}

/// Current-conditions record as returned by the provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurrentRecord {
    pub name: String,
    pub coord: Coordinates,
    pub main: RawMain,
    #[serde(default)]
    pub weather: Vec<RawCondition>,
    pub wind: RawWind,
    /// Metres.
    #[serde(default)]
    pub visibility: Option<f64>,
    pub sys: RawSys,
    /// UTC offset of the location in seconds.
    #[serde(default)]
    pub timezone: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawSampleMain {
    pub temp: Option<f64>,
    pub humidity: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawSampleWind {
    pub speed: Option<f64>,
}

/// One forecast list entry. Every field is optional so a single bad entry can be
/// dropped without failing the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawSample {
    pub dt: Option<i64>,
    #[serde(default)]
    pub main: Option<RawSampleMain>,
    #[serde(default)]
    pub weather: Vec<RawCondition>,
    #[serde(default)]
    pub wind: Option<RawSampleWind>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawCity {
    #[serde(default)]
    pub timezone: Option<i32>,
}

/// Interval forecast as returned by the provider.
///
/// List entries stay untyped until aggregation so that one entry with a wrongly
/// typed field is dropped on its own instead of failing the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ForecastRecord {
    #[serde(default)]
    pub city: Option<RawCity>,
    #[serde(default)]
    pub list: Vec<serde_json::Value>,
}

/// Both halves of a weather lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherPayload {
    pub current: CurrentRecord,
    pub forecast: ForecastRecord,
}

// ---------------------------------------------------------------------------
// Validated samples
// ---------------------------------------------------------------------------

/// One validated forecast observation, still in provider units.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalSample {
    pub observed_at: DateTime<Utc>,
    pub temperature_kelvin: f64,
    pub humidity_percent: u8,
    pub wind_speed_mps: f64,
    pub condition_code: String,
    pub condition_group: String,
    pub description: String,
}

impl IntervalSample {
    pub fn timestamp(&self) -> i64 {
        self.observed_at.timestamp()
    }
}

impl TryFrom<&serde_json::Value> for IntervalSample {
    type Error = &'static str;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        let raw = RawSample::deserialize(value).map_err(|_| "shape")?;
        Self::try_from(&raw)
    }
}

impl TryFrom<&RawSample> for IntervalSample {
    type Error = &'static str;

    fn try_from(raw: &RawSample) -> Result<Self, Self::Error> {
        let observed_at = raw
            .dt
            .and_then(|dt| DateTime::from_timestamp(dt, 0))
            .ok_or("dt")?;
        let main = raw.main.as_ref().ok_or("main")?;
        let temperature_kelvin = main.temp.filter(|t| t.is_finite()).ok_or("main.temp")?;
        let humidity_percent = main.humidity.filter(|h| *h <= 100).ok_or("main.humidity")?;
        let wind_speed_mps = raw
            .wind
            .as_ref()
            .and_then(|w| w.speed)
            .filter(|s| s.is_finite())
            .ok_or("wind.speed")?;
        let condition = raw.weather.first().ok_or("weather")?;

        Ok(Self {
            observed_at,
            temperature_kelvin,
            humidity_percent,
            wind_speed_mps,
            condition_code: condition.icon.clone(),
            condition_group: condition.main.clone(),
            description: condition.description.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Normalized views
// ---------------------------------------------------------------------------

/// UV index from the optional UV collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "value")]
pub enum UvIndex {
    Available(f64),
    #[default]
    Unavailable,
}

impl std::fmt::Display for UvIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available(v) => write!(f, "{}", v.round()),
            Self::Unavailable => f.write_str("n/a"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentSnapshot {
    pub location: String,
    pub coordinates: Coordinates,
    pub temperature_c: i32,
    pub feels_like_c: i32,
    pub condition: String,
    pub description: String,
    pub icon: IconCategory,
    pub humidity_pct: u8,
    pub wind_speed_kmh: i32,
    pub visibility_km: Option<i32>,
    pub pressure_hpa: u32,
    pub sunrise: i64,
    pub sunset: i64,
    pub utc_offset_secs: i32,
    pub uv_index: UvIndex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyView {
    pub time: String,
    pub timestamp: i64,
    pub temperature_c: i32,
    pub condition: String,
    pub icon: IconCategory,
    pub humidity_pct: u8,
    pub wind_speed_kmh: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub day: String,
    pub date: NaiveDate,
    pub high_c: i32,
    pub low_c: i32,
    pub condition: String,
    pub icon: IconCategory,
    pub humidity_pct: u8,
    pub wind_speed_kmh: i32,
}

/// The three consumer views built from one successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: CurrentSnapshot,
    pub hourly: Vec<HourlyView>,
    pub daily: Vec<DailyAggregate>,
}

/// Candidate location from the geocoding lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSuggestion {
    pub name: String,
    pub region: Option<String>,
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationSuggestion {
    /// `"Springfield, Illinois, US"`, or `"Paris, FR"` without a region.
    pub fn display_name(&self) -> String {
        match &self.region {
            Some(region) if !region.is_empty() => {
                format!("{}, {}, {}", self.name, region, self.country_code)
            }
            _ => format!("{}, {}", self.name, self.country_code),
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.latitude,
            lon: self.longitude,
        }
    }
}
