use serde::{Deserialize, Serialize};

/// Logical icon category for a provider condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IconCategory {
    Clear,
    PartlyCloudy,
    #[default]
    Cloudy,
    Drizzle,
    Rain,
    Thunderstorm,
    Snow,
    Fog,
}

impl IconCategory {
    /// Resolve an OpenWeather icon code such as `"10d"` or `"50n"`.
    ///
    /// Day and night variants share a category. Anything unrecognised is `Cloudy`.
    pub fn from_code(code: &str) -> Self {
        let prefix = code.trim().get(..2).unwrap_or_default();
        match prefix {
            "01" => Self::Clear,
            "02" => Self::PartlyCloudy,
            "03" | "04" => Self::Cloudy,
            "09" => Self::Drizzle,
            "10" => Self::Rain,
            "11" => Self::Thunderstorm,
            "13" => Self::Snow,
            "50" => Self::Fog,
            _ => Self::Cloudy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::PartlyCloudy => "partly_cloudy",
            Self::Cloudy => "cloudy",
            Self::Drizzle => "drizzle",
            Self::Rain => "rain",
            Self::Thunderstorm => "thunderstorm",
            Self::Snow => "snow",
            Self::Fog => "fog",
        }
    }

    /// Single-glyph rendering for terminal output.
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Clear => "☀",
            Self::PartlyCloudy => "⛅",
            Self::Cloudy => "☁",
            Self::Drizzle => "🌦",
            Self::Rain => "🌧",
            Self::Thunderstorm => "⛈",
            Self::Snow => "❄",
            Self::Fog => "🌫",
        }
    }
}

impl std::fmt::Display for IconCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
