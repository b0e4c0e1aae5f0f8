use thiserror::Error;

/// Failure kinds surfaced by the weather and search pipelines.
///
/// Provider failures are deliberately flattened into [`WeatherError::Upstream`]:
/// callers get no machine-distinguishable subtype for transport, status or decode
/// problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    /// A required credential or setting is absent. Retrying cannot help.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Neither coordinates nor a city name were supplied.
    #[error("either coordinates (lat, lon) or a city name is required")]
    Input,

    /// Network failure or non-success response from the backend.
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// One of the two parallel weather fetches failed.
    #[error("incomplete weather data: {0}")]
    PartialData(String),
}

impl WeatherError {
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Whether a manual refresh or re-submit may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::PartialData(_))
    }

    /// Short, non-technical message for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Configuration(_) => {
                "Weather service is not configured. Run `weather configure` first."
            }
            Self::Input => "Enter a city name or coordinates.",
            Self::Upstream(_) | Self::PartialData(_) => {
                "Failed to fetch weather data. Please try again."
            }
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream(err.to_string())
    }
}
