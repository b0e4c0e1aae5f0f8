use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use inquire::{Password, PasswordDisplayMode, Select, Text};
use tracing::debug;
use weather_core::{
    Config, SearchController, SessionView, WeatherError, WeatherQuery, WeatherService,
    WeatherSession,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and default city.
    Configure,

    /// Show current conditions, the hourly view and the daily roll-up.
    Show {
        /// City name; defaults to the configured city.
        #[arg(long, conflicts_with_all = ["lat", "lon"])]
        city: Option<String>,

        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        #[arg(long, value_enum, default_value_t)]
        units: Units,
    },

    /// Look up cities matching TEXT.
    Search {
        text: String,

        /// Pick one of the suggestions interactively and show its weather.
        #[arg(long)]
        pick: bool,

        #[arg(long, value_enum, default_value_t)]
        units: Units,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show {
                city,
                lat,
                lon,
                units,
            } => {
                let config = Config::load()?;
                let query = resolve_query(city.as_deref(), lat, lon, config.default_city())
                    .context(WeatherError::Input.user_message())?;
                show(&config, query, units).await
            }
            Command::Search { text, pick, units } => search(&text, pick, units).await,
        }
    }
}

/// The configured default city applies only when no location was given at all.
fn resolve_query(
    city: Option<&str>,
    lat: Option<f64>,
    lon: Option<f64>,
    default_city: &str,
) -> Result<WeatherQuery, WeatherError> {
    if city.is_none() && lat.is_none() && lon.is_none() {
        return Ok(WeatherQuery::City(default_city.to_string()));
    }
    WeatherQuery::from_parts(lat, lon, city)
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }
    config.set_api_key(api_key);

    let city = Text::new("Default city:")
        .with_default(config.default_city())
        .prompt()
        .context("Failed to read default city")?;
    config.default_city = Some(city.trim().to_string()).filter(|c| !c.is_empty());

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(config: &Config, query: WeatherQuery, units: Units) -> anyhow::Result<()> {
    let (service, _) = WeatherService::openweather(config)?;
    debug!(?query, "fetching weather");
    let mut session = WeatherSession::new();
    session.fetch(&service, query).await;
    print_view(&session, units)
}

fn print_view(session: &WeatherSession, units: Units) -> anyhow::Result<()> {
    match session.view() {
        SessionView::Ready { report, error, .. } => {
            if let Some(err) = error {
                eprintln!("warning: {}", err.user_message());
            }
            print!("{}", render::report(report, units));
            Ok(())
        }
        SessionView::Failed(err) => Err(err.clone()).context(err.user_message()),
        SessionView::Loading => bail!("weather fetch did not complete"),
    }
}

async fn search(text: &str, pick: bool, units: Units) -> anyhow::Result<()> {
    let config = Config::load()?;
    let (service, geocoder) = WeatherService::openweather(&config)?;

    let mut controller = SearchController::new(config.search.clone(), geocoder);
    controller.input(text);
    controller.settled().await;

    let suggestions = controller.visible_suggestions();
    if suggestions.is_empty() || !pick {
        print!(
            "{}",
            render::suggestions(text, &suggestions, config.search.display_min_chars)
        );
        return Ok(());
    }

    let labels: Vec<String> = suggestions.iter().map(|s| s.display_name()).collect();
    let picked = Select::new("Choose a location:", labels)
        .raw_prompt()
        .context("No location selected")?;

    let Some(choice) = controller.select(picked.index) else {
        bail!("selected location is no longer available");
    };

    let query = WeatherQuery::Coordinates(choice.coordinates());
    debug!(location = %choice.display_name(), "suggestion selected");
    let mut session = WeatherSession::new();
    session.fetch(&service, query).await;
    print_view(&session, units)
}
