//! Plain-text rendering of a weather report.

use chrono::Utc;
use weather_core::{
    LocationSuggestion, UvIndex, WeatherReport,
    aggregate::{fixed_offset, format_clock},
    units as convert,
};

use crate::cli::Units;

fn temp(celsius: i32, units: Units) -> String {
    match units {
        Units::Metric => format!("{celsius}°C"),
        Units::Imperial => format!("{}°F", convert::celsius_to_fahrenheit(celsius)),
    }
}

fn speed(kmh: i32, units: Units) -> String {
    match units {
        Units::Metric => format!("{kmh} km/h"),
        Units::Imperial => format!("{} mph", convert::kmh_to_mph(kmh)),
    }
}

pub fn report(report: &WeatherReport, units: Units) -> String {
    let now = &report.current;
    let today = Utc::now()
        .with_timezone(&fixed_offset(now.utc_offset_secs))
        .format("%a, %b %-d");

    let mut lines = vec![
        format!("{}  ({today})", now.location),
        format!(
            "{} {}  {}, feels like {}",
            now.icon.glyph(),
            temp(now.temperature_c, units),
            now.description,
            temp(now.feels_like_c, units),
        ),
        format!(
            "Humidity {}%  Wind {}  Visibility {}  Pressure {} hPa  UV {}",
            now.humidity_pct,
            speed(now.wind_speed_kmh, units),
            now.visibility_km
                .map_or_else(|| "n/a".to_string(), |km| format!("{km} km")),
            now.pressure_hpa,
            uv(now.uv_index),
        ),
        format!(
            "Sunrise {}  Sunset {}",
            format_clock(now.sunrise, now.utc_offset_secs),
            format_clock(now.sunset, now.utc_offset_secs),
        ),
    ];

    if !report.hourly.is_empty() {
        lines.push(String::new());
        lines.push("Hourly".to_string());
        for hour in &report.hourly {
            lines.push(format!(
                "  {:>5}  {} {:>5}  {:<12} {:>3}%  {}",
                hour.time,
                hour.icon.glyph(),
                temp(hour.temperature_c, units),
                hour.condition,
                hour.humidity_pct,
                speed(hour.wind_speed_kmh, units),
            ));
        }
    }

    if !report.daily.is_empty() {
        lines.push(String::new());
        lines.push("Daily".to_string());
        for day in &report.daily {
            lines.push(format!(
                "  {:<11} {} {:>5} / {:<5}  {:<12} {:>3}%  {}",
                day.day,
                day.icon.glyph(),
                temp(day.high_c, units),
                temp(day.low_c, units),
                day.condition,
                day.humidity_pct,
                speed(day.wind_speed_kmh, units),
            ));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Listing for `search`. `shown` is empty while the list is hidden.
pub fn suggestions(text: &str, shown: &[LocationSuggestion], display_min_chars: usize) -> String {
    if text.chars().count() < display_min_chars {
        return format!("Type at least {display_min_chars} characters to see suggestions\n");
    }
    if shown.is_empty() {
        return format!("No matches for \"{text}\"\n");
    }

    let mut out = format!("Search results for \"{text}\":\n");
    for (i, suggestion) in shown.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, suggestion.display_name()));
    }
    out
}

fn uv(index: UvIndex) -> String {
    match index {
        UvIndex::Available(_) => index.to_string(),
        UvIndex::Unavailable => "unavailable".to_string(),
    }
}
