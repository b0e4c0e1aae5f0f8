//! Turns raw provider payloads into the snapshot, hourly and daily views.
//!
//! Day buckets are keyed by the *local* calendar date of each sample, using the
//! location's UTC offset reported by the provider. Truncating in UTC would split a
//! local evening across two buckets and misalign the "Today" label.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use tracing::debug;

use crate::{
    config::ForecastConfig,
    icon::IconCategory,
    model::{
        CurrentRecord, CurrentSnapshot, DailyAggregate, ForecastRecord, HourlyView,
        IntervalSample, UvIndex, WeatherPayload, WeatherReport,
    },
    units,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastAggregator {
    hourly_count: usize,
    daily_count: usize,
}

impl Default for ForecastAggregator {
    fn default() -> Self {
        Self::new(&ForecastConfig::default())
    }
}

impl ForecastAggregator {
    pub fn new(config: &ForecastConfig) -> Self {
        Self {
            hourly_count: config.hourly_count,
            daily_count: config.daily_count,
        }
    }

    /// Build all three views. Pure: the same payload always yields the same report.
    pub fn aggregate(&self, payload: &WeatherPayload, uv_index: UvIndex) -> WeatherReport {
        let offset = location_offset(payload);
        let samples = valid_samples(&payload.forecast);

        WeatherReport {
            current: self.snapshot(&payload.current, uv_index),
            hourly: self.hourly(&samples, offset),
            daily: self.daily(&samples, offset),
        }
    }

    pub fn snapshot(&self, current: &CurrentRecord, uv_index: UvIndex) -> CurrentSnapshot {
        let location = match current.sys.country.as_deref() {
            Some(country) if !country.is_empty() => format!("{}, {}", current.name, country),
            _ => current.name.clone(),
        };

        let (condition, description, icon) = match current.weather.first() {
            Some(w) => (
                w.main.clone(),
                w.description.clone(),
                IconCategory::from_code(&w.icon),
            ),
            None => (String::new(), String::new(), IconCategory::default()),
        };

        CurrentSnapshot {
            location,
            coordinates: current.coord,
            temperature_c: units::kelvin_to_celsius(current.main.temp),
            feels_like_c: units::kelvin_to_celsius(current.main.feels_like),
            condition,
            description,
            icon,
            humidity_pct: current.main.humidity,
            wind_speed_kmh: units::mps_to_kmh(current.wind.speed),
            visibility_km: current.visibility.map(units::meters_to_km),
            pressure_hpa: current.main.pressure,
            sunrise: current.sys.sunrise,
            sunset: current.sys.sunset,
            utc_offset_secs: current.timezone.unwrap_or_default(),
            uv_index,
        }
    }

    /// The first `hourly_count` samples, in input order.
    pub fn hourly(&self, samples: &[IntervalSample], offset: FixedOffset) -> Vec<HourlyView> {
        samples
            .iter()
            .take(self.hourly_count)
            .map(|s| HourlyView {
                time: s.observed_at.with_timezone(&offset).format("%-I %p").to_string(),
                timestamp: s.timestamp(),
                temperature_c: units::kelvin_to_celsius(s.temperature_kelvin),
                condition: s.condition_group.clone(),
                icon: IconCategory::from_code(&s.condition_code),
                humidity_pct: s.humidity_percent,
                wind_speed_kmh: units::mps_to_kmh(s.wind_speed_mps),
            })
            .collect()
    }

    /// Group samples by local calendar date and roll each day up.
    ///
    /// Days keep first-seen order. The first sample of a day supplies its
    /// condition, icon, humidity and wind.
    pub fn daily(&self, samples: &[IntervalSample], offset: FixedOffset) -> Vec<DailyAggregate> {
        let mut buckets: Vec<DayBucket<'_>> = Vec::new();
        let mut index: HashMap<NaiveDate, usize> = HashMap::new();

        for sample in samples {
            let date = local_date(sample.observed_at, offset);
            let temp = units::kelvin_to_celsius(sample.temperature_kelvin);

            match index.get(&date) {
                Some(&i) => buckets[i].temps.push(temp),
                None => {
                    index.insert(date, buckets.len());
                    buckets.push(DayBucket {
                        date,
                        first: sample,
                        temps: vec![temp],
                    });
                }
            }
        }

        buckets
            .into_iter()
            .take(self.daily_count)
            .enumerate()
            .filter_map(|(i, bucket)| bucket.finish(i == 0))
            .collect()
    }
}

struct DayBucket<'a> {
    date: NaiveDate,
    first: &'a IntervalSample,
    temps: Vec<i32>,
}

impl DayBucket<'_> {
    fn finish(self, is_today: bool) -> Option<DailyAggregate> {
        let high = self.temps.iter().copied().max()?;
        let low = self.temps.iter().copied().min()?;

        let day = if is_today {
            "Today".to_string()
        } else {
            self.date.format("%a, %b %-d").to_string()
        };

        Some(DailyAggregate {
            day,
            date: self.date,
            high_c: high,
            low_c: low,
            condition: self.first.condition_group.clone(),
            icon: IconCategory::from_code(&self.first.condition_code),
            humidity_pct: self.first.humidity_percent,
            wind_speed_kmh: units::mps_to_kmh(self.first.wind_speed_mps),
        })
    }
}

/// Validated samples in input order. Malformed entries are dropped, not fatal.
pub fn valid_samples(forecast: &ForecastRecord) -> Vec<IntervalSample> {
    forecast
        .list
        .iter()
        .enumerate()
        .filter_map(|(i, raw)| match IntervalSample::try_from(raw) {
            Ok(sample) => Some(sample),
            Err(field) => {
                debug!(index = i, field, "dropping malformed forecast sample");
                None
            }
        })
        .collect()
}

/// UTC offset of the forecast location: forecast city first, then the current
/// record, then UTC.
pub fn location_offset(payload: &WeatherPayload) -> FixedOffset {
    payload
        .forecast
        .city
        .as_ref()
        .and_then(|c| c.timezone)
        .or(payload.current.timezone)
        .map(fixed_offset)
        .unwrap_or_else(utc)
}

pub fn fixed_offset(secs: i32) -> FixedOffset {
    FixedOffset::east_opt(secs).unwrap_or_else(utc)
}

fn utc() -> FixedOffset {
    Utc.fix()
}

pub fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// Local wall-clock time such as `"6:42 AM"`, for sunrise and sunset.
pub fn format_clock(timestamp: i64, utc_offset_secs: i32) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|at| {
            at.with_timezone(&fixed_offset(utc_offset_secs))
                .format("%-I:%M %p")
                .to_string()
        })
        .unwrap_or_else(|| "--:--".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinates, RawCity, RawCondition, RawMain, RawSys, RawWind};
    use serde_json::{Value, json};

    // 2024-03-04T00:00:00Z, a Monday.
    const MIDNIGHT_UTC: i64 = 1_709_510_400;
    const HOUR: i64 = 3600;

    fn current(temp: f64, name: &str, country: &str) -> CurrentRecord {
        CurrentRecord {
            name: name.into(),
            coord: Coordinates { lat: 48.85, lon: 2.35 },
            main: RawMain {
                temp,
                feels_like: temp + 1.0,
                pressure: 1013,
                humidity: 65,
            },
            weather: vec![RawCondition {
                main: "Clear".into(),
                description: "clear sky".into(),
                icon: "01d".into(),
            }],
            wind: RawWind { speed: 3.33 },
            visibility: Some(10_000.0),
            sys: RawSys {
                country: Some(country.into()),
                sunrise: MIDNIGHT_UTC + 6 * HOUR,
                sunset: MIDNIGHT_UTC + 18 * HOUR,
            },
            timezone: Some(0),
        }
    }

    fn sample(dt: i64, celsius: f64, icon: &str, group: &str) -> Value {
        json!({
            "dt": dt,
            "main": { "temp": celsius + 273.15, "humidity": 70 },
            "weather": [{ "main": group, "description": group.to_lowercase(), "icon": icon }],
            "wind": { "speed": 5.0 }
        })
    }

    fn payload(list: Vec<Value>, tz: i32) -> WeatherPayload {
        WeatherPayload {
            current: current(297.15, "Paris", "FR"),
            forecast: ForecastRecord {
                city: Some(RawCity { timezone: Some(tz) }),
                list,
            },
        }
    }

    /// Two local days, eight 3-hourly samples each.
    fn two_days() -> Vec<Value> {
        let temps = [20.0, 22.0, 24.0, 23.0, 21.0, 19.0, 18.0, 17.0];
        (0..16)
            .map(|i| {
                let (icon, group) = if i < 8 { ("10d", "Rain") } else { ("01d", "Clear") };
                sample(MIDNIGHT_UTC + i * 3 * HOUR, temps[(i % 8) as usize], icon, group)
            })
            .collect()
    }

    fn report_for(payload: &WeatherPayload, uv_index: UvIndex) -> WeatherReport {
        ForecastAggregator::default().aggregate(payload, uv_index)
    }

    #[test]
    fn paris_snapshot() {
        let snap = ForecastAggregator::default()
            .snapshot(&current(297.15, "Paris", "FR"), UvIndex::Unavailable);

        assert_eq!(snap.location, "Paris, FR");
        assert_eq!(snap.temperature_c, 24);
        assert_eq!(snap.feels_like_c, 25);
        assert_eq!(snap.wind_speed_kmh, 12);
        assert_eq!(snap.visibility_km, Some(10));
        assert_eq!(snap.pressure_hpa, 1013);
        assert_eq!(snap.humidity_pct, 65);
        assert_eq!(snap.icon, IconCategory::Clear);
        assert_eq!(snap.uv_index, UvIndex::Unavailable);
    }

    #[test]
    fn snapshot_without_country_uses_name_only() {
        let mut record = current(280.0, "Atlantis", "");
        record.sys.country = None;
        let snap = ForecastAggregator::default().snapshot(&record, UvIndex::Available(3.0));
        assert_eq!(snap.location, "Atlantis");
        assert_eq!(snap.uv_index, UvIndex::Available(3.0));
    }

    #[test]
    fn two_day_high_low() {
        let report = report_for(&payload(two_days(), 0), UvIndex::Unavailable);

        assert_eq!(report.daily.len(), 2);
        for day in &report.daily {
            assert_eq!(day.high_c, 24);
            assert_eq!(day.low_c, 17);
        }
        assert_eq!(report.daily[0].day, "Today");
        assert_eq!(report.daily[0].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(report.daily[1].day, "Tue, Mar 5");
    }

    #[test]
    fn first_sample_of_day_is_representative() {
        let mut list = two_days();
        // Second sample of day one turns to thunder; the day stays "Rain".
        list[1] = sample(MIDNIGHT_UTC + 3 * HOUR, 22.0, "11d", "Thunderstorm");
        let report = report_for(&payload(list, 0), UvIndex::Unavailable);

        assert_eq!(report.daily[0].condition, "Rain");
        assert_eq!(report.daily[0].icon, IconCategory::Rain);
        assert_eq!(report.daily[0].humidity_pct, 70);
        assert_eq!(report.daily[0].wind_speed_kmh, 18);
        assert_eq!(report.daily[1].icon, IconCategory::Clear);
    }

    #[test]
    fn buckets_follow_local_date_not_utc() {
        // 22:00Z and 23:00Z on Mar 4 are already Mar 5 at UTC+3.
        let list = vec![
            sample(MIDNIGHT_UTC + 20 * HOUR, 10.0, "01n", "Clear"),
            sample(MIDNIGHT_UTC + 22 * HOUR, 8.0, "01n", "Clear"),
            sample(MIDNIGHT_UTC + 23 * HOUR, 7.0, "01n", "Clear"),
        ];

        let utc_report = report_for(&payload(list.clone(), 0), UvIndex::Unavailable);
        assert_eq!(utc_report.daily.len(), 1);

        let local = report_for(&payload(list, 3 * 3600), UvIndex::Unavailable);
        assert_eq!(local.daily.len(), 2);
        assert_eq!((local.daily[0].high_c, local.daily[0].low_c), (10, 10));
        assert_eq!((local.daily[1].high_c, local.daily[1].low_c), (8, 7));
        assert_eq!(local.daily[1].date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn offset_falls_back_to_current_record() {
        let mut p = payload(vec![], 0);
        p.forecast.city = None;
        p.current.timezone = Some(3600);
        assert_eq!(location_offset(&p).local_minus_utc(), 3600);

        p.current.timezone = None;
        assert_eq!(location_offset(&p).local_minus_utc(), 0);
    }

    #[test]
    fn daily_is_truncated_to_five_days() {
        let list: Vec<Value> = (0..7 * 8)
            .map(|i| sample(MIDNIGHT_UTC + i * 3 * HOUR, (i % 8) as f64, "02d", "Clouds"))
            .collect();
        let report = report_for(&payload(list, 0), UvIndex::Unavailable);

        assert_eq!(report.daily.len(), 5);
        for day in &report.daily {
            assert!(day.high_c >= day.low_c);
            assert_eq!((day.high_c, day.low_c), (7, 0));
        }
        let dates: Vec<NaiveDate> = report.daily.iter().map(|d| d.date).collect();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn every_sample_lands_in_exactly_one_bucket() {
        let list = two_days();
        let samples = valid_samples(&ForecastRecord { city: None, list });
        let daily = ForecastAggregator::default().daily(&samples, utc());

        for day in &daily {
            let temps: Vec<i32> = samples
                .iter()
                .filter(|s| local_date(s.observed_at, utc()) == day.date)
                .map(|s| units::kelvin_to_celsius(s.temperature_kelvin))
                .collect();
            assert_eq!(temps.len(), 8);
            assert_eq!(day.high_c, *temps.iter().max().unwrap());
            assert_eq!(day.low_c, *temps.iter().min().unwrap());
        }
    }

    #[test]
    fn hourly_takes_first_eight_in_order() {
        let report = report_for(&payload(two_days(), 0), UvIndex::Unavailable);

        assert_eq!(report.hourly.len(), 8);
        let stamps: Vec<i64> = report.hourly.iter().map(|h| h.timestamp).collect();
        let expected: Vec<i64> = (0..8).map(|i| MIDNIGHT_UTC + i * 3 * HOUR).collect();
        assert_eq!(stamps, expected);
        assert_eq!(report.hourly[0].time, "12 AM");
        assert_eq!(report.hourly[5].time, "3 PM");
        assert_eq!(report.hourly[2].temperature_c, 24);
        assert_eq!(report.hourly[0].wind_speed_kmh, 18);
        assert_eq!(report.hourly[0].icon, IconCategory::Rain);
    }

    #[test]
    fn short_sequences_keep_their_length() {
        let list = two_days().into_iter().take(3).collect();
        let report = report_for(&payload(list, 0), UvIndex::Unavailable);
        assert_eq!(report.hourly.len(), 3);
        assert_eq!(report.daily.len(), 1);
    }

    #[test]
    fn empty_forecast_yields_empty_views() {
        let report = report_for(&payload(vec![], 0), UvIndex::Unavailable);
        assert!(report.hourly.is_empty());
        assert!(report.daily.is_empty());
        assert_eq!(report.current.location, "Paris, FR");
    }

    #[test]
    fn malformed_samples_are_dropped() {
        let mut list = two_days();
        list[2] = json!({ "dt": MIDNIGHT_UTC + 6 * HOUR, "main": { "humidity": 70 } });
        list[9] = json!("garbage");
        let report = report_for(&payload(list, 0), UvIndex::Unavailable);

        assert_eq!(report.hourly.len(), 8);
        assert_eq!(report.daily.len(), 2);
        // The 24 degree reading of day one was the malformed one.
        assert_eq!((report.daily[0].high_c, report.daily[0].low_c), (23, 17));
        assert_eq!((report.daily[1].high_c, report.daily[1].low_c), (24, 17));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let p = payload(two_days(), 7200);
        let agg = ForecastAggregator::default();
        assert_eq!(
            agg.aggregate(&p, UvIndex::Unavailable),
            agg.aggregate(&p, UvIndex::Unavailable)
        );
    }

    #[test]
    fn configured_counts_are_respected() {
        let agg = ForecastAggregator::new(&ForecastConfig {
            hourly_count: 4,
            daily_count: 1,
        });
        let report = agg.aggregate(&payload(two_days(), 0), UvIndex::Unavailable);
        assert_eq!(report.hourly.len(), 4);
        assert_eq!(report.daily.len(), 1);
    }

    #[test]
    fn clock_uses_location_offset() {
        assert_eq!(format_clock(MIDNIGHT_UTC + 6 * HOUR + 42 * 60, 0), "6:42 AM");
        assert_eq!(format_clock(MIDNIGHT_UTC + 6 * HOUR, -5 * 3600), "1:00 AM");
        assert_eq!(format_clock(MIDNIGHT_UTC + 18 * HOUR, 3600), "7:00 PM");
    }
}
