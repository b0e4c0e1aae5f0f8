//! Per-user weather state with whole-view replacement.

use std::sync::Arc;

use tracing::debug;

use crate::{
    aggregate::ForecastAggregator,
    config::Config,
    error::WeatherError,
    model::{WeatherQuery, WeatherReport},
    provider::{
        LocationSearch, NoUvIndex, UvIndexSource, WeatherProvider, fetch_report,
        openweather::OpenWeatherProvider,
    },
};

/// Everything needed to turn a query into a report.
#[derive(Debug, Clone)]
pub struct WeatherService {
    provider: Arc<dyn WeatherProvider>,
    uv_source: Arc<dyn UvIndexSource>,
    aggregator: ForecastAggregator,
}

impl WeatherService {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        uv_source: Arc<dyn UvIndexSource>,
        aggregator: ForecastAggregator,
    ) -> Self {
        Self {
            provider,
            uv_source,
            aggregator,
        }
    }

    /// OpenWeather-backed service plus the geocoder sharing its HTTP client.
    pub fn openweather(config: &Config) -> Result<(Self, Arc<dyn LocationSearch>), WeatherError> {
        let provider = Arc::new(OpenWeatherProvider::from_config(config)?);
        let geocoder: Arc<dyn LocationSearch> = provider.clone();
        let service = Self::new(
            provider,
            Arc::new(NoUvIndex),
            ForecastAggregator::new(&config.forecast),
        );
        Ok((service, geocoder))
    }

    pub async fn report(&self, query: &WeatherQuery) -> Result<WeatherReport, WeatherError> {
        fetch_report(
            self.provider.as_ref(),
            self.uv_source.as_ref(),
            &self.aggregator,
            query,
        )
        .await
    }
}

/// Handle for one fetch cycle; only the newest ticket may write.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    seq: u64,
    query: WeatherQuery,
}

impl FetchTicket {
    pub fn query(&self) -> &WeatherQuery {
        &self.query
    }
}

/// What the renderer should show.
#[derive(Debug, PartialEq)]
pub enum SessionView<'a> {
    /// First fetch still running.
    Loading,
    /// No report yet and the last fetch failed.
    Failed(&'a WeatherError),
    /// A report, possibly stale, with the latest failure if there was one.
    Ready {
        report: &'a WeatherReport,
        error: Option<&'a WeatherError>,
        refreshing: bool,
    },
}

#[derive(Debug, Default)]
pub struct WeatherSession {
    report: Option<WeatherReport>,
    error: Option<WeatherError>,
    last_query: Option<WeatherQuery>,
    issued: u64,
    in_flight: bool,
}

impl WeatherSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fetch cycle. Any earlier outstanding cycle is superseded.
    pub fn begin(&mut self, query: WeatherQuery) -> FetchTicket {
        self.issued += 1;
        self.in_flight = true;
        self.last_query = Some(query.clone());
        FetchTicket {
            seq: self.issued,
            query,
        }
    }

    /// Finish a fetch cycle. Results from superseded tickets are dropped.
    ///
    /// Success replaces the whole report and clears the error. Failure keeps the
    /// previous report visible and records the error next to it.
    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: Result<WeatherReport, WeatherError>,
    ) -> bool {
        if ticket.seq != self.issued {
            debug!(seq = ticket.seq, newest = self.issued, "discarding superseded weather fetch");
            return false;
        }

        self.in_flight = false;
        match result {
            Ok(report) => {
                self.report = Some(report);
                self.error = None;
            }
            Err(err) => self.error = Some(err),
        }
        true
    }

    pub fn report(&self) -> Option<&WeatherReport> {
        self.report.as_ref()
    }

    pub fn error(&self) -> Option<&WeatherError> {
        self.error.as_ref()
    }

    pub fn view(&self) -> SessionView<'_> {
        match (&self.report, &self.error) {
            (Some(report), error) => SessionView::Ready {
                report,
                error: error.as_ref(),
                refreshing: self.in_flight,
            },
            (None, Some(err)) if !self.in_flight => SessionView::Failed(err),
            (None, _) => SessionView::Loading,
        }
    }

    /// Query for a manual refresh: the shown location's coordinates, else the last
    /// query, else the fallback city.
    pub fn refresh_query(&self, fallback_city: &str) -> WeatherQuery {
        if let Some(report) = &self.report {
            return WeatherQuery::Coordinates(report.current.coordinates);
        }
        self.last_query
            .clone()
            .unwrap_or_else(|| WeatherQuery::City(fallback_city.to_string()))
    }

    /// Begin, fetch and complete one cycle.
    pub async fn fetch(&mut self, service: &WeatherService, query: WeatherQuery) -> bool {
        let ticket = self.begin(query);
        let result = service.report(ticket.query()).await;
        self.complete(ticket, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{Coordinates, UvIndex},
        provider::testing::ScriptedProvider,
    };

    fn service(provider: ScriptedProvider) -> WeatherService {
        WeatherService::new(
            Arc::new(provider),
            Arc::new(NoUvIndex),
            ForecastAggregator::default(),
        )
    }

    fn report_named(location: &str) -> WeatherReport {
        let agg = ForecastAggregator::default();
        let mut current = crate::provider::testing::paris_current();
        current.name = location.into();
        let payload = crate::model::WeatherPayload {
            current,
            forecast: crate::provider::testing::paris_forecast(),
        };
        agg.aggregate(&payload, UvIndex::Unavailable)
    }

    fn city(name: &str) -> WeatherQuery {
        WeatherQuery::City(name.into())
    }

    #[test]
    fn loading_until_first_result() {
        let mut session = WeatherSession::new();
        assert_eq!(session.view(), SessionView::Loading);

        let ticket = session.begin(city("Paris"));
        assert_eq!(session.view(), SessionView::Loading);

        session.complete(ticket, Err(WeatherError::upstream("down")));
        assert!(matches!(session.view(), SessionView::Failed(WeatherError::Upstream(_))));
    }

    #[test]
    fn failure_keeps_previous_report_visible() {
        let mut session = WeatherSession::new();
        let ticket = session.begin(city("Paris"));
        session.complete(ticket, Ok(report_named("Paris")));

        let ticket = session.begin(city("Paris"));
        match session.view() {
            SessionView::Ready { refreshing, error, .. } => {
                assert!(refreshing);
                assert!(error.is_none());
            }
            other => panic!("unexpected view {other:?}"),
        }

        session.complete(ticket, Err(WeatherError::PartialData("forecast".into())));
        match session.view() {
            SessionView::Ready { report, error, refreshing } => {
                assert_eq!(report.current.location, "Paris, FR");
                assert!(matches!(error, Some(WeatherError::PartialData(_))));
                assert!(!refreshing);
            }
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn superseded_fetch_cannot_overwrite_newer_one() {
        let mut session = WeatherSession::new();
        let old = session.begin(city("Paris"));
        let new = session.begin(city("Berlin"));

        assert!(session.complete(new, Ok(report_named("Berlin"))));
        assert!(!session.complete(old, Ok(report_named("Paris"))));

        assert_eq!(session.report().unwrap().current.location, "Berlin, FR");
    }

    #[test]
    fn success_clears_previous_error() {
        let mut session = WeatherSession::new();
        let t = session.begin(city("Paris"));
        session.complete(t, Err(WeatherError::upstream("down")));
        let t = session.begin(city("Paris"));
        session.complete(t, Ok(report_named("Paris")));

        assert!(session.error().is_none());
    }

    #[test]
    fn refresh_prefers_shown_coordinates() {
        let mut session = WeatherSession::new();
        assert_eq!(session.refresh_query("London"), city("London"));

        let t = session.begin(city("Pariss"));
        assert_eq!(session.refresh_query("London"), city("Pariss"));
        session.complete(t, Ok(report_named("Paris")));

        assert_eq!(
            session.refresh_query("London"),
            WeatherQuery::Coordinates(Coordinates { lat: 48.85, lon: 2.35 })
        );
    }

    #[tokio::test]
    async fn fetch_runs_a_full_cycle() {
        let mut session = WeatherSession::new();
        let svc = service(ScriptedProvider::default());

        assert!(session.fetch(&svc, city("Paris")).await);
        let report = session.report().expect("report stored");
        assert_eq!(report.current.temperature_c, 24);
        assert_eq!(report.daily[0].day, "Today");

        let failing = service(ScriptedProvider {
            fail_current: true,
            ..Default::default()
        });
        assert!(session.fetch(&failing, city("Paris")).await);
        assert!(matches!(session.error(), Some(WeatherError::PartialData(_))));
        assert!(session.report().is_some());
    }
}
