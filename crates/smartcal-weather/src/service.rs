//! Weather state shared with the UI: the reduced daily forecast for the last
//! requested city.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use smartcal_core::{FailurePolicy, Notifier, WeatherConfig, WeatherError};

use crate::client::ForecastClient;
use crate::reduce::reduce_to_daily;
use crate::types::DailyForecast;

#[derive(Debug, Default)]
struct WeatherState {
    city: Option<String>,
    daily: Vec<DailyForecast>,
}

/// Counts a request as in flight until dropped, including when the
/// `refresh` future is cancelled mid-request.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct WeatherService {
    client: ForecastClient,
    notifier: Arc<dyn Notifier>,
    failure_policy: FailurePolicy,
    state: Mutex<WeatherState>,
    /// Bumped by every `refresh`; only the newest request may write state.
    generation: AtomicU64,
    in_flight: AtomicUsize,
}

impl WeatherService {
    pub fn new(
        config: &WeatherConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, WeatherError> {
        Ok(Self::with_client(
            ForecastClient::new(config)?,
            config.failure_policy,
            notifier,
        ))
    }

    pub fn with_client(
        client: ForecastClient,
        failure_policy: FailurePolicy,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            client,
            notifier,
            failure_policy,
            state: Mutex::new(WeatherState::default()),
            generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Fetch and reduce the forecast for `city`.
    ///
    /// The result always goes back to the caller. Shared state is only
    /// updated when no newer `refresh` started in the meantime.
    ///
    /// # Errors
    /// Returns the fetch error after raising an error notification naming
    /// the city.
    pub async fn refresh(&self, city: &str) -> Result<Vec<DailyForecast>, WeatherError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let result = {
            let _in_flight = InFlight::enter(&self.in_flight);
            self.client
                .fetch_forecast(city)
                .await
                .map(|forecast| reduce_to_daily(&forecast.entries))
        };

        let latest = self.generation.load(Ordering::SeqCst) == generation;

        match &result {
            Ok(daily) if latest => {
                tracing::info!("Weather updated for {} ({} days)", city, daily.len());
                *self.state.lock() = WeatherState {
                    city: Some(city.to_string()),
                    daily: daily.clone(),
                };
            }
            Ok(_) => {
                tracing::debug!("Discarding superseded forecast for {}", city);
            }
            Err(e) => {
                tracing::error!("Error fetching weather for {}: {}", city, e);
                self.notifier.error(&format!(
                    "Unable to fetch weather forecast for \"{}\". {}",
                    city,
                    e.user_message()
                ));
                if latest && self.failure_policy == FailurePolicy::Reset {
                    *self.state.lock() = WeatherState::default();
                }
            }
        }

        result
    }

    /// Daily forecast for the last successfully refreshed city.
    pub fn daily(&self) -> Vec<DailyForecast> {
        self.state.lock().daily.clone()
    }

    pub fn city(&self) -> Option<String> {
        self.state.lock().city.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn forecast_for(&self, date: NaiveDate) -> Option<DailyForecast> {
        self.state
            .lock()
            .daily
            .iter()
            .find(|d| d.date == date)
            .cloned()
    }
}

impl std::fmt::Debug for WeatherService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherService")
            .field("client", &self.client)
            .field("failure_policy", &self.failure_policy)
            .field("city", &self.city())
            .finish()
    }
}
