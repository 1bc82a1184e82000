//! OpenWeatherMap 5-day / 3-hour forecast client.

use std::time::Duration;

use smartcal_core::{Units, WeatherConfig, WeatherError};
use tracing::instrument;

use crate::types::{ApiForecastResponse, Forecast};

pub struct ForecastClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    lang: String,
    units: Units,
}

impl ForecastClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.resolved_api_key(),
            lang: config.lang.clone(),
            units: config.units,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetch the multi-day forecast for a city name.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_forecast(&self, city: &str) -> Result<Forecast, WeatherError> {
        let api_key = self.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;
        let url = format!("{}/forecast", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", city),
                ("lang", self.lang.as_str()),
                ("units", self.units.as_query()),
                ("APPID", api_key),
            ])
            .send()
            .await?;

        let body = self.handle_response(city, response).await?;
        let payload: ApiForecastResponse = serde_json::from_str(&body)
            .map_err(|e| WeatherError::InvalidResponse(e.to_string()))?;
        let forecast = Forecast::try_from(payload)?;

        tracing::debug!(
            "Fetched {} forecast entries for {}",
            forecast.entries.len(),
            forecast.city
        );
        Ok(forecast)
    }

    async fn handle_response(
        &self,
        city: &str,
        response: reqwest::Response,
    ) -> Result<String, WeatherError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.text().await?);
        }

        let message = response.text().await.unwrap_or_default();
        tracing::warn!("Forecast request failed: {} - {}", status, message);

        match status.as_u16() {
            404 => Err(WeatherError::CityNotFound(city.to_string())),
            401 => Err(WeatherError::InvalidApiKey),
            code => Err(WeatherError::Api {
                status: code,
                message,
            }),
        }
    }
}

impl std::fmt::Debug for ForecastClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForecastClient")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("lang", &self.lang)
            .field("units", &self.units)
            .finish()
    }
}
