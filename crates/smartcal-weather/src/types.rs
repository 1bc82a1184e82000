//! Forecast payloads as returned by OpenWeatherMap, and the validated domain
//! forms built from them.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use smartcal_core::WeatherError;

/// Format of `dt_txt` in forecast entries (UTC).
const DT_TXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `GET /forecast` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiForecastResponse {
    pub list: Vec<ApiForecastEntry>,
    pub city: ApiCity,
}

/// One 3-hour slot.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiForecastEntry {
    pub dt_txt: String,
    pub main: ApiMain,
    pub weather: Vec<ApiCondition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMain {
    pub temp: f64,
    pub temp_max: f64,
    pub temp_min: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCondition {
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCity {
    pub name: String,
}

/// A forecast slot with a parsed timestamp and a single condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastEntry {
    pub at: NaiveDateTime,
    pub temp: f64,
    pub temp_max: f64,
    pub temp_min: f64,
    pub description: String,
    pub icon: String,
}

impl ForecastEntry {
    /// Whether the provider tagged this slot as daylight (`01d`, `10d`, ...).
    pub fn is_daytime(&self) -> bool {
        self.icon.ends_with('d')
    }

    fn from_api(entry: ApiForecastEntry) -> Result<Self, WeatherError> {
        let at = NaiveDateTime::parse_from_str(&entry.dt_txt, DT_TXT_FORMAT).map_err(|_| {
            WeatherError::InvalidResponse(format!("bad dt_txt {:?}", entry.dt_txt))
        })?;
        let condition = entry.weather.into_iter().next().ok_or_else(|| {
            WeatherError::InvalidResponse(format!("no conditions for {}", entry.dt_txt))
        })?;

        Ok(Self {
            at,
            temp: entry.main.temp,
            temp_max: entry.main.temp_max,
            temp_min: entry.main.temp_min,
            description: condition.description,
            icon: condition.icon,
        })
    }
}

/// Validated forecast for one city, in provider order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub city: String,
    pub entries: Vec<ForecastEntry>,
}

impl TryFrom<ApiForecastResponse> for Forecast {
    type Error = WeatherError;

    fn try_from(response: ApiForecastResponse) -> Result<Self, Self::Error> {
        let entries = response
            .list
            .into_iter()
            .map(ForecastEntry::from_api)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            city: response.city.name,
            entries,
        })
    }
}

/// One representative forecast per calendar date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub temp: f64,
    pub temp_max: f64,
    pub temp_min: f64,
    pub description: String,
    pub icon: String,
}

impl DailyForecast {
    pub fn glyph(&self) -> &'static str {
        icon_glyph(&self.icon)
    }
}

impl From<&ForecastEntry> for DailyForecast {
    fn from(entry: &ForecastEntry) -> Self {
        Self {
            date: entry.at.date(),
            temp: entry.temp,
            temp_max: entry.temp_max,
            temp_min: entry.temp_min,
            description: entry.description.clone(),
            icon: entry.icon.clone(),
        }
    }
}

/// Map an OpenWeatherMap icon code to a display glyph.
pub fn icon_glyph(code: &str) -> &'static str {
    match code {
        "01n" => "🌙",
        "02d" | "02n" => "⛅",
        "03d" | "03n" | "04d" | "04n" => "☁️",
        "09d" | "09n" => "🌧️",
        "10d" | "10n" => "🌦️",
        "11d" | "11n" => "⛈️",
        "13d" | "13n" => "❄️",
        "50d" | "50n" => "🌫️",
        _ => "☀️",
    }
}
