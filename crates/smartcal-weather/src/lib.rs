//! Weather forecasts for reminders
//!
//! Fetches the OpenWeatherMap 5-day forecast for a city and reduces it to one
//! daytime entry per date.

pub mod client;
pub mod reduce;
pub mod service;
pub mod types;

pub use client::ForecastClient;
pub use reduce::reduce_to_daily;
pub use service::WeatherService;
pub use types::*;
