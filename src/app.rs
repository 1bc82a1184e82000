use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use smartcal_core::{AppError, ChannelNotifier, Config, Notification, Notifier};
use smartcal_store::{
    validate_reminder_text, KeyValueStore, NewReminder, Reminder, ReminderPatch, ReminderStore,
    SnapshotStorage, SqliteKeyValueStore, StoreOptions, WeatherInfo,
};
use smartcal_weather::WeatherService;

/// File name of the key-value database inside `data_dir`.
const DATABASE_FILE: &str = "calendar.db";

/// Main application state and lifecycle manager
pub struct App {
    config: Arc<Config>,
    store: ReminderStore,
    weather: WeatherService,
    notifications: Receiver<Notification>,
}

impl App {
    /// Create the application with a SQLite store under `config.data_dir`
    pub fn new(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("Failed to create data directory {}", config.data_dir.display())
        })?;

        let db_path = config.data_dir.join(DATABASE_FILE);
        let backend = SqliteKeyValueStore::open(&db_path, config.storage.quota_bytes)
            .with_context(|| format!("Failed to open {}", db_path.display()))?;

        Self::with_backend(config, Arc::new(backend))
    }

    /// Create the application on top of an existing key-value store
    pub fn with_backend(config: Config, backend: Arc<dyn KeyValueStore>) -> Result<Self> {
        let (notifier, notifications) = ChannelNotifier::new();
        let notifier: Arc<dyn Notifier> = Arc::new(notifier);

        let storage = SnapshotStorage::new(
            backend,
            config.storage.key.clone(),
            config.storage.write_policy,
        );
        let store = ReminderStore::new(storage, StoreOptions::from_config(&config), notifier.clone());
        let weather = WeatherService::new(&config.weather, notifier)?;

        Ok(Self {
            config: Arc::new(config),
            store,
            weather,
            notifications,
        })
    }

    /// Load the stored calendar
    pub fn initialize(&self) -> Result<()> {
        let snapshot = self.store.initialize();
        tracing::info!(
            "Application initialized ({} reminders)",
            snapshot.reminders.len()
        );
        Ok(())
    }

    /// Write any pending calendar changes
    pub fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down application");
        self.store
            .flush()
            .context("Failed to save calendar data on shutdown")?;
        Ok(())
    }

    /// Validate and add a reminder. Returns its ID.
    pub fn create_reminder(&self, mut draft: NewReminder) -> Result<String, AppError> {
        validate_reminder_text(&draft.text).map_err(|e| AppError::Validation(e.to_string()))?;
        draft.text = draft.text.trim().to_string();

        self.store
            .add_reminder(draft)
            .ok_or_else(|| AppError::Other(anyhow::anyhow!("Calendar is not loaded yet")))
    }

    /// Validate and apply a partial update. Returns whether a reminder changed.
    pub fn update_reminder(&self, id: &str, mut patch: ReminderPatch) -> Result<bool, AppError> {
        if let Some(text) = patch.text.take() {
            validate_reminder_text(&text).map_err(|e| AppError::Validation(e.to_string()))?;
            patch.text = Some(text.trim().to_string());
        }
        Ok(self.store.update_reminder(id, patch))
    }

    /// Fetch the forecast for a reminder's city and attach the entry for its day.
    ///
    /// Returns `None` when the reminder is unknown, has no city, or falls
    /// outside the forecast range.
    pub async fn attach_forecast(&self, id: &str) -> Result<Option<WeatherInfo>, AppError> {
        let Some(reminder) = self.store.reminder(id) else {
            tracing::debug!("No reminder {} to attach weather to", id);
            return Ok(None);
        };
        let city = reminder.city.trim();
        if city.is_empty() {
            return Ok(None);
        }

        // Use this request's result; shared weather state may already
        // belong to a newer refresh for another city.
        let forecast = self.weather.refresh(city).await?;

        let day = self.store.local_day(reminder.date);
        let Some(daily) = forecast.into_iter().find(|d| d.date == day) else {
            tracing::debug!("No forecast for {} on {}", city, day);
            return Ok(None);
        };

        let info = WeatherInfo {
            forecast: daily.description,
            temperature: daily.temp,
            icon: Some(daily.icon),
        };
        self.store.update_reminder(
            id,
            ReminderPatch {
                weather: Some(Some(info.clone())),
                ..Default::default()
            },
        );
        Ok(Some(info))
    }

    /// Days of the displayed month that have reminders, in order
    pub fn month_agenda(&self) -> Vec<(NaiveDate, Vec<Reminder>)> {
        let (year, month) = (self.store.current_year(), self.store.current_month());
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            return Vec::new();
        };

        first
            .iter_days()
            .take_while(|day| day.month() == month)
            .map(|day| (day, self.store.reminders_for_date(day)))
            .filter(|(_, reminders)| !reminders.is_empty())
            .collect()
    }

    /// Notifications raised since the last call
    pub fn drain_notifications(&self) -> Vec<Notification> {
        self.notifications.try_iter().collect()
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &ReminderStore {
        &self.store
    }

    pub fn weather(&self) -> &WeatherService {
        &self.weather
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use chrono::{TimeZone, Utc};
    use smartcal_store::MemoryKeyValueStore;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(data_dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.data_dir = data_dir.to_path_buf();
        config.calendar.utc_offset_minutes = Some(0);
        config.weather.api_key = Some("test-key".to_string());
        config
    }

    fn memory_app(config: Config) -> App {
        let app = App::with_backend(config, Arc::new(MemoryKeyValueStore::new())).unwrap();
        app.initialize().unwrap();
        app
    }

    #[test]
    fn test_create_reminder_applies_form_rules() {
        let dir = tempfile::tempdir().unwrap();
        let app = memory_app(test_config(dir.path()));
        let date = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();

        let err = app.create_reminder(NewReminder::new("   ", date)).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Please enter reminder text"));

        let long = "x".repeat(31);
        assert!(matches!(
            app.create_reminder(NewReminder::new(long, date)),
            Err(AppError::Validation(_))
        ));

        let id = app.create_reminder(NewReminder::new("  Dentist ", date)).unwrap();
        assert_eq!(app.store().reminder(&id).unwrap().text, "Dentist");
    }

    #[test]
    fn test_update_reminder_validates_text() {
        let dir = tempfile::tempdir().unwrap();
        let app = memory_app(test_config(dir.path()));
        let date = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let id = app.create_reminder(NewReminder::new("Dentist", date)).unwrap();

        let patch = ReminderPatch {
            text: Some(String::new()),
            ..Default::default()
        };
        assert!(app.update_reminder(&id, patch).is_err());
        assert_eq!(app.store().reminder(&id).unwrap().text, "Dentist");

        let patch = ReminderPatch {
            color: Some("#ec4899".to_string()),
            ..Default::default()
        };
        assert!(app.update_reminder(&id, patch).unwrap());
        assert_eq!(
            app.drain_notifications(),
            vec![Notification::success("Reminder updated successfully")]
        );
    }

    #[tokio::test]
    async fn test_reminders_survive_app_restart() {
        let dir = tempfile::tempdir().unwrap();
        let date = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();

        let id = {
            let app = App::new(test_config(dir.path())).unwrap();
            app.initialize().unwrap();
            let id = app.create_reminder(NewReminder::new("Dentist", date)).unwrap();
            app.shutdown().unwrap();
            id
        };

        assert!(dir.path().join(DATABASE_FILE).exists());

        let app = App::new(test_config(dir.path())).unwrap();
        app.initialize().unwrap();
        assert_eq!(app.store().reminder(&id).unwrap().date, date);
    }

    #[test]
    fn test_month_agenda_lists_days_with_reminders() {
        let dir = tempfile::tempdir().unwrap();
        let app = memory_app(test_config(dir.path()));
        let today = app.store().local_day(app.store().current_date());
        let noon = today.and_hms_opt(12, 0, 0).unwrap().and_utc();

        app.create_reminder(NewReminder::new("Later", noon + chrono::Duration::minutes(5)))
            .unwrap();
        app.create_reminder(NewReminder::new("Now", noon)).unwrap();

        let agenda = app.month_agenda();
        assert_eq!(agenda.len(), 1);
        assert_eq!(agenda[0].0, today);
        let texts: Vec<_> = agenda[0].1.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["Now", "Later"]);
    }

    #[tokio::test]
    async fn test_attach_forecast_merges_matching_day() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("q", "Lisbon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "list": [
                    {
                        "dt_txt": "2024-03-10 12:00:00",
                        "main": {"temp": 18.5, "temp_max": 19.0, "temp_min": 15.0},
                        "weather": [{"description": "broken clouds", "icon": "04d"}]
                    },
                    {
                        "dt_txt": "2024-03-11 12:00:00",
                        "main": {"temp": 21.0, "temp_max": 22.0, "temp_min": 16.0},
                        "weather": [{"description": "clear sky", "icon": "01d"}]
                    }
                ],
                "city": {"name": "Lisbon"}
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.weather.base_url = server.uri();
        let app = memory_app(config);

        let date = Utc.with_ymd_and_hms(2024, 3, 11, 8, 30, 0).unwrap();
        let id = app
            .create_reminder(NewReminder::new("Beach", date).with_city("Lisbon"))
            .unwrap();

        let info = app.attach_forecast(&id).await.unwrap().unwrap();
        assert_eq!(info.forecast, "clear sky");
        assert_eq!(info.temperature, 21.0);
        assert_eq!(app.store().reminder(&id).unwrap().weather, Some(info));
    }

    #[tokio::test]
    async fn test_attach_forecast_keeps_own_city_during_concurrent_refresh() {
        let server = MockServer::start().await;
        for (city, description, delay_ms) in [("Paris", "paris weather", 300), ("Rome", "rome weather", 0)] {
            Mock::given(method("GET"))
                .and(path("/forecast"))
                .and(query_param("q", city))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({
                            "list": [{
                                "dt_txt": "2024-03-11 12:00:00",
                                "main": {"temp": 15.0, "temp_max": 16.0, "temp_min": 14.0},
                                "weather": [{"description": description, "icon": "02d"}]
                            }],
                            "city": {"name": city}
                        }))
                        .set_delay(std::time::Duration::from_millis(delay_ms)),
                )
                .mount(&server)
                .await;
        }

        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.weather.base_url = server.uri();
        let app = memory_app(config);

        let date = Utc.with_ymd_and_hms(2024, 3, 11, 9, 0, 0).unwrap();
        let id = app
            .create_reminder(NewReminder::new("Louvre", date).with_city("Paris"))
            .unwrap();

        // The Rome refresh starts later, so it owns the shared weather state.
        let (attached, rome) = tokio::join!(app.attach_forecast(&id), app.weather().refresh("Rome"));
        rome.unwrap();
        assert_eq!(app.weather().city().as_deref(), Some("Rome"));

        let info = attached.unwrap().unwrap();
        assert_eq!(info.forecast, "paris weather");
        assert_eq!(
            app.store().reminder(&id).unwrap().weather.unwrap().forecast,
            "paris weather"
        );
    }

    #[tokio::test]
    async fn test_attach_forecast_failure_is_notified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.weather.base_url = server.uri();
        let app = memory_app(config);

        let date = Utc.with_ymd_and_hms(2024, 3, 11, 8, 30, 0).unwrap();
        let id = app
            .create_reminder(NewReminder::new("Trip", date).with_city("Atlantis"))
            .unwrap();

        assert!(matches!(app.attach_forecast(&id).await, Err(AppError::Weather(_))));
        assert!(app.store().reminder(&id).unwrap().weather.is_none());

        let notes = app.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].message.contains("\"Atlantis\""));
    }

    #[tokio::test]
    async fn test_attach_forecast_without_city_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.weather.base_url = server.uri();
        let app = memory_app(config);

        let id = app
            .create_reminder(NewReminder::new("Home", Utc::now()))
            .unwrap();
        assert_eq!(app.attach_forecast(&id).await.unwrap(), None);
    }
}
