//! Reminder and calendar state types held in memory by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weather annotation attached to a reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherInfo {
    pub forecast: String,
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A single calendar reminder.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub id: String,
    pub text: String,
    pub date: DateTime<Utc>,
    pub city: String,
    pub color: String,
    pub weather: Option<WeatherInfo>,
}

/// A reminder that has not been assigned an ID yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReminder {
    pub text: String,
    pub date: DateTime<Utc>,
    pub city: String,
    pub color: String,
    pub weather: Option<WeatherInfo>,
}

impl NewReminder {
    pub fn new(text: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            date,
            city: String::new(),
            color: crate::form::DEFAULT_COLOR.to_string(),
            weather: None,
        }
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = city.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub(crate) fn into_reminder(self, id: String) -> Reminder {
        Reminder {
            id,
            text: self.text,
            date: self.date,
            city: self.city,
            color: self.color,
            weather: self.weather,
        }
    }
}

/// Partial update for a reminder; only `Some` fields are applied.
///
/// `weather: Some(None)` clears an existing annotation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReminderPatch {
    pub text: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub city: Option<String>,
    pub color: Option<String>,
    pub weather: Option<Option<WeatherInfo>>,
}

impl ReminderPatch {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.date.is_none()
            && self.city.is_none()
            && self.color.is_none()
            && self.weather.is_none()
    }

    pub(crate) fn apply(self, reminder: &mut Reminder) {
        if let Some(text) = self.text {
            reminder.text = text;
        }
        if let Some(date) = self.date {
            reminder.date = date;
        }
        if let Some(city) = self.city {
            reminder.city = city;
        }
        if let Some(color) = self.color {
            reminder.color = color;
        }
        if let Some(weather) = self.weather {
            reminder.weather = weather;
        }
    }
}

/// Everything that survives a restart.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarSnapshot {
    /// Instant whose month/year is on display.
    pub current_date: DateTime<Utc>,
    pub selected_date: Option<DateTime<Utc>>,
    /// Insertion order, not date order.
    pub reminders: Vec<Reminder>,
}

impl CalendarSnapshot {
    /// Empty calendar positioned at `now`.
    pub fn empty_at(now: DateTime<Utc>) -> Self {
        Self {
            current_date: now,
            selected_date: None,
            reminders: Vec::new(),
        }
    }
}

/// Direction for month navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonthDirection {
    Prev,
    Next,
}

impl MonthDirection {
    pub(crate) fn delta(self) -> i32 {
        match self {
            Self::Prev => -1,
            Self::Next => 1,
        }
    }
}
