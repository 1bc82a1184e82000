//! Centralized error types for the smartcal application.
//!
//! This module provides a typed error hierarchy that:
//! - Enables precise error handling throughout the codebase
//! - Provides user-friendly messages suitable for UI display
//! - Preserves full error context for debugging/logging

use thiserror::Error;

/// Top-level application error type.
///
/// All errors in smartcal should be convertible to this type.
/// Use `user_message()` to get a UI-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Invalid reminder: {0}")]
    Validation(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Storage(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Validation(_) => "Please check the reminder and try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The server is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
        }
    }
}

/// Local key-value storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The value does not fit in the store's capacity.
    #[error("Storage quota exceeded: {needed} bytes needed, limit is {limit}")]
    QuotaExceeded { needed: usize, limit: usize },

    /// The snapshot could not be turned into JSON.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// The stored blob is not a valid snapshot.
    #[error("Stored data could not be decoded: {0}")]
    Decode(String),

    /// The underlying store failed (SQLite, disk).
    #[error("Storage backend failed: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::QuotaExceeded { .. } => {
                "Local storage is full. Delete some reminders and try again."
            }
            StorageError::Serialization(_) => "Unable to save calendar data.",
            StorageError::Decode(_) => {
                "Saved calendar data could not be read and was reset."
            }
            StorageError::Backend(_) => "Unable to access local data. Try restarting the app.",
        }
    }

    /// Whether the error means the stored data itself is unusable.
    pub fn is_corruption(&self) -> bool {
        matches!(self, StorageError::Decode(_))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            StorageError::Decode(e.to_string())
        } else {
            StorageError::Serialization(e.to_string())
        }
    }
}

/// Weather forecast errors.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Weather API key is not configured")]
    MissingApiKey,

    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Weather API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Invalid forecast response: {0}")]
    InvalidResponse(String),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::MissingApiKey => "Weather API key is missing. Check settings.",
            WeatherError::CityNotFound(_) => "Please check the city name and try again.",
            WeatherError::InvalidApiKey => "Weather API key is invalid. Check settings.",
            WeatherError::Api { status, .. } if *status >= 500 => {
                "Weather service unavailable. Please try again later."
            }
            WeatherError::Api { .. } => "Weather service error. Please try again.",
            WeatherError::Network(e) => e.user_message(),
            WeatherError::InvalidResponse(_) => "Weather data was incomplete. Please try again.",
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            WeatherError::InvalidResponse(e.to_string())
        } else {
            WeatherError::Network(e.into_network_error())
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_storage_error(self) -> StorageError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_storage_error(self) -> StorageError {
        match &self {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::DiskFull =>
            {
                StorageError::QuotaExceeded {
                    needed: 0,
                    limit: 0,
                }
            }
            _ => StorageError::Backend(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn test_user_messages_are_non_empty() {
        let messages = [
            NetworkError::Timeout.user_message(),
            StorageError::Decode("x".into()).user_message(),
            StorageError::QuotaExceeded { needed: 10, limit: 5 }.user_message(),
            WeatherError::MissingApiKey.user_message(),
            WeatherError::CityNotFound("Atlantis".into()).user_message(),
        ];

        for message in messages {
            assert!(!message.is_empty());
        }
    }

    #[test]
    fn test_app_error_conversion() {
        let err: AppError = StorageError::Backend("locked".into()).into();
        assert!(matches!(err, AppError::Storage(StorageError::Backend(_))));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Weather(WeatherError::InvalidApiKey);
        assert_eq!(
            app_err.user_message(),
            "Weather API key is invalid. Check settings."
        );
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let storage: StorageError = err.into();
        assert!(storage.is_corruption());
    }

    #[test]
    fn test_server_status_message() {
        let err = WeatherError::Api {
            status: 503,
            message: "down".into(),
        };
        assert_eq!(
            err.user_message(),
            "Weather service unavailable. Please try again later."
        );
    }

    #[test]
    fn test_sqlite_disk_full_maps_to_quota() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
            None,
        );
        assert!(matches!(
            err.into_storage_error(),
            StorageError::QuotaExceeded { .. }
        ));
    }
}
