pub mod config;
pub mod error;
pub mod notify;

pub use config::{
    CalendarConfig, Config, CorruptSnapshotPolicy, FailurePolicy, StorageConfig, Units,
    ValidationResult, WeatherConfig, WritePolicy,
};
pub use error::{
    AppError, NetworkError, ReqwestErrorExt, RusqliteErrorExt, StorageError,
    WeatherError,
};
pub use notify::{ChannelNotifier, Notification, Notifier, Severity, TracingNotifier};

use anyhow::Result;

/// Initialize logging for the application
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("smartcal core initialized");
    Ok(())
}
