pub mod debounce;
pub mod form;
pub mod kv;
pub mod mapper;
pub mod persistence;
pub mod store;
pub mod types;

pub use debounce::Debouncer;
pub use form::{
    color_option, matching_cities, month_name, validate_reminder_text, ColorOption, FormError,
    CITY_OPTIONS, COLOR_OPTIONS, DEFAULT_COLOR, MONTH_NAMES,
};
pub use kv::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
pub use mapper::{from_storage, generate_reminder_id, to_storage, MapperError, StoredReminder, StoredSnapshot};
pub use persistence::SnapshotStorage;
pub use store::{ReminderStore, StoreOptions};
pub use types::{CalendarSnapshot, MonthDirection, NewReminder, Reminder, ReminderPatch, WeatherInfo};
