//! The reminder store: in-memory calendar state, derived views, mutations,
//! and debounced persistence.
//!
//! All instants are held in UTC. Day grouping and month navigation happen in
//! the store's display offset, so "the same date" means the same local
//! calendar day for the person looking at the calendar.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{
    DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use parking_lot::Mutex;
use smartcal_core::{Config, CorruptSnapshotPolicy, Notifier, StorageError};

use crate::debounce::Debouncer;
use crate::mapper;
use crate::persistence::SnapshotStorage;
use crate::types::{CalendarSnapshot, MonthDirection, NewReminder, Reminder, ReminderPatch};

/// Store construction options.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Quiet period before a scheduled write fires.
    pub debounce: Duration,
    pub corrupt_policy: CorruptSnapshotPolicy,
    /// Zone used for day grouping and month navigation.
    pub display_offset: FixedOffset,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            corrupt_policy: CorruptSnapshotPolicy::Recover,
            display_offset: Utc.fix(),
        }
    }
}

impl StoreOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            debounce: Duration::from_millis(config.storage.debounce_ms),
            corrupt_policy: config.storage.corrupt_policy,
            display_offset: config.calendar.display_offset(),
        }
    }
}

/// State shared with the debounced writer.
struct Shared {
    data: Mutex<Option<CalendarSnapshot>>,
    storage: SnapshotStorage,
    notifier: Arc<dyn Notifier>,
    /// Reads and writes currently touching storage.
    loading: AtomicUsize,
}

/// Marks storage as busy until dropped.
struct Loading<'a>(&'a AtomicUsize);

impl<'a> Loading<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Shared {
    /// Write the state as it is right now. Does nothing before initialization.
    fn write_snapshot(&self) -> Result<(), StorageError> {
        let stored = match self.data.lock().as_ref() {
            Some(snapshot) => mapper::to_storage(snapshot),
            None => return Ok(()),
        };

        let _loading = Loading::enter(&self.loading);
        self.storage.save(&stored)
    }
}

/// Reactive reminder store.
pub struct ReminderStore {
    shared: Arc<Shared>,
    editing: Mutex<Option<Reminder>>,
    writer: Debouncer,
    options: StoreOptions,
}

impl ReminderStore {
    pub fn new(
        storage: SnapshotStorage,
        options: StoreOptions,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let shared = Arc::new(Shared {
            data: Mutex::new(None),
            storage,
            notifier,
            loading: AtomicUsize::new(0),
        });

        let writer_state = shared.clone();
        let writer = Debouncer::new(options.debounce, move || {
            if let Err(e) = writer_state.write_snapshot() {
                tracing::error!("Error saving calendar data: {}", e);
                writer_state.notifier.error("Unable to save calendar data");
            }
        });

        Self {
            shared,
            editing: Mutex::new(None),
            writer,
            options,
        }
    }

    // ---- lifecycle ----

    /// Read the stored calendar, falling back to an empty one at "now".
    ///
    /// Never fails: a missing snapshot is the first-run case, and unreadable
    /// or corrupt data is handled per `CorruptSnapshotPolicy`.
    pub fn load_initial_state(&self) -> CalendarSnapshot {
        let _loading = Loading::enter(&self.shared.loading);
        let now = Utc::now();

        let snapshot = match self.shared.storage.load() {
            Ok(None) => {
                tracing::debug!("No stored calendar, starting empty");
                CalendarSnapshot::empty_at(now)
            }
            Ok(Some(stored)) => match mapper::from_storage(stored) {
                Ok(snapshot) => snapshot,
                Err(e) => self.recover_from_corruption(StorageError::Decode(e.to_string()), now),
            },
            Err(e) if e.is_corruption() => self.recover_from_corruption(e, now),
            Err(e) => {
                tracing::warn!("Error loading calendar data, starting empty: {}", e);
                CalendarSnapshot::empty_at(now)
            }
        };

        snapshot
    }

    fn recover_from_corruption(&self, error: StorageError, now: DateTime<Utc>) -> CalendarSnapshot {
        match self.options.corrupt_policy {
            CorruptSnapshotPolicy::Recover => {
                tracing::warn!("Stored calendar is unreadable, starting empty: {}", error);
            }
            CorruptSnapshotPolicy::Report => {
                tracing::error!("Stored calendar is unreadable: {}", error);
                if let Err(e) = self.shared.storage.backup_corrupt() {
                    tracing::error!("Could not back up unreadable calendar data: {}", e);
                }
                self.shared.notifier.error(error.user_message());
            }
        }
        CalendarSnapshot::empty_at(now)
    }

    /// Load the stored calendar and make it the live state.
    ///
    /// Pending writes are flushed first so a re-initialization cannot drop
    /// them.
    pub fn initialize(&self) -> CalendarSnapshot {
        self.writer.flush();
        let snapshot = self.load_initial_state();
        *self.shared.data.lock() = Some(snapshot.clone());
        tracing::info!(
            "Calendar initialized with {} reminders",
            snapshot.reminders.len()
        );
        snapshot
    }

    /// Write the current state now, cancelling any pending debounced write.
    ///
    /// # Errors
    /// Returns the storage error under `WritePolicy::Strict`.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.writer.cancel();
        self.shared.write_snapshot()
    }

    /// Whether a debounced write is waiting to fire.
    pub fn has_pending_write(&self) -> bool {
        self.writer.has_pending()
    }

    // ---- derived views ----

    pub fn is_initialized(&self) -> bool {
        self.shared.data.lock().is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.loading.load(Ordering::SeqCst) > 0
    }

    pub fn snapshot(&self) -> Option<CalendarSnapshot> {
        self.shared.data.lock().clone()
    }

    pub fn display_offset(&self) -> FixedOffset {
        self.options.display_offset
    }

    pub fn current_date(&self) -> DateTime<Utc> {
        self.shared
            .data
            .lock()
            .as_ref()
            .map(|d| d.current_date)
            .unwrap_or_else(Utc::now)
    }

    pub fn selected_date(&self) -> Option<DateTime<Utc>> {
        self.shared.data.lock().as_ref().and_then(|d| d.selected_date)
    }

    /// All reminders in insertion order.
    pub fn reminders(&self) -> Vec<Reminder> {
        self.shared
            .data
            .lock()
            .as_ref()
            .map(|d| d.reminders.clone())
            .unwrap_or_default()
    }

    pub fn reminder(&self, id: &str) -> Option<Reminder> {
        self.shared
            .data
            .lock()
            .as_ref()
            .and_then(|d| d.reminders.iter().find(|r| r.id == id).cloned())
    }

    /// Month on display, 1-12.
    pub fn current_month(&self) -> u32 {
        self.to_local(self.current_date()).month()
    }

    pub fn current_year(&self) -> i32 {
        self.to_local(self.current_date()).year()
    }

    /// Calendar day of `instant` in the display zone.
    pub fn local_day(&self, instant: DateTime<Utc>) -> NaiveDate {
        local_day(instant, self.options.display_offset)
    }

    fn to_local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.options.display_offset)
    }

    /// Reminders on `day`, earliest first.
    pub fn reminders_for_date(&self, day: NaiveDate) -> Vec<Reminder> {
        let offset = self.options.display_offset;
        let mut matching: Vec<Reminder> = self
            .shared
            .data
            .lock()
            .as_ref()
            .map(|d| {
                d.reminders
                    .iter()
                    .filter(|r| local_day(r.date, offset) == day)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        matching.sort_by_key(|r| r.date);
        matching
    }

    pub fn editing_reminder(&self) -> Option<Reminder> {
        self.editing.lock().clone()
    }

    // ---- mutations ----

    /// Apply `change` to the live state and schedule a write.
    ///
    /// Returns `None` (and changes nothing) before `initialize`.
    fn mutate<R>(&self, change: impl FnOnce(&mut CalendarSnapshot) -> R) -> Option<R> {
        let result = {
            let mut data = self.shared.data.lock();
            let Some(snapshot) = data.as_mut() else {
                tracing::debug!("Calendar not initialized, ignoring change");
                return None;
            };
            change(snapshot)
        };
        self.writer.schedule();
        Some(result)
    }

    /// Append a reminder with a fresh ID. Returns the ID.
    pub fn add_reminder(&self, reminder: NewReminder) -> Option<String> {
        let id = mapper::generate_reminder_id();
        let new_id = id.clone();
        self.mutate(move |snapshot| {
            snapshot.reminders.push(reminder.into_reminder(new_id));
        })?;
        tracing::debug!("Added reminder {}", id);
        Some(id)
    }

    /// Merge `patch` into the reminder with `id`.
    ///
    /// Unknown IDs are ignored. Returns whether a reminder was updated.
    pub fn update_reminder(&self, id: &str, patch: ReminderPatch) -> bool {
        {
            let mut data = self.shared.data.lock();
            let Some(reminder) = data
                .as_mut()
                .and_then(|d| d.reminders.iter_mut().find(|r| r.id == id))
            else {
                tracing::debug!("Update ignored, no reminder {}", id);
                return false;
            };
            patch.apply(reminder);
        }

        self.writer.schedule();
        tracing::debug!("Updated reminder {}", id);
        self.shared.notifier.success("Reminder updated successfully");
        true
    }

    /// Remove the reminder with `id`. Returns whether one was removed.
    pub fn delete_reminder(&self, id: &str) -> bool {
        let removed = self
            .mutate(|snapshot| {
                let before = snapshot.reminders.len();
                snapshot.reminders.retain(|r| r.id != id);
                before != snapshot.reminders.len()
            })
            .unwrap_or(false);

        if removed {
            tracing::debug!("Deleted reminder {}", id);
            self.shared.notifier.success("Reminder deleted successfully");
        }
        removed
    }

    /// Remove every reminder on `day`. Returns how many were removed.
    pub fn delete_reminders_by_date(&self, day: NaiveDate) -> usize {
        let offset = self.options.display_offset;
        let removed = self
            .mutate(|snapshot| {
                let before = snapshot.reminders.len();
                snapshot
                    .reminders
                    .retain(|r| local_day(r.date, offset) != day);
                before - snapshot.reminders.len()
            })
            .unwrap_or(0);

        if removed > 0 {
            tracing::debug!("Deleted {} reminders on {}", removed, day);
            self.shared
                .notifier
                .success("All reminders for this date deleted successfully");
        }
        removed
    }

    pub fn set_selected_date(&self, date: Option<DateTime<Utc>>) {
        self.mutate(|snapshot| snapshot.selected_date = date);
    }

    /// Set the reminder being edited. Transient, never persisted.
    pub fn set_editing_reminder(&self, reminder: Option<Reminder>) {
        *self.editing.lock() = reminder;
    }

    /// Move the displayed month one step. Returns the new current date.
    pub fn navigate_month(&self, direction: MonthDirection) -> Option<DateTime<Utc>> {
        let offset = self.options.display_offset;
        self.mutate(|snapshot| {
            let local = snapshot.current_date.with_timezone(&offset).naive_local();
            match add_months_overflowing(local, direction.delta())
                .and_then(|shifted| offset.from_local_datetime(&shifted).single())
            {
                Some(shifted) => snapshot.current_date = shifted.with_timezone(&Utc),
                None => tracing::warn!("Cannot navigate past {}", snapshot.current_date),
            }
            snapshot.current_date
        })
    }
}

impl std::fmt::Debug for ReminderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderStore")
            .field("storage", &self.shared.storage)
            .field("options", &self.options)
            .field("writer", &self.writer)
            .finish()
    }
}

fn local_day(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

/// Shift by whole months keeping the day number; days past the end of the
/// target month roll over into the next one (Jan 31 + 1 month = Mar 2 or 3).
pub fn add_months_overflowing(dt: NaiveDateTime, months: i32) -> Option<NaiveDateTime> {
    let total = dt.year().checked_mul(12)?.checked_add(dt.month0() as i32)?.checked_add(months)?;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;

    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let date = first.checked_add_days(Days::new(u64::from(dt.day() - 1)))?;
    Some(date.and_time(dt.time()))
}
