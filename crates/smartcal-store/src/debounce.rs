//! Trailing-edge debouncer for snapshot writes.
//!
//! One pending task at a time: scheduling again aborts the previous task and
//! restarts the quiet period. The action reads whatever state is current when
//! it fires, so a burst of changes collapses into one write of the final state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

type Action = Arc<dyn Fn() + Send + Sync>;

/// A scheduled run. `claimed` is set by whoever runs it first: the timer
/// task when it fires, or `cancel`/`flush`.
struct Pending {
    handle: JoinHandle<()>,
    claimed: Arc<AtomicBool>,
}

impl Pending {
    fn claim(&self) -> bool {
        !self.claimed.swap(true, Ordering::SeqCst)
    }

    fn is_waiting(&self) -> bool {
        !self.claimed.load(Ordering::SeqCst)
    }
}

pub struct Debouncer {
    delay: Duration,
    action: Action,
    pending: Mutex<Option<Pending>>,
}

impl Debouncer {
    pub fn new<F>(delay: Duration, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            delay,
            action: Arc::new(action),
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule the action after the quiet period, replacing any pending run.
    ///
    /// Outside a Tokio runtime there is nothing to sleep on, so the action
    /// runs immediately.
    pub fn schedule(&self) {
        let Ok(runtime) = Handle::try_current() else {
            tracing::debug!("No async runtime, running debounced action inline");
            (self.action)();
            return;
        };

        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            if previous.claim() {
                previous.handle.abort();
            }
        }

        let action = self.action.clone();
        let delay = self.delay;
        let claimed = Arc::new(AtomicBool::new(false));
        let task_claim = claimed.clone();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if task_claim.swap(true, Ordering::SeqCst) {
                return;
            }
            if let Err(e) = tokio::task::spawn_blocking(move || action()).await {
                tracing::error!("Debounced action failed: {}", e);
            }
        });
        *pending = Some(Pending { handle, claimed });
    }

    /// Whether a scheduled run has not fired yet. A run that already started
    /// does not count.
    pub fn has_pending(&self) -> bool {
        self.pending.lock().as_ref().is_some_and(Pending::is_waiting)
    }

    /// Drop the pending run without executing it.
    ///
    /// Returns `false` when nothing was waiting, including when the run has
    /// already started.
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(pending) if pending.claim() => {
                pending.handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Run a pending action now instead of waiting for the timer.
    ///
    /// Returns `true` if a run was pending.
    pub fn flush(&self) -> bool {
        if self.cancel() {
            (self.action)();
            true
        } else {
            false
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.get_mut().take() {
            if pending.claim() {
                pending.handle.abort();
            }
        }
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.has_pending())
            .finish()
    }
}
