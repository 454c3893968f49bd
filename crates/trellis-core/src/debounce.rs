//! Debounced search query
//!
//! Keystrokes arrive much faster than layouts are worth recomputing. Every
//! push cancels the pending evaluation and schedules a new one after the
//! quiet period, so only the latest query is ever committed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Quiet period before a query is committed
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

pub struct QueryDebouncer {
    delay: Duration,
    /// Bumped on every push; a task only commits if it is still the latest
    generation: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
    settled: Arc<watch::Sender<String>>,
}

impl QueryDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self::with_initial(delay, String::new())
    }

    /// Start with an already settled query, e.g. one restored from config
    pub fn with_initial(delay: Duration, initial: impl Into<String>) -> Self {
        let (settled, _) = watch::channel(initial.into());
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
            settled: Arc::new(settled),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `query` to settle after the quiet period.
    ///
    /// Must be called from within a tokio runtime.
    pub fn push(&self, query: impl Into<String>) {
        let query = query.into();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.generation);
        let settled = Arc::clone(&self.settled);
        let delay = self.delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if latest.load(Ordering::SeqCst) != generation {
                return;
            }
            let committed = settled.send_if_modified(|current| {
                if *current == query {
                    false
                } else {
                    *current = query;
                    true
                }
            });
            if committed {
                tracing::debug!("Query settled after {:?}", delay);
            }
        });

        if let Some(previous) = self.pending.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Drop any pending query without committing it
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(previous) = self.pending.lock().take() {
            previous.abort();
        }
    }

    /// Whether a pushed query is still waiting out the quiet period
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Receiver notified whenever a new query settles
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.settled.subscribe()
    }

    /// The last committed query
    pub fn settled(&self) -> String {
        self.settled.borrow().clone()
    }
}

impl Default for QueryDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Drop for QueryDebouncer {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.get_mut().take() {
            pending.abort();
        }
    }
}
