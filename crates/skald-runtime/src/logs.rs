//! Bounded in-memory log buffer with synchronous subscriber fan-out.
//!
//! Every line the game server prints is parsed once here and kept in a
//! FIFO of fixed capacity. Subscribers are notified in insertion order. A
//! subscriber that panics is isolated: the remaining subscribers still see
//! the entry and the caller of [`LogBuffer::add`] is unaffected.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use skald_core::{LogEntry, LogLevel, ServerEvent, parse_event, parse_line};
use tracing::warn;

type Callback = Arc<dyn Fn(&LogEntry, Option<&ServerEvent>) + Send + Sync>;
type SubscriberList = RwLock<Vec<(u64, Callback)>>;

/// Ring buffer of parsed log entries.
pub struct LogBuffer {
    capacity: usize,
    entries: RwLock<VecDeque<LogEntry>>,
    subscribers: Arc<SubscriberList>,
    next_id: AtomicU64,
}

/// Handle returned by [`LogBuffer::subscribe`].
///
/// Dropping the handle keeps the subscription alive; call
/// [`Subscription::unsubscribe`] to remove it.
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Subscription {
    id: u64,
    subscribers: Weak<SubscriberList>,
}

impl Subscription {
    /// Remove the subscriber. Idempotent with respect to a dropped buffer.
    pub fn unsubscribe(self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            let mut list = subscribers.write().unwrap_or_else(|e| e.into_inner());
            list.retain(|(id, _)| *id != self.id);
        }
    }
}

impl LogBuffer {
    /// Create a buffer holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Parse `raw`, store it (evicting the oldest entry when full) and
    /// notify subscribers. Returns the stored entry and any event it carried.
    pub fn add(&self, raw: &str) -> (LogEntry, Option<ServerEvent>) {
        let entry = parse_line(raw);
        let event = parse_event(raw);

        {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            entries.push_back(entry.clone());
            while entries.len() > self.capacity {
                entries.pop_front();
            }
        }

        self.notify(&entry, event.as_ref());
        (entry, event)
    }

    fn notify(&self, entry: &LogEntry, event: Option<&ServerEvent>) {
        // Snapshot so subscribers may (un)subscribe or read the buffer.
        let callbacks: Vec<Callback> = {
            let list = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
            list.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(entry, event))).is_err() {
                warn!("Log subscriber panicked; continuing with remaining subscribers");
            }
        }
    }

    /// Register a subscriber called for every new entry.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&LogEntry, Option<&ServerEvent>) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut list = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        list.push((id, Arc::new(callback)));
        Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Copy of every stored entry, oldest first.
    pub fn get_all(&self) -> Vec<LogEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.iter().cloned().collect()
    }

    /// Stored entries with the given level, oldest first.
    pub fn get_filtered(&self, level: LogLevel) -> Vec<LogEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.iter().filter(|e| e.level == level).cloned().collect()
    }

    /// The `n` most recent entries, oldest first.
    pub fn get_recent(&self, n: usize) -> Vec<LogEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
