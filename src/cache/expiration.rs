//! Expiration Tracking
//!
//! Stamps capture time and max age on stored entries and decides staleness.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::cache::{CacheConfig, EntryMetadata, StoredEntry};

// == Clock ==
/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: std::time::Duration) {
        let mut now = self.now.lock();
        *now += chrono::Duration::milliseconds(by.as_millis() as i64);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

// == Expiration Tracker ==
#[derive(Debug, Clone)]
pub struct ExpirationTracker {
    clock: Arc<dyn Clock>,
}

impl Default for ExpirationTracker {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl ExpirationTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Metadata for an entry persisted now under `config`.
    pub fn stamp(&self, config: &CacheConfig) -> EntryMetadata {
        EntryMetadata::new(self.clock.now(), config.max_age)
    }

    /// Entries without metadata are never expired.
    pub fn is_expired(&self, entry: &StoredEntry) -> bool {
        entry.is_expired(self.clock.now())
    }
}
