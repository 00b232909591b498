//! Single-slot time-to-live cache.
//!
//! Wraps an expensive zero-argument producer (enumerating the items in a
//! panel) so that consecutive frames reuse the last snapshot until it expires.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// TTL used for inventory and stash item snapshots.
pub const ITEM_SNAPSHOT_TTL: Duration = Duration::from_millis(200);

type Producer<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Caches the last value of `producer` for `ttl`.
///
/// The check-and-recompute step runs under one lock, so concurrent callers in
/// an expired window trigger a single producer call and the rest wait for its
/// result. The producer must not read the same cache.
pub struct TimedCache<T> {
    producer: Producer<T>,
    ttl: Duration,
    slot: Mutex<Option<(Instant, Arc<T>)>>,
}

impl<T> TimedCache<T> {
    pub fn new(ttl: Duration, producer: impl Fn() -> T + Send + Sync + 'static) -> Self {
        TimedCache {
            producer: Box::new(producer),
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached value, recomputing it when older than the TTL.
    ///
    /// A `now` earlier than the stored timestamp counts as fresh.
    pub fn get(&self, now: Instant) -> Arc<T> {
        let mut slot = self.slot.lock();
        if let Some((stamp, value)) = slot.as_ref()
            && now.saturating_duration_since(*stamp) < self.ttl
        {
            return Arc::clone(value);
        }
        log::debug!("snapshot expired, recomputing (ttl {:?})", self.ttl);
        let value = Arc::new((self.producer)());
        *slot = Some((now, Arc::clone(&value)));
        value
    }

    /// Drop the cached value so the next `get` recomputes.
    pub fn invalidate(&self) {
        *self.slot.lock() = None;
    }
}

impl<T> fmt::Debug for TimedCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedCache")
            .field("ttl", &self.ttl)
            .field("populated", &self.slot.lock().is_some())
            .finish()
    }
}
