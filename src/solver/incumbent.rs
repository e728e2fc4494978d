//! Best-known schedule shared between search workers.

use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;

/// Incumbent makespan and start vector.
///
/// `best()` is a lock-free read used for pruning; it may lag behind a
/// concurrent `offer`, which only makes pruning weaker. Updates compare
/// and write under the lock, so the stored schedule always matches the
/// stored makespan.
#[derive(Debug)]
pub(crate) struct Incumbent {
    best: AtomicI64,
    schedule: Mutex<Option<Vec<i64>>>,
}

impl Incumbent {
    /// Creates an empty incumbent. Schedules must beat `bound` to be kept.
    pub(crate) fn new(bound: i64) -> Self {
        Self {
            best: AtomicI64::new(bound),
            schedule: Mutex::new(None),
        }
    }

    /// Current best makespan (or the initial bound).
    #[inline]
    pub(crate) fn best(&self) -> i64 {
        self.best.load(Ordering::Acquire)
    }

    /// Offers a schedule. Returns `true` if it became the incumbent.
    pub(crate) fn offer(&self, makespan: i64, starts: &[i64]) -> bool {
        if makespan >= self.best() {
            return false;
        }
        let mut guard = self.schedule.lock();
        if makespan >= self.best.load(Ordering::Acquire) {
            return false;
        }
        *guard = Some(starts.to_vec());
        self.best.store(makespan, Ordering::Release);
        true
    }

    /// Whether a schedule has been stored.
    pub(crate) fn has_schedule(&self) -> bool {
        self.schedule.lock().is_some()
    }

    /// Consumes the incumbent, returning `(makespan, starts)` if any.
    pub(crate) fn into_best(self) -> Option<(i64, Vec<i64>)> {
        let best = self.best.into_inner();
        self.schedule.into_inner().map(|starts| (best, starts))
    }
}
