//! Shared handle to the queue: the single lock every caller goes through.
//!
//! The request path and the background syncer each hold a clone of
//! [`SharedQueue`]. Every method takes the lock exactly once, so each call is
//! one serialisation point and a snapshot can never observe a bucket in the
//! middle of a splice.
//!
//! ```
//! use ticketkit::shared::SharedQueue;
//!
//! let queue = SharedQueue::new();
//! let syncer_view = queue.clone();
//!
//! queue.raise(42, 3).unwrap();
//! assert_eq!(syncer_view.lookup_score(42), Some(3));
//! assert_eq!(syncer_view.dequeue_max(), Some(42));
//! assert!(queue.is_empty());
//! ```

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::ds::{ItemId, Score};
use crate::error::RaiseError;
use crate::queue::{PriorityQueue, Raised};
use crate::stats::StatsSnapshot;

#[derive(Debug, Clone, Default)]
pub struct SharedQueue {
    inner: Arc<Mutex<PriorityQueue>>,
}

impl SharedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_queue(queue: PriorityQueue) -> Self {
        Self {
            inner: Arc::new(Mutex::new(queue)),
        }
    }

    pub fn raise(&self, item: ItemId, delta: Score) -> Result<Raised, RaiseError> {
        self.inner.lock().raise(item, delta)
    }

    pub fn dequeue_max(&self) -> Option<ItemId> {
        self.inner.lock().dequeue_max()
    }

    pub fn peek_max(&self) -> Option<ItemId> {
        self.inner.lock().peek_max()
    }

    pub fn lookup_score(&self, item: ItemId) -> Option<Score> {
        self.inner.lock().lookup_score(item)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.lock().stats()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Runs `f` with the lock held, for multi-step work such as snapshotting.
    pub fn with_locked<R>(&self, f: impl FnOnce(&mut PriorityQueue) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut *guard)
    }

    /// Explicit guard for callers that need to hold the lock across calls.
    pub fn lock(&self) -> MutexGuard<'_, PriorityQueue> {
        self.inner.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn clones_share_state() {
        let queue = SharedQueue::new();
        let other = queue.clone();
        queue.raise(1, 1).unwrap();
        other.raise(1, 4).unwrap();
        assert_eq!(queue.lookup_score(1), Some(5));
        assert_eq!(other.len(), 1);
        assert_eq!(queue.stats().updates, 2);
    }

    #[test]
    fn with_locked_sees_consistent_state() {
        let queue = SharedQueue::new();
        queue.raise(1, 2).unwrap();
        queue.raise(2, 2).unwrap();
        let pairs = queue.with_locked(|q| q.iter().collect::<Vec<_>>());
        assert_eq!(pairs, vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn concurrent_raises_are_all_counted() {
        let queue = SharedQueue::new();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for _ in 0..250 {
                        queue.raise(t + 1, 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for item in 1..=4 {
            assert_eq!(queue.lookup_score(item), Some(250));
        }
        assert_eq!(queue.stats().updates, 1000);
        queue.lock().debug_validate_invariants();
    }
}
