//! The priority-dispatch engine.
//!
//! [`PriorityQueue`] composes [`ScoreBuckets`] with process statistics and
//! exposes the four ticket operations:
//!
//! | Operation      | Result                                          |
//! |----------------|-------------------------------------------------|
//! | `raise`        | add `delta` to an item's score, enqueue if new  |
//! | `dequeue_max`  | consume the longest-waiting top-scored item     |
//! | `peek_max`     | same selection, no mutation                     |
//! | `lookup_score` | current score of an enqueued item               |
//!
//! Empty results are `None`; the wire protocol renders them as
//! [`EMPTY_SENTINEL`].
//!
//! A promoted item is treated as a fresh arrival at its new score: it joins
//! the tail of that bucket behind everything already waiting there.
//!
//! ```
//! use ticketkit::queue::PriorityQueue;
//!
//! let mut queue = PriorityQueue::new();
//! queue.raise(5000, 19).unwrap();
//! queue.raise(5001, 5).unwrap();
//! queue.raise(5002, 7).unwrap();
//! queue.raise(5003, 1).unwrap();
//!
//! let order: Vec<_> = std::iter::from_fn(|| queue.dequeue_max()).collect();
//! assert_eq!(order, vec![5000, 5002, 5001, 5003]);
//! assert_eq!(queue.dequeue_max(), None);
//! ```

use tracing::trace;

use crate::ds::{ItemId, Score, ScoreBuckets};
use crate::error::{InvariantError, RaiseError};
use crate::stats::{Stats, StatsSnapshot};

/// Wire value for "queue empty" / "no such item".
pub const EMPTY_SENTINEL: i64 = -1;

/// What a successful `raise` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Raised {
    /// First raise for this item; it now waits at `score`.
    Enqueued { score: Score },
    /// Existing item moved from `from` to the strictly higher `to`.
    Promoted { from: Score, to: Score },
}

impl Raised {
    pub fn score(self) -> Score {
        match self {
            Raised::Enqueued { score } => score,
            Raised::Promoted { to, .. } => to,
        }
    }
}

#[derive(Debug, Default)]
pub struct PriorityQueue {
    buckets: ScoreBuckets,
    stats: Stats,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buckets: ScoreBuckets::with_capacity(capacity),
            stats: Stats::new(),
        }
    }

    /// Adds `delta` to `item`'s score, enqueuing it at `delta` if absent.
    ///
    /// Rejects non-positive ids and deltas below 1 without touching the
    /// indexes or the statistics.
    pub fn raise(&mut self, item: ItemId, delta: Score) -> Result<Raised, RaiseError> {
        if item <= 0 {
            return Err(RaiseError::InvalidItemId(item));
        }
        if delta < 1 {
            return Err(RaiseError::InvalidScore(delta));
        }

        let raised = match self.buckets.score(&item) {
            None => {
                self.buckets.insert(item, delta);
                self.stats.items += 1;
                Raised::Enqueued { score: delta }
            },
            Some(current) => {
                let to = current
                    .checked_add(delta)
                    .ok_or(RaiseError::ScoreOverflow {
                        item,
                        current,
                        delta,
                    })?;
                self.buckets.promote(&item, to);
                Raised::Promoted { from: current, to }
            },
        };
        self.stats.updates += 1;
        self.sync_pools();
        trace!(item, delta, score = raised.score(), "raise");
        Ok(raised)
    }

    /// Removes and returns the head of the highest-scored bucket.
    pub fn dequeue_max(&mut self) -> Option<ItemId> {
        let (item, score) = self.buckets.pop_max()?;
        self.stats.items -= 1;
        self.sync_pools();
        trace!(item, score, "dequeue");
        Some(item)
    }

    /// The item `dequeue_max` would return, left in place.
    pub fn peek_max(&self) -> Option<ItemId> {
        self.buckets.peek_max().map(|(item, _)| item)
    }

    /// Current score of `item`, or `None` if it is not enqueued.
    pub fn lookup_score(&self, item: ItemId) -> Option<Score> {
        self.buckets.score(&item)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.bucket_count()
    }

    pub fn max_score(&self) -> Option<Score> {
        self.buckets.max_score()
    }

    /// Every enqueued `(item, score)`, highest score first, FIFO within a score.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, Score)> + '_ {
        self.buckets.iter()
    }

    /// Verifies that the statistics agree with the indexes.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let indexed = self.buckets.len() as u64;
        if self.stats.items != indexed {
            return Err(InvariantError::new(format!(
                "items stat {} != indexed items {}",
                self.stats.items, indexed
            )));
        }
        let buckets = self.buckets.bucket_count() as u64;
        if self.stats.pools != buckets {
            return Err(InvariantError::new(format!(
                "pools stat {} != live buckets {}",
                self.stats.pools, buckets
            )));
        }
        if self.stats.updates < self.stats.items {
            return Err(InvariantError::new(format!(
                "updates stat {} below live items {}",
                self.stats.updates, self.stats.items
            )));
        }
        Ok(())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.buckets.debug_validate_invariants();
        if let Err(err) = self.check_invariants() {
            panic!("{err}");
        }
    }

    fn sync_pools(&mut self) {
        self.stats.pools = self.buckets.bucket_count() as u64;
    }
}
