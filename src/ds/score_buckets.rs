//! Score buckets: the dual index behind the ticket queue.
//!
//! Tracks every enqueued item under its accumulated score. Items sharing a
//! score form a FIFO bucket; buckets are kept in an ordered Score Index so the
//! highest score is always one tree descent away. A second ordered index maps
//! item ids to the arena slot of their bucket membership, which is the
//! back-reference that makes unlinking an item from its bucket `O(1)`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                           ScoreBuckets Layout                               │
//! │                                                                             │
//! │   ┌──────────────────────────────────┐   ┌────────────────────────────────┐ │
//! │   │ items: OrderedMap<ItemId, SlotId>│   │ entries: SlotArena<Entry>      │ │
//! │   │                                  │   │                                │ │
//! │   │   5000 ──► id_0 ─────────────────┼───┼─► id_0 { score: 19, prev/next }│ │
//! │   │   5001 ──► id_1 ─────────────────┼───┼─► id_1 { score: 5,  prev/next }│ │
//! │   │   5002 ──► id_2 ─────────────────┼───┼─► id_2 { score: 5,  prev/next }│ │
//! │   └──────────────────────────────────┘   └────────────────────────────────┘ │
//! │                                                                             │
//! │   ┌───────────────────────────────────────────────────────────────────────┐ │
//! │   │ scores: OrderedMap<Score, Bucket>   (AVL, max = next dispatch)        │ │
//! │   │                                                                       │ │
//! │   │   score=19: head ──► [id_0] ◄── tail                 ◄── last_key     │ │
//! │   │   score=5:  head ──► [id_1] ◄──► [id_2] ◄── tail                      │ │
//! │   │                      oldest        newest                             │ │
//! │   └───────────────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────────┘
//!
//! Promote Flow
//! ────────────
//!
//!   promote(5001, 7):
//!     1. Lookup id_1 in items
//!     2. Unlink id_1 from score=5 bucket (prev/next splice)
//!     3. If score=5 bucket is empty → delete it from scores
//!     4. Find-or-create score=7 bucket
//!     5. Append id_1 at the tail of score=7 (fresh arrival)
//!
//! Dispatch Flow (pop_max)
//! ───────────────────────
//!
//!   pop_max():
//!     1. scores.last_key_value() → highest bucket
//!     2. Unlink its head (longest waiting at that score)
//!     3. If bucket empty → delete it from scores
//!     4. Free the entry slot and drop the item from items
//! ```
//!
//! ## Operations
//!
//! | Operation   | Time      | Notes                                   |
//! |-------------|-----------|-----------------------------------------|
//! | `insert`    | O(log n)  | New item at the tail of its bucket      |
//! | `promote`   | O(log n)  | Move to a strictly higher score's tail  |
//! | `pop_max`   | O(log n)  | Head of the highest bucket              |
//! | `peek_max`  | O(log n)  | Same selection, no mutation             |
//! | `score`     | O(log n)  | Item Index lookup                       |
//! | `iter`      | O(n)      | Score-descending, FIFO within a bucket  |
//!
//! ## Invariants
//!
//! - An item is in `items` iff it is a member of exactly one bucket, and that
//!   bucket's key equals the entry's score.
//! - A bucket exists iff it has at least one member.
//! - Scores are `≥ 1` and only ever increase for a live item.
//! - Members of a bucket are ordered by the time they entered *that* bucket.
//!
//! A broken link is a corrupted index; the structure panics rather than keep
//! serving a priority order it can no longer vouch for.

use crate::ds::ordered_map::OrderedMap;
use crate::ds::slot_arena::{SlotArena, SlotId};

/// Client-supplied item identifier. Valid ids are strictly positive.
pub type ItemId = i64;

/// Accumulated priority. Live scores are strictly positive.
pub type Score = i64;

#[derive(Debug)]
struct Entry {
    prev: Option<SlotId>,
    next: Option<SlotId>,
    score: Score,
    item: ItemId,
}

#[derive(Debug, Default)]
struct Bucket {
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

/// Dual-indexed score buckets with FIFO ordering inside each score.
///
/// # Example
///
/// ```
/// use ticketkit::ds::ScoreBuckets;
///
/// let mut buckets = ScoreBuckets::new();
/// buckets.insert(5000, 19);
/// buckets.insert(5001, 5);
/// buckets.insert(5002, 7);
///
/// assert_eq!(buckets.peek_max(), Some((5000, 19)));
/// assert_eq!(buckets.promote(&5001, 20), Some(5));
///
/// assert_eq!(buckets.pop_max(), Some((5001, 20)));
/// assert_eq!(buckets.pop_max(), Some((5000, 19)));
/// assert_eq!(buckets.pop_max(), Some((5002, 7)));
/// assert_eq!(buckets.pop_max(), None);
/// ```
#[derive(Debug, Default)]
pub struct ScoreBuckets {
    entries: SlotArena<Entry>,
    items: OrderedMap<ItemId, SlotId>,
    scores: OrderedMap<Score, Bucket>,
}

impl ScoreBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: SlotArena::with_capacity(capacity),
            items: OrderedMap::with_capacity(capacity),
            scores: OrderedMap::new(),
        }
    }

    /// Number of enqueued items.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct scores currently held (one bucket each).
    pub fn bucket_count(&self) -> usize {
        self.scores.len()
    }

    #[inline]
    pub fn contains(&self, item: &ItemId) -> bool {
        self.items.contains_key(item)
    }

    /// Current score of `item`, if enqueued.
    #[inline]
    pub fn score(&self, item: &ItemId) -> Option<Score> {
        let id = *self.items.get(item)?;
        Some(self.entry(id).score)
    }

    /// Highest score present.
    pub fn max_score(&self) -> Option<Score> {
        self.scores.last_key_value().map(|(score, _)| *score)
    }

    /// Number of members in the bucket for `score` (0 when it does not exist).
    pub fn bucket_len(&self, score: Score) -> usize {
        self.scores.get(&score).map_or(0, |bucket| bucket.len)
    }

    /// Members of the `score` bucket, oldest first.
    pub fn iter_bucket(&self, score: Score) -> BucketIter<'_> {
        BucketIter {
            entries: &self.entries,
            current: self.scores.get(&score).and_then(|bucket| bucket.head),
        }
    }

    /// All `(item, score)` pairs, highest score first, FIFO within a score.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, Score)> + '_ {
        self.scores.iter_rev().flat_map(move |(&score, bucket)| {
            BucketIter {
                entries: &self.entries,
                current: bucket.head,
            }
            .map(move |item| (item, score))
        })
    }

    /// Enqueues a new item at the tail of the `score` bucket.
    ///
    /// Returns `false` (and changes nothing) if `item` is already enqueued.
    ///
    /// # Panics
    ///
    /// Panics if `score < 1`.
    pub fn insert(&mut self, item: ItemId, score: Score) -> bool {
        assert!(score >= 1, "score must be positive, got {score}");
        if self.items.contains_key(&item) {
            return false;
        }
        let id = self.entries.insert(Entry {
            prev: None,
            next: None,
            score,
            item,
        });
        self.items.insert(item, id);
        self.list_push_back(score, id);
        true
    }

    /// Moves `item` to `new_score`, appending it to the tail of that bucket.
    ///
    /// Returns the previous score, or `None` if `item` is not enqueued. The
    /// old bucket is deleted if this was its last member.
    ///
    /// # Panics
    ///
    /// Panics if `new_score` is not strictly greater than the current score;
    /// scores never decrease while an item is enqueued.
    pub fn promote(&mut self, item: &ItemId, new_score: Score) -> Option<Score> {
        let id = *self.items.get(item)?;
        let old_score = self.entry(id).score;
        assert!(
            new_score > old_score,
            "promotion of item {item} must increase its score ({old_score} -> {new_score})"
        );

        self.list_remove(old_score, id);
        self.entry_mut(id).score = new_score;
        self.list_push_back(new_score, id);
        Some(old_score)
    }

    /// The longest-waiting item in the highest bucket, without removing it.
    pub fn peek_max(&self) -> Option<(ItemId, Score)> {
        let (&score, bucket) = self.scores.last_key_value()?;
        let head = bucket.head.expect("score index holds an empty bucket");
        Some((self.entry(head).item, score))
    }

    /// Removes and returns the longest-waiting item in the highest bucket.
    ///
    /// The item leaves both indexes; it is consumed, not parked.
    pub fn pop_max(&mut self) -> Option<(ItemId, Score)> {
        let (&score, bucket) = self.scores.last_key_value()?;
        let head = bucket.head.expect("score index holds an empty bucket");

        self.list_remove(score, head);
        let entry = self
            .entries
            .remove(head)
            .expect("bucket head points at a freed entry");
        self.items.remove(&entry.item);
        Some((entry.item, entry.score))
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.items.debug_validate_invariants();
        self.scores.debug_validate_invariants();
        assert_eq!(self.items.len(), self.entries.len());

        let mut members = 0usize;
        for (&score, bucket) in self.scores.iter() {
            assert!(score >= 1, "non-positive score {score}");
            assert!(bucket.len > 0, "empty bucket at score {score}");
            assert!(bucket.head.is_some());

            let mut current = bucket.head;
            let mut last = None;
            let mut count = 0usize;
            while let Some(id) = current {
                let entry = self.entries.get(id).expect("bucket entry missing");
                assert_eq!(entry.score, score);
                assert_eq!(entry.prev, last);
                assert_eq!(self.items.get(&entry.item), Some(&id));
                last = Some(id);
                current = entry.next;
                count += 1;
            }
            assert_eq!(bucket.tail, last);
            assert_eq!(bucket.len, count);
            members += count;
        }
        assert_eq!(members, self.entries.len(), "entry outside every bucket");
    }

    fn entry(&self, id: SlotId) -> &Entry {
        self.entries.get(id).expect("item index points at a freed entry")
    }

    fn entry_mut(&mut self, id: SlotId) -> &mut Entry {
        self.entries
            .get_mut(id)
            .expect("item index points at a freed entry")
    }

    /// Appends `id` to the tail of the `score` bucket, creating the bucket.
    fn list_push_back(&mut self, score: Score, id: SlotId) {
        let old_tail = match self.scores.get(&score) {
            Some(bucket) => bucket.tail,
            None => {
                self.scores.insert(score, Bucket::default());
                None
            },
        };

        let entry = self.entry_mut(id);
        entry.prev = old_tail;
        entry.next = None;
        if let Some(old_tail) = old_tail {
            self.entry_mut(old_tail).next = Some(id);
        }

        let bucket = self.scores.get_mut(&score).expect("bucket just ensured");
        if old_tail.is_none() {
            bucket.head = Some(id);
        }
        bucket.tail = Some(id);
        bucket.len += 1;
    }

    /// Unlinks `id` from the `score` bucket, deleting the bucket if it empties.
    fn list_remove(&mut self, score: Score, id: SlotId) {
        let (prev, next) = {
            let entry = self.entry(id);
            (entry.prev, entry.next)
        };
        if let Some(prev) = prev {
            self.entry_mut(prev).next = next;
        }
        if let Some(next) = next {
            self.entry_mut(next).prev = prev;
        }

        let bucket = self
            .scores
            .get_mut(&score)
            .expect("entry score has no bucket");
        if prev.is_none() {
            bucket.head = next;
        }
        if next.is_none() {
            bucket.tail = prev;
        }
        bucket.len -= 1;
        let emptied = bucket.len == 0;

        let entry = self.entry_mut(id);
        entry.prev = None;
        entry.next = None;

        if emptied {
            self.scores.remove(&score);
        }
    }
}

/// Iterator over one bucket's members, oldest first.
#[derive(Debug)]
pub struct BucketIter<'a> {
    entries: &'a SlotArena<Entry>,
    current: Option<SlotId>,
}

impl Iterator for BucketIter<'_> {
    type Item = ItemId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let entry = self.entries.get(id)?;
        self.current = entry.next;
        Some(entry.item)
    }
}
