pub mod ordered_map;
pub mod score_buckets;
pub mod slot_arena;

pub use ordered_map::OrderedMap;
pub use score_buckets::{BucketIter, ItemId, Score, ScoreBuckets};
pub use slot_arena::{SlotArena, SlotId};
