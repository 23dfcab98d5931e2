//! ticketkit: priority ticket dispatch.
//!
//! Items accumulate score through `raise`; `dequeue_max` hands out the
//! longest-waiting item among those with the highest score. The engine sits
//! behind one lock, is persisted to a line-oriented snapshot by a background
//! thread, and is served over a small text protocol by `ticketd`.

pub mod ds;
pub mod error;
pub mod protocol;
pub mod queue;
pub mod shared;
pub mod snapshot;
pub mod stats;
pub mod syncer;

#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod server;

pub mod prelude;

pub use crate::ds::{ItemId, OrderedMap, Score, ScoreBuckets, SlotArena, SlotId};
pub use crate::queue::{EMPTY_SENTINEL, PriorityQueue, Raised};
pub use crate::shared::SharedQueue;
pub use crate::stats::StatsSnapshot;
