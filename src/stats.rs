//! Process-wide queue statistics.
//!
//! Counters live inside the engine and are mutated under the same lock as the
//! indexes, so a [`StatsSnapshot`] always describes one serialisation point.

use std::time::{Duration, Instant};

/// Server version reported by `INFO`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone)]
pub struct Stats {
    started_at: Instant,
    pub(crate) updates: u64,
    pub(crate) items: u64,
    pub(crate) pools: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            updates: 0,
            items: 0,
            pools: 0,
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.started_at.elapsed(),
            version: VERSION,
            updates: self.updates,
            items: self.items,
            pools: self.pools,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`Stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub uptime: Duration,
    pub version: &'static str,
    /// Successful raises since start (snapshot replay included).
    pub updates: u64,
    /// Items currently enqueued.
    pub items: u64,
    /// Distinct scores currently held.
    pub pools: u64,
}

impl StatsSnapshot {
    /// `(key, value)` pairs in `INFO` order.
    pub fn fields(&self) -> [(&'static str, String); 5] {
        [
            ("uptime", self.uptime.as_secs().to_string()),
            ("version", self.version.to_string()),
            ("updates", self.updates.to_string()),
            ("items", self.items.to_string()),
            ("pools", self.pools.to_string()),
        ]
    }
}
