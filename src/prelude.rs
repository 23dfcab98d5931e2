pub use crate::ds::{ItemId, Score};
pub use crate::error::{ProtocolError, RaiseError, SnapshotError};
pub use crate::protocol::{Command, Reply};
pub use crate::queue::{EMPTY_SENTINEL, PriorityQueue, Raised};
pub use crate::shared::SharedQueue;
pub use crate::snapshot::{LoadReport, load_snapshot, write_snapshot};
pub use crate::stats::StatsSnapshot;
pub use crate::syncer::Syncer;
