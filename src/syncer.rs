//! Background snapshot thread.
//!
//! ```text
//!   spawn ──► wait(interval | stop) ──► lock ──► write_snapshot ──► unlock
//!                 ▲                                     │
//!                 └─────────────── ok ──────────────────┘
//!                                                       │ err
//!                                                       ▼
//!                                               error! + abort
//! ```
//!
//! The queue lock is held for the whole write, so a snapshot is always one
//! consistent serialisation point. A failed write is fatal: running on with a
//! persistence path that silently fails would lose the queue on restart.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::error::SnapshotError;
use crate::shared::SharedQueue;
use crate::snapshot::write_snapshot;

/// Writes one snapshot with the queue locked; returns the number of items.
pub fn sync_once(queue: &SharedQueue, path: &Path) -> Result<usize, SnapshotError> {
    let started = Instant::now();
    let written = queue.with_locked(|q| write_snapshot(q, path))?;
    debug!(
        items = written,
        elapsed_us = started.elapsed().as_micros() as u64,
        path = %path.display(),
        "snapshot written"
    );
    Ok(written)
}

/// Handle to a running syncer. Dropping it without [`Syncer::shutdown`]
/// leaves the thread running until the process exits.
#[derive(Debug)]
pub struct Syncer {
    stop: Sender<()>,
    handle: JoinHandle<Result<usize, SnapshotError>>,
}

impl Syncer {
    /// Starts the thread. Write failures inside the loop abort the process.
    pub fn spawn(queue: SharedQueue, path: PathBuf, interval: Duration) -> std::io::Result<Self> {
        Self::spawn_with(queue, path, interval, fatal)
    }

    /// Like [`Syncer::spawn`], with a custom handler for periodic write failures.
    ///
    /// The loop ends after `on_error` returns.
    pub fn spawn_with(
        queue: SharedQueue,
        path: PathBuf,
        interval: Duration,
        on_error: fn(&SnapshotError),
    ) -> std::io::Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("ticketd-syncer".to_owned())
            .spawn(move || {
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if let Err(err) = sync_once(&queue, &path) {
                                on_error(&err);
                                return Err(err);
                            }
                        },
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                sync_once(&queue, &path)
            })?;
        info!(interval_secs = interval.as_secs(), "syncer started");
        Ok(Self { stop, handle })
    }

    /// Stops the loop, writes a final snapshot, and returns its item count.
    pub fn shutdown(self) -> Result<usize, SnapshotError> {
        let _ = self.stop.send(());
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

fn fatal(err: &SnapshotError) {
    error!(error = %err, "snapshot write failed, aborting");
    std::process::abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn writes_periodically_and_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.snapshot");
        let queue = SharedQueue::new();
        queue.raise(1, 5).unwrap();

        let syncer = Syncer::spawn(queue.clone(), path.clone(), Duration::from_millis(10)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while !path.exists() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "1 5\n");

        queue.raise(2, 9).unwrap();
        assert_eq!(syncer.shutdown().unwrap(), 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "2 9\n1 5\n");
    }

    #[test]
    fn shutdown_before_first_tick_still_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.snapshot");
        let queue = SharedQueue::new();
        queue.raise(3, 1).unwrap();

        let syncer = Syncer::spawn(queue, path.clone(), Duration::from_secs(3600)).unwrap();
        assert_eq!(syncer.shutdown().unwrap(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "3 1\n");
    }

    #[test]
    fn periodic_failure_goes_to_handler() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        fn ignore(_: &SnapshotError) {}

        let syncer = Syncer::spawn_with(
            SharedQueue::new(),
            blocker.join("queue.snapshot"),
            Duration::from_millis(5),
            ignore,
        )
        .unwrap();
        assert!(matches!(syncer.shutdown(), Err(SnapshotError::Io { .. })));
    }
}
