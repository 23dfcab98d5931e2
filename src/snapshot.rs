//! Durable snapshot of the queue.
//!
//! The file is plain text, one enqueued item per line:
//!
//! ```text
//! <item id> <score>
//! ```
//!
//! No header, no trailer. Loading replays each line as the item's first
//! raise with `delta = score`, which rebuilds the same item/score/bucket
//! state. Line order inside one score is the FIFO order at the time of
//! writing, so a round trip also preserves arrival order within a bucket.
//!
//! Writes go to a sibling temp file that is fsync'd and then renamed over the
//! target, so a reader of the snapshot path sees either the previous complete
//! snapshot or the new complete snapshot.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::ds::{ItemId, Score};
use crate::error::SnapshotError;
use crate::queue::PriorityQueue;

/// Outcome of [`load_snapshot`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Lines replayed into the queue.
    pub loaded: usize,
    /// Malformed lines that were ignored.
    pub skipped: usize,
}

/// Parses one snapshot line into `(item, score)`.
///
/// Returns `None` for anything other than exactly two integers with a
/// positive id and a score of at least 1.
///
/// ```
/// use ticketkit::snapshot::parse_line;
///
/// assert_eq!(parse_line("5000 19"), Some((5000, 19)));
/// assert_eq!(parse_line("5000 19\r"), Some((5000, 19)));
/// assert_eq!(parse_line("5000"), None);
/// assert_eq!(parse_line("0 4"), None);
/// ```
pub fn parse_line(line: &str) -> Option<(ItemId, Score)> {
    let mut tokens = line.split_whitespace();
    let item: ItemId = tokens.next()?.parse().ok()?;
    let score: Score = tokens.next()?.parse().ok()?;
    if tokens.next().is_some() || item <= 0 || score < 1 {
        return None;
    }
    Some((item, score))
}

/// Replays the snapshot at `path` into `queue`.
///
/// A missing file is an empty snapshot. Malformed lines are logged and
/// skipped; only I/O failures are errors.
pub fn load_snapshot(
    queue: &mut PriorityQueue,
    path: impl AsRef<Path>,
) -> Result<LoadReport, SnapshotError> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no snapshot, starting empty");
            return Ok(LoadReport::default());
        },
        Err(err) => return Err(SnapshotError::io(path, err)),
    };

    let mut report = LoadReport::default();
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|err| SnapshotError::io(path, err))?;
        if read == 0 {
            break;
        }
        line_no += 1;

        let parsed = std::str::from_utf8(&buf).ok().and_then(parse_line);
        let Some((item, score)) = parsed else {
            if !buf.iter().all(u8::is_ascii_whitespace) {
                warn!(path = %path.display(), line = line_no, "skipping malformed snapshot line");
            }
            report.skipped += 1;
            continue;
        };
        match queue.raise(item, score) {
            Ok(_) => report.loaded += 1,
            Err(err) => {
                warn!(path = %path.display(), line = line_no, error = %err, "skipping snapshot entry");
                report.skipped += 1;
            },
        }
    }

    debug!(
        path = %path.display(),
        loaded = report.loaded,
        skipped = report.skipped,
        "snapshot loaded"
    );
    Ok(report)
}

/// Writes every enqueued item of `queue` to `path`, atomically replacing it.
///
/// Returns the number of lines written. The caller is expected to hold the
/// queue lock for the duration.
pub fn write_snapshot(queue: &PriorityQueue, path: impl AsRef<Path>) -> Result<usize, SnapshotError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|err| SnapshotError::io(parent, err))?;
    }

    let tmp_path = tmp_write_path(path);
    let written = match write_lines(queue, &tmp_path) {
        Ok(written) => written,
        Err(err) => {
            let _ = fs::remove_file(&tmp_path);
            return Err(SnapshotError::io(&tmp_path, err));
        },
    };

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(SnapshotError::io(path, err));
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        let dir = File::open(parent).map_err(|err| SnapshotError::io(parent, err))?;
        dir.sync_all().map_err(|err| SnapshotError::io(parent, err))?;
    }

    Ok(written)
}

fn write_lines(queue: &PriorityQueue, tmp_path: &Path) -> io::Result<usize> {
    let file = File::create(tmp_path)?;
    let mut writer = BufWriter::new(file);
    let mut written = 0usize;
    for (item, score) in queue.iter() {
        writeln!(writer, "{item} {score}")?;
        written += 1;
    }
    let file = writer.into_inner().map_err(|err| err.into_error())?;
    file.sync_all()?;
    Ok(written)
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}
