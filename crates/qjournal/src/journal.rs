//! The lifecycle facade the external queue drives: `open`, `close`, `roll`,
//! the six record emitters, and read-behind control. This module is the
//! composition root that wires the writer, the read-behind cursor, and
//! rotation together behind one handle; it holds no algorithm of its own.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

use crate::clock::Clock;
use crate::error::{JournalError, Result};
use crate::read_behind::{FillOutcome, ReadBehind};
use crate::record::QItem;
use crate::replay as replay_mod;
use crate::record::Record;
use crate::writer::Writer;

/// What a single [`Journal::fill_read_behind`] call observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadBehindStatus {
    /// An item was re-materialized and handed to the caller's callback.
    Delivered,
    /// A non-`Add` record was skipped; the cursor advanced but delivered nothing.
    Skipped,
    /// The cursor had no records left to read, or was never started;
    /// [`Journal::in_read_behind`] now returns `false`.
    Inactive,
}

/// A live handle on a journal file: an append-only writer, plus an optional
/// read-behind cursor trailing it.
pub struct Journal {
    path:        PathBuf,
    clock:       Box<dyn Clock>,
    writer:      Writer,
    read_behind: Option<ReadBehind>,
}

impl Debug for Journal {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Journal")
            .field("path", &self.path)
            .field("writer", &self.writer)
            .field("read_behind", &self.read_behind)
            .finish()
    }
}

impl Journal {
    /// Opens the journal at `path`, creating it if absent.
    ///
    /// Any stray `<path>.<ts>` backup left behind by a crash mid-[`roll`]
    /// is logged and deleted; its survival only ever indicates the process
    /// died between the rename and the reopen, at which point the primary
    /// file at `path` is already the authoritative one.
    ///
    /// [`roll`]: Journal::roll
    pub fn open(path: impl AsRef<Path>, clock: impl Clock + 'static) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        cleanup_stray_backups(&path)?;
        let writer = Writer::open(&path)?;
        Ok(Self { path, clock: Box::new(clock), writer, read_behind: None })
    }

    /// Replays `path` from the start, delivering each decoded record (plus a
    /// terminal [`Record::EndOfFile`]) to `f`, in file order. Does not
    /// require an open [`Journal`]; this is how the external queue rebuilds
    /// its state before calling [`Journal::open`].
    pub fn replay(
        path:  impl AsRef<Path>,
        clock: &dyn Clock,
        f:     impl FnMut(Record),
    ) -> std::io::Result<u64> {
        replay_mod::replay(path.as_ref(), clock, f)
    }

    /// The observable byte length of the live journal.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.writer.size()
    }

    pub fn add(&mut self, item: &QItem) -> Result<()> {
        self.writer.add(item).map_err(JournalError::from)
    }

    pub fn remove(&mut self) -> Result<()> {
        self.writer.remove().map_err(JournalError::from)
    }

    pub fn remove_tentative(&mut self) -> Result<()> {
        self.writer.remove_tentative().map_err(JournalError::from)
    }

    pub fn save_xid(&mut self, xid: u32) -> Result<()> {
        self.writer.save_xid(xid).map_err(JournalError::from)
    }

    pub fn unremove(&mut self, xid: u32) -> Result<()> {
        self.writer.unremove(xid).map_err(JournalError::from)
    }

    pub fn confirm_remove(&mut self, xid: u32) -> Result<()> {
        self.writer.confirm_remove(xid).map_err(JournalError::from)
    }

    /// Releases the writer and any active read-behind cursor. Equivalent to
    /// dropping the `Journal`; exposed explicitly to match the interface the
    /// external queue expects to call.
    pub fn close(self) {}

    #[must_use]
    pub fn in_read_behind(&self) -> bool {
        self.read_behind.is_some()
    }

    /// Activates a read-behind cursor positioned at the writer's current
    /// offset. A no-op replaced by a fresh cursor if one was already active.
    pub fn start_read_behind(&mut self) -> Result<()> {
        let cursor = ReadBehind::start(&self.path, self.writer.size())?;
        self.read_behind = Some(cursor);
        Ok(())
    }

    /// Advances the read-behind cursor by exactly one record.
    ///
    /// If the cursor has caught up to the writer, it is closed and
    /// [`ReadBehindStatus::Inactive`] is returned. Calling this while
    /// [`Journal::in_read_behind`] is `false` is also harmless and returns
    /// `Inactive`.
    pub fn fill_read_behind(&mut self, mut f: impl FnMut(QItem)) -> Result<ReadBehindStatus> {
        let Some(cursor) = self.read_behind.as_mut() else {
            return Ok(ReadBehindStatus::Inactive);
        };

        match cursor.fill_one(self.writer.size(), self.clock.as_ref())? {
            FillOutcome::CaughtUp => {
                self.read_behind = None;
                Ok(ReadBehindStatus::Inactive)
            },
            FillOutcome::Delivered(item) => {
                f(item);
                Ok(ReadBehindStatus::Delivered)
            },
            FillOutcome::Skipped => Ok(ReadBehindStatus::Skipped),
        }
    }

    /// Retires the current file and begins a fresh, empty one at the same
    /// path: rename to `<path>.<now-ms>`, reopen `path`, then delete the
    /// renamed backup. Only requested once the in-memory queue has been
    /// fully checkpointed, so an active read-behind cursor (which would be
    /// reading state the queue no longer needs) is dropped.
    pub fn roll(&mut self) -> Result<()> {
        let backup_path = backup_path_for(&self.path, self.clock.now_millis());

        // Renaming the path out from under `self.writer`'s still-open handle is safe on
        // POSIX: a rename only changes the directory entry, not what an open fd refers
        // to. The old handle is dropped below once `self.writer` is reassigned.
        std::fs::rename(&self.path, &backup_path)?;
        self.writer = Writer::open(&self.path)?;
        std::fs::remove_file(&backup_path)?;
        self.read_behind = None;

        Ok(())
    }
}

fn backup_path_for(path: &Path, timestamp_millis: u64) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(timestamp_millis.to_string());
    PathBuf::from(name)
}

/// Deletes any `<path>.<digits>` sibling left behind by a crash between
/// [`Journal::roll`]'s rename and its reopen.
fn cleanup_stray_backups(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else { return Ok(()) };
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else { return Ok(()) };
    let prefix = format!("{file_name}.");

    let dir = match std::fs::read_dir(parent) {
        Ok(dir) => dir,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(JournalError::Io(err)),
    };

    for entry in dir {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(suffix) = name.strip_prefix(&prefix) else { continue };
        if suffix.bytes().all(|b| b.is_ascii_digit()) && !suffix.is_empty() {
            tracing::warn!(
                path = %entry.path().display(),
                "found journal backup left over from an interrupted roll, deleting it",
            );
            std::fs::remove_file(entry.path())?;
        }
    }

    Ok(())
}
