//! `qjournal` is the write-ahead journal for a durable, in-memory FIFO
//! message queue.
//!
//! It owns the on-disk binary format, the append-only writer, crash
//! recovery by replay, and a read-behind cursor that lets a live reader
//! trail the writer through the same file when the queue has offloaded
//! part of its tail to disk. It does not own queue state (the item list,
//! the tentative-pending transaction map, or the in-flight transaction-id
//! counter) — those belong to the caller; this crate only serializes and
//! deserializes the records that describe their changes.
//!
//! Typical use by the owning queue:
//!
//! ```no_run
//! use qjournal::{Journal, SystemClock};
//!
//! # fn main() -> qjournal::Result<()> {
//! // Rebuild in-memory state from whatever the journal already has.
//! qjournal::Journal::replay("queue.journal", &SystemClock, |record| {
//!     // apply `record` to the queue's item list / transaction map
//!     let _ = record;
//! })?;
//!
//! // Then open it live, to keep logging further state changes.
//! let mut journal = Journal::open("queue.journal", SystemClock)?;
//! journal.add(&qjournal::QItem { add_time: 0, expiry: 0, data: vec![1, 2, 3] })?;
//! journal.close();
//! # Ok(())
//! # }
//! ```

mod clock;
mod error;
mod journal;
mod read_behind;
mod record;
mod replay;
mod writer;

pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::error::{JournalError, Result};
pub use crate::journal::{Journal, ReadBehindStatus};
pub use crate::record::{QItem, Record};
