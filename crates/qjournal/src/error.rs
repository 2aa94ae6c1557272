//! The journal's error taxonomy.
//!
//! Per the format's crash-recovery design, most decode-time failures
//! (truncated tail, unknown opcode) are *not* represented here: they are
//! logged and treated as the end of a recoverable prefix by [`crate::replay`]
//! rather than bubbled up as an [`Err`]. `JournalError` is reserved for
//! failures a caller actually has to react to: I/O errors on open, write,
//! or rotate, and the one fatal read-behind inconsistency.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, JournalError>;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// [`crate::read_behind::ReadBehind::fill_read_behind`] observed a
    /// synthetic `EndOfFile` record, which should be unreachable because the
    /// cursor checks its position against the writer before ever decoding.
    #[error("fill_read_behind observed EndOfFile, which should be unreachable")]
    ReadBehindInconsistency,
}
