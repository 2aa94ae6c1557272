//! Drives the record codec over an entire journal file, in order, tolerating
//! a truncated or corrupt tail the way a process that crashed mid-write
//! would leave one.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read};
use std::path::Path;

use crate::clock::Clock;
use crate::record::{decode_body, DecodeError, Record};

/// A [`Read`] wrapper that counts the bytes it has yielded, so the replayer
/// can report exactly how many bytes of the file it consumed.
struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

/// Replays `path` from the start, delivering each decoded [`Record`] to `f`
/// in file order, followed by a terminal [`Record::EndOfFile`].
///
/// Returns the number of bytes of `path` that were successfully consumed.
/// A missing file is treated as an empty journal (logged at `info`, not an
/// error). A truncated or corrupt tail stops replay early, after logging a
/// `warn`-level "data may have been lost" message, and is not surfaced to
/// the caller: the prefix already delivered to `f` is the queue's recovered
/// state.
pub fn replay(
    path:  &Path,
    clock: &dyn Clock,
    mut f: impl FnMut(Record),
) -> io::Result<u64> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "journal file not found, starting empty");
            f(Record::EndOfFile);
            return Ok(0);
        },
        Err(err) => return Err(err),
    };

    let mut reader = CountingReader { inner: BufReader::new(file), count: 0 };

    loop {
        let mut op_byte = [0_u8; 1];
        let n = loop {
            match reader.read(&mut op_byte) {
                Ok(n) => break n,
                // Not a real failure, just a signal arriving mid-syscall; retry the read
                // the same way `Read::read_exact`'s default impl does.
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                // A real I/O failure reading the opcode byte itself (not EOF) is not the
                // truncation case the format is designed to tolerate; surface it.
                Err(err) => return Err(err),
            }
        };
        if n == 0 {
            break; // clean EOF right before an opcode: a sane end of file.
        }

        match decode_body(op_byte[0], &mut reader, clock) {
            Ok(record) => f(record),
            Err(DecodeError::Io(err)) if err.kind() == ErrorKind::UnexpectedEof => {
                tracing::warn!(
                    path = %path.display(),
                    "journal record truncated mid-write, DATA MAY HAVE BEEN LOST",
                );
                break;
            },
            Err(DecodeError::Io(err)) => return Err(err),
            Err(DecodeError::InvalidOpcode(op)) => {
                tracing::warn!(
                    path = %path.display(),
                    opcode = op,
                    "unrecognized journal opcode, DATA MAY HAVE BEEN LOST",
                );
                break;
            },
        }
    }

    f(Record::EndOfFile);
    Ok(reader.count)
}
