//! Append-only journal writer.
//!
//! Each public method appends exactly one complete record and advances
//! [`Writer::size`] by that record's exact byte length. `std::fs::File`'s
//! `Write::write_all` already loops until every byte is accepted by the OS
//! or an error occurs, which is the "retried in-place" contract this
//! module's methods need; there is no block-fragmentation to worry about
//! here; every record's length is either fixed by its opcode or written
//! explicitly in a length prefix, so a record is always one `write_all` call.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::record::{encode_add, encode_fixed, encode_zero, QItem, OP_CONFIRM_REMOVE, OP_REMOVE,
    OP_REMOVE_TENTATIVE, OP_SAVE_XID, OP_UNREMOVE};

/// An append-mode handle on the current journal file, tracking the running
/// byte size as records are written.
#[derive(Debug)]
pub(crate) struct Writer {
    file: File,
    size: u64,
}

impl Writer {
    /// Opens `path` for appending, creating it if absent, and seeds `size`
    /// from the file's current length (so reopening a non-empty journal
    /// after a restart starts `size` in the right place).
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let size = file.metadata()?.len();
        Ok(Self { file, size })
    }

    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    pub(crate) fn add(&mut self, item: &QItem) -> io::Result<()> {
        self.write_record(&encode_add(item))
    }

    pub(crate) fn remove(&mut self) -> io::Result<()> {
        self.write_record(&encode_zero(OP_REMOVE))
    }

    pub(crate) fn remove_tentative(&mut self) -> io::Result<()> {
        self.write_record(&encode_zero(OP_REMOVE_TENTATIVE))
    }

    pub(crate) fn save_xid(&mut self, xid: u32) -> io::Result<()> {
        self.write_record(&encode_fixed(OP_SAVE_XID, xid))
    }

    pub(crate) fn unremove(&mut self, xid: u32) -> io::Result<()> {
        self.write_record(&encode_fixed(OP_UNREMOVE, xid))
    }

    pub(crate) fn confirm_remove(&mut self, xid: u32) -> io::Result<()> {
        self.write_record(&encode_fixed(OP_CONFIRM_REMOVE, xid))
    }

    fn write_record(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)?;
        self.size += bytes.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn size_tracks_sum_of_record_lengths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal");
        let mut writer = Writer::open(&path).unwrap();
        assert_eq!(writer.size(), 0);

        writer.add(&QItem { add_time: 1, expiry: 0, data: b"hi".to_vec() }).unwrap();
        assert_eq!(writer.size(), 23); // 1 + 4 + 16 + 2

        writer.remove_tentative().unwrap();
        assert_eq!(writer.size(), 25);

        writer.save_xid(17).unwrap();
        assert_eq!(writer.size(), 30);

        let on_disk = std::fs::metadata(&path).unwrap().len();
        assert_eq!(on_disk, writer.size());
    }

    #[test]
    fn reopening_seeds_size_from_file_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal");
        {
            let mut writer = Writer::open(&path).unwrap();
            writer.remove().unwrap();
            writer.remove().unwrap();
        }
        let writer = Writer::open(&path).unwrap();
        assert_eq!(writer.size(), 2);
    }
}
