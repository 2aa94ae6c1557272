//! Wire format for journal records: opcodes, block layouts, and the pure
//! encode/decode functions that know nothing about files or offsets.

use std::io::{self, Read};

use crate::clock::Clock;

/// `Add`, opcode 2: `[op][u32 len][u64 add_time][u64 expiry][data]`.
pub(crate) const OP_ADD: u8 = 2;
/// `AddLegacy`, opcode 0, decode-only: `[op][u32 len][u32 expiry_secs][data]`.
pub(crate) const OP_ADD_LEGACY: u8 = 0;
/// `Remove`, opcode 1: `[op]`.
pub(crate) const OP_REMOVE: u8 = 1;
/// `RemoveTentative`, opcode 3: `[op]`.
pub(crate) const OP_REMOVE_TENTATIVE: u8 = 3;
/// `SaveXid`, opcode 4: `[op][u32 xid]`.
pub(crate) const OP_SAVE_XID: u8 = 4;
/// `Unremove`, opcode 5: `[op][u32 xid]`.
pub(crate) const OP_UNREMOVE: u8 = 5;
/// `ConfirmRemove`, opcode 6: `[op][u32 xid]`.
pub(crate) const OP_CONFIRM_REMOVE: u8 = 6;

/// Header size of an `Add` block's item portion: `add_time` (8) + `expiry` (8).
const ITEM_HEADER_LEN: usize = 16;

/// An item enqueued in the FIFO, as serialized by the journal.
///
/// The transaction id a queue associates with a pending remove is tracked
/// by the caller and is never part of this struct or of the serialized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QItem {
    /// Absolute enqueue time, in milliseconds.
    pub add_time: u64,
    /// Absolute expiry time, in milliseconds. `0` means the item never expires.
    pub expiry: u64,
    /// Opaque payload.
    pub data: Vec<u8>,
}

/// One decoded journal record, tagged by opcode.
///
/// `EndOfFile` is synthetic: the replayer emits it once after the last real
/// record to mark a clean end of stream. It is never written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Add(QItem),
    Remove,
    RemoveTentative,
    SaveXid(u32),
    Unremove(u32),
    ConfirmRemove(u32),
    EndOfFile,
}

/// Encodes an `Add` record (opcode 2) into a freshly allocated buffer.
pub(crate) fn encode_add(item: &QItem) -> Vec<u8> {
    let block_len = ITEM_HEADER_LEN + item.data.len();
    let block_len = u32::try_from(block_len).expect("Add payload exceeds u32::MAX bytes");
    let mut buf = Vec::with_capacity(1 + 4 + block_len as usize);
    buf.push(OP_ADD);
    buf.extend_from_slice(&block_len.to_le_bytes());
    buf.extend_from_slice(&item.add_time.to_le_bytes());
    buf.extend_from_slice(&item.expiry.to_le_bytes());
    buf.extend_from_slice(&item.data);
    buf
}

/// Encodes a zero-payload record (`Remove` or `RemoveTentative`): one byte.
pub(crate) fn encode_zero(op: u8) -> [u8; 1] {
    [op]
}

/// Encodes a fixed-payload record (`SaveXid`, `Unremove`, `ConfirmRemove`):
/// `[op][u32 xid]`, five bytes total.
pub(crate) fn encode_fixed(op: u8, xid: u32) -> [u8; 5] {
    let mut buf = [0_u8; 5];
    buf[0] = op;
    buf[1..5].copy_from_slice(&xid.to_le_bytes());
    buf
}

/// A journal record could not be decoded.
///
/// `Io` with [`io::ErrorKind::UnexpectedEof`] means the record was truncated
/// mid-flight; the replayer and read-behind cursor treat that specially.
/// `InvalidOpcode` means the opcode byte itself did not name a known record.
#[derive(Debug)]
pub(crate) enum DecodeError {
    Io(io::Error),
    InvalidOpcode(u8),
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl DecodeError {
    /// Whether this failure is the truncation case (EOF inside a record),
    /// as opposed to an unrecoverable I/O error or a bad opcode.
    pub(crate) fn is_truncation(&self) -> bool {
        matches!(self, Self::Io(err) if err.kind() == io::ErrorKind::UnexpectedEof)
    }
}

/// Decodes the body of a record given its already-consumed opcode byte.
///
/// `reader` must yield exactly the bytes following the opcode; an EOF part
/// way through a block is surfaced as [`DecodeError::Io`] with
/// [`io::ErrorKind::UnexpectedEof`], which the caller is expected to treat
/// as truncation rather than a hard failure.
pub(crate) fn decode_body(
    op:     u8,
    reader: &mut impl Read,
    clock:  &dyn Clock,
) -> Result<Record, DecodeError> {
    match op {
        OP_REMOVE => Ok(Record::Remove),
        OP_REMOVE_TENTATIVE => Ok(Record::RemoveTentative),
        OP_SAVE_XID => Ok(Record::SaveXid(read_u32(reader)?)),
        OP_UNREMOVE => Ok(Record::Unremove(read_u32(reader)?)),
        OP_CONFIRM_REMOVE => Ok(Record::ConfirmRemove(read_u32(reader)?)),
        OP_ADD => decode_add_block(reader),
        OP_ADD_LEGACY => decode_add_legacy_block(reader, clock),
        other => Err(DecodeError::InvalidOpcode(other)),
    }
}

fn decode_add_block(reader: &mut impl Read) -> Result<Record, DecodeError> {
    let block_len = read_u32(reader)? as usize;
    let data_len = block_len.checked_sub(ITEM_HEADER_LEN).ok_or_else(|| {
        DecodeError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            "Add block shorter than its 16-byte item header",
        ))
    })?;
    let add_time = read_u64(reader)?;
    let expiry = read_u64(reader)?;
    let data = read_exact_vec(reader, data_len)?;
    Ok(Record::Add(QItem { add_time, expiry, data }))
}

fn decode_add_legacy_block(reader: &mut impl Read, clock: &dyn Clock) -> Result<Record, DecodeError> {
    let block_len = read_u32(reader)? as usize;
    let data_len = block_len.checked_sub(4).ok_or_else(|| {
        DecodeError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            "AddLegacy block shorter than its 4-byte expiry field",
        ))
    })?;
    let expiry_secs = read_u32(reader)?;
    let data = read_exact_vec(reader, data_len)?;
    let expiry = if expiry_secs == 0 { 0 } else { u64::from(expiry_secs) * 1000 };
    Ok(Record::Add(QItem { add_time: clock.now_millis(), expiry, data }))
}

fn read_u32(reader: &mut impl Read) -> io::Result<u32> {
    let mut buf = [0_u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(reader: &mut impl Read) -> io::Result<u64> {
    let mut buf = [0_u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_exact_vec(reader: &mut impl Read, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0_u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    #[test]
    fn round_trips_add() {
        let item = QItem { add_time: 1000, expiry: 0, data: b"hi".to_vec() };
        let bytes = encode_add(&item);
        assert_eq!(bytes.len(), 23);
        assert_eq!(bytes[0], OP_ADD);

        let mut rest = &bytes[1..];
        let record = decode_body(OP_ADD, &mut rest, &FixedClock::new(0)).unwrap();
        assert_eq!(record, Record::Add(item));
    }

    #[test]
    fn decodes_legacy_add_with_synthesized_time() {
        let mut block = Vec::new();
        block.extend_from_slice(&10_u32.to_le_bytes()); // block_len = 4 + data_len(6)
        block.extend_from_slice(&0_u32.to_le_bytes()); // expiry_secs = 0
        block.extend_from_slice(b"legacy");

        let mut rest = &block[..];
        let record = decode_body(OP_ADD_LEGACY, &mut rest, &FixedClock::new(4242)).unwrap();
        assert_eq!(
            record,
            Record::Add(QItem { add_time: 4242, expiry: 0, data: b"legacy".to_vec() }),
        );
    }

    #[test]
    fn legacy_expiry_is_seconds_times_a_thousand() {
        let mut block = Vec::new();
        block.extend_from_slice(&4_u32.to_le_bytes());
        block.extend_from_slice(&30_u32.to_le_bytes());

        let mut rest = &block[..];
        let record = decode_body(OP_ADD_LEGACY, &mut rest, &FixedClock::new(0)).unwrap();
        match record {
            Record::Add(item) => assert_eq!(item.expiry, 30_000),
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn unknown_opcode_is_invalid() {
        let mut rest: &[u8] = &[];
        let err = decode_body(9, &mut rest, &FixedClock::new(0)).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidOpcode(9)));
    }

    #[test]
    fn truncated_fixed_record_is_detected() {
        let mut rest: &[u8] = &[1, 2]; // only 2 of the 4 xid bytes
        let err = decode_body(OP_SAVE_XID, &mut rest, &FixedClock::new(0)).unwrap_err();
        assert!(err.is_truncation());
    }
}
