use crate::message::Message;
use bytes::Bytes;

/// The compression type carried in a sub-entry's header byte: the low 7
/// bits of the entry type byte once its high bit marks the entry as a
/// sub-entry batch rather than a standard record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CompressionType {
    None,
    Gzip,
    Reserved(u8),
}

impl CompressionType {
    pub fn from_low_bits(bits: u8) -> Self {
        match bits {
            0 => Self::None,
            1 => Self::Gzip,
            other => Self::Reserved(other),
        }
    }

    pub fn low_bits(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Gzip => 1,
            Self::Reserved(bits) => *bits,
        }
    }
}

/// A decoded broker chunk: the unit of transfer for a stream subscription.
///
/// `chunk_id` is the 64-bit offset of the first message in `data`; per-message
/// offsets are `chunk_id + n` for the `n`th message decoded out of the chunk.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub chunk_id: u64,
    pub timestamp: i64,
    pub num_records: u32,
    pub data: Bytes,
}

impl Chunk {
    pub fn new(chunk_id: u64, timestamp: i64, num_records: u32, data: Bytes) -> Self {
        Self {
            chunk_id,
            timestamp,
            num_records,
            data,
        }
    }
}

/// A message decoded out of a chunk, tagged with the offset it was assigned
/// during parsing.
#[derive(Debug, Clone)]
pub struct OffsetMessage {
    pub offset: u64,
    pub message: Message,
}
