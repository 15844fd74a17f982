//! Decodes a chunk into individual offset-tagged messages.
//!
//! Parsing is synchronous and CPU-bound; the only I/O this module touches
//! is handed to it already read into memory as a [`Chunk`].

use bytes::{Buf, Bytes};
use stream_protocol::{Chunk, CompressionType, Message, OffsetMessage};
use stream_std::errors::CodecError;
use stream_std::traits::Decompress;

const SUB_ENTRY_FLAG: u8 = 0x80;

/// One parsed record, or a per-message decode failure that the caller
/// should log and skip without aborting the rest of the chunk.
pub enum ParsedEntry {
    Message(OffsetMessage),
    Skipped { offset: u64, error: CodecError },
}

/// The outcome of decoding one entry at the current cursor position.
enum EntryOutcome {
    /// One or more messages decoded, `remaining` decremented by their count.
    Messages(Vec<Message>),
    /// The entry's byte span was fully consumed before the failure was
    /// discovered, so the cursor is already positioned at the next entry;
    /// parsing continues, decrementing `remaining` by the entry's declared
    /// record count.
    RecoverableSkip { error: CodecError, record_count: u32 },
    /// The entry's length could not be determined at all (a truncated
    /// header), so the cursor cannot be advanced past it; parsing must
    /// stop here.
    FatalSkip { error: CodecError },
}

/// Parses every record out of `chunk`, assigning offsets `chunk_id + n` in
/// delivery order. `resolve_decompressor` maps a
/// sub-entry's compression type to an implementation; an unresolved type is
/// a recoverable per-sub-entry decode error, not a panic.
pub fn parse_chunk(
    chunk: &Chunk,
    resolve_decompressor: impl Fn(CompressionType) -> Option<std::sync::Arc<dyn Decompress>>,
) -> Vec<ParsedEntry> {
    let mut cursor = chunk.data.clone();
    let mut remaining = chunk.num_records;
    let mut message_offset: u64 = 0;
    let mut out = Vec::new();

    while remaining > 0 && !cursor.is_empty() {
        let entry_type = cursor[0];

        let outcome = if entry_type & SUB_ENTRY_FLAG == 0 {
            read_standard_entry(&mut cursor)
        } else {
            read_sub_entry(&mut cursor, entry_type, &resolve_decompressor)
        };

        match outcome {
            EntryOutcome::Messages(messages) => {
                remaining = remaining.saturating_sub(messages.len() as u32);
                for message in messages {
                    out.push(ParsedEntry::Message(OffsetMessage {
                        offset: chunk.chunk_id + message_offset,
                        message,
                    }));
                    message_offset += 1;
                }
            }
            EntryOutcome::RecoverableSkip { error, record_count } => {
                out.push(ParsedEntry::Skipped {
                    offset: chunk.chunk_id + message_offset,
                    error,
                });
                message_offset += record_count as u64;
                remaining = remaining.saturating_sub(record_count);
            }
            EntryOutcome::FatalSkip { error } => {
                out.push(ParsedEntry::Skipped {
                    offset: chunk.chunk_id + message_offset,
                    error,
                });
                break;
            }
        }
    }

    out
}

fn read_standard_entry(cursor: &mut Bytes) -> EntryOutcome {
    if cursor.len() < 4 {
        return EntryOutcome::FatalSkip {
            error: CodecError::TruncatedEntry,
        };
    }
    let len = cursor.get_u32() as usize;
    if cursor.len() < len {
        return EntryOutcome::FatalSkip {
            error: CodecError::RecordLengthOutOfRange(len, cursor.len()),
        };
    }
    let body = cursor.split_to(len);
    EntryOutcome::Messages(vec![Message::new(body)])
}

fn read_sub_entry(
    cursor: &mut Bytes,
    entry_type: u8,
    resolve_decompressor: &impl Fn(CompressionType) -> Option<std::sync::Arc<dyn Decompress>>,
) -> EntryOutcome {
    cursor.advance(1);

    if cursor.len() < 2 + 4 + 4 {
        return EntryOutcome::FatalSkip {
            error: CodecError::TruncatedEntry,
        };
    }

    let compression = CompressionType::from_low_bits(entry_type & !SUB_ENTRY_FLAG);
    let records_in_batch = cursor.get_u16();
    let uncompressed_size = cursor.get_u32();
    let data_len = cursor.get_u32() as usize;

    if cursor.len() < data_len {
        return EntryOutcome::FatalSkip {
            error: CodecError::RecordLengthOutOfRange(data_len, cursor.len()),
        };
    }
    // The sub-entry's byte span is now fully known and consumed: any
    // failure from here on is recoverable, the cursor already sits at the
    // start of the next entry.
    let data = cursor.split_to(data_len);

    let uncompressed = match compression {
        CompressionType::None => data,
        other => match resolve_decompressor(other) {
            Some(decompressor) => match decompressor.decompress(data, uncompressed_size) {
                Ok(bytes) => bytes,
                Err(err) => {
                    return EntryOutcome::RecoverableSkip {
                        error: CodecError::DecompressFailure(err),
                        record_count: records_in_batch as u32,
                    }
                }
            },
            None => {
                return EntryOutcome::RecoverableSkip {
                    error: CodecError::UnknownCompressionType(other.low_bits()),
                    record_count: records_in_batch as u32,
                }
            }
        },
    };

    match decode_sub_entry_records(uncompressed, records_in_batch) {
        Ok(messages) => EntryOutcome::Messages(messages),
        Err(error) => EntryOutcome::RecoverableSkip {
            error,
            record_count: records_in_batch as u32,
        },
    }
}

fn decode_sub_entry_records(mut buf: Bytes, records_in_batch: u16) -> Result<Vec<Message>, CodecError> {
    let mut messages = Vec::with_capacity(records_in_batch as usize);
    for _ in 0..records_in_batch {
        if buf.len() < 4 {
            return Err(CodecError::TruncatedEntry);
        }
        let len = buf.get_u32() as usize;
        if buf.len() < len {
            return Err(CodecError::RecordLengthOutOfRange(len, buf.len()));
        }
        let body = buf.split_to(len);
        messages.push(Message::new(body));
    }
    Ok(messages)
}
