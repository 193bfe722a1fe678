//! Replay engine: walks the backing store in strict write order.
//!
//! The cursor is a sum type so an invalid position (memory index plus a
//! file offset, say) is unrepresentable. Memory segments are drained
//! strictly before any spill-file byte is read; within each domain bytes
//! come back in write order, reproducing exactly the sequence that was
//! written.
//!
//! "No data" is a tri-state, not an error:
//! - [`ReadOutcome::Pending`]: nothing available *yet*; the write side
//!   is still open and the caller should retry later.
//! - [`ReadOutcome::EndOfStream`]: the write side is finished and every
//!   byte has been delivered. Terminal.

use super::errors::ReadError;
use super::store::BackingStore;

/// Position of the next unread byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadCursor {
    /// Reading the memory segment list.
    InMemory { segment: usize, offset: usize },
    /// Memory is exhausted; reading the spill file.
    OnDisk { offset: u64 },
}

impl ReadCursor {
    /// Cursor at the very first byte of the stream.
    pub(crate) fn start() -> Self {
        ReadCursor::InMemory {
            segment: 0,
            offset: 0,
        }
    }
}

/// Result of one replay step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A non-empty chunk; the cursor has advanced past it.
    Data(Vec<u8>),
    /// No data available yet, write side still open. Retry later.
    Pending,
    /// Write side finished and every byte consumed. Terminal.
    EndOfStream,
}

impl BackingStore {
    /// Reads up to `max_bytes` at the cursor, advancing it on success.
    ///
    /// The cursor switches from memory to file mode only once the
    /// segment list is exhausted and the file holds bytes; it never
    /// moves backwards and never reads past `file_bytes`, so a reader
    /// cannot observe an in-flight write.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::Io`] if the spill-file read fails.
    pub(crate) async fn read_next(
        &mut self,
        cursor: &mut ReadCursor,
        finished: bool,
        max_bytes: usize,
    ) -> Result<ReadOutcome, ReadError> {
        let max_bytes = max_bytes.max(1);

        loop {
            match *cursor {
                ReadCursor::InMemory { segment, offset } => {
                    match self.segment(segment) {
                        Some(seg) if offset < seg.len() => {
                            let end = seg.len().min(offset + max_bytes);
                            let data = seg[offset..end].to_vec();
                            *cursor = ReadCursor::InMemory {
                                segment,
                                offset: end,
                            };
                            return Ok(ReadOutcome::Data(data));
                        }
                        // Current segment fully consumed; step to the next.
                        Some(_) => {
                            *cursor = ReadCursor::InMemory {
                                segment: segment + 1,
                                offset: 0,
                            };
                        }
                        None => {
                            if self.file_bytes() > 0 {
                                // Memory exhausted and the overflow lives on
                                // disk; the file starts where memory left off.
                                *cursor = ReadCursor::OnDisk { offset: 0 };
                            } else if finished {
                                return Ok(ReadOutcome::EndOfStream);
                            } else {
                                return Ok(ReadOutcome::Pending);
                            }
                        }
                    }
                }
                ReadCursor::OnDisk { offset } => {
                    if offset >= self.file_bytes() {
                        return Ok(if finished {
                            ReadOutcome::EndOfStream
                        } else {
                            ReadOutcome::Pending
                        });
                    }

                    let len = max_bytes.min((self.file_bytes() - offset) as usize);
                    let data = self.read_file_at(offset, len).await?;
                    *cursor = ReadCursor::OnDisk {
                        offset: offset + data.len() as u64,
                    };
                    return Ok(ReadOutcome::Data(data));
                }
            }
        }
    }
}
