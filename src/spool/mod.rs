//! Spool engine: memory-first byte storage with transparent disk overflow.
//!
//! A spool accepts an unbounded stream of bytes, keeps the first
//! `max_memory_bytes` in memory and spills the remainder to a uniquely
//! named temp file, then replays the whole stream in write order.
//!
//! # Design principles
//!
//! - Single producer, single consumer; no broadcast.
//! - Memory-to-disk transition is monotonic per instance.
//! - Replay order is exactly write order (memory prefix, then file).
//! - Invalidation (disposal or transfer) is a terminal state; every
//!   later operation fails loudly instead of silently no-opping.
//! - Not a persistent store: the spill file dies with the instance.

mod errors;
mod reader;
mod store;
mod writer;

pub use errors::{ReadError, TransferError, WriteError};
pub use reader::ReadOutcome;

pub(crate) use reader::ReadCursor;
pub(crate) use store::BackingStore;

/// Mutable engine state shared between the producer path, the consumer
/// path and lifecycle operations. All access is serialized by the
/// facade's mutex; this struct is the single mutation entry point, so
/// external code can never corrupt the size or cursor invariants.
///
/// `store: None` means the instance is invalidated: either disposed or
/// transferred away. `moved` tells the two cases apart where the
/// distinction matters (a second transfer attempt).
pub(crate) struct SpoolState {
    pub(crate) store: Option<BackingStore>,
    pub(crate) cursor: ReadCursor,
    pub(crate) finished: bool,
    pub(crate) moved: bool,
}

impl SpoolState {
    pub(crate) fn new(store: BackingStore) -> Self {
        Self {
            store: Some(store),
            cursor: ReadCursor::start(),
            finished: false,
            moved: false,
        }
    }

    /// Producer path: accumulate one chunk.
    pub(crate) async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), WriteError> {
        let store = self.store.as_mut().ok_or(WriteError::Invalidated)?;
        if self.finished {
            return Err(WriteError::AlreadyFinished);
        }
        store.write_chunk(chunk).await
    }

    /// Marks the write side finished. Idempotent while the instance is
    /// alive; required for replay to ever report end-of-stream.
    pub(crate) fn finish(&mut self) -> Result<(), WriteError> {
        if self.store.is_none() {
            return Err(WriteError::Invalidated);
        }
        self.finished = true;
        Ok(())
    }

    /// Consumer path: one replay step at the current cursor.
    pub(crate) async fn read_next(&mut self, max_bytes: usize) -> Result<ReadOutcome, ReadError> {
        let Self {
            store,
            cursor,
            finished,
            ..
        } = self;
        let store = store.as_mut().ok_or(ReadError::Invalidated)?;
        store.read_next(cursor, *finished, max_bytes).await
    }

    /// Current logical size (memory plus file bytes).
    pub(crate) fn size(&self) -> Result<u64, ReadError> {
        self.store
            .as_ref()
            .map(BackingStore::size)
            .ok_or(ReadError::Invalidated)
    }

    /// Resets the cursor to the first byte of the stream.
    pub(crate) fn rewind(&mut self) -> Result<(), ReadError> {
        if self.store.is_none() {
            return Err(ReadError::Invalidated);
        }
        self.cursor = ReadCursor::start();
        Ok(())
    }
}
