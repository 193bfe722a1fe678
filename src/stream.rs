//! Public duplex facade over the spool engine.
//!
//! A [`SpoolStream`] is written by one producer (`write` then `end`) and
//! replayed to one consumer, either by direct pulls (`read_next`) or
//! through the scheduler-driven push channel (`replay`). The producer
//! and consumer paths may run on independent tasks; one mutex serializes
//! every touch of the shared byte counters and cursor.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, Notify};

use crate::config::SpoolConfig;
use crate::scheduler::{Delivery, PullScheduler};
use crate::spool::{
    BackingStore, ReadError, ReadOutcome, SpoolState, TransferError, WriteError,
};

/// A spooled duplex byte buffer.
///
/// Accepts an unbounded stream of bytes, keeps the first
/// `max_memory_bytes` in memory, transparently overflows the remainder
/// to a uniquely named temp file, and replays the complete stream in
/// write order. The payload is never fully memory-resident and the
/// producer never needs to know its size in advance.
///
/// # Lifecycle
///
/// The backing storage is destroyed by an explicit [`clear`], not by
/// drop: a stream abandoned without `clear` leaks its spill file (an
/// accepted risk on abnormal termination). [`transfer`] hands the
/// storage to a fresh instance without copying a byte; the source is
/// invalidated and every later operation on it fails with an
/// `Invalidated` error.
///
/// [`clear`]: SpoolStream::clear
/// [`transfer`]: SpoolStream::transfer
pub struct SpoolStream {
    config: SpoolConfig,
    state: Arc<Mutex<SpoolState>>,
    /// Signaled by the write side (and lifecycle events) so a replay
    /// parked on `Pending` wakes up promptly instead of waiting out the
    /// poll interval.
    data_ready: Arc<Notify>,
}

impl SpoolStream {
    /// Creates an empty stream with a fresh spill file.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::Io`] if the spill file cannot be created
    /// (including a name collision, which the exclusive create rejects).
    pub async fn new(config: SpoolConfig) -> Result<Self, WriteError> {
        let store = BackingStore::create(&config).await?;
        Ok(Self {
            config,
            state: Arc::new(Mutex::new(SpoolState::new(store))),
            data_ready: Arc::new(Notify::new()),
        })
    }

    /// Creates an empty stream with the default configuration.
    pub async fn with_defaults() -> Result<Self, WriteError> {
        Self::new(SpoolConfig::default()).await
    }

    /// Appends a chunk to the stream.
    ///
    /// Bytes land in memory while headroom remains and on disk after;
    /// a chunk straddling the boundary is split in this call.
    ///
    /// # Errors
    ///
    /// - [`WriteError::Invalidated`] after `clear` or `transfer`.
    /// - [`WriteError::AlreadyFinished`] after `end`.
    /// - [`WriteError::Io`] on spill-file failure; the instance should
    ///   be treated as unusable and cleared.
    pub async fn write(&self, chunk: &[u8]) -> Result<(), WriteError> {
        {
            let mut state = self.state.lock().await;
            state.write_chunk(chunk).await?;
        }
        self.data_ready.notify_one();
        Ok(())
    }

    /// Marks the stream finished: no more writes will occur.
    ///
    /// Required for replay to ever report end-of-stream instead of
    /// staying pending forever. Idempotent while the instance is alive.
    pub async fn end(&self) -> Result<(), WriteError> {
        {
            let mut state = self.state.lock().await;
            state.finish()?;
        }
        self.data_ready.notify_one();
        Ok(())
    }

    /// Current logical byte count (memory plus spill file).
    pub async fn size(&self) -> Result<u64, ReadError> {
        self.state.lock().await.size()
    }

    /// Bytes currently held in memory segments.
    pub async fn memory_bytes(&self) -> Result<u64, ReadError> {
        let state = self.state.lock().await;
        state
            .store
            .as_ref()
            .map(|s| s.memory_bytes() as u64)
            .ok_or(ReadError::Invalidated)
    }

    /// Bytes spilled to the temp file.
    pub async fn file_bytes(&self) -> Result<u64, ReadError> {
        let state = self.state.lock().await;
        state
            .store
            .as_ref()
            .map(|s| s.file_bytes())
            .ok_or(ReadError::Invalidated)
    }

    /// Path of the spill file backing this stream.
    pub async fn spill_path(&self) -> Result<PathBuf, ReadError> {
        let state = self.state.lock().await;
        state
            .store
            .as_ref()
            .map(|s| s.spill_path().to_path_buf())
            .ok_or(ReadError::Invalidated)
    }

    /// One direct pull: up to `max_bytes` at the read cursor.
    ///
    /// See [`ReadOutcome`] for the data / pending / end tri-state.
    pub async fn read_next(&self, max_bytes: usize) -> Result<ReadOutcome, ReadError> {
        self.state.lock().await.read_next(max_bytes).await
    }

    /// Starts a scheduler-driven replay, delivering the stream's
    /// contents as they become available.
    ///
    /// `capacity` is the consumer's saturation window: the number of
    /// undelivered chunks that may be in flight before the scheduler
    /// stops reading. Receiving from the channel is the readiness
    /// signal; dropping it cancels the replay.
    ///
    /// The stream is single-consumer: at most one replay (or sequence of
    /// `read_next` pulls) should drive the cursor at a time.
    pub fn replay(&self, capacity: usize) -> mpsc::Receiver<Delivery> {
        PullScheduler {
            state: self.state.clone(),
            data_ready: self.data_ready.clone(),
            poll_interval: self.config.effective_poll_interval(),
            chunk_size: self.config.effective_chunk_size(),
        }
        .spawn(capacity)
    }

    /// Resets the read cursor to the first byte, so the retained stream
    /// can be replayed again from the start. The backing storage is
    /// untouched.
    pub async fn rewind(&self) -> Result<(), ReadError> {
        self.state.lock().await.rewind()
    }

    /// Whether this instance has been transferred away.
    pub async fn is_transferred(&self) -> bool {
        self.state.lock().await.moved
    }

    /// Hands the backing storage (segment list, spill-file handle, byte
    /// counters and read cursor) to a freshly constructed instance
    /// without copying any bytes.
    ///
    /// Exactly one successful transfer is permitted per instance. The
    /// source is invalidated: every later write, read or getter fails
    /// with `Invalidated`, and its own [`clear`](SpoolStream::clear)
    /// becomes a no-op with respect to the file: the target owns
    /// disposal from here on.
    ///
    /// # Errors
    ///
    /// - [`TransferError::AlreadyTransferred`] on a second attempt.
    /// - [`TransferError::Invalidated`] if the source was cleared first.
    pub async fn transfer(&self) -> Result<SpoolStream, TransferError> {
        let mut state = self.state.lock().await;
        if state.moved {
            return Err(TransferError::AlreadyTransferred);
        }
        let store = state.store.take().ok_or(TransferError::Invalidated)?;

        let mut target = SpoolState::new(store);
        target.cursor = state.cursor;
        target.finished = state.finished;
        state.moved = true;

        Ok(SpoolStream {
            config: self.config.clone(),
            state: Arc::new(Mutex::new(target)),
            data_ready: Arc::new(Notify::new()),
        })
    }

    /// Disposes the backing storage: closes the spill-file handle and
    /// unlinks the file.
    ///
    /// Idempotent and safe after errors or transfer (where it is a
    /// no-op). Cleanup is best-effort: close/unlink failures are logged,
    /// never raised. A replay parked on `Pending` is woken so it
    /// observes the invalidation and stops.
    pub async fn clear(&self) {
        {
            let mut state = self.state.lock().await;
            if let Some(store) = state.store.take() {
                store.dispose().await;
            }
        }
        self.data_ready.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn stream_in(dir: &TempDir, max_memory_bytes: usize) -> SpoolStream {
        let config = SpoolConfig::new()
            .with_temp_dir(dir.path())
            .with_max_memory_bytes(max_memory_bytes);
        SpoolStream::new(config).await.unwrap()
    }

    #[tokio::test]
    async fn test_write_after_end_is_rejected() {
        let dir = TempDir::new().unwrap();
        let stream = stream_in(&dir, 8).await;

        stream.write(b"ok").await.unwrap();
        stream.end().await.unwrap();
        // end() is idempotent...
        stream.end().await.unwrap();
        // ...but writing past it is an explicit error, not a silent drop.
        assert!(matches!(
            stream.write(b"late").await,
            Err(WriteError::AlreadyFinished)
        ));
        assert_eq!(stream.size().await.unwrap(), 2);

        stream.clear().await;
    }

    #[tokio::test]
    async fn test_operations_after_clear_fail_invalidated() {
        let dir = TempDir::new().unwrap();
        let stream = stream_in(&dir, 8).await;
        stream.write(b"x").await.unwrap();

        stream.clear().await;
        // Idempotent.
        stream.clear().await;

        assert!(matches!(
            stream.write(b"y").await,
            Err(WriteError::Invalidated)
        ));
        assert!(matches!(stream.end().await, Err(WriteError::Invalidated)));
        assert!(matches!(
            stream.read_next(16).await,
            Err(ReadError::Invalidated)
        ));
        assert!(matches!(stream.size().await, Err(ReadError::Invalidated)));
        assert!(matches!(stream.rewind().await, Err(ReadError::Invalidated)));
    }

    #[tokio::test]
    async fn test_direct_pull_roundtrip() {
        let dir = TempDir::new().unwrap();
        let stream = stream_in(&dir, 2).await;

        stream.write(b"AB").await.unwrap();
        stream.write(b"CD").await.unwrap();
        stream.write(b"EF").await.unwrap();
        stream.end().await.unwrap();

        assert_eq!(stream.memory_bytes().await.unwrap(), 2);
        assert_eq!(stream.file_bytes().await.unwrap(), 4);

        let mut replayed = Vec::new();
        loop {
            match stream.read_next(3).await.unwrap() {
                ReadOutcome::Data(chunk) => replayed.extend_from_slice(&chunk),
                ReadOutcome::EndOfStream => break,
                ReadOutcome::Pending => panic!("finished stream reported Pending"),
            }
        }
        assert_eq!(replayed, b"ABCDEF");

        stream.clear().await;
    }

    #[tokio::test]
    async fn test_rewind_replays_from_start() {
        let dir = TempDir::new().unwrap();
        let stream = stream_in(&dir, 2).await;

        stream.write(b"ABCD").await.unwrap();
        stream.end().await.unwrap();

        let mut first = Vec::new();
        loop {
            match stream.read_next(16).await.unwrap() {
                ReadOutcome::Data(chunk) => first.extend_from_slice(&chunk),
                ReadOutcome::EndOfStream => break,
                ReadOutcome::Pending => unreachable!(),
            }
        }
        assert_eq!(first, b"ABCD");

        stream.rewind().await.unwrap();

        let mut second = Vec::new();
        loop {
            match stream.read_next(16).await.unwrap() {
                ReadOutcome::Data(chunk) => second.extend_from_slice(&chunk),
                ReadOutcome::EndOfStream => break,
                ReadOutcome::Pending => unreachable!(),
            }
        }
        assert_eq!(second, b"ABCD");

        stream.clear().await;
    }
}
