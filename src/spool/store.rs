//! Backing store: the memory segment list plus the spill-file handle.
//!
//! The store is a pure data holder with size accounting. Policy lives
//! elsewhere: the write accumulator (`writer`) decides what lands in
//! memory versus on disk, the replay engine (`reader`) decides what to
//! hand back and in which order.
//!
//! # Invariants
//!
//! - Memory segments are append-only and never mutated after insertion;
//!   insertion order is write order.
//! - `memory_bytes <= max_memory_bytes` at all times.
//! - Disk writes are sequential: every write lands at offset `file_bytes`,
//!   and `file_bytes` advances only after the write is confirmed.
//! - Logical size is exactly `memory_bytes + file_bytes`.
//! - The spill file is exclusively owned: it is created fresh (open fails
//!   if the name already exists) and unlinked on disposal.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::Rng;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::config::SpoolConfig;
use crate::observability::{Logger, Severity};

/// Owns the in-memory prefix and the on-disk remainder of one logical
/// byte stream.
///
/// Disposal consumes the store, so a disposed store cannot be touched
/// again and the spill file can never be double-released. Ownership
/// transfer is a plain move of this struct.
pub struct BackingStore {
    /// Immutable byte chunks in write order.
    segments: Vec<Vec<u8>>,
    /// Total bytes across `segments`.
    memory_bytes: usize,
    /// Threshold before overflow goes to disk.
    max_memory_bytes: usize,
    /// Exclusive read+write handle to the spill file.
    file: File,
    /// Path of the spill file, for disposal.
    file_path: PathBuf,
    /// Bytes written to the spill file so far.
    file_bytes: u64,
}

impl BackingStore {
    /// Creates an empty store with a freshly created spill file in
    /// `config.temp_dir`.
    ///
    /// The file name combines process id, millisecond timestamp and a
    /// random suffix, and the file is opened with `create_new` so a
    /// colliding name fails instead of silently sharing a file.
    pub(crate) async fn create(config: &SpoolConfig) -> std::io::Result<Self> {
        let file_path = config.temp_dir.join(format!(
            ".{}.{}-{:08}.tmp",
            std::process::id(),
            Utc::now().timestamp_millis(),
            rand::thread_rng().gen_range(0..100_000_000u32),
        ));

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&file_path)
            .await?;

        Logger::log(
            Severity::Info,
            "spill_file_created",
            &[("path", &file_path.display().to_string())],
        );

        Ok(Self {
            segments: Vec::new(),
            memory_bytes: 0,
            max_memory_bytes: config.max_memory_bytes,
            file,
            file_path,
            file_bytes: 0,
        })
    }

    /// Total logical size: memory bytes plus spill-file bytes.
    pub(crate) fn size(&self) -> u64 {
        self.memory_bytes as u64 + self.file_bytes
    }

    /// Bytes currently held in memory segments.
    pub(crate) fn memory_bytes(&self) -> usize {
        self.memory_bytes
    }

    /// Bytes written to the spill file.
    pub(crate) fn file_bytes(&self) -> u64 {
        self.file_bytes
    }

    /// Remaining in-memory headroom before writes overflow to disk.
    pub(crate) fn headroom(&self) -> usize {
        self.max_memory_bytes.saturating_sub(self.memory_bytes)
    }

    /// Path of the spill file.
    pub(crate) fn spill_path(&self) -> &Path {
        &self.file_path
    }

    /// The memory segment at `index`, if it exists.
    pub(crate) fn segment(&self, index: usize) -> Option<&[u8]> {
        self.segments.get(index).map(Vec::as_slice)
    }

    /// Appends a segment to the memory list.
    ///
    /// The caller (the write accumulator) must have checked headroom;
    /// this only does the bookkeeping.
    pub(crate) fn push_segment(&mut self, segment: Vec<u8>) {
        debug_assert!(segment.len() <= self.headroom());
        self.memory_bytes += segment.len();
        self.segments.push(segment);
    }

    /// Appends `data` to the spill file at offset `file_bytes`.
    ///
    /// The counter advances only after the write and flush complete, so a
    /// reader can never observe bytes that are not yet on disk.
    pub(crate) async fn append_file(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(self.file_bytes)).await?;
        self.file.write_all(data).await?;
        self.file.flush().await?;
        self.file_bytes += data.len() as u64;
        Ok(())
    }

    /// Reads exactly `len` bytes from the spill file at `offset`.
    ///
    /// Callers must stay within `file_bytes`; the sequential-append
    /// invariant guarantees those bytes exist.
    pub(crate) async fn read_file_at(&mut self, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
        debug_assert!(offset + len as u64 <= self.file_bytes);
        self.file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = vec![0u8; len];
        self.file.read_exact(&mut buf).await?;
        Ok(buf)
    }

    /// Closes the spill-file handle and unlinks the file.
    ///
    /// Best-effort: both steps are attempted even if the first fails, and
    /// failures are logged rather than raised. Consuming `self` makes a
    /// second disposal unrepresentable.
    pub(crate) async fn dispose(self) {
        let Self {
            mut file, file_path, ..
        } = self;

        if let Err(e) = file.shutdown().await {
            Logger::log(
                Severity::Warn,
                "spill_file_close_failed",
                &[
                    ("path", &file_path.display().to_string()),
                    ("error", &e.to_string()),
                ],
            );
        }
        drop(file);

        if let Err(e) = fs::remove_file(&file_path).await {
            Logger::log(
                Severity::Warn,
                "spill_file_unlink_failed",
                &[
                    ("path", &file_path.display().to_string()),
                    ("error", &e.to_string()),
                ],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> SpoolConfig {
        SpoolConfig::new().with_temp_dir(dir.path())
    }

    #[tokio::test]
    async fn test_create_makes_fresh_empty_file() {
        let dir = TempDir::new().unwrap();
        let store = BackingStore::create(&config_in(&dir)).await.unwrap();

        assert!(store.spill_path().exists());
        assert_eq!(store.size(), 0);
        assert_eq!(store.memory_bytes(), 0);
        assert_eq!(store.file_bytes(), 0);
    }

    #[tokio::test]
    async fn test_spill_file_names_are_unique() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let a = BackingStore::create(&config).await.unwrap();
        let b = BackingStore::create(&config).await.unwrap();

        assert_ne!(a.spill_path(), b.spill_path());
    }

    #[tokio::test]
    async fn test_append_then_read_back() {
        let dir = TempDir::new().unwrap();
        let mut store = BackingStore::create(&config_in(&dir)).await.unwrap();

        store.append_file(b"hello ").await.unwrap();
        store.append_file(b"world").await.unwrap();
        assert_eq!(store.file_bytes(), 11);

        let all = store.read_file_at(0, 11).await.unwrap();
        assert_eq!(all, b"hello world");

        let tail = store.read_file_at(6, 5).await.unwrap();
        assert_eq!(tail, b"world");
    }

    #[tokio::test]
    async fn test_segment_accounting() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir).with_max_memory_bytes(16);
        let mut store = BackingStore::create(&config).await.unwrap();

        store.push_segment(b"ab".to_vec());
        store.push_segment(b"cdef".to_vec());

        assert_eq!(store.memory_bytes(), 6);
        assert_eq!(store.headroom(), 10);
        assert_eq!(store.segment(0), Some(&b"ab"[..]));
        assert_eq!(store.segment(1), Some(&b"cdef"[..]));
        assert_eq!(store.segment(2), None);
        assert_eq!(store.size(), 6);
    }

    #[tokio::test]
    async fn test_dispose_unlinks_spill_file() {
        let dir = TempDir::new().unwrap();
        let store = BackingStore::create(&config_in(&dir)).await.unwrap();
        let path = store.spill_path().to_path_buf();

        assert!(path.exists());
        store.dispose().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_dispose_after_unlink_does_not_panic() {
        let dir = TempDir::new().unwrap();
        let store = BackingStore::create(&config_in(&dir)).await.unwrap();
        let path = store.spill_path().to_path_buf();

        std::fs::remove_file(&path).unwrap();
        store.dispose().await;
    }
}
