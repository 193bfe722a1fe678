//! Construction parameters for a spool stream.
//!
//! All knobs have defaults; the zero-config path (`SpoolConfig::default()`)
//! spools into the platform temp directory with an 8 MiB memory window.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of bytes held in memory before spilling to disk.
pub const DEFAULT_MAX_MEMORY_BYTES: usize = 8 * 1024 * 1024;

/// Default scheduler tick period used as the liveness net while the
/// read side is waiting for more data.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default maximum bytes per scheduler-driven read.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Configuration for a [`SpoolStream`](crate::SpoolStream).
#[derive(Debug, Clone)]
pub struct SpoolConfig {
    /// Bytes kept in memory before overflow goes to the spill file.
    /// `0` sends every byte to disk.
    pub max_memory_bytes: usize,
    /// Directory the spill file is created in.
    pub temp_dir: PathBuf,
    /// Scheduler tick period (lower bound on wake-up latency when the
    /// write-side wake signal is missed).
    pub poll_interval: Duration,
    /// Maximum bytes handed to the consumer per delivery.
    pub chunk_size: usize,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: DEFAULT_MAX_MEMORY_BYTES,
            temp_dir: env::temp_dir(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SpoolConfig {
    /// Create a config with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the in-memory threshold before disk spill begins.
    pub fn with_max_memory_bytes(mut self, max_memory_bytes: usize) -> Self {
        self.max_memory_bytes = max_memory_bytes;
        self
    }

    /// Set the directory the spill file is created in.
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    /// Set the scheduler tick period.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the maximum bytes per scheduler-driven read.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Chunk size clamped to at least one byte.
    pub(crate) fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }

    /// Poll interval clamped to at least one millisecond so the interval
    /// timer never degenerates into a busy loop.
    pub(crate) fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.max(Duration::from_millis(1))
    }
}
