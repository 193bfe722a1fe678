//! Write accumulation policy: memory first, disk for the overflow.
//!
//! Each incoming chunk lands in memory while headroom remains; once the
//! threshold is reached every subsequent byte goes to the spill file. A
//! chunk that straddles the boundary is split inside a single call, so
//! accounting is never transiently wrong: `size` grows by exactly the
//! chunk length, memory-to-disk transition is monotonic, and no byte is
//! lost or duplicated.

use super::errors::WriteError;
use super::store::BackingStore;

impl BackingStore {
    /// Accumulates one chunk into the store.
    ///
    /// Empty chunks are a no-op. A failed spill-file write is fatal to
    /// the instance: the memory prefix written by the same call (if any)
    /// is kept, but `file_bytes` never advances past confirmed writes,
    /// so the committed size stays consistent.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::Io`] if the spill-file append fails.
    pub(crate) async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), WriteError> {
        if chunk.is_empty() {
            return Ok(());
        }

        let in_memory = self.headroom().min(chunk.len());
        if in_memory > 0 {
            self.push_segment(chunk[..in_memory].to_vec());
        }

        if in_memory < chunk.len() {
            self.append_file(&chunk[in_memory..]).await?;
        }

        Ok(())
    }
}
