//! Error taxonomy for the spool engine.
//!
//! Every failure is scoped to one storage instance and reported to the
//! caller of the operation that triggered it; nothing is swallowed and
//! nothing is fatal to the process. I/O failures are terminal for the
//! instance; there are no automatic retries.

use std::io;

use thiserror::Error;

/// Errors surfaced on the producer (write) path.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Underlying spill-file write failed. The instance is unusable
    /// afterwards and should be disposed.
    #[error("spill file write failed: {0}")]
    Io(#[from] io::Error),

    /// The instance has been disposed or transferred away.
    #[error("stream storage is invalidated (disposed or transferred away)")]
    Invalidated,

    /// A write arrived after `end()` marked the stream finished.
    #[error("write after end of stream")]
    AlreadyFinished,
}

/// Errors surfaced on the consumer (read/replay) path.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Underlying spill-file read failed. The instance is unusable
    /// afterwards and should be disposed.
    #[error("spill file read failed: {0}")]
    Io(#[from] io::Error),

    /// The instance has been disposed or transferred away.
    #[error("stream storage is invalidated (disposed or transferred away)")]
    Invalidated,
}

/// Errors surfaced by the one-shot ownership transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The instance has already been transferred once.
    #[error("stream storage has already been transferred")]
    AlreadyTransferred,

    /// The instance was disposed before the transfer attempt.
    #[error("stream storage is invalidated (disposed or transferred away)")]
    Invalidated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_preserves_source() {
        let err = WriteError::from(io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(matches!(err, WriteError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_invalidated_messages_name_both_causes() {
        for msg in [
            WriteError::Invalidated.to_string(),
            ReadError::Invalidated.to_string(),
            TransferError::Invalidated.to_string(),
        ] {
            assert!(msg.contains("disposed"));
            assert!(msg.contains("transferred"));
        }
    }

    #[test]
    fn test_already_transferred_is_distinct_from_invalidated() {
        assert_ne!(
            TransferError::AlreadyTransferred.to_string(),
            TransferError::Invalidated.to_string()
        );
    }
}
