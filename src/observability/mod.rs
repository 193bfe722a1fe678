//! Observability for the spool engine.
//!
//! Cleanup on disposal is best-effort: a close or unlink failure must
//! not be raised to the caller, but it must not vanish either. The
//! structured logger here is the channel for those secondary failures.
//!
//! # Principles
//!
//! 1. Observability is read-only: no side effects on engine state
//! 2. Synchronous, no buffering
//! 3. One log line = one event, deterministic field ordering

mod logger;

pub use logger::{Logger, Severity};
