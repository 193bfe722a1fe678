//! spoolstream - spooled duplex byte buffer
//!
//! A sink for unbounded byte streams: the first N bytes stay in memory,
//! the remainder spills to a uniquely named temp file, and the complete
//! stream replays in write order through a pull-based interface with
//! native backpressure. Single producer, single consumer, no durability
//! across process restarts.

pub mod config;
pub mod observability;
pub mod scheduler;
pub mod spool;
pub mod stream;

pub use config::SpoolConfig;
pub use scheduler::Delivery;
pub use spool::{ReadError, ReadOutcome, TransferError, WriteError};
pub use stream::SpoolStream;
