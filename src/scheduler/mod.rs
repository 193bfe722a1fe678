//! Pull scheduler: bridges the pull-based replay engine to a push-based
//! consumer without busy-looping and without overrunning a paused
//! consumer.
//!
//! Each replay spawns one task that loops over three waits:
//!
//! 1. Reserve a send permit on the bounded delivery channel. A saturated
//!    consumer blocks the reservation, so no byte is read from the store
//!    until there is a slot to put it in; a paused consumer can never
//!    cause a read result to be dropped or skipped.
//! 2. Step the replay engine. `Pending` parks the task on a wake signal
//!    from the write side, with the configured poll interval as a
//!    liveness net in case a wake-up is ever missed.
//! 3. Send the delivery through the held permit.
//!
//! The task exits on end-of-stream, on a read error (delivered to the
//! consumer first), when the consumer drops the receiver (observed at
//! the permit gate and again while parked on `Pending`), or when the
//! instance is invalidated under it (delivered as an error). A single
//! task drives all reads, so a slow step can never overlap the next.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::{Mutex, Notify};
use tokio::time::{self, MissedTickBehavior};

use crate::spool::{ReadError, ReadOutcome, SpoolState};

/// One item handed to the consumer.
#[derive(Debug)]
pub enum Delivery {
    /// A non-empty chunk of replayed bytes, in write order.
    Data(Vec<u8>),
    /// The write side finished and every byte has been delivered.
    /// Always the last item on a clean replay.
    EndOfStream,
    /// A fatal stream error; no further deliveries follow.
    Error(ReadError),
}

/// Drives one replay of a spool's contents to one consumer.
pub(crate) struct PullScheduler {
    pub(crate) state: Arc<Mutex<SpoolState>>,
    pub(crate) data_ready: Arc<Notify>,
    pub(crate) poll_interval: Duration,
    pub(crate) chunk_size: usize,
}

impl PullScheduler {
    /// Spawns the delivery task. `capacity` (clamped to at least 1) is
    /// the number of undelivered chunks the consumer may hold before the
    /// scheduler stops reading; this is the backpressure window.
    pub(crate) fn spawn(self, capacity: usize) -> mpsc::Receiver<Delivery> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(self.run(tx));
        rx
    }

    async fn run(self, tx: mpsc::Sender<Delivery>) {
        let mut ticker = time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // Backpressure gate: hold a delivery slot before reading.
            let permit = match tx.reserve().await {
                Ok(permit) => permit,
                // Consumer went away; stop without touching the store.
                Err(_) => return,
            };

            let outcome = loop {
                let step = {
                    let mut state = self.state.lock().await;
                    state.read_next(self.chunk_size).await
                };
                match step {
                    Ok(ReadOutcome::Pending) => {
                        // Park until the write side signals new data (or
                        // end/disposal), bounded by the poll interval. A
                        // consumer that goes away mid-wait ends the replay
                        // here; the held permit is released on return.
                        tokio::select! {
                            _ = self.data_ready.notified() => {}
                            _ = ticker.tick() => {}
                            _ = tx.closed() => return,
                        }
                    }
                    other => break other,
                }
            };

            match outcome {
                Ok(ReadOutcome::Data(chunk)) => permit.send(Delivery::Data(chunk)),
                Ok(ReadOutcome::EndOfStream) => {
                    permit.send(Delivery::EndOfStream);
                    return;
                }
                Ok(ReadOutcome::Pending) => unreachable!("Pending is handled in the inner loop"),
                Err(e) => {
                    permit.send(Delivery::Error(e));
                    return;
                }
            }
        }
    }
}
