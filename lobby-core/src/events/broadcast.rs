//! Broadcast-channel EventBus

use std::sync::{Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::trace;

use super::LobbyEvent;
use super::bus::{EventBus, EventSeq};

/// Events a subscriber may fall behind by before it sees `Lagged`
pub const DEFAULT_CAPACITY: usize = 256;

/// EventBus over a tokio broadcast channel
///
/// Sequence numbers are assigned and sent under one lock, so every
/// subscriber observes them strictly increasing. Memory is bounded by the
/// channel capacity.
pub struct BroadcastEventBus {
    next_seq: Mutex<EventSeq>,
    tx: broadcast::Sender<(EventSeq, LobbyEvent)>,
}

impl BroadcastEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            next_seq: Mutex::new(0),
            tx,
        }
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus for BroadcastEventBus {
    fn publish(&self, event: LobbyEvent) -> EventSeq {
        let mut next_seq = self.next_seq.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = *next_seq;
        *next_seq += 1;
        if self.tx.send((seq, event)).is_err() {
            trace!(seq, "event published with no subscribers");
        }
        seq
    }

    fn subscribe(&self) -> broadcast::Receiver<(EventSeq, LobbyEvent)> {
        self.tx.subscribe()
    }
}
