//! EventBus trait definition
//!
//! Coordinators publish every observable outcome here for whoever is
//! listening right now. Nothing is retained: state that outlives an event
//! lives on the coordinator and is read through its accessors.

use tokio::sync::broadcast;

use super::LobbyEvent;

/// Position of an event in publish order
pub type EventSeq = u64;

/// Fan-out of [`LobbyEvent`]s to live subscribers
pub trait EventBus: Send + Sync {
    /// Publish an event, returning the sequence number it was given
    fn publish(&self, event: LobbyEvent) -> EventSeq;

    /// Receive every event published from now on
    fn subscribe(&self) -> broadcast::Receiver<(EventSeq, LobbyEvent)>;
}
