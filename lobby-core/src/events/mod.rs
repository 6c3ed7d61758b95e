//! Event system for lobby coordinators

pub mod broadcast;
pub mod bus;
pub mod types;

pub use broadcast::BroadcastEventBus;
pub use bus::{EventBus, EventSeq};
pub use types::LobbyEvent;
