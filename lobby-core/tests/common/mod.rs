//! Shared test utilities for lobby-core integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use lobby_core::config::PasswordAdvertisement;
use lobby_core::{
    AdvertisedSettings, BroadcastEventBus, CoordinatorConfig, CoordinatorState, EventBus,
    EventSeq, LobbyEvent, MockProvider, SessionConfig, SessionCoordinator, SessionProvider,
    SessionRecord,
};
use tokio::sync::broadcast;

/// A coordinator over a MockProvider, with a live event subscription
///
/// `log` is a second subscription left untouched by `next_event`, so tests
/// can inspect everything published since the harness was built.
pub struct Harness {
    pub mock: Arc<MockProvider>,
    pub coordinator: SessionCoordinator,
    pub events: broadcast::Receiver<(EventSeq, LobbyEvent)>,
    log: broadcast::Receiver<(EventSeq, LobbyEvent)>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_provider(MockProvider::new(), CoordinatorConfig::default())
    }

    pub fn with_provider(mock: MockProvider, config: CoordinatorConfig) -> Self {
        let mock = Arc::new(mock);
        let provider: Arc<dyn SessionProvider> = mock.clone();
        let event_bus: Arc<dyn EventBus> = Arc::new(BroadcastEventBus::new(1024));
        let coordinator = SessionCoordinator::new(provider, event_bus, config);
        let events = coordinator.subscribe();
        let log = coordinator.subscribe();
        Self {
            mock,
            coordinator,
            events,
            log,
        }
    }

    /// Next event other than a state change
    pub async fn next_event(&mut self) -> LobbyEvent {
        next_event(&mut self.events).await
    }

    /// Events published since the last call, in order
    pub fn history(&mut self) -> Vec<LobbyEvent> {
        let mut events = Vec::new();
        while let Ok((_, event)) = self.log.try_recv() {
            events.push(event);
        }
        events
    }

    /// Yield until the coordinator reaches `state`
    pub async fn wait_for_state(&self, state: CoordinatorState) {
        for _ in 0..1000 {
            if self.coordinator.state().await == state {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!(
            "coordinator never reached {state}, stuck in {}",
            self.coordinator.state().await
        );
    }
}

/// Next event other than a state change, bounded so a broken test fails fast
pub async fn next_event(rx: &mut broadcast::Receiver<(EventSeq, LobbyEvent)>) -> LobbyEvent {
    loop {
        let (_, event) = tokio::time::timeout(Duration::from_secs(60), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event bus closed");
        if !matches!(event, LobbyEvent::StateChanged { .. }) {
            return event;
        }
    }
}

/// A search record for a session hosted by `owner_id`
pub fn record(owner_id: &str, config: &SessionConfig, open: u32) -> SessionRecord {
    SessionRecord {
        owner_id: owner_id.to_string(),
        session_id: format!("{owner_id}-session"),
        settings: AdvertisedSettings::from_config(config, PasswordAdvertisement::Cleartext),
        open_public_connections: open,
        ping_ms: 20,
    }
}
