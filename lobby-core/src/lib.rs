//! lobby-core: Session lifecycle coordination for multiplayer lobbies
//!
//! This crate sequences hosting, searching, joining and tearing down a lobby
//! session on top of an asynchronous session provider:
//!
//! - **Coordinator** - [`SessionCoordinator`] owns the single local session and the last search results
//! - **Provider boundary** - [`SessionProvider`] trait, with [`MockProvider`] and [`LoopbackProvider`] in-tree
//! - **Event system** - [`EventBus`] trait and [`BroadcastEventBus`] carrying [`LobbyEvent`]s
//! - **Facade** - [`LobbyFacade`] for one local player, driving a [`Transition`] from events
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lobby_core::{
//!     BroadcastEventBus, CoordinatorConfig, LobbyEvent, LoopbackNetwork, SessionConfig,
//!     SessionCoordinator,
//! };
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let network = LoopbackNetwork::new();
//!     let coordinator = SessionCoordinator::new(
//!         Arc::new(network.provider()),
//!         Arc::new(BroadcastEventBus::default()),
//!         CoordinatorConfig::default(),
//!     );
//!
//!     let mut events = coordinator.subscribe();
//!     coordinator.host("alice", &SessionConfig::default()).await?;
//!
//!     while let Ok((_, event)) = events.recv().await {
//!         if let LobbyEvent::HostingStarted { level, .. } = event {
//!             println!("hosting on {level}");
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   intent    ┌────────────────────┐  requests  ┌─────────────────┐
//! │ LobbyFacade  │────────────▶│ SessionCoordinator │───────────▶│ SessionProvider │
//! │ (Transition) │◀────────────│   (state machine)  │◀───────────│                 │
//! └──────────────┘ LobbyEvents └────────────────────┘ completions└─────────────────┘
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod facade;
pub mod provider;
pub mod session;

// Re-export key types for convenience
pub use config::{CoordinatorConfig, OperationTimeouts, PasswordAdvertisement, SearchSettings};
pub use coordinator::{
    CompletionSubscription, CoordinatorState, DestroyOutcome, OwnedSession, SessionCoordinator,
    SessionRole,
};
pub use error::{LobbyError, ProviderError};
pub use events::{BroadcastEventBus, EventBus, EventSeq, LobbyEvent};
pub use facade::{LobbyFacade, LoggingTransition, Transition, drive_transition};
pub use provider::{
    Completion, CompletionNotice, CompletionSender, JoinResultCode, ListenerHandle,
    ListenerRegistry, LoopbackNetwork, LoopbackProvider, MockOutcome, MockProvider, OperationKind,
    ProviderRequest, RequestId, SessionProvider,
};
pub use session::{
    AdvertisedSettings, SearchQuery, SearchResult, SearchSnapshot, SessionConfig, SessionRecord,
};
