//! Caller-facing lobby surface
//!
//! LobbyFacade forwards player intent to a [`SessionCoordinator`] on behalf
//! of one local player, and drives level transitions from the events the
//! coordinator publishes.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::coordinator::{DestroyOutcome, SessionCoordinator};
use crate::error::LobbyError;
use crate::events::LobbyEvent;
use crate::session::{SearchResult, SessionConfig};

/// Level and travel hooks of the hosting application
pub trait Transition: Send + Sync {
    /// Open `level`, listening for clients when hosting
    fn open_level(&self, level: &str, listen: bool);

    /// Travel to a joined session
    fn client_travel(&self, connect_string: &str);

    /// Go back to the menu after the session is gone
    fn return_to_menu(&self, menu_level: &str);
}

/// Transition that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingTransition;

impl Transition for LoggingTransition {
    fn open_level(&self, level: &str, listen: bool) {
        info!(%level, listen, "opening level");
    }

    fn client_travel(&self, connect_string: &str) {
        info!(%connect_string, "travelling to session");
    }

    fn return_to_menu(&self, menu_level: &str) {
        info!(%menu_level, "returning to menu");
    }
}

/// Apply the transition an event calls for, returning whether one was driven
pub fn drive_transition(
    transition: &dyn Transition,
    menu_level: &str,
    event: &LobbyEvent,
) -> bool {
    match event {
        LobbyEvent::HostingStarted { level, .. } => transition.open_level(level, true),
        LobbyEvent::JoinResolved { connect_string, .. } => transition.client_travel(connect_string),
        LobbyEvent::ReturnedToIdle { .. } => transition.return_to_menu(menu_level),
        _ => return false,
    }
    true
}

/// One local player's view of the lobby
pub struct LobbyFacade {
    user_id: String,
    player_name: String,
    coordinator: SessionCoordinator,
    transition: Arc<dyn Transition>,
}

impl LobbyFacade {
    /// Create a facade; the player name starts out as the user id
    pub fn new(
        user_id: impl Into<String>,
        coordinator: SessionCoordinator,
        transition: Arc<dyn Transition>,
    ) -> Self {
        let user_id = user_id.into();
        Self {
            player_name: user_id.clone(),
            user_id,
            coordinator,
            transition,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn set_player_name(&mut self, name: impl Into<String>) {
        self.player_name = name.into();
    }

    pub fn coordinator(&self) -> &SessionCoordinator {
        &self.coordinator
    }

    /// Name of the session this player hosts or joins
    pub fn game_session_name(&self) -> &str {
        self.coordinator.session_name()
    }

    pub async fn start_session(&self, config: &SessionConfig) -> Result<(), LobbyError> {
        self.coordinator.host(&self.user_id, config).await
    }

    pub async fn destroy_session(&self) -> Result<DestroyOutcome, LobbyError> {
        self.coordinator.destroy().await
    }

    /// Search LAN sessions advertised through presence
    pub async fn find_online_games(&self) -> Result<(), LobbyError> {
        self.find_sessions(true, true).await
    }

    pub async fn find_sessions(&self, is_lan: bool, uses_presence: bool) -> Result<(), LobbyError> {
        self.coordinator
            .find_sessions(&self.user_id, is_lan, uses_presence)
            .await
    }

    pub async fn search_results(&self) -> Vec<SearchResult> {
        self.coordinator.search_results().await
    }

    pub async fn check_password_for_session_of(&self, owner_id: &str, password: &str) -> bool {
        self.coordinator.check_password(owner_id, password).await
    }

    pub async fn join_game(&self, owner_id: &str) -> Result<(), LobbyError> {
        self.coordinator.join(&self.user_id, owner_id).await
    }

    /// Drive this facade's transition for a single event
    pub fn apply_event(&self, event: &LobbyEvent) -> bool {
        drive_transition(
            self.transition.as_ref(),
            &self.coordinator.config().menu_level,
            event,
        )
    }

    /// Spawn a task applying transitions for every coordinator event
    ///
    /// Runs until the event bus closes; abort the handle to stop it earlier.
    pub fn spawn_transitions(&self) -> JoinHandle<()> {
        let mut rx = self.coordinator.subscribe();
        let transition = Arc::clone(&self.transition);
        let menu_level = self.coordinator.config().menu_level.clone();
        let user_id = self.user_id.clone();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok((_seq, event)) => {
                        drive_transition(transition.as_ref(), &menu_level, &event);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(owner_id = %user_id, "transition driver lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
