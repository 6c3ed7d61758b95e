//! SessionCoordinator: the lobby session state machine
//!
//! Caller-facing operations validate preconditions, register a one-shot
//! completion subscription and issue the provider request while holding the
//! coordinator lock, then return. A spawned task awaits the completion and
//! applies the resulting transition, publishing a [`LobbyEvent`] for every
//! observable outcome.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, broadcast};
use tracing::{debug, info, warn};

use super::state::{CoordinatorState, OwnedSession};
use super::subscription::CompletionSubscription;
use crate::config::CoordinatorConfig;
use crate::error::LobbyError;
use crate::events::{EventBus, EventSeq, LobbyEvent};
use crate::provider::{Completion, JoinResultCode, OperationKind, RequestId, SessionProvider};
use crate::session::{
    AdvertisedSettings, SearchQuery, SearchResult, SearchSnapshot, SessionConfig,
};

/// Result of a destroy request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// Destroy issued; `ReturnedToIdle` or `DestroyFailed` follows
    Requested,
    /// Nothing was owned, nothing to do
    NothingOwned,
}

#[derive(Default)]
struct Inner {
    state: CoordinatorState,
    owned: Option<OwnedSession>,
    searching: bool,
    search: SearchSnapshot,
}

struct Shared {
    provider: Arc<dyn SessionProvider>,
    event_bus: Arc<dyn EventBus>,
    config: CoordinatorConfig,
    inner: Mutex<Inner>,
}

/// Coordinates one local session against a [`SessionProvider`]
///
/// Cloning yields another handle to the same coordinator.
#[derive(Clone)]
pub struct SessionCoordinator {
    shared: Arc<Shared>,
}

impl SessionCoordinator {
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        event_bus: Arc<dyn EventBus>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                provider,
                event_bus,
                config,
                inner: Mutex::new(Inner::default()),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.shared.config
    }

    /// Name of the local session this coordinator creates, joins and destroys
    pub fn session_name(&self) -> &str {
        &self.shared.config.session_name
    }

    pub fn event_bus(&self) -> &Arc<dyn EventBus> {
        &self.shared.event_bus
    }

    /// Live stream of coordinator events
    pub fn subscribe(&self) -> broadcast::Receiver<(EventSeq, LobbyEvent)> {
        self.shared.event_bus.subscribe()
    }

    pub async fn state(&self) -> CoordinatorState {
        self.lock().await.state
    }

    pub async fn owned_session(&self) -> Option<OwnedSession> {
        self.lock().await.owned.clone()
    }

    pub async fn is_searching(&self) -> bool {
        self.lock().await.searching
    }

    // ==================== Hosting ====================

    /// Create and start a session described by `config`
    ///
    /// Returns once the create request is accepted. `HostingStarted` or
    /// `HostingFailed` is published when the create/start cycle ends.
    pub async fn host(&self, user_id: &str, config: &SessionConfig) -> Result<(), LobbyError> {
        config.validate()?;

        let shared = &self.shared;
        let mut inner = self.lock().await;
        ensure_settled(&inner)?;
        if inner.owned.is_some() {
            return Err(LobbyError::AlreadyHosting);
        }
        if !shared.provider.is_available() {
            return Err(LobbyError::ProviderUnavailable);
        }

        let name = shared.config.session_name.clone();
        let settings =
            AdvertisedSettings::from_config(config, shared.config.password_advertisement);
        let created = CompletionSubscription::register(&shared.provider, OperationKind::Create);
        self.transition(&mut inner, CoordinatorState::Creating);

        let request = match shared
            .provider
            .create_session(user_id, &name, &settings)
            .await
        {
            Ok(request) => request,
            Err(error) => {
                let error = LobbyError::from_provider(OperationKind::Create, error);
                warn!(session_name = %name, %error, "create request rejected");
                self.transition(&mut inner, CoordinatorState::Idle);
                return Err(error);
            }
        };
        drop(inner);

        info!(
            session_name = %name,
            owner_id = %user_id,
            level = %config.map_or_level_id,
            max_players = config.max_players,
            %request,
            "hosting requested"
        );
        let this = self.clone();
        let level = config.map_or_level_id.clone();
        tokio::spawn(async move { this.finish_host(name, level, created, request).await });
        Ok(())
    }

    async fn finish_host(
        self,
        name: String,
        level: String,
        created: CompletionSubscription,
        request: RequestId,
    ) {
        let shared = &self.shared;
        let outcome = created
            .wait(request, shared.config.timeouts.for_kind(OperationKind::Create))
            .await;
        match require_success(outcome, || {
            LobbyError::CreateFailed(format!("provider could not create '{name}'"))
        }) {
            Ok(()) => {}
            // The provider may still create the session after we stop waiting.
            Err(error @ LobbyError::TimedOut(_)) => {
                self.abandon_hosting(name, error).await;
                return;
            }
            Err(error) => {
                warn!(session_name = %name, %error, "hosting failed");
                let mut inner = self.lock().await;
                self.transition(&mut inner, CoordinatorState::Idle);
                self.publish(LobbyEvent::HostingFailed { error });
                return;
            }
        }

        let mut inner = self.lock().await;
        let started = CompletionSubscription::register(&shared.provider, OperationKind::Start);
        self.transition(&mut inner, CoordinatorState::Starting);
        let issued = shared.provider.start_session(&name).await;
        drop(inner);

        let outcome = match issued {
            Ok(request) => require_success(
                started
                    .wait(request, shared.config.timeouts.for_kind(OperationKind::Start))
                    .await,
                || LobbyError::StartFailed(format!("provider could not start '{name}'")),
            ),
            Err(error) => Err(LobbyError::from_provider(OperationKind::Start, error)),
        };

        match outcome {
            Ok(()) => {
                let mut inner = self.lock().await;
                inner.owned = Some(OwnedSession::hosted(&name, &level));
                self.transition(&mut inner, CoordinatorState::Hosting);
                info!(session_name = %name, %level, "hosting started");
                self.publish(LobbyEvent::HostingStarted {
                    session_name: name,
                    level,
                });
            }
            Err(error) => self.abandon_hosting(name, error).await,
        }
    }

    /// Destroy whatever the provider holds for `name`, then report `error`
    async fn abandon_hosting(&self, name: String, error: LobbyError) {
        warn!(session_name = %name, %error, "hosting failed, destroying session");
        self.cleanup_destroy(&name).await;

        let mut inner = self.lock().await;
        self.transition(&mut inner, CoordinatorState::Idle);
        self.publish(LobbyEvent::HostingFailed { error });
    }

    /// Best-effort destroy of a session the coordinator never came to own
    ///
    /// Leaves the coordinator in `Destroying`; the caller settles the state.
    async fn cleanup_destroy(&self, name: &str) {
        let shared = &self.shared;
        let mut inner = self.lock().await;
        let destroyed = CompletionSubscription::register(&shared.provider, OperationKind::Destroy);
        self.transition(&mut inner, CoordinatorState::Destroying);
        let issued = shared.provider.destroy_session(name).await;
        drop(inner);

        let cleanup = match issued {
            Ok(request) => require_success(
                destroyed
                    .wait(request, shared.config.timeouts.for_kind(OperationKind::Destroy))
                    .await,
                || LobbyError::DestroyFailed(format!("provider could not destroy '{name}'")),
            ),
            Err(error) => Err(LobbyError::from_provider(OperationKind::Destroy, error)),
        };
        if let Err(error) = cleanup {
            warn!(session_name = %name, %error, "cleanup destroy failed");
        }
    }

    // ==================== Searching ====================

    /// Search for advertised sessions
    ///
    /// Exactly one `SearchCompleted` is published per accepted call, and one
    /// (unsuccessful) when the provider cannot be reached.
    pub async fn find_sessions(
        &self,
        user_id: &str,
        is_lan: bool,
        uses_presence: bool,
    ) -> Result<(), LobbyError> {
        let shared = &self.shared;
        let mut inner = self.lock().await;
        if inner.searching {
            return Err(LobbyError::OperationInProgress(OperationKind::Find));
        }
        if !shared.provider.is_available() {
            warn!(owner_id = %user_id, "search refused, provider unavailable");
            inner.search = SearchSnapshot::empty();
            self.publish_search(false, 0);
            return Err(LobbyError::ProviderUnavailable);
        }

        let query = SearchQuery::new(is_lan, uses_presence, &shared.config.search);
        let found = CompletionSubscription::register(&shared.provider, OperationKind::Find);
        inner.searching = true;

        let request = match shared.provider.find_sessions(user_id, &query).await {
            Ok(request) => request,
            Err(error) => {
                let error = LobbyError::from_provider(OperationKind::Find, error);
                warn!(owner_id = %user_id, %error, "search request rejected");
                inner.searching = false;
                inner.search = SearchSnapshot::empty();
                self.publish_search(false, 0);
                return Err(error);
            }
        };
        drop(inner);

        debug!(owner_id = %user_id, is_lan, uses_presence, %request, "search requested");
        let this = self.clone();
        tokio::spawn(async move { this.finish_find(found, request).await });
        Ok(())
    }

    async fn finish_find(self, found: CompletionSubscription, request: RequestId) {
        let shared = &self.shared;
        let outcome = found
            .wait(request, shared.config.timeouts.for_kind(OperationKind::Find))
            .await;

        let (success, records) = match outcome {
            Ok(Completion::Found {
                success: true,
                mut results,
            }) => {
                results.truncate(shared.config.search.max_results);
                (true, results)
            }
            Ok(_) => (false, Vec::new()),
            Err(error) => {
                warn!(%error, "search failed");
                (false, Vec::new())
            }
        };

        let mut inner = self.lock().await;
        let result_count = records.len();
        inner.search = SearchSnapshot::new(records);
        inner.searching = false;
        debug!(success, result_count, "search completed");
        self.publish_search(success, result_count);
    }

    /// Results of the last completed search, in provider order
    pub async fn search_results(&self) -> Vec<SearchResult> {
        self.lock().await.search.results()
    }

    /// Whether `candidate` matches the password advertised by `owner_id`'s session
    pub async fn check_password(&self, owner_id: &str, candidate: &str) -> bool {
        self.lock().await.search.check_password(owner_id, candidate)
    }

    // ==================== Joining ====================

    /// Join the cached session hosted by `target_owner_id`
    ///
    /// `JoinResolved` or `JoinFailed` is published once the provider answers.
    pub async fn join(&self, user_id: &str, target_owner_id: &str) -> Result<(), LobbyError> {
        if user_id == target_owner_id {
            return Err(LobbyError::CannotJoinSelf);
        }

        let shared = &self.shared;
        let mut inner = self.lock().await;
        ensure_settled(&inner)?;
        if inner.owned.is_some() {
            return Err(LobbyError::JoinFailed(JoinResultCode::AlreadyInSession));
        }
        let record = inner
            .search
            .find_owner(target_owner_id)
            .cloned()
            .ok_or_else(|| LobbyError::UnknownSession(target_owner_id.to_string()))?;
        if !shared.provider.is_available() {
            return Err(LobbyError::ProviderUnavailable);
        }

        let name = shared.config.session_name.clone();
        let joined = CompletionSubscription::register(&shared.provider, OperationKind::Join);
        self.transition(&mut inner, CoordinatorState::Joining);

        let request = match shared
            .provider
            .join_session(user_id, &name, &record)
            .await
        {
            Ok(request) => request,
            Err(error) => {
                let error = LobbyError::from_provider(OperationKind::Join, error);
                warn!(owner_id = %target_owner_id, %error, "join request rejected");
                self.transition(&mut inner, CoordinatorState::Idle);
                return Err(error);
            }
        };
        drop(inner);

        info!(session_name = %name, owner_id = %target_owner_id, %request, "join requested");
        let this = self.clone();
        tokio::spawn(async move { this.finish_join(name, joined, request).await });
        Ok(())
    }

    async fn finish_join(self, name: String, joined: CompletionSubscription, request: RequestId) {
        let shared = &self.shared;
        let outcome = joined
            .wait(request, shared.config.timeouts.for_kind(OperationKind::Join))
            .await;
        let error = match outcome {
            Ok(Completion::Joined {
                result: JoinResultCode::Success,
                ..
            }) => None,
            Ok(Completion::Joined { result, .. }) => Some(LobbyError::JoinFailed(result)),
            Ok(_) => Some(LobbyError::JoinFailed(JoinResultCode::UnknownError)),
            Err(error) => Some(error),
        };

        if let Some(error) = error {
            warn!(session_name = %name, %error, "join failed");
            // A join that answers late may still have made us a member.
            if matches!(error, LobbyError::TimedOut(_)) {
                self.cleanup_destroy(&name).await;
            }
            let mut inner = self.lock().await;
            self.transition(&mut inner, CoordinatorState::Idle);
            self.publish(LobbyEvent::JoinFailed { error });
            return;
        }

        let mut inner = self.lock().await;
        let connect_string = shared.provider.resolve_connect_string(&name);
        inner.owned = Some(OwnedSession::joined(&name, connect_string.clone()));
        self.transition(&mut inner, CoordinatorState::Joined);

        match connect_string {
            Some(connect_string) => {
                info!(session_name = %name, %connect_string, "join resolved");
                self.publish(LobbyEvent::JoinResolved {
                    session_name: name,
                    connect_string,
                });
            }
            None => {
                warn!(session_name = %name, "joined but no connect string available");
                self.publish(LobbyEvent::JoinFailed {
                    error: LobbyError::JoinFailed(JoinResultCode::CouldNotRetrieveAddress),
                });
            }
        }
    }

    // ==================== Destroying ====================

    /// Destroy the owned session, hosted or joined
    pub async fn destroy(&self) -> Result<DestroyOutcome, LobbyError> {
        let shared = &self.shared;
        let mut inner = self.lock().await;
        ensure_settled(&inner)?;
        let Some(owned) = inner.owned.clone() else {
            return Ok(DestroyOutcome::NothingOwned);
        };

        let previous = inner.state;
        let destroyed = CompletionSubscription::register(&shared.provider, OperationKind::Destroy);
        self.transition(&mut inner, CoordinatorState::Destroying);

        let request = match shared.provider.destroy_session(&owned.name).await {
            Ok(request) => request,
            Err(error) => {
                let error = LobbyError::from_provider(OperationKind::Destroy, error);
                warn!(session_name = %owned.name, %error, "destroy request rejected");
                self.transition(&mut inner, previous);
                return Err(error);
            }
        };
        drop(inner);

        info!(session_name = %owned.name, role = ?owned.role, %request, "destroy requested");
        let this = self.clone();
        tokio::spawn(async move { this.finish_destroy(owned.name, destroyed, request).await });
        Ok(DestroyOutcome::Requested)
    }

    async fn finish_destroy(
        self,
        name: String,
        destroyed: CompletionSubscription,
        request: RequestId,
    ) {
        let outcome = require_success(
            destroyed
                .wait(
                    request,
                    self.shared.config.timeouts.for_kind(OperationKind::Destroy),
                )
                .await,
            || LobbyError::DestroyFailed(format!("provider could not destroy '{name}'")),
        );

        let mut inner = self.lock().await;
        inner.owned = None;
        self.transition(&mut inner, CoordinatorState::Idle);
        match outcome {
            Ok(()) => {
                info!(session_name = %name, "session destroyed");
                self.publish(LobbyEvent::ReturnedToIdle { session_name: name });
            }
            Err(error) => {
                warn!(session_name = %name, %error, "destroy failed");
                self.publish(LobbyEvent::DestroyFailed { error });
            }
        }
    }

    // ==================== Internals ====================

    async fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock().await
    }

    fn transition(&self, inner: &mut Inner, to: CoordinatorState) {
        let from = std::mem::replace(&mut inner.state, to);
        if from != to {
            debug!(%from, %to, "coordinator state changed");
            self.publish(LobbyEvent::StateChanged { from, to });
        }
    }

    fn publish_search(&self, success: bool, result_count: usize) {
        self.publish(LobbyEvent::SearchCompleted {
            success,
            result_count,
        });
    }

    fn publish(&self, event: LobbyEvent) {
        self.shared.event_bus.publish(event);
    }
}

/// Reject calls while a lifecycle operation is outstanding
fn ensure_settled(inner: &Inner) -> Result<(), LobbyError> {
    match inner.state.in_flight() {
        Some(kind) => Err(LobbyError::OperationInProgress(kind)),
        None => Ok(()),
    }
}

fn require_success(
    outcome: Result<Completion, LobbyError>,
    failed: impl FnOnce() -> LobbyError,
) -> Result<(), LobbyError> {
    match outcome {
        Ok(completion) if completion.succeeded() => Ok(()),
        Ok(_) => Err(failed()),
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::events::BroadcastEventBus;
    use crate::provider::{MockOutcome, MockProvider};

    fn coordinator(mock: &Arc<MockProvider>) -> SessionCoordinator {
        let provider: Arc<dyn SessionProvider> = mock.clone();
        SessionCoordinator::new(
            provider,
            Arc::new(BroadcastEventBus::default()),
            CoordinatorConfig::default(),
        )
    }

    async fn next_non_state(
        rx: &mut broadcast::Receiver<(EventSeq, LobbyEvent)>,
    ) -> LobbyEvent {
        loop {
            let (_, event) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            if !matches!(event, LobbyEvent::StateChanged { .. }) {
                return event;
            }
        }
    }

    #[tokio::test]
    async fn accessors_reflect_fresh_coordinator() {
        let mock = Arc::new(MockProvider::new());
        let coordinator = coordinator(&mock);

        assert_eq!(coordinator.session_name(), "Game");
        assert_eq!(coordinator.state().await, CoordinatorState::Idle);
        assert!(coordinator.owned_session().await.is_none());
        assert!(!coordinator.is_searching().await);
        assert!(coordinator.search_results().await.is_empty());
    }

    #[tokio::test]
    async fn invalid_config_never_reaches_provider() {
        let mock = Arc::new(MockProvider::new());
        let coordinator = coordinator(&mock);

        let result = coordinator
            .host("alice", &SessionConfig::default().with_max_players(0))
            .await;

        assert!(matches!(result, Err(LobbyError::InvalidConfig(_))));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn rejected_create_returns_to_idle_synchronously() {
        let mock = Arc::new(MockProvider::new());
        mock.reject_next(
            OperationKind::Create,
            crate::error::ProviderError::Rejected("quota".to_string()),
        );
        let coordinator = coordinator(&mock);

        let result = coordinator.host("alice", &SessionConfig::default()).await;

        assert!(matches!(result, Err(LobbyError::CreateFailed(msg)) if msg.contains("quota")));
        assert_eq!(coordinator.state().await, CoordinatorState::Idle);
        assert_eq!(mock.active_listeners(), 0);
    }

    #[tokio::test]
    async fn failed_create_reports_hosting_failed() {
        let mock = Arc::new(MockProvider::new());
        mock.queue_outcome(OperationKind::Create, MockOutcome::Fail);
        let coordinator = coordinator(&mock);
        let mut rx = coordinator.subscribe();

        coordinator
            .host("alice", &SessionConfig::default())
            .await
            .unwrap();

        assert!(matches!(
            next_non_state(&mut rx).await,
            LobbyEvent::HostingFailed {
                error: LobbyError::CreateFailed(_)
            }
        ));
        assert_eq!(coordinator.state().await, CoordinatorState::Idle);
        assert_eq!(mock.request_count(OperationKind::Start), 0);
    }

    #[tokio::test]
    async fn destroy_restores_state_when_rejected() {
        let mock = Arc::new(MockProvider::new());
        mock.queue_outcome(OperationKind::Create, MockOutcome::Succeed);
        mock.queue_outcome(OperationKind::Start, MockOutcome::Succeed);
        let coordinator = coordinator(&mock);
        let mut rx = coordinator.subscribe();
        coordinator
            .host("alice", &SessionConfig::default())
            .await
            .unwrap();
        next_non_state(&mut rx).await;

        mock.reject_next(
            OperationKind::Destroy,
            crate::error::ProviderError::Rejected("busy".to_string()),
        );
        let result = coordinator.destroy().await;

        assert!(matches!(result, Err(LobbyError::DestroyFailed(_))));
        assert_eq!(coordinator.state().await, CoordinatorState::Hosting);
        assert!(coordinator.owned_session().await.is_some());
    }
}
