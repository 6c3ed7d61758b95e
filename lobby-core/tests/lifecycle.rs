//! Coordinator lifecycle tests against the scripted MockProvider
//!
//! Covers hosting, searching, password checks, joining and destroying,
//! including the guards against overlapping operations.

mod common;

use common::{Harness, record};
use lobby_core::{
    CoordinatorConfig, CoordinatorState, DestroyOutcome, JoinResultCode, LobbyError, LobbyEvent,
    MockOutcome, MockProvider, OperationKind, ProviderRequest, SessionConfig, SessionRole,
};

fn succeed_hosting(harness: &Harness) {
    harness
        .mock
        .queue_outcome(OperationKind::Create, MockOutcome::Succeed);
    harness
        .mock
        .queue_outcome(OperationKind::Start, MockOutcome::Succeed);
}

async fn hosted(harness: &mut Harness) {
    succeed_hosting(harness);
    harness
        .coordinator
        .host("alice", &SessionConfig::default())
        .await
        .unwrap();
    assert!(matches!(
        harness.next_event().await,
        LobbyEvent::HostingStarted { .. }
    ));
}

async fn searched(harness: &mut Harness, records: Vec<lobby_core::SessionRecord>) {
    harness
        .mock
        .queue_outcome(OperationKind::Find, MockOutcome::Found(records));
    harness
        .coordinator
        .find_sessions("alice", true, false)
        .await
        .unwrap();
    assert!(matches!(
        harness.next_event().await,
        LobbyEvent::SearchCompleted { success: true, .. }
    ));
}

// ==================== Hosting ====================

#[tokio::test]
async fn host_reaches_hosting_exactly_once() {
    let mut harness = Harness::new();
    succeed_hosting(&harness);
    let config = SessionConfig::default().with_lan(true).with_max_players(4);

    harness.coordinator.host("alice", &config).await.unwrap();

    assert_eq!(
        harness.next_event().await,
        LobbyEvent::HostingStarted {
            session_name: "Game".to_string(),
            level: "TestMap2".to_string(),
        }
    );
    assert_eq!(harness.coordinator.state().await, CoordinatorState::Hosting);

    let owned = harness.coordinator.owned_session().await.unwrap();
    assert_eq!(owned.name, "Game");
    assert_eq!(owned.role, SessionRole::Host);

    let history = harness.history();
    let started = history
        .iter()
        .filter(|e| matches!(e, LobbyEvent::HostingStarted { .. }))
        .count();
    assert_eq!(started, 1);

    let transitions: Vec<_> = history
        .iter()
        .filter_map(|e| match e {
            LobbyEvent::StateChanged { to, .. } => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            CoordinatorState::Creating,
            CoordinatorState::Starting,
            CoordinatorState::Hosting,
        ]
    );
}

#[tokio::test]
async fn host_advertises_settings_from_config() {
    let mut harness = Harness::new();
    hosted(&mut harness).await;

    let requests = harness.mock.requests();
    let ProviderRequest::Create {
        user_id,
        session_name,
        settings,
    } = &requests[0]
    else {
        panic!("expected create first, got {:?}", requests[0]);
    };
    assert_eq!(user_id, "alice");
    assert_eq!(session_name, "Game");
    assert_eq!(settings.public_connections, 4);
    assert_eq!(settings.party_name(), Some("Party"));
    assert_eq!(settings.map_name(), Some("TestMap2"));
    assert!(!settings.has_password());
}

#[tokio::test]
async fn flag_only_password_is_not_advertised() {
    let mut harness = Harness::new();
    succeed_hosting(&harness);
    let config = SessionConfig::default().with_password("secret");

    harness.coordinator.host("alice", &config).await.unwrap();
    harness.next_event().await;

    let ProviderRequest::Create { settings, .. } = &harness.mock.requests()[0] else {
        panic!("expected create");
    };
    assert!(settings.has_password());
    assert!(settings.password().is_none());
}

#[tokio::test]
async fn second_host_while_creating_is_rejected() {
    let harness = Harness::new();
    let config = SessionConfig::default();

    harness.coordinator.host("alice", &config).await.unwrap();
    let second = harness.coordinator.host("alice", &config).await;

    assert_eq!(
        second,
        Err(LobbyError::OperationInProgress(OperationKind::Create))
    );
    assert_eq!(harness.mock.request_count(OperationKind::Create), 1);
}

#[tokio::test]
async fn host_is_guarded_through_start_and_once_hosting() {
    let mut harness = Harness::new();
    let config = SessionConfig::default();

    harness.coordinator.host("alice", &config).await.unwrap();
    harness
        .mock
        .complete_last(OperationKind::Create, MockOutcome::Succeed);
    harness.wait_for_state(CoordinatorState::Starting).await;

    assert_eq!(
        harness.coordinator.host("alice", &config).await,
        Err(LobbyError::OperationInProgress(OperationKind::Start))
    );

    harness
        .mock
        .complete_last(OperationKind::Start, MockOutcome::Succeed);
    assert!(matches!(
        harness.next_event().await,
        LobbyEvent::HostingStarted { .. }
    ));
    assert_eq!(
        harness.coordinator.host("alice", &config).await,
        Err(LobbyError::AlreadyHosting)
    );
    assert_eq!(harness.mock.request_count(OperationKind::Create), 1);
}

#[tokio::test]
async fn start_failure_destroys_created_session() {
    let mut harness = Harness::new();
    harness
        .mock
        .queue_outcome(OperationKind::Create, MockOutcome::Succeed);
    harness
        .mock
        .queue_outcome(OperationKind::Start, MockOutcome::Fail);
    harness
        .mock
        .queue_outcome(OperationKind::Destroy, MockOutcome::Succeed);

    harness
        .coordinator
        .host("alice", &SessionConfig::default())
        .await
        .unwrap();

    assert!(matches!(
        harness.next_event().await,
        LobbyEvent::HostingFailed {
            error: LobbyError::StartFailed(_)
        }
    ));
    assert_eq!(harness.coordinator.state().await, CoordinatorState::Idle);
    assert!(harness.coordinator.owned_session().await.is_none());

    let kinds: Vec<_> = harness.mock.requests().iter().map(|r| r.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            OperationKind::Create,
            OperationKind::Start,
            OperationKind::Destroy
        ]
    );
    assert_eq!(
        harness.mock.requests()[2],
        ProviderRequest::Destroy {
            session_name: "Game".to_string()
        }
    );
}

#[tokio::test]
async fn unavailable_provider_refuses_host() {
    let harness = Harness::with_provider(MockProvider::unavailable(), CoordinatorConfig::default());
    assert_eq!(
        harness
            .coordinator
            .host("alice", &SessionConfig::default())
            .await,
        Err(LobbyError::ProviderUnavailable)
    );
    assert_eq!(harness.coordinator.state().await, CoordinatorState::Idle);
}

// ==================== Searching ====================

#[tokio::test]
async fn find_caches_results_in_provider_order() {
    let mut harness = Harness::new();
    let open = SessionConfig::new("Open Party", "Arena");
    let locked = SessionConfig::new("Locked Party", "Docks").with_password("secret");
    searched(
        &mut harness,
        vec![record("bob", &open, 3), record("carol", &locked, 9)],
    )
    .await;

    let results = harness.coordinator.search_results().await;
    let owners: Vec<_> = results.iter().map(|r| r.owner_id.as_str()).collect();
    assert_eq!(owners, vec!["bob", "carol"]);
    assert!(results.iter().all(|r| r.open_connections <= r.max_connections));
    assert_eq!(results[1].open_connections, 4);
    assert!(!results[0].has_password);
    assert!(results[1].has_password);

    assert_eq!(harness.coordinator.search_results().await, results);
}

#[tokio::test]
async fn check_password_against_cached_results() {
    let mut harness = Harness::new();
    let open = SessionConfig::new("Open Party", "Arena");
    let locked = SessionConfig::new("Locked Party", "Docks").with_password("secret");
    searched(
        &mut harness,
        vec![record("bob", &open, 3), record("carol", &locked, 3)],
    )
    .await;

    assert!(harness.coordinator.check_password("carol", "secret").await);
    assert!(!harness.coordinator.check_password("carol", "Secret").await);
    assert!(!harness.coordinator.check_password("bob", "secret").await);
    assert!(!harness.coordinator.check_password("dave", "secret").await);
}

#[tokio::test]
async fn find_passes_query_settings_to_provider() {
    let mut harness = Harness::new();
    harness
        .mock
        .queue_outcome(OperationKind::Find, MockOutcome::Succeed);

    harness
        .coordinator
        .find_sessions("alice", true, true)
        .await
        .unwrap();
    harness.next_event().await;

    let ProviderRequest::Find { user_id, query } = &harness.mock.requests()[0] else {
        panic!("expected find");
    };
    assert_eq!(user_id, "alice");
    assert!(query.is_lan_query);
    assert_eq!(query.presence, Some(true));
    assert_eq!(query.max_results, 20);
    assert_eq!(query.ping_bucket_size, 100);
}

#[tokio::test]
async fn unavailable_provider_still_signals_search_completion() {
    let mut harness =
        Harness::with_provider(MockProvider::unavailable(), CoordinatorConfig::default());

    let result = harness.coordinator.find_sessions("alice", true, false).await;

    assert_eq!(result, Err(LobbyError::ProviderUnavailable));
    assert_eq!(
        harness.next_event().await,
        LobbyEvent::SearchCompleted {
            success: false,
            result_count: 0
        }
    );
    let completions = harness
        .history()
        .into_iter()
        .filter(|e| matches!(e, LobbyEvent::SearchCompleted { .. }))
        .count();
    assert_eq!(completions, 1);
}

#[tokio::test]
async fn overlapping_find_is_rejected() {
    let mut harness = Harness::new();
    harness
        .coordinator
        .find_sessions("alice", false, false)
        .await
        .unwrap();

    assert!(harness.coordinator.is_searching().await);
    assert_eq!(
        harness.coordinator.find_sessions("alice", false, false).await,
        Err(LobbyError::OperationInProgress(OperationKind::Find))
    );
    assert_eq!(harness.mock.request_count(OperationKind::Find), 1);

    harness.mock.complete_last(
        OperationKind::Find,
        MockOutcome::Found(vec![record("bob", &SessionConfig::default(), 1)]),
    );
    assert_eq!(
        harness.next_event().await,
        LobbyEvent::SearchCompleted {
            success: true,
            result_count: 1
        }
    );
    assert!(!harness.coordinator.is_searching().await);
}

#[tokio::test]
async fn failed_search_leaves_empty_cache() {
    let mut harness = Harness::new();
    searched(
        &mut harness,
        vec![record("bob", &SessionConfig::default(), 1)],
    )
    .await;
    assert_eq!(harness.coordinator.search_results().await.len(), 1);

    harness
        .mock
        .queue_outcome(OperationKind::Find, MockOutcome::Fail);
    harness
        .coordinator
        .find_sessions("alice", true, false)
        .await
        .unwrap();

    assert_eq!(
        harness.next_event().await,
        LobbyEvent::SearchCompleted {
            success: false,
            result_count: 0
        }
    );
    assert!(harness.coordinator.search_results().await.is_empty());
}

#[tokio::test]
async fn search_results_are_capped_at_max_results() {
    let mut harness = Harness::new();
    let config = SessionConfig::default();
    let records = (0..25)
        .map(|i| record(&format!("host-{i}"), &config, 1))
        .collect();
    harness
        .mock
        .queue_outcome(OperationKind::Find, MockOutcome::Found(records));

    harness
        .coordinator
        .find_sessions("alice", false, false)
        .await
        .unwrap();

    assert_eq!(
        harness.next_event().await,
        LobbyEvent::SearchCompleted {
            success: true,
            result_count: 20
        }
    );
}

// ==================== Joining ====================

#[tokio::test]
async fn join_self_never_contacts_provider() {
    let harness = Harness::new();
    assert_eq!(
        harness.coordinator.join("alice", "alice").await,
        Err(LobbyError::CannotJoinSelf)
    );
    assert!(harness.mock.requests().is_empty());
}

#[tokio::test]
async fn join_requires_cached_owner() {
    let harness = Harness::new();
    let result = harness.coordinator.join("alice", "bob").await;
    assert_eq!(result, Err(LobbyError::UnknownSession("bob".to_string())));
    assert!(harness.mock.requests().is_empty());
}

#[tokio::test]
async fn join_resolves_connect_string() {
    let mut harness = Harness::new();
    let bob = record("bob", &SessionConfig::default(), 3);
    searched(&mut harness, vec![bob.clone()]).await;
    harness.mock.set_connect_string("Game", "10.0.0.2:7777");
    harness
        .mock
        .queue_outcome(OperationKind::Join, MockOutcome::Join(JoinResultCode::Success));

    harness.coordinator.join("alice", "bob").await.unwrap();

    assert_eq!(
        harness.next_event().await,
        LobbyEvent::JoinResolved {
            session_name: "Game".to_string(),
            connect_string: "10.0.0.2:7777".to_string(),
        }
    );
    assert_eq!(harness.coordinator.state().await, CoordinatorState::Joined);
    let owned = harness.coordinator.owned_session().await.unwrap();
    assert_eq!(owned.role, SessionRole::Client);
    assert_eq!(owned.connect_string.as_deref(), Some("10.0.0.2:7777"));

    assert_eq!(
        harness.mock.requests().last(),
        Some(&ProviderRequest::Join {
            user_id: "alice".to_string(),
            session_name: "Game".to_string(),
            record: bob,
        })
    );
}

#[tokio::test]
async fn join_failure_code_is_passed_through() {
    let mut harness = Harness::new();
    searched(
        &mut harness,
        vec![record("bob", &SessionConfig::default(), 0)],
    )
    .await;
    harness.mock.queue_outcome(
        OperationKind::Join,
        MockOutcome::Join(JoinResultCode::SessionIsFull),
    );

    harness.coordinator.join("alice", "bob").await.unwrap();

    assert_eq!(
        harness.next_event().await,
        LobbyEvent::JoinFailed {
            error: LobbyError::JoinFailed(JoinResultCode::SessionIsFull)
        }
    );
    assert_eq!(harness.coordinator.state().await, CoordinatorState::Idle);
    assert!(harness.coordinator.owned_session().await.is_none());
}

#[tokio::test]
async fn join_without_address_still_owns_session() {
    let mut harness = Harness::new();
    searched(
        &mut harness,
        vec![record("bob", &SessionConfig::default(), 3)],
    )
    .await;
    harness
        .mock
        .queue_outcome(OperationKind::Join, MockOutcome::Join(JoinResultCode::Success));

    harness.coordinator.join("alice", "bob").await.unwrap();

    assert_eq!(
        harness.next_event().await,
        LobbyEvent::JoinFailed {
            error: LobbyError::JoinFailed(JoinResultCode::CouldNotRetrieveAddress)
        }
    );
    assert_eq!(harness.coordinator.state().await, CoordinatorState::Joined);

    harness
        .mock
        .queue_outcome(OperationKind::Destroy, MockOutcome::Succeed);
    assert_eq!(
        harness.coordinator.destroy().await,
        Ok(DestroyOutcome::Requested)
    );
    assert_eq!(
        harness.next_event().await,
        LobbyEvent::ReturnedToIdle {
            session_name: "Game".to_string()
        }
    );
}

#[tokio::test]
async fn join_while_hosting_is_already_in_session() {
    let mut harness = Harness::new();
    hosted(&mut harness).await;
    searched(
        &mut harness,
        vec![record("bob", &SessionConfig::default(), 3)],
    )
    .await;

    assert_eq!(
        harness.coordinator.join("alice", "bob").await,
        Err(LobbyError::JoinFailed(JoinResultCode::AlreadyInSession))
    );
    assert_eq!(harness.mock.request_count(OperationKind::Join), 0);
}

// ==================== Destroying ====================

#[tokio::test]
async fn destroy_without_session_is_a_no_op() {
    let harness = Harness::new();
    assert_eq!(
        harness.coordinator.destroy().await,
        Ok(DestroyOutcome::NothingOwned)
    );
    assert!(harness.mock.requests().is_empty());
}

#[tokio::test]
async fn destroy_hosted_session_returns_to_idle() {
    let mut harness = Harness::new();
    hosted(&mut harness).await;
    harness
        .mock
        .queue_outcome(OperationKind::Destroy, MockOutcome::Succeed);

    assert_eq!(
        harness.coordinator.destroy().await,
        Ok(DestroyOutcome::Requested)
    );
    assert_eq!(
        harness.next_event().await,
        LobbyEvent::ReturnedToIdle {
            session_name: "Game".to_string()
        }
    );
    assert_eq!(harness.coordinator.state().await, CoordinatorState::Idle);
    assert!(harness.coordinator.owned_session().await.is_none());
    assert_eq!(
        harness.mock.requests().last(),
        Some(&ProviderRequest::Destroy {
            session_name: "Game".to_string()
        })
    );
}

#[tokio::test]
async fn destroy_while_destroying_is_rejected() {
    let mut harness = Harness::new();
    hosted(&mut harness).await;

    harness.coordinator.destroy().await.unwrap();
    assert_eq!(
        harness.coordinator.destroy().await,
        Err(LobbyError::OperationInProgress(OperationKind::Destroy))
    );
    assert_eq!(harness.mock.request_count(OperationKind::Destroy), 1);
}

#[tokio::test]
async fn failed_destroy_still_returns_to_idle() {
    let mut harness = Harness::new();
    hosted(&mut harness).await;
    harness
        .mock
        .queue_outcome(OperationKind::Destroy, MockOutcome::Fail);

    harness.coordinator.destroy().await.unwrap();

    assert!(matches!(
        harness.next_event().await,
        LobbyEvent::DestroyFailed {
            error: LobbyError::DestroyFailed(_)
        }
    ));
    assert_eq!(harness.coordinator.state().await, CoordinatorState::Idle);
    assert!(harness.coordinator.owned_session().await.is_none());
}

// ==================== Listener Hygiene ====================

#[tokio::test]
async fn every_listener_is_cleared_exactly_once() {
    let mut harness = Harness::new();
    hosted(&mut harness).await;
    searched(
        &mut harness,
        vec![record("bob", &SessionConfig::default(), 3)],
    )
    .await;
    harness
        .mock
        .queue_outcome(OperationKind::Destroy, MockOutcome::Succeed);
    harness.coordinator.destroy().await.unwrap();
    harness.next_event().await;

    // Rejected calls must not leak a listener either
    let _ = harness.coordinator.join("alice", "alice").await;
    let _ = harness.coordinator.join("alice", "nobody").await;

    assert_eq!(harness.mock.registered_listeners(), 4);
    assert_eq!(harness.mock.cleared_listeners(), 4);
    assert_eq!(harness.mock.active_listeners(), 0);
}
