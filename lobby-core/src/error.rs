//! Error types for lobby-core

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provider::{JoinResultCode, OperationKind};

/// Errors reported by the session coordinator
///
/// Every variant is recoverable: the coordinator rolls back to `Idle` (or
/// leaves its state untouched) before reporting it. Errors are `Clone` so
/// they can travel inside [`crate::events::LobbyEvent`]s.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum LobbyError {
    #[error("A {0} operation is already in progress")]
    OperationInProgress(OperationKind),

    #[error("Session provider is unavailable")]
    ProviderUnavailable,

    #[error("Session creation failed: {0}")]
    CreateFailed(String),

    #[error("Session start failed: {0}")]
    StartFailed(String),

    #[error("Session search failed")]
    SearchFailed,

    #[error("Join failed: {0}")]
    JoinFailed(JoinResultCode),

    #[error("Session destroy failed: {0}")]
    DestroyFailed(String),

    #[error("No cached session owned by '{0}', search again")]
    UnknownSession(String),

    #[error("Cannot join your own session")]
    CannotJoinSelf,

    #[error("A session is already owned by this coordinator")]
    AlreadyHosting,

    #[error("Invalid session config: {0}")]
    InvalidConfig(String),

    #[error("Provider did not complete {0} in time")]
    TimedOut(OperationKind),
}

impl LobbyError {
    /// Map a provider rejection of a request into the coordinator taxonomy
    pub fn from_provider(kind: OperationKind, error: ProviderError) -> Self {
        if matches!(error, ProviderError::Unavailable) {
            return Self::ProviderUnavailable;
        }
        match kind {
            OperationKind::Create => Self::CreateFailed(error.to_string()),
            OperationKind::Start => Self::StartFailed(error.to_string()),
            OperationKind::Find => Self::SearchFailed,
            OperationKind::Join => match error {
                ProviderError::UnknownSession(_) => {
                    Self::JoinFailed(JoinResultCode::SessionDoesNotExist)
                }
                _ => Self::JoinFailed(JoinResultCode::UnknownError),
            },
            OperationKind::Destroy => Self::DestroyFailed(error.to_string()),
        }
    }
}

/// Errors raised by a provider when it refuses to accept a request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider is not reachable")]
    Unavailable,

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Unknown session: {0}")]
    UnknownSession(String),
}
