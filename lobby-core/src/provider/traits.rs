//! SessionProvider trait and related types
//!
//! The provider is the external backend that actually creates, advertises,
//! finds, joins and destroys sessions. Every request is fire-and-forget: the
//! provider hands back a [`RequestId`] and the outcome arrives later as a
//! [`CompletionNotice`] carrying that id, on each listener registered for the
//! request's [`OperationKind`].

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::session::{AdvertisedSettings, SearchQuery, SessionRecord};

/// Kind of asynchronous provider operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Start,
    Find,
    Join,
    Destroy,
}

impl OperationKind {
    /// All operation kinds, in lifecycle order
    pub const ALL: [OperationKind; 5] = [
        OperationKind::Create,
        OperationKind::Start,
        OperationKind::Find,
        OperationKind::Join,
        OperationKind::Destroy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Start => "start",
            Self::Find => "find",
            Self::Join => "join",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result code reported by the provider when a join completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinResultCode {
    Success,
    SessionIsFull,
    SessionDoesNotExist,
    CouldNotRetrieveAddress,
    AlreadyInSession,
    UnknownError,
}

impl JoinResultCode {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::SessionIsFull => "session is full",
            Self::SessionDoesNotExist => "session does not exist",
            Self::CouldNotRetrieveAddress => "could not retrieve address",
            Self::AlreadyInSession => "already in session",
            Self::UnknownError => "unknown error",
        }
    }
}

impl fmt::Display for JoinResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Out-of-band completion notification for a previously issued request
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Created { session_name: String, success: bool },
    Started { session_name: String, success: bool },
    Found {
        success: bool,
        results: Vec<SessionRecord>,
    },
    Joined {
        session_name: String,
        result: JoinResultCode,
    },
    Destroyed { session_name: String, success: bool },
}

impl Completion {
    /// The operation this completion belongs to
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Created { .. } => OperationKind::Create,
            Self::Started { .. } => OperationKind::Start,
            Self::Found { .. } => OperationKind::Find,
            Self::Joined { .. } => OperationKind::Join,
            Self::Destroyed { .. } => OperationKind::Destroy,
        }
    }

    /// Whether the provider reported success
    pub fn succeeded(&self) -> bool {
        match self {
            Self::Created { success, .. }
            | Self::Started { success, .. }
            | Self::Found { success, .. }
            | Self::Destroyed { success, .. } => *success,
            Self::Joined { result, .. } => result.is_success(),
        }
    }
}

/// Identifier a provider assigns to each request it accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A completion addressed to the request that produced it
///
/// Listeners of a kind see the completions of every request of that kind,
/// including late ones for requests nobody waits on any more; the id tells
/// them apart.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionNotice {
    pub request: RequestId,
    pub completion: Completion,
}

/// Channel a listener receives completions on
pub type CompletionSender = mpsc::UnboundedSender<CompletionNotice>;

/// Handle identifying a registered completion listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

impl ListenerHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Trait for session provider backends
///
/// Implementations must deliver exactly one completion per accepted request,
/// tagged with the [`RequestId`] returned when it was accepted. Clearing a
/// listener that was already cleared (or never existed) is a no-op.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Whether the backend can currently be reached
    fn is_available(&self) -> bool;

    /// Register a listener for completions of `kind`
    fn add_completion_listener(
        &self,
        kind: OperationKind,
        sender: CompletionSender,
    ) -> ListenerHandle;

    /// Unregister a listener (idempotent)
    fn clear_completion_listener(&self, handle: ListenerHandle);

    /// Request creation of a session advertised with `settings`
    async fn create_session(
        &self,
        user_id: &str,
        session_name: &str,
        settings: &AdvertisedSettings,
    ) -> Result<RequestId, ProviderError>;

    /// Request that a created session be started
    async fn start_session(&self, session_name: &str) -> Result<RequestId, ProviderError>;

    /// Request a search for advertised sessions
    async fn find_sessions(
        &self,
        user_id: &str,
        query: &SearchQuery,
    ) -> Result<RequestId, ProviderError>;

    /// Request joining the session described by `record`
    async fn join_session(
        &self,
        user_id: &str,
        session_name: &str,
        record: &SessionRecord,
    ) -> Result<RequestId, ProviderError>;

    /// Request destruction of a local session
    async fn destroy_session(&self, session_name: &str) -> Result<RequestId, ProviderError>;

    /// Connection address for a joined session, if the provider can resolve one
    fn resolve_connect_string(&self, session_name: &str) -> Option<String>;
}
