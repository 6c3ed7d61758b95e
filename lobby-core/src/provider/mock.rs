//! Mock provider for testing
//!
//! MockProvider records every request it accepts and lets tests decide when
//! and how each one completes. Queue an outcome with `queue_outcome()` to
//! have the next request of that kind complete as soon as it is issued, or
//! leave the queue empty and call `complete_last()` or `complete_request()`
//! later. A request with nothing queued and no manual completion never
//! completes, which is how coordinator timeouts are exercised.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use super::listeners::ListenerRegistry;
use super::traits::{
    Completion, CompletionSender, JoinResultCode, ListenerHandle, OperationKind, RequestId,
    SessionProvider,
};
use crate::error::ProviderError;
use crate::session::{AdvertisedSettings, SearchQuery, SessionRecord};

/// A request the mock accepted
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderRequest {
    Create {
        user_id: String,
        session_name: String,
        settings: AdvertisedSettings,
    },
    Start {
        session_name: String,
    },
    Find {
        user_id: String,
        query: SearchQuery,
    },
    Join {
        user_id: String,
        session_name: String,
        record: SessionRecord,
    },
    Destroy {
        session_name: String,
    },
}

impl ProviderRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Start { .. } => OperationKind::Start,
            Self::Find { .. } => OperationKind::Find,
            Self::Join { .. } => OperationKind::Join,
            Self::Destroy { .. } => OperationKind::Destroy,
        }
    }

    fn session_name(&self) -> &str {
        match self {
            Self::Create { session_name, .. }
            | Self::Start { session_name }
            | Self::Join { session_name, .. }
            | Self::Destroy { session_name } => session_name,
            Self::Find { .. } => "",
        }
    }
}

/// Scripted outcome for a request
#[derive(Debug, Clone, PartialEq)]
pub enum MockOutcome {
    Succeed,
    Fail,
    /// Successful search returning these records
    Found(Vec<SessionRecord>),
    /// Join completing with this code
    Join(JoinResultCode),
}

impl MockOutcome {
    fn into_completion(self, kind: OperationKind, session_name: &str) -> Completion {
        let session_name = session_name.to_string();
        let success = match &self {
            Self::Succeed | Self::Found(_) => true,
            Self::Fail => false,
            Self::Join(code) => code.is_success(),
        };
        match kind {
            OperationKind::Create => Completion::Created {
                session_name,
                success,
            },
            OperationKind::Start => Completion::Started {
                session_name,
                success,
            },
            OperationKind::Destroy => Completion::Destroyed {
                session_name,
                success,
            },
            OperationKind::Find => Completion::Found {
                success,
                results: match self {
                    Self::Found(results) => results,
                    _ => Vec::new(),
                },
            },
            OperationKind::Join => Completion::Joined {
                session_name,
                result: match self {
                    Self::Join(code) => code,
                    _ if success => JoinResultCode::Success,
                    _ => JoinResultCode::UnknownError,
                },
            },
        }
    }
}

/// Scriptable SessionProvider for tests
pub struct MockProvider {
    available: AtomicBool,
    listeners: ListenerRegistry,
    requests: Mutex<Vec<(RequestId, ProviderRequest)>>,
    outcomes: Mutex<HashMap<OperationKind, VecDeque<MockOutcome>>>,
    rejections: Mutex<HashMap<OperationKind, ProviderError>>,
    connect_strings: Mutex<HashMap<String, String>>,
}

impl MockProvider {
    /// Create an available provider with nothing queued
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            listeners: ListenerRegistry::new(),
            requests: Mutex::new(Vec::new()),
            outcomes: Mutex::new(HashMap::new()),
            rejections: Mutex::new(HashMap::new()),
            connect_strings: Mutex::new(HashMap::new()),
        }
    }

    /// Create a provider that reports itself unreachable
    pub fn unavailable() -> Self {
        let provider = Self::new();
        provider.set_available(false);
        provider
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Complete the next request of `kind` with `outcome` as soon as it is issued
    pub fn queue_outcome(&self, kind: OperationKind, outcome: MockOutcome) {
        lock(&self.outcomes)
            .entry(kind)
            .or_default()
            .push_back(outcome);
    }

    /// Refuse the next request of `kind` at issue time
    pub fn reject_next(&self, kind: OperationKind, error: ProviderError) {
        lock(&self.rejections).insert(kind, error);
    }

    /// Connect string returned for `session_name` after a join
    pub fn set_connect_string(&self, session_name: &str, connect_string: &str) {
        lock(&self.connect_strings).insert(session_name.to_string(), connect_string.to_string());
    }

    /// Deliver a completion for `request`, returning how many listeners got it
    pub fn complete(&self, request: RequestId, completion: Completion) -> usize {
        self.listeners.notify(request, &completion)
    }

    /// Complete the accepted request `request` with `outcome`
    ///
    /// Returns 0 without delivering anything if no such request was accepted.
    pub fn complete_request(&self, request: RequestId, outcome: MockOutcome) -> usize {
        let accepted = lock(&self.requests)
            .iter()
            .find(|(id, _)| *id == request)
            .map(|(_, r)| (r.kind(), r.session_name().to_string()));
        match accepted {
            Some((kind, session_name)) => {
                self.complete(request, outcome.into_completion(kind, &session_name))
            }
            None => 0,
        }
    }

    /// Complete the most recent request of `kind` with `outcome`
    pub fn complete_last(&self, kind: OperationKind, outcome: MockOutcome) -> usize {
        match self.request_ids(kind).last() {
            Some(request) => self.complete_request(*request, outcome),
            None => 0,
        }
    }

    /// All accepted requests, in issue order
    pub fn requests(&self) -> Vec<ProviderRequest> {
        lock(&self.requests)
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Ids of accepted requests of `kind`, in issue order
    pub fn request_ids(&self, kind: OperationKind) -> Vec<RequestId> {
        lock(&self.requests)
            .iter()
            .filter(|(_, r)| r.kind() == kind)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn request_count(&self, kind: OperationKind) -> usize {
        self.request_ids(kind).len()
    }

    pub fn active_listeners(&self) -> usize {
        self.listeners.active_count()
    }

    pub fn registered_listeners(&self) -> usize {
        self.listeners.registered_total()
    }

    pub fn cleared_listeners(&self) -> usize {
        self.listeners.cleared_total()
    }

    fn accept(&self, request: ProviderRequest) -> Result<RequestId, ProviderError> {
        let kind = request.kind();
        if !self.is_available() {
            return Err(ProviderError::Unavailable);
        }
        if let Some(error) = lock(&self.rejections).remove(&kind) {
            debug!(%kind, %error, "mock provider rejecting request");
            return Err(error);
        }

        let id = self.listeners.next_request();
        let session_name = request.session_name().to_string();
        lock(&self.requests).push((id, request));

        let queued = lock(&self.outcomes)
            .get_mut(&kind)
            .and_then(VecDeque::pop_front);
        if let Some(outcome) = queued {
            debug!(%kind, request = %id, ?outcome, "mock provider completing request");
            self.complete(id, outcome.into_completion(kind, &session_name));
        }
        Ok(id)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl SessionProvider for MockProvider {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn add_completion_listener(
        &self,
        kind: OperationKind,
        sender: CompletionSender,
    ) -> ListenerHandle {
        self.listeners.add(kind, sender)
    }

    fn clear_completion_listener(&self, handle: ListenerHandle) {
        self.listeners.clear(handle);
    }

    async fn create_session(
        &self,
        user_id: &str,
        session_name: &str,
        settings: &AdvertisedSettings,
    ) -> Result<RequestId, ProviderError> {
        self.accept(ProviderRequest::Create {
            user_id: user_id.to_string(),
            session_name: session_name.to_string(),
            settings: settings.clone(),
        })
    }

    async fn start_session(&self, session_name: &str) -> Result<RequestId, ProviderError> {
        self.accept(ProviderRequest::Start {
            session_name: session_name.to_string(),
        })
    }

    async fn find_sessions(
        &self,
        user_id: &str,
        query: &SearchQuery,
    ) -> Result<RequestId, ProviderError> {
        self.accept(ProviderRequest::Find {
            user_id: user_id.to_string(),
            query: query.clone(),
        })
    }

    async fn join_session(
        &self,
        user_id: &str,
        session_name: &str,
        record: &SessionRecord,
    ) -> Result<RequestId, ProviderError> {
        self.accept(ProviderRequest::Join {
            user_id: user_id.to_string(),
            session_name: session_name.to_string(),
            record: record.clone(),
        })
    }

    async fn destroy_session(&self, session_name: &str) -> Result<RequestId, ProviderError> {
        self.accept(ProviderRequest::Destroy {
            session_name: session_name.to_string(),
        })
    }

    fn resolve_connect_string(&self, session_name: &str) -> Option<String> {
        lock(&self.connect_strings).get(session_name).cloned()
    }
}
