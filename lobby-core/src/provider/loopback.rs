//! In-process provider shared between several coordinators
//!
//! A [`LoopbackNetwork`] plays the part of the online service: sessions
//! created through one [`LoopbackProvider`] become visible to searches made
//! through every other provider on the same network once started. Each
//! accepted request completes from a spawned task, after the network's
//! configured latency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use super::listeners::ListenerRegistry;
use super::traits::{
    Completion, CompletionSender, JoinResultCode, ListenerHandle, OperationKind, RequestId,
    SessionProvider,
};
use crate::error::ProviderError;
use crate::session::{AdvertisedSettings, SearchQuery, SessionRecord};

#[derive(Debug, Clone)]
struct HostedSession {
    session_id: Uuid,
    owner_id: String,
    settings: AdvertisedSettings,
    started: bool,
    /// Users in the session, host first
    members: Vec<String>,
}

impl HostedSession {
    fn open_public_connections(&self) -> u32 {
        let members = u32::try_from(self.members.len()).unwrap_or(u32::MAX);
        self.settings.public_connections.saturating_sub(members)
    }
}

/// Shared registry of sessions visible to every loopback provider
pub struct LoopbackNetwork {
    sessions: RwLock<Vec<HostedSession>>,
    latency: Duration,
    online: AtomicBool,
}

impl LoopbackNetwork {
    /// Network delivering completions on the next scheduler turn
    pub fn new() -> Arc<Self> {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(Vec::new()),
            latency,
            online: AtomicBool::new(true),
        })
    }

    /// A provider attached to this network
    pub fn provider(self: &Arc<Self>) -> LoopbackProvider {
        LoopbackProvider {
            network: Arc::clone(self),
            listeners: Arc::new(ListenerRegistry::new()),
            hosted: Mutex::new(HashMap::new()),
            joined: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Sessions currently registered, started or not
    pub fn session_count(&self) -> usize {
        self.read().len()
    }

    /// Members of the session hosted by `owner_id`, host included
    pub fn member_count(&self, owner_id: &str) -> Option<usize> {
        self.read()
            .iter()
            .find(|s| s.owner_id == owner_id)
            .map(|s| s.members.len())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<HostedSession>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<HostedSession>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Provider view of a [`LoopbackNetwork`] for one local player
pub struct LoopbackProvider {
    network: Arc<LoopbackNetwork>,
    listeners: Arc<ListenerRegistry>,
    /// Local session name to the session this provider created
    hosted: Mutex<HashMap<String, Uuid>>,
    /// Local session name to (session, joining user)
    joined: Mutex<HashMap<String, (Uuid, String)>>,
}

impl LoopbackProvider {
    pub fn network(&self) -> &Arc<LoopbackNetwork> {
        &self.network
    }

    fn check_online(&self) -> Result<(), ProviderError> {
        if self.network.is_online() {
            Ok(())
        } else {
            Err(ProviderError::Unavailable)
        }
    }

    /// Complete a new request after the network latency, returning its id
    fn deliver(&self, completion: Completion) -> RequestId {
        let request = self.listeners.next_request();
        let listeners = Arc::clone(&self.listeners);
        let latency = self.network.latency;
        tokio::spawn(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            let delivered = listeners.notify(request, &completion);
            debug!(kind = %completion.kind(), %request, delivered, "loopback completion delivered");
        });
        request
    }

    fn join_code(
        &self,
        user_id: &str,
        session_name: &str,
        record: &SessionRecord,
    ) -> JoinResultCode {
        if lock(&self.hosted).contains_key(session_name)
            || lock(&self.joined).contains_key(session_name)
        {
            return JoinResultCode::AlreadyInSession;
        }

        let session_id = {
            let mut sessions = self.network.write();
            let Some(session) = sessions
                .iter_mut()
                .find(|s| s.started && s.session_id.to_string() == record.session_id)
            else {
                return JoinResultCode::SessionDoesNotExist;
            };
            if session.members.iter().any(|m| m == user_id) {
                return JoinResultCode::AlreadyInSession;
            }
            if session.open_public_connections() == 0 {
                return JoinResultCode::SessionIsFull;
            }
            session.members.push(user_id.to_string());
            session.session_id
        };

        lock(&self.joined).insert(session_name.to_string(), (session_id, user_id.to_string()));
        JoinResultCode::Success
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl SessionProvider for LoopbackProvider {
    fn is_available(&self) -> bool {
        self.network.is_online()
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
        self.check_online()?;
        let mut hosted = lock(&self.hosted);
        if hosted.contains_key(session_name) || lock(&self.joined).contains_key(session_name) {
            return Err(ProviderError::Rejected(format!(
                "session '{session_name}' already exists"
            )));
        }

        let session_id = Uuid::new_v4();
        self.network.write().push(HostedSession {
            session_id,
            owner_id: user_id.to_string(),
            settings: settings.clone(),
            started: false,
            members: vec![user_id.to_string()],
        });
        hosted.insert(session_name.to_string(), session_id);
        drop(hosted);

        info!(%session_id, owner_id = %user_id, session_name, "loopback session created");
        Ok(self.deliver(Completion::Created {
            session_name: session_name.to_string(),
            success: true,
        }))
    }

    async fn start_session(&self, session_name: &str) -> Result<RequestId, ProviderError> {
        self.check_online()?;
        let session_id = lock(&self.hosted)
            .get(session_name)
            .copied()
            .ok_or_else(|| ProviderError::UnknownSession(session_name.to_string()))?;

        let success = match self
            .network
            .write()
            .iter_mut()
            .find(|s| s.session_id == session_id)
        {
            Some(session) => {
                session.started = true;
                true
            }
            None => false,
        };

        Ok(self.deliver(Completion::Started {
            session_name: session_name.to_string(),
            success,
        }))
    }

    async fn find_sessions(
        &self,
        user_id: &str,
        query: &SearchQuery,
    ) -> Result<RequestId, ProviderError> {
        self.check_online()?;
        let ping_ms = u32::try_from(self.network.latency.as_millis()).unwrap_or(u32::MAX);
        let results: Vec<SessionRecord> = self
            .network
            .read()
            .iter()
            .filter(|s| s.started && s.owner_id != user_id && query.matches(&s.settings))
            .take(query.max_results)
            .map(|s| SessionRecord {
                owner_id: s.owner_id.clone(),
                session_id: s.session_id.to_string(),
                settings: s.settings.clone(),
                open_public_connections: s.open_public_connections(),
                ping_ms,
            })
            .collect();

        debug!(owner_id = %user_id, found = results.len(), "loopback search");
        Ok(self.deliver(Completion::Found {
            success: true,
            results,
        }))
    }

    async fn join_session(
        &self,
        user_id: &str,
        session_name: &str,
        record: &SessionRecord,
    ) -> Result<RequestId, ProviderError> {
        self.check_online()?;
        let result = self.join_code(user_id, session_name, record);
        debug!(owner_id = %record.owner_id, session_name, %result, "loopback join");
        Ok(self.deliver(Completion::Joined {
            session_name: session_name.to_string(),
            result,
        }))
    }

    async fn destroy_session(&self, session_name: &str) -> Result<RequestId, ProviderError> {
        self.check_online()?;

        let hosted = lock(&self.hosted).remove(session_name);
        let joined = match hosted {
            Some(_) => None,
            None => lock(&self.joined).remove(session_name),
        };

        match (hosted, joined) {
            (Some(session_id), _) => {
                self.network.write().retain(|s| s.session_id != session_id);
                info!(%session_id, session_name, "loopback session removed");
            }
            (None, Some((session_id, user_id))) => {
                if let Some(session) = self
                    .network
                    .write()
                    .iter_mut()
                    .find(|s| s.session_id == session_id)
                {
                    session.members.retain(|m| *m != user_id);
                }
                debug!(%session_id, session_name, "loopback membership left");
            }
            (None, None) => {
                return Err(ProviderError::UnknownSession(session_name.to_string()));
            }
        }

        Ok(self.deliver(Completion::Destroyed {
            session_name: session_name.to_string(),
            success: true,
        }))
    }

    fn resolve_connect_string(&self, session_name: &str) -> Option<String> {
        let (session_id, _) = lock(&self.joined).get(session_name).cloned()?;
        self.network
            .read()
            .iter()
            .find(|s| s.session_id == session_id)
            .map(|s| format!("loopback://{}/{}", s.owner_id, s.session_id))
    }
}
