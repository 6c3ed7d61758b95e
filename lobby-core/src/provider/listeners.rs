//! Completion listener bookkeeping shared by provider implementations

use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tracing::trace;

use super::traits::{
    Completion, CompletionNotice, CompletionSender, ListenerHandle, OperationKind, RequestId,
};

struct Listener {
    handle: ListenerHandle,
    kind: OperationKind,
    sender: CompletionSender,
}

/// Registry of completion listeners keyed by operation kind
///
/// Delivery fans a completion out to every listener of its kind; listeners
/// whose receiver was dropped are pruned on the way. The registry also mints
/// the request ids its provider hands out.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    next_request: AtomicU64,
    listeners: Mutex<Vec<Listener>>,
    registered: AtomicUsize,
    cleared: AtomicUsize,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, kind: OperationKind, sender: CompletionSender) -> ListenerHandle {
        let handle = ListenerHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.lock().push(Listener {
            handle,
            kind,
            sender,
        });
        self.registered.fetch_add(1, Ordering::Relaxed);
        trace!(handle = handle.get(), %kind, "completion listener added");
        handle
    }

    /// Id for a newly accepted request
    pub fn next_request(&self) -> RequestId {
        RequestId::new(self.next_request.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Remove a listener, returning whether it was still registered
    pub fn clear(&self, handle: ListenerHandle) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|l| l.handle != handle);
        let removed = listeners.len() < before;
        if removed {
            self.cleared.fetch_add(1, Ordering::Relaxed);
            trace!(handle = handle.get(), "completion listener cleared");
        }
        removed
    }

    /// Deliver the completion of `request` to every listener of its kind
    ///
    /// Returns the number of listeners that received it.
    pub fn notify(&self, request: RequestId, completion: &Completion) -> usize {
        let kind = completion.kind();
        let mut listeners = self.lock();
        let mut delivered = 0;
        listeners.retain(|l| {
            if l.kind != kind {
                return true;
            }
            let notice = CompletionNotice {
                request,
                completion: completion.clone(),
            };
            match l.sender.send(notice) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        delivered
    }

    /// Listeners currently registered
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// Listeners ever registered
    pub fn registered_total(&self) -> usize {
        self.registered.load(Ordering::Relaxed)
    }

    /// Listeners explicitly cleared
    pub fn cleared_total(&self) -> usize {
        self.cleared.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
