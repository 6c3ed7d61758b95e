//! One-shot completion subscriptions

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::LobbyError;
use crate::provider::{
    Completion, CompletionNotice, ListenerHandle, OperationKind, RequestId, SessionProvider,
};

/// A provider listener awaiting the completion of one request
///
/// Register before issuing the request so an immediate completion is not
/// missed, then `wait` with the id the provider returned. The listener is
/// cleared exactly once: after `wait` returns, on `release`, or when the
/// subscription is dropped, whichever happens first.
pub struct CompletionSubscription {
    provider: Arc<dyn SessionProvider>,
    kind: OperationKind,
    handle: Option<ListenerHandle>,
    rx: mpsc::UnboundedReceiver<CompletionNotice>,
}

impl CompletionSubscription {
    /// Register a listener for `kind` on `provider`
    pub fn register(provider: &Arc<dyn SessionProvider>, kind: OperationKind) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = provider.add_completion_listener(kind, tx);
        Self {
            provider: Arc::clone(provider),
            kind,
            handle: Some(handle),
            rx,
        }
    }

    /// Wait for the completion of `request`, bounded by `timeout`
    ///
    /// Completions of other requests of the same kind, such as a late answer
    /// to one that already timed out, are skipped.
    pub async fn wait(
        mut self,
        request: RequestId,
        timeout: Duration,
    ) -> Result<Completion, LobbyError> {
        let kind = self.kind;
        let rx = &mut self.rx;
        let outcome = tokio::time::timeout(timeout, async move {
            while let Some(notice) = rx.recv().await {
                if notice.request == request {
                    return Some(notice.completion);
                }
                debug!(
                    %kind,
                    expected = %request,
                    stale = %notice.request,
                    "skipping completion of another request"
                );
            }
            None
        })
        .await;
        self.release();

        match outcome {
            Ok(Some(completion)) => Ok(completion),
            Ok(None) => Err(LobbyError::ProviderUnavailable),
            Err(_) => {
                warn!(%kind, %request, ?timeout, "provider completion timed out");
                Err(LobbyError::TimedOut(kind))
            }
        }
    }

    /// Clear the provider listener now
    pub fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.provider.clear_completion_listener(handle);
        }
    }
}

impl Drop for CompletionSubscription {
    fn drop(&mut self) {
        self.release();
    }
}
