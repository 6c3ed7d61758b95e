//! Session provider boundary and in-tree implementations

mod listeners;
mod loopback;
mod mock;
mod traits;

pub use listeners::ListenerRegistry;
pub use loopback::{LoopbackNetwork, LoopbackProvider};
pub use mock::{MockOutcome, MockProvider, ProviderRequest};
pub use traits::{
    Completion, CompletionNotice, CompletionSender, JoinResultCode, ListenerHandle, OperationKind,
    RequestId, SessionProvider,
};
