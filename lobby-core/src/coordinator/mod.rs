//! Session lifecycle coordination

mod machine;
mod state;
mod subscription;

pub use machine::{DestroyOutcome, SessionCoordinator};
pub use state::{CoordinatorState, OwnedSession, SessionRole};
pub use subscription::CompletionSubscription;
