//! Event type definitions

use serde::{Deserialize, Serialize};

use crate::coordinator::CoordinatorState;
use crate::error::LobbyError;

/// Events published by a session coordinator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LobbyEvent {
    /// Coordinator moved between lifecycle states
    StateChanged {
        from: CoordinatorState,
        to: CoordinatorState,
    },

    /// Created session was started; the host should open `level` listening
    HostingStarted { session_name: String, level: String },

    /// Create/start cycle ended without a hosted session
    HostingFailed { error: LobbyError },

    /// A find completed (or was refused because no provider was reachable)
    SearchCompleted { success: bool, result_count: usize },

    /// Join succeeded and the session's address is known
    JoinResolved {
        session_name: String,
        connect_string: String,
    },

    /// Join did not produce a usable connection
    JoinFailed { error: LobbyError },

    /// Owned session was destroyed; return to the menu
    ReturnedToIdle { session_name: String },

    /// Provider reported the destroy as failed
    DestroyFailed { error: LobbyError },
}

impl LobbyEvent {
    /// Session this event concerns, if any
    pub fn session_name(&self) -> Option<&str> {
        match self {
            Self::HostingStarted { session_name, .. }
            | Self::JoinResolved { session_name, .. }
            | Self::ReturnedToIdle { session_name } => Some(session_name),
            _ => None,
        }
    }

    /// Whether this event reports a failure
    pub fn is_failure(&self) -> bool {
        match self {
            Self::HostingFailed { .. } | Self::JoinFailed { .. } | Self::DestroyFailed { .. } => {
                true
            }
            Self::SearchCompleted { success, .. } => !success,
            _ => false,
        }
    }
}
