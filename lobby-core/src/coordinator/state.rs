//! Coordinator lifecycle states and the owned-session record

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::OperationKind;

/// Lifecycle state of a coordinator
///
/// Searching is tracked separately: a find can be in flight in any state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    #[default]
    Idle,
    /// Create issued, awaiting completion
    Creating,
    /// Start issued, awaiting completion
    Starting,
    /// Hosting a started session
    Hosting,
    /// Join issued, awaiting completion
    Joining,
    /// Joined another player's session
    Joined,
    /// Destroy issued, awaiting completion
    Destroying,
}

impl CoordinatorState {
    /// Provider operation this state is waiting on, if any
    pub fn in_flight(&self) -> Option<OperationKind> {
        match self {
            Self::Creating => Some(OperationKind::Create),
            Self::Starting => Some(OperationKind::Start),
            Self::Joining => Some(OperationKind::Join),
            Self::Destroying => Some(OperationKind::Destroy),
            Self::Idle | Self::Hosting | Self::Joined => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Creating => "creating",
            Self::Starting => "starting",
            Self::Hosting => "hosting",
            Self::Joining => "joining",
            Self::Joined => "joined",
            Self::Destroying => "destroying",
        }
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the local player takes part in the owned session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    Host,
    Client,
}

/// The single session a coordinator owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedSession {
    pub name: String,
    pub role: SessionRole,
    /// Level opened by the host
    pub level: Option<String>,
    /// Address a client travels to
    pub connect_string: Option<String>,
    pub since: DateTime<Utc>,
}

impl OwnedSession {
    pub fn hosted(name: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: SessionRole::Host,
            level: Some(level.into()),
            connect_string: None,
            since: Utc::now(),
        }
    }

    pub fn joined(name: impl Into<String>, connect_string: Option<String>) -> Self {
        Self {
            name: name.into(),
            role: SessionRole::Client,
            level: None,
            connect_string,
            since: Utc::now(),
        }
    }
}
