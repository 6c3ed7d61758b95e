//! Caller-supplied description of a session to host

use serde::{Deserialize, Serialize};

use crate::error::LobbyError;

/// Desired attributes of a session the caller wants to host
///
/// Consumed by [`crate::coordinator::SessionCoordinator::host`]; only the
/// advertised attributes derived from it outlive the create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Searchable party name
    pub display_name: String,
    /// Restrict the session to the local network
    pub is_lan: bool,
    /// Advertise through presence
    pub uses_presence: bool,
    /// Public slots, host included
    pub max_players: u32,
    /// Join password, if any
    pub password: Option<String>,
    /// Level the host travels to once the session is started
    pub map_or_level_id: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            display_name: "Party".to_string(),
            is_lan: false,
            uses_presence: false,
            max_players: 4,
            password: None,
            map_or_level_id: "TestMap2".to_string(),
        }
    }
}

impl SessionConfig {
    /// Create a config with the given party name and level, other fields defaulted
    pub fn new(display_name: impl Into<String>, map_or_level_id: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            map_or_level_id: map_or_level_id.into(),
            ..Self::default()
        }
    }

    pub fn with_max_players(mut self, max_players: u32) -> Self {
        self.max_players = max_players;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_lan(mut self, is_lan: bool) -> Self {
        self.is_lan = is_lan;
        self
    }

    pub fn with_presence(mut self, uses_presence: bool) -> Self {
        self.uses_presence = uses_presence;
        self
    }

    /// The password, treating an empty string as none
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// Check the config can be hosted
    pub fn validate(&self) -> Result<(), LobbyError> {
        if self.max_players == 0 {
            return Err(LobbyError::InvalidConfig(
                "max_players must be greater than zero".to_string(),
            ));
        }
        if self.map_or_level_id.trim().is_empty() {
            return Err(LobbyError::InvalidConfig(
                "map_or_level_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
