//! Coordinator configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::provider::OperationKind;

/// Session name used when none is configured
pub const DEFAULT_SESSION_NAME: &str = "Game";

/// Level the facade returns to after a session is destroyed
pub const DEFAULT_MENU_LEVEL: &str = "MainMenu";

/// Upper bound on results requested from the provider
pub const DEFAULT_MAX_SEARCH_RESULTS: usize = 20;

/// Ping bucket size passed along with every search
pub const DEFAULT_PING_BUCKET_SIZE: u32 = 100;

/// Seconds to wait for any single provider completion
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for a [`crate::coordinator::SessionCoordinator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Name of the local session this coordinator creates and destroys
    #[serde(default = "default_session_name")]
    pub session_name: String,

    /// Level to return to once the owned session is gone
    #[serde(default = "default_menu_level")]
    pub menu_level: String,

    /// How a session password is exposed in advertised attributes
    #[serde(default)]
    pub password_advertisement: PasswordAdvertisement,

    #[serde(default)]
    pub timeouts: OperationTimeouts,

    #[serde(default)]
    pub search: SearchSettings,
}

fn default_session_name() -> String {
    DEFAULT_SESSION_NAME.to_string()
}

fn default_menu_level() -> String {
    DEFAULT_MENU_LEVEL.to_string()
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            session_name: default_session_name(),
            menu_level: default_menu_level(),
            password_advertisement: PasswordAdvertisement::default(),
            timeouts: OperationTimeouts::default(),
            search: SearchSettings::default(),
        }
    }
}

/// Whether the password itself is advertised, or only the fact one exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordAdvertisement {
    /// Only a has-password flag is advertised
    #[default]
    FlagOnly,
    /// The password is advertised alongside the flag
    Cleartext,
}

impl PasswordAdvertisement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlagOnly => "flag_only",
            Self::Cleartext => "cleartext",
        }
    }
}

/// Per-operation completion timeouts, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationTimeouts {
    pub create_secs: u64,
    pub start_secs: u64,
    pub find_secs: u64,
    pub join_secs: u64,
    pub destroy_secs: u64,
}

impl Default for OperationTimeouts {
    fn default() -> Self {
        Self::uniform(DEFAULT_TIMEOUT_SECS)
    }
}

impl OperationTimeouts {
    /// Same timeout for every operation
    pub const fn uniform(secs: u64) -> Self {
        Self {
            create_secs: secs,
            start_secs: secs,
            find_secs: secs,
            join_secs: secs,
            destroy_secs: secs,
        }
    }

    /// Timeout for a given operation kind
    pub fn for_kind(&self, kind: OperationKind) -> Duration {
        let secs = match kind {
            OperationKind::Create => self.create_secs,
            OperationKind::Start => self.start_secs,
            OperationKind::Find => self.find_secs,
            OperationKind::Join => self.join_secs,
            OperationKind::Destroy => self.destroy_secs,
        };
        Duration::from_secs(secs)
    }
}

/// Parameters attached to every session search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub max_results: usize,
    pub ping_bucket_size: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_SEARCH_RESULTS,
            ping_bucket_size: DEFAULT_PING_BUCKET_SIZE,
        }
    }
}
