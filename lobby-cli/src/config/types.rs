use lobby_core::{CoordinatorConfig, PasswordAdvertisement, SessionConfig};
use serde::{Deserialize, Serialize};

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawLobbyConfig {
    #[serde(default)]
    pub player: RawPlayerConfig,

    #[serde(default)]
    pub coordinator: RawCoordinatorConfig,

    #[serde(default)]
    pub host: RawHostConfig,

    #[serde(default)]
    pub loopback: RawLoopbackConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPlayerConfig {
    /// Local user id, also used as the display name
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCoordinatorConfig {
    pub session_name: Option<String>,
    pub menu_level: Option<String>,
    pub password_advertisement: Option<PasswordAdvertisement>,

    #[serde(default)]
    pub timeouts: RawTimeouts,

    #[serde(default)]
    pub search: RawSearchSettings,
}

/// Per-operation timeouts in seconds; unset fields fall through to lower layers
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawTimeouts {
    pub create_secs: Option<u64>,
    pub start_secs: Option<u64>,
    pub find_secs: Option<u64>,
    pub join_secs: Option<u64>,
    pub destroy_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSearchSettings {
    pub max_results: Option<usize>,
    pub ping_bucket_size: Option<u32>,
}

/// Session to host, field by field so layers can override single values
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawHostConfig {
    pub display_name: Option<String>,
    pub is_lan: Option<bool>,
    pub uses_presence: Option<bool>,
    pub max_players: Option<u32>,
    pub password: Option<String>,
    pub map_or_level_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawLoopbackConfig {
    /// Simulated provider latency in milliseconds
    pub latency_ms: Option<u64>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LobbyConfig {
    #[serde(default)]
    pub player: PlayerConfig,

    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default)]
    pub host: SessionConfig,

    #[serde(default)]
    pub loopback: LoopbackConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub name: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PLAYER_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopbackConfig {
    pub latency_ms: u64,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            latency_ms: DEFAULT_LATENCY_MS,
        }
    }
}

/// Player name when none is configured
pub const DEFAULT_PLAYER_NAME: &str = "player";

/// Default simulated latency of the loopback network
pub const DEFAULT_LATENCY_MS: u64 = 25;
