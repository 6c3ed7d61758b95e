use super::types::{
    LobbyConfig, LoopbackConfig, PlayerConfig, RawCoordinatorConfig, RawHostConfig,
    RawLobbyConfig, RawLoopbackConfig, RawPlayerConfig, RawSearchSettings, RawTimeouts,
};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use lobby_core::{CoordinatorConfig, OperationTimeouts, SearchSettings, SessionConfig};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<LobbyConfig> {
        let user_path = Self::user_config_path();
        Self::load_from_paths(user_path.as_deref(), &Self::project_config_path())
    }

    /// Load from explicit paths; missing files are skipped
    pub fn load_from_paths(user: Option<&Path>, project: &Path) -> Result<LobbyConfig> {
        let mut raw = RawLobbyConfig::default();

        // Layer 1: User config
        if let Some(user_path) = user
            && let Some(user_config) = Self::read_layer(user_path)?
        {
            raw = Self::merge_raw(raw, user_config);
        }

        // Layer 2: Project config
        if let Some(project_config) = Self::read_layer(project)? {
            raw = Self::merge_raw(raw, project_config);
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "lobby").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with LOBBY_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("LOBBY_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".lobby/config.toml")
        }
    }

    fn read_layer(path: &Path) -> Result<Option<RawLobbyConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(config))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawLobbyConfig, overlay: RawLobbyConfig) -> RawLobbyConfig {
        RawLobbyConfig {
            player: RawPlayerConfig {
                name: overlay.player.name.or(base.player.name),
            },
            coordinator: RawCoordinatorConfig {
                session_name: overlay
                    .coordinator
                    .session_name
                    .or(base.coordinator.session_name),
                menu_level: overlay.coordinator.menu_level.or(base.coordinator.menu_level),
                password_advertisement: overlay
                    .coordinator
                    .password_advertisement
                    .or(base.coordinator.password_advertisement),
                timeouts: Self::merge_timeouts(
                    base.coordinator.timeouts,
                    overlay.coordinator.timeouts,
                ),
                search: RawSearchSettings {
                    max_results: overlay
                        .coordinator
                        .search
                        .max_results
                        .or(base.coordinator.search.max_results),
                    ping_bucket_size: overlay
                        .coordinator
                        .search
                        .ping_bucket_size
                        .or(base.coordinator.search.ping_bucket_size),
                },
            },
            host: RawHostConfig {
                display_name: overlay.host.display_name.or(base.host.display_name),
                is_lan: overlay.host.is_lan.or(base.host.is_lan),
                uses_presence: overlay.host.uses_presence.or(base.host.uses_presence),
                max_players: overlay.host.max_players.or(base.host.max_players),
                password: overlay.host.password.or(base.host.password),
                map_or_level_id: overlay.host.map_or_level_id.or(base.host.map_or_level_id),
            },
            loopback: RawLoopbackConfig {
                latency_ms: overlay.loopback.latency_ms.or(base.loopback.latency_ms),
            },
        }
    }

    fn merge_timeouts(base: RawTimeouts, overlay: RawTimeouts) -> RawTimeouts {
        RawTimeouts {
            create_secs: overlay.create_secs.or(base.create_secs),
            start_secs: overlay.start_secs.or(base.start_secs),
            find_secs: overlay.find_secs.or(base.find_secs),
            join_secs: overlay.join_secs.or(base.join_secs),
            destroy_secs: overlay.destroy_secs.or(base.destroy_secs),
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawLobbyConfig) -> LobbyConfig {
        let coordinator_defaults = CoordinatorConfig::default();
        let host_defaults = SessionConfig::default();
        let player_defaults = PlayerConfig::default();
        let loopback_defaults = LoopbackConfig::default();

        LobbyConfig {
            player: PlayerConfig {
                name: raw.player.name.unwrap_or(player_defaults.name),
            },
            coordinator: CoordinatorConfig {
                session_name: raw
                    .coordinator
                    .session_name
                    .unwrap_or(coordinator_defaults.session_name),
                menu_level: raw
                    .coordinator
                    .menu_level
                    .unwrap_or(coordinator_defaults.menu_level),
                password_advertisement: raw
                    .coordinator
                    .password_advertisement
                    .unwrap_or(coordinator_defaults.password_advertisement),
                timeouts: Self::finalize_timeouts(
                    raw.coordinator.timeouts,
                    coordinator_defaults.timeouts,
                ),
                search: SearchSettings {
                    max_results: raw
                        .coordinator
                        .search
                        .max_results
                        .unwrap_or(coordinator_defaults.search.max_results),
                    ping_bucket_size: raw
                        .coordinator
                        .search
                        .ping_bucket_size
                        .unwrap_or(coordinator_defaults.search.ping_bucket_size),
                },
            },
            host: SessionConfig {
                display_name: raw.host.display_name.unwrap_or(host_defaults.display_name),
                is_lan: raw.host.is_lan.unwrap_or(host_defaults.is_lan),
                uses_presence: raw.host.uses_presence.unwrap_or(host_defaults.uses_presence),
                max_players: raw.host.max_players.unwrap_or(host_defaults.max_players),
                password: raw.host.password.or(host_defaults.password),
                map_or_level_id: raw
                    .host
                    .map_or_level_id
                    .unwrap_or(host_defaults.map_or_level_id),
            },
            loopback: LoopbackConfig {
                latency_ms: raw.loopback.latency_ms.unwrap_or(loopback_defaults.latency_ms),
            },
        }
    }

    fn finalize_timeouts(raw: RawTimeouts, defaults: OperationTimeouts) -> OperationTimeouts {
        OperationTimeouts {
            create_secs: raw.create_secs.unwrap_or(defaults.create_secs),
            start_secs: raw.start_secs.unwrap_or(defaults.start_secs),
            find_secs: raw.find_secs.unwrap_or(defaults.find_secs),
            join_secs: raw.join_secs.unwrap_or(defaults.join_secs),
            destroy_secs: raw.destroy_secs.unwrap_or(defaults.destroy_secs),
        }
    }
}
