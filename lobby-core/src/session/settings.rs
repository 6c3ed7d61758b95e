//! Provider-side advertised session data and search queries

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::config::SessionConfig;
use crate::config::{PasswordAdvertisement, SearchSettings};

/// Advertised attribute keys
pub mod keys {
    pub const PARTY_NAME: &str = "Party Name";
    pub const MAP_NAME: &str = "MAPNAME";
    pub const HAS_PASSWORD: &str = "HasPassword";
    pub const PASSWORD: &str = "Password";
}

/// Settings a session is created and advertised with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertisedSettings {
    pub is_lan: bool,
    pub uses_presence: bool,
    pub public_connections: u32,
    pub private_connections: u32,
    pub allow_invites: bool,
    pub allow_join_in_progress: bool,
    pub should_advertise: bool,
    pub allow_join_via_presence: bool,
    pub allow_join_via_presence_friends_only: bool,
    /// Searchable key/value attributes
    pub attributes: BTreeMap<String, String>,
}

impl AdvertisedSettings {
    /// Derive advertised settings from a host request
    pub fn from_config(config: &SessionConfig, passwords: PasswordAdvertisement) -> Self {
        let mut settings = Self {
            is_lan: config.is_lan,
            uses_presence: config.uses_presence,
            public_connections: config.max_players,
            private_connections: 0,
            allow_invites: true,
            allow_join_in_progress: true,
            should_advertise: true,
            allow_join_via_presence: true,
            allow_join_via_presence_friends_only: false,
            attributes: BTreeMap::new(),
        };

        settings.set(keys::PARTY_NAME, &config.display_name);
        settings.set(keys::MAP_NAME, &config.map_or_level_id);

        if let Some(password) = config.password() {
            settings.set(keys::HAS_PASSWORD, "true");
            if passwords == PasswordAdvertisement::Cleartext {
                settings.set(keys::PASSWORD, password);
            }
        }

        settings
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn party_name(&self) -> Option<&str> {
        self.get(keys::PARTY_NAME)
    }

    pub fn map_name(&self) -> Option<&str> {
        self.get(keys::MAP_NAME)
    }

    /// Stored password, present only when advertised in cleartext
    pub fn password(&self) -> Option<&str> {
        self.get(keys::PASSWORD)
    }

    pub fn has_password(&self) -> bool {
        self.contains(keys::HAS_PASSWORD) || self.contains(keys::PASSWORD)
    }
}

/// A session as returned by a provider search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// User that owns (hosts) the session
    pub owner_id: String,
    /// Provider-assigned session identity
    pub session_id: String,
    pub settings: AdvertisedSettings,
    /// Public slots still free
    pub open_public_connections: u32,
    pub ping_ms: u32,
}

/// Filters for a provider search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub is_lan_query: bool,
    pub max_results: usize,
    pub ping_bucket_size: u32,
    /// Presence filter, only set when presence sessions were requested
    pub presence: Option<bool>,
}

impl SearchQuery {
    pub fn new(is_lan: bool, uses_presence: bool, settings: &SearchSettings) -> Self {
        Self {
            is_lan_query: is_lan,
            max_results: settings.max_results,
            ping_bucket_size: settings.ping_bucket_size,
            presence: uses_presence.then_some(true),
        }
    }

    /// Whether an advertised session passes this query's filters
    pub fn matches(&self, settings: &AdvertisedSettings) -> bool {
        if !settings.should_advertise || settings.is_lan != self.is_lan_query {
            return false;
        }
        match self.presence {
            Some(presence) => settings.uses_presence == presence,
            None => true,
        }
    }
}
