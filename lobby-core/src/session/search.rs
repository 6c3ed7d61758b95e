//! Cached search results and their caller-facing projection

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::settings::SessionRecord;

/// Caller-facing view of one found session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub owner_id: String,
    pub display_name: String,
    pub open_connections: u32,
    pub max_connections: u32,
    pub has_password: bool,
    pub map_or_level_id: String,
}

impl From<&SessionRecord> for SearchResult {
    fn from(record: &SessionRecord) -> Self {
        let settings = &record.settings;
        let max_connections = settings.public_connections;
        Self {
            owner_id: record.owner_id.clone(),
            display_name: settings.party_name().unwrap_or_default().to_string(),
            open_connections: record.open_public_connections.min(max_connections),
            max_connections,
            has_password: settings.has_password(),
            map_or_level_id: settings.map_name().unwrap_or_default().to_string(),
        }
    }
}

/// Results of the most recent successful search
///
/// Cloning shares the underlying records.
#[derive(Debug, Clone, Default)]
pub struct SearchSnapshot {
    records: Arc<[SessionRecord]>,
}

impl SearchSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(records: Vec<SessionRecord>) -> Self {
        Self {
            records: records.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    /// Projected results, in provider order
    pub fn results(&self) -> Vec<SearchResult> {
        self.records.iter().map(SearchResult::from).collect()
    }

    pub fn find_owner(&self, owner_id: &str) -> Option<&SessionRecord> {
        self.records.iter().find(|r| r.owner_id == owner_id)
    }

    /// Compare `candidate` against the password advertised by `owner_id`'s session
    ///
    /// False when the owner is not cached or no password is advertised.
    pub fn check_password(&self, owner_id: &str, candidate: &str) -> bool {
        self.find_owner(owner_id)
            .and_then(|r| r.settings.password())
            .is_some_and(|password| password == candidate)
    }
}
