//! Session data model: host requests, advertised settings and search results

mod config;
mod search;
mod settings;

pub use config::SessionConfig;
pub use search::{SearchResult, SearchSnapshot};
pub use settings::{AdvertisedSettings, SearchQuery, SessionRecord, keys};
