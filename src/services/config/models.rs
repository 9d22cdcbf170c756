use serde::{Deserialize, Serialize};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://mixwise.db";
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Settings-table keys that may override the environment.
pub const SETTING_BATCH_SIZE: &str = "batch_size";
pub const SETTING_MATCH_LIMIT: &str = "match_limit";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub database_url: String,
    pub batch_size: usize,
    /// Cap applied to each match list when the caller gives none.
    pub match_limit: Option<usize>,
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            match_limit: None,
            log_filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}
