pub mod models;

pub use models::*;

use crate::database::settings_repo;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Mutex;

/// Layer `MIXWISE_*` variables over `config`. Unparseable numbers are
/// ignored with a warning.
pub fn apply_env<F>(mut config: EngineConfig, lookup: F) -> EngineConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("MIXWISE_DATABASE_URL").filter(|v| !v.trim().is_empty()) {
        config.database_url = url.trim().to_string();
    }
    if let Some(raw) = lookup("MIXWISE_BATCH_SIZE") {
        match parse_batch_size(&raw) {
            Some(size) => config.batch_size = size,
            None => log::warn!("Ignoring MIXWISE_BATCH_SIZE={raw}: expected a positive integer"),
        }
    }
    if let Some(raw) = lookup("MIXWISE_MATCH_LIMIT") {
        match raw.trim().parse::<usize>() {
            Ok(limit) => config.match_limit = Some(limit),
            Err(_) => log::warn!("Ignoring MIXWISE_MATCH_LIMIT={raw}: expected an integer"),
        }
    }
    if let Some(filter) = lookup("MIXWISE_LOG").filter(|v| !v.trim().is_empty()) {
        config.log_filter = filter.trim().to_string();
    }
    config
}

/// Defaults, then `.env`, then the process environment.
pub fn load_env_config() -> EngineConfig {
    let _ = dotenvy::dotenv(); // Try to load .env, ignore if missing
    apply_env(EngineConfig::default(), |key| std::env::var(key).ok())
}

fn parse_batch_size(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|size| *size >= 1)
}

/// Layer persisted overrides from `engine_settings` over `config`.
pub fn apply_overrides(mut config: EngineConfig, kv: &HashMap<String, String>) -> EngineConfig {
    if let Some(size) = kv.get(SETTING_BATCH_SIZE).and_then(|v| parse_batch_size(v)) {
        config.batch_size = size;
    }
    if let Some(raw) = kv.get(SETTING_MATCH_LIMIT) {
        config.match_limit = raw.trim().parse::<usize>().ok();
    }
    config
}

pub struct ConfigService {
    pool: SqlitePool,
    settings: Mutex<EngineConfig>,
}

impl ConfigService {
    /// Start from `base` and apply the overrides stored in the database.
    pub async fn init(pool: SqlitePool, base: EngineConfig) -> Self {
        let settings = Self::load_from_db(&pool, base).await;
        Self {
            pool,
            settings: Mutex::new(settings),
        }
    }

    async fn load_from_db(pool: &SqlitePool, base: EngineConfig) -> EngineConfig {
        match settings_repo::get_all_settings(pool).await {
            Ok(kv) => apply_overrides(base, &kv),
            Err(e) => {
                log::error!("Failed to load settings from DB: {e}");
                base
            }
        }
    }

    pub fn get_settings(&self) -> EngineConfig {
        self.settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub async fn set_batch_size(&self, batch_size: usize) -> Result<(), String> {
        if batch_size == 0 {
            return Err("Batch size must be at least 1".to_string());
        }
        settings_repo::set_setting(&self.pool, SETTING_BATCH_SIZE, &batch_size.to_string())
            .await
            .map_err(|e| e.to_string())?;
        self.settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .batch_size = batch_size;
        Ok(())
    }

    /// `None` removes the persisted limit.
    pub async fn set_match_limit(&self, limit: Option<usize>) -> Result<(), String> {
        match limit {
            Some(limit) => {
                settings_repo::set_setting(&self.pool, SETTING_MATCH_LIMIT, &limit.to_string())
                    .await
                    .map_err(|e| e.to_string())?;
            }
            None => {
                settings_repo::delete_setting(&self.pool, SETTING_MATCH_LIMIT)
                    .await
                    .map_err(|e| e.to_string())?;
            }
        }
        self.settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .match_limit = limit;
        Ok(())
    }

    /// Get a reference to the pool (for use in commands that need direct DB access).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
