use crate::services::config::{ConfigService, EngineConfig};
use crate::types::errors::{CommandError, CommandResult};

pub async fn get_settings_cmd(state: &ConfigService) -> CommandResult<EngineConfig> {
    Ok(state.get_settings())
}

pub async fn set_batch_size_cmd(
    state: &ConfigService,
    batch_size: usize,
) -> CommandResult<EngineConfig> {
    state
        .set_batch_size(batch_size)
        .await
        .map_err(CommandError::Validation)?;
    Ok(state.get_settings())
}

/// `None` clears the persisted limit.
pub async fn set_match_limit_cmd(
    state: &ConfigService,
    limit: Option<usize>,
) -> CommandResult<EngineConfig> {
    state
        .set_match_limit(limit)
        .await
        .map_err(CommandError::Validation)?;
    Ok(state.get_settings())
}
