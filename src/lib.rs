pub mod cli;
pub mod commands;
pub mod database;
pub mod services;
pub mod types;
#[cfg(test)]
pub mod test_utils;

use anyhow::Context;
use services::config::{load_env_config, ConfigService};

/// Run one `mixwise-admin` invocation and return its exit code.
///
/// Configuration layers apply in order: defaults, `.env` and the process
/// environment, the `engine_settings` table, then command-line flags.
pub async fn run(cli: cli::Cli) -> anyhow::Result<i32> {
    let mut base = load_env_config();
    if let Some(url) = cli.database_url {
        base.database_url = url;
    }

    let _ = env_logger::Builder::new()
        .parse_filters(&base.log_filter)
        .format_timestamp_millis()
        .try_init();

    let pool = database::connect(&base.database_url)
        .await
        .with_context(|| format!("failed to open database {}", base.database_url))?;
    log::debug!("Connected to {}", base.database_url);

    let config = ConfigService::init(pool.clone(), base).await;

    let outcome = cli::dispatch(&pool, &config, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&outcome.output)?);

    pool.close().await;
    Ok(outcome.exit_code)
}
