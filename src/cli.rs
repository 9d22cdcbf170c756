//! `mixwise-admin` argument parsing and dispatch.
//!
//! Every subcommand prints one JSON document on stdout and maps its result
//! to an exit code: 0 success, 1 skipped or unresolved records (or
//! validation errors), 2 consistency failure, 3 a migration stopped by a
//! store error. Usage and other fatal errors are mapped to 3 by the binary.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::PathBuf;

use crate::commands::catalog_cmds::{import_catalog_cmd, validate_catalog_cmd};
use crate::commands::identity_cmds::{latent_duplicates_cmd, normalize_cmd};
use crate::commands::match_cmds::{match_cmd, OwnedSource};
use crate::commands::merge_cmds::plan_merge_cmd;
use crate::commands::migration_cmds::{migration_history_cmd, run_migration_cmd, PlanSource};
use crate::commands::settings_cmds::{get_settings_cmd, set_batch_size_cmd, set_match_limit_cmd};
use crate::services::config::ConfigService;
use crate::services::merge::MergeRequest;
use crate::services::migration::{ExecutionMode, MigrationOptions};
use crate::types::errors::CommandResult;

pub const EXIT_OK: i32 = 0;
pub const EXIT_INCOMPLETE: i32 = 1;
pub const EXIT_USAGE: i32 = 3;

#[derive(Debug, Parser)]
#[command(
    name = "mixwise-admin",
    about = "Ingredient identity reconciliation and recipe matchability tools",
    version
)]
pub struct Cli {
    /// SQLite URL; overrides MIXWISE_DATABASE_URL.
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve identifiers of any shape to canonical keys.
    Normalize {
        #[arg(required = true)]
        identifiers: Vec<String>,
    },

    /// Plan merging duplicate ingredients into one survivor. Never writes
    /// to the stores.
    #[command(name = "plan-merge")]
    PlanMerge(PlanMergeArgs),

    /// Execute a merge or normalization plan (dry run unless --apply).
    #[command(name = "run-migration")]
    RunMigration(RunMigrationArgs),

    /// List ready and one-away recipes for an owned set.
    Match(MatchArgs),

    /// Check catalog rules and every stored reference.
    #[command(name = "validate-catalog")]
    ValidateCatalog,

    /// Report exact and possible duplicate ingredients.
    #[command(name = "latent-duplicates")]
    LatentDuplicates,

    /// Import ingredients and recipes from a JSON document.
    #[command(name = "import-catalog")]
    ImportCatalog { path: PathBuf },

    /// Show recent applied migration runs.
    History {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// Show or change persisted engine settings.
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct PlanMergeArgs {
    /// Names or keys believed to denote one ingredient.
    #[arg(required = true, num_args = 1..)]
    pub candidates: Vec<String>,

    /// The ingredient that keeps its key.
    #[arg(long)]
    pub survivor: Option<String>,

    /// Write the plan here for a later `run-migration`.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RunMigrationArgs {
    /// Plan file written by `plan-merge` or `--save-plan`.
    #[arg(required_unless_present = "normalize", conflicts_with = "normalize")]
    pub plan: Option<PathBuf>,

    /// Build a normalization plan from the current stores.
    #[arg(long)]
    pub normalize: bool,

    /// With --normalize, also write the plan to this file.
    #[arg(long, requires = "normalize")]
    pub save_plan: Option<PathBuf>,

    /// Write to the stores. Requires --confirm.
    #[arg(long)]
    pub apply: bool,

    /// Fingerprint prefix printed by the dry run.
    #[arg(long)]
    pub confirm: Option<String>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Execute at most this many plan actions.
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct MatchArgs {
    /// Match against this user's stored ingredients.
    #[arg(long, conflicts_with = "owned", required_unless_present = "owned")]
    pub user: Option<String>,

    /// Owned identifiers of any shape.
    #[arg(long, num_args = 1..)]
    pub owned: Vec<String>,

    /// Cap on each result list.
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub set_batch_size: Option<usize>,

    #[arg(long, conflicts_with = "clear_match_limit")]
    pub set_match_limit: Option<usize>,

    #[arg(long)]
    pub clear_match_limit: bool,
}

/// Result of one subcommand: the JSON to print and the exit code.
#[derive(Debug)]
pub struct Outcome {
    pub output: serde_json::Value,
    pub exit_code: i32,
}

impl Outcome {
    fn new<T: Serialize>(value: &T, exit_code: i32) -> CommandResult<Self> {
        Ok(Self {
            output: serde_json::to_value(value)?,
            exit_code,
        })
    }
}

fn exit_if(incomplete: bool) -> i32 {
    if incomplete {
        EXIT_INCOMPLETE
    } else {
        EXIT_OK
    }
}

pub async fn dispatch(
    pool: &SqlitePool,
    config: &ConfigService,
    command: Commands,
) -> CommandResult<Outcome> {
    let settings = config.get_settings();

    match command {
        Commands::Normalize { identifiers } => {
            let outcomes = normalize_cmd(pool, &identifiers).await?;
            let incomplete = outcomes.iter().any(|o| !o.is_resolved());
            Outcome::new(&outcomes, exit_if(incomplete))
        }
        Commands::PlanMerge(args) => {
            let request = MergeRequest {
                candidates: args.candidates,
                survivor: args.survivor,
            };
            let response = plan_merge_cmd(pool, request, args.out.as_deref()).await?;
            Outcome::new(&response, exit_if(response.is_refused()))
        }
        Commands::RunMigration(args) => {
            let source = match args.plan {
                Some(path) if !args.normalize => PlanSource::File(path),
                _ => PlanSource::Normalize {
                    save_to: args.save_plan,
                },
            };
            let options = MigrationOptions {
                mode: if args.apply {
                    ExecutionMode::Apply
                } else {
                    ExecutionMode::DryRun
                },
                batch_size: args.batch_size.unwrap_or(settings.batch_size),
                limit: args.limit,
                confirmation: args.confirm,
            };
            let report = run_migration_cmd(pool, source, options).await?;
            if !report.mode.is_apply() {
                log::info!(
                    "Dry run only. To apply: run-migration --apply --confirm {}",
                    &report.fingerprint[..report.fingerprint.len().min(12)]
                );
            }
            Outcome::new(&report, report.exit_code())
        }
        Commands::Match(args) => {
            let source = match args.user {
                Some(user) => OwnedSource::User(user),
                None => OwnedSource::Identifiers(args.owned),
            };
            let limit = args.limit.or(settings.match_limit);
            let response = match_cmd(pool, source, limit).await?;
            let incomplete =
                !response.unresolved_owned.is_empty() || !response.excluded_recipes.is_empty();
            Outcome::new(&response, exit_if(incomplete))
        }
        Commands::ValidateCatalog => {
            let report = validate_catalog_cmd(pool).await?;
            Outcome::new(&report, exit_if(!report.is_valid()))
        }
        Commands::LatentDuplicates => {
            let report = latent_duplicates_cmd(pool).await?;
            Outcome::new(&report, EXIT_OK)
        }
        Commands::ImportCatalog { path } => {
            let summary = import_catalog_cmd(pool, &path).await?;
            Outcome::new(&summary, exit_if(!summary.unresolved_requirements.is_empty()))
        }
        Commands::History { limit } => {
            let runs = migration_history_cmd(pool, limit).await?;
            Outcome::new(&runs, EXIT_OK)
        }
        Commands::Config(args) => {
            if let Some(size) = args.set_batch_size {
                set_batch_size_cmd(config, size).await?;
            }
            if let Some(limit) = args.set_match_limit {
                set_match_limit_cmd(config, Some(limit)).await?;
            } else if args.clear_match_limit {
                set_match_limit_cmd(config, None).await?;
            }
            Outcome::new(&get_settings_cmd(config).await?, EXIT_OK)
        }
    }
}

#[cfg(test)]
#[path = "tests/cli_tests.rs"]
mod tests;
