//! Migration runner: plan documents, normalization planning, and the
//! verified batch executor.

pub mod normalization;
pub mod plan;
pub mod runner;
pub mod verify;

pub use normalization::{build_normalization_plan, plan_normalization_from_store};
pub use plan::{
    load_store_snapshots, ActionKind, MergePlan, MigrationPlan, NormalizationPlan,
    ReferenceAction, SkippedReference, StoreSnapshot,
};
pub use runner::{
    confirm_apply, execute, BatchFailure, ExecutionMode, MigrationCounts, MigrationOptions,
    MigrationPhase, MigrationReport, Retirement, RunVerdict, MIN_CONFIRMATION_LEN,
};
pub use verify::{ConsistencyIssue, VerificationBoundary};

use thiserror::Error;

/// Reasons a run refuses to start or cannot read the stores.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Plan fingerprint {fingerprint} does not match the plan content")]
    FingerprintMismatch { fingerprint: String },

    #[error("Applying a plan requires --confirm with at least {min_len} characters of its fingerprint")]
    ConfirmationRequired { min_len: usize },

    #[error("Confirmation '{given}' does not match plan fingerprint {expected}")]
    ConfirmationMismatch { given: String, expected: String },

    #[error("Batch size must be at least 1")]
    InvalidBatchSize,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for MigrationError {
    fn from(error: sqlx::Error) -> Self {
        MigrationError::Database(error.to_string())
    }
}
