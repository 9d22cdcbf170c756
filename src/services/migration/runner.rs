//! Batch executor for migration plans.
//!
//! Phases run in a fixed order:
//! `Planned -> PreVerifying -> Applying(1..n) -> PostVerifying -> Completed | Aborted`.
//!
//! Batches are sequential and each one is a single transaction. Every write
//! is guarded by the key the record is expected to hold, so replaying a
//! batch that already committed changes nothing. A failing batch rolls back,
//! is logged with enough detail to replay by hand, and the run moves on.

use super::plan::{ActionKind, MigrationPlan, ReferenceAction, SkippedReference};
use super::verify::{self, ConsistencyIssue};
use super::MigrationError;
use crate::database::models::ReferenceStore;
use crate::database::{ingredient_repo, migration_run_repo, reference_repo};
use crate::types::CanonicalKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::fmt;

/// Shortest fingerprint prefix accepted as apply confirmation.
pub const MIN_CONFIRMATION_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    DryRun,
    Apply,
}

impl ExecutionMode {
    pub const fn is_apply(self) -> bool {
        matches!(self, ExecutionMode::Apply)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionMode::DryRun => "dry_run",
            ExecutionMode::Apply => "apply",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub mode: ExecutionMode,
    pub batch_size: usize,
    /// Cap on the number of plan actions executed in this run.
    pub limit: Option<usize>,
    /// Fingerprint prefix the operator typed to confirm an apply.
    pub confirmation: Option<String>,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::DryRun,
            batch_size: 100,
            limit: None,
            confirmation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum MigrationPhase {
    Planned,
    PreVerifying,
    Applying { batch: usize, of: usize },
    PostVerifying,
    Completed,
    Aborted,
}

impl fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationPhase::Planned => f.write_str("planned"),
            MigrationPhase::PreVerifying => f.write_str("verifying (pre)"),
            MigrationPhase::Applying { batch, of } => write!(f, "applying batch {batch}/{of}"),
            MigrationPhase::PostVerifying => f.write_str("verifying (post)"),
            MigrationPhase::Completed => f.write_str("completed"),
            MigrationPhase::Aborted => f.write_str("aborted"),
        }
    }
}

/// Only a consistency failure flips the verdict; record-level problems are
/// reported in the counts and failure lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunVerdict {
    Verified,
    ConsistencyCheckFailure,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationCounts {
    /// Plan actions visited (after `limit`).
    pub processed: u64,
    /// Records pointed at their target key.
    pub updated: u64,
    /// Records removed because the owner already held the target.
    pub collapsed: u64,
    /// Records already in their target state.
    pub already_applied: u64,
    /// References the plan could not translate.
    pub skipped: u64,
    /// Actions in batches that rolled back.
    pub failed: u64,
}

/// A rolled-back batch, with what is needed to replay it by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub batch_index: usize,
    pub store: ReferenceStore,
    pub record_ids: Vec<i64>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Retirement {
    pub retired_key: CanonicalKey,
    pub survivor_key: CanonicalKey,
    /// False when the row was already gone (a repeated run).
    pub row_deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub run_id: String,
    pub plan_kind: String,
    pub fingerprint: String,
    pub mode: ExecutionMode,
    pub phase: MigrationPhase,
    pub verdict: RunVerdict,
    pub batch_size: usize,
    pub batches: usize,
    pub truncated: bool,
    pub counts: MigrationCounts,
    pub pre_counts: BTreeMap<ReferenceStore, i64>,
    pub post_counts: BTreeMap<ReferenceStore, i64>,
    pub failures: Vec<BatchFailure>,
    pub skipped: Vec<SkippedReference>,
    pub consistency_issues: Vec<ConsistencyIssue>,
    pub retirement: Option<Retirement>,
    pub retirement_deferred: Option<String>,
    /// Store error that stopped the run part way; earlier batches stay committed.
    pub fatal_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl MigrationReport {
    fn new(plan: &MigrationPlan, options: &MigrationOptions, truncated: bool) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            plan_kind: plan.kind().to_string(),
            fingerprint: plan.fingerprint().to_string(),
            mode: options.mode,
            phase: MigrationPhase::Planned,
            verdict: RunVerdict::Verified,
            batch_size: options.batch_size,
            batches: 0,
            truncated,
            counts: MigrationCounts {
                skipped: plan.skipped().len() as u64,
                ..Default::default()
            },
            pre_counts: BTreeMap::new(),
            post_counts: BTreeMap::new(),
            failures: Vec::new(),
            skipped: plan.skipped().to_vec(),
            consistency_issues: Vec::new(),
            retirement: None,
            retirement_deferred: None,
            fatal_error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    fn transition(&mut self, next: MigrationPhase) {
        log::info!("Migration {} [{}]: {} -> {}", self.run_id, self.mode.as_str(), self.phase, next);
        self.phase = next;
    }

    fn abort(&mut self, issues: Vec<ConsistencyIssue>) {
        for issue in &issues {
            log::error!(
                "Consistency check failed ({:?}) on {}: {}",
                issue.boundary,
                issue.store,
                issue.message
            );
        }
        self.verdict = RunVerdict::ConsistencyCheckFailure;
        self.consistency_issues.extend(issues);
        self.transition(MigrationPhase::Aborted);
    }

    fn fail(&mut self, error: &MigrationError, retires: bool) {
        log::error!(
            "Migration {} stopped during {}: {}",
            self.run_id,
            self.phase,
            error
        );
        if retires && self.retirement.is_none() && self.retirement_deferred.is_none() {
            self.retirement_deferred = Some(format!("run stopped: {error}"));
        }
        self.fatal_error = Some(error.to_string());
        self.transition(MigrationPhase::Aborted);
    }

    /// 0 on full success, 1 when records were skipped or failed,
    /// 2 on a consistency failure, 3 when a store error stopped the run.
    pub fn exit_code(&self) -> i32 {
        if self.fatal_error.is_some() {
            3
        } else if self.verdict == RunVerdict::ConsistencyCheckFailure {
            2
        } else if self.counts.failed > 0 || self.counts.skipped > 0 {
            1
        } else {
            0
        }
    }

    pub fn status(&self) -> &'static str {
        if self.fatal_error.is_some() {
            return "failed";
        }
        match (self.verdict, self.failures.is_empty()) {
            (RunVerdict::ConsistencyCheckFailure, _) => "aborted",
            (RunVerdict::Verified, true) => "completed",
            (RunVerdict::Verified, false) => "completed_with_failures",
        }
    }
}

/// The separate gate in front of real writes.
pub fn confirm_apply(plan: &MigrationPlan, confirmation: Option<&str>) -> Result<(), MigrationError> {
    let given = confirmation.map(str::trim).unwrap_or_default();
    if given.len() < MIN_CONFIRMATION_LEN {
        return Err(MigrationError::ConfirmationRequired {
            min_len: MIN_CONFIRMATION_LEN,
        });
    }
    if !plan.fingerprint().starts_with(&given.to_lowercase()) {
        return Err(MigrationError::ConfirmationMismatch {
            given: given.to_string(),
            expected: plan.fingerprint().to_string(),
        });
    }
    Ok(())
}

/// Execute `plan` and return the full report.
///
/// Errors are reserved for refusing to start (bad fingerprint, missing
/// confirmation, invalid options, no audit row). Once started, a store
/// error ends the run with `fatal_error` set and the counts so far.
pub async fn execute(
    pool: &SqlitePool,
    plan: &MigrationPlan,
    options: &MigrationOptions,
) -> Result<MigrationReport, MigrationError> {
    if options.batch_size == 0 {
        return Err(MigrationError::InvalidBatchSize);
    }
    if !plan.verify_fingerprint() {
        return Err(MigrationError::FingerprintMismatch {
            fingerprint: plan.fingerprint().to_string(),
        });
    }
    if options.mode.is_apply() {
        confirm_apply(plan, options.confirmation.as_deref())?;
    }

    let all_actions = plan.actions();
    let take = options
        .limit
        .map_or(all_actions.len(), |limit| limit.min(all_actions.len()));
    let actions = &all_actions[..take];
    let mut report = MigrationReport::new(plan, options, take < all_actions.len());

    log::info!(
        "Migration {} [{}]: {} plan {} with {} of {} actions, batch size {}",
        report.run_id,
        options.mode.as_str(),
        plan.kind(),
        plan.fingerprint(),
        actions.len(),
        all_actions.len(),
        options.batch_size
    );

    if options.mode.is_apply() {
        migration_run_repo::insert_run(
            pool,
            &report.run_id,
            plan.kind(),
            plan.fingerprint(),
            options.mode.as_str(),
            &report.started_at.to_rfc3339(),
        )
        .await?;
    }

    if let Err(e) = run_phases(pool, plan, actions, options, &mut report).await {
        report.fail(&e, plan.retirement().is_some());
    }
    report.finished_at = Some(Utc::now());

    if options.mode.is_apply() {
        let status = report.status();
        let summary = serde_json::to_string(&report.counts).unwrap_or_default();
        if let Err(e) = migration_run_repo::finish_run(
            pool,
            &report.run_id,
            status,
            &summary,
            &Utc::now().to_rfc3339(),
        )
        .await
        {
            log::warn!("Failed to record migration run {}: {}", report.run_id, e);
        }
    }

    log::info!(
        "Migration {} finished: {} processed, {} updated, {} collapsed, {} already applied, {} skipped, {} failed",
        report.run_id,
        report.counts.processed,
        report.counts.updated,
        report.counts.collapsed,
        report.counts.already_applied,
        report.counts.skipped,
        report.counts.failed
    );
    Ok(report)
}

async fn run_phases(
    pool: &SqlitePool,
    plan: &MigrationPlan,
    actions: &[ReferenceAction],
    options: &MigrationOptions,
    report: &mut MigrationReport,
) -> Result<(), MigrationError> {
    report.transition(MigrationPhase::PreVerifying);
    report.pre_counts = verify::snapshot_counts(pool, plan.store_counts().keys().copied()).await?;
    let drift = verify::check_drift(plan, &report.pre_counts);
    if !drift.is_empty() {
        report.abort(drift);
        return Ok(());
    }

    let batches = split_batches(actions, options.batch_size);
    report.batches = batches.len();
    let mut applied: Vec<&ReferenceAction> = Vec::new();
    let mut collapses: BTreeMap<ReferenceStore, i64> = BTreeMap::new();

    for (index, batch) in batches.iter().enumerate() {
        report.transition(MigrationPhase::Applying {
            batch: index + 1,
            of: batches.len(),
        });
        report.counts.processed += batch.len() as u64;

        let outcome = if options.mode.is_apply() {
            apply_batch(pool, batch).await
        } else {
            simulate_batch(pool, batch).await
        };

        match outcome {
            Ok(tally) => {
                report.counts.updated += tally.updated;
                report.counts.collapsed += tally.collapsed;
                report.counts.already_applied += tally.already_applied;
                if tally.collapsed > 0 {
                    *collapses.entry(batch[0].store).or_default() += tally.collapsed as i64;
                }
                applied.extend(batch.iter());
            }
            Err(e) => {
                let store = batch[0].store;
                let record_ids: Vec<i64> = batch.iter().map(|a| a.record_id).collect();
                log::error!(
                    "Batch {}/{} on {} failed and was rolled back; records {:?}: {}",
                    index + 1,
                    batches.len(),
                    store,
                    record_ids,
                    e
                );
                report.counts.failed += batch.len() as u64;
                report.failures.push(BatchFailure {
                    batch_index: index + 1,
                    store,
                    record_ids,
                    error: e.to_string(),
                });
            }
        }
    }

    if !options.mode.is_apply() {
        report.post_counts = report.pre_counts.clone();
        report.retirement_deferred = plan
            .retirement()
            .map(|_| "dry run: no ingredient row is retired".to_string());
        report.transition(MigrationPhase::Completed);
        return Ok(());
    }

    report.transition(MigrationPhase::PostVerifying);
    report.post_counts = verify::snapshot_counts(pool, plan.store_counts().keys().copied()).await?;
    let mut issues = verify::check_conservation(&report.pre_counts, &report.post_counts, &collapses);
    issues.extend(verify::check_applied_records(pool, &applied).await?);
    if !issues.is_empty() {
        if plan.retirement().is_some() {
            report.retirement_deferred =
                Some("consistency check failed; the duplicate row was kept".to_string());
        }
        report.abort(issues);
        return Ok(());
    }

    if let Some((retiring, survivor)) = plan.retirement() {
        retire(pool, report, &retiring.key, &survivor.key, &retiring.display_name).await?;
    }

    report.transition(MigrationPhase::Completed);
    Ok(())
}

async fn retire(
    pool: &SqlitePool,
    report: &mut MigrationReport,
    retiring: &CanonicalKey,
    survivor: &CanonicalKey,
    display_name: &str,
) -> Result<(), MigrationError> {
    if !report.failures.is_empty() {
        report.retirement_deferred = Some(format!(
            "{} batch(es) failed; re-run the plan before retiring {}",
            report.failures.len(),
            retiring
        ));
        return Ok(());
    }
    if report.truncated {
        report.retirement_deferred = Some(format!(
            "run limited to {} action(s); re-run without --limit to retire {}",
            report.counts.processed, retiring
        ));
        return Ok(());
    }

    let residual = verify::residual_references(pool, retiring).await?;
    if !residual.is_empty() {
        log::warn!(
            "{} reference(s) still resolve to {}: {:?}",
            residual.len(),
            retiring,
            residual
        );
        report.retirement_deferred = Some(format!(
            "{} reference(s) still resolve to {}; re-plan the merge",
            residual.len(),
            retiring
        ));
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    let deleted =
        ingredient_repo::retire_ingredient(&mut *tx, retiring.as_str(), survivor.as_str(), display_name)
            .await?;
    tx.commit().await?;

    if deleted > 0 {
        log::info!("Retired ingredient {} into {}", retiring, survivor);
    } else {
        log::info!("Ingredient {} was already retired", retiring);
    }
    report.retirement = Some(Retirement {
        retired_key: retiring.clone(),
        survivor_key: survivor.clone(),
        row_deleted: deleted > 0,
    });
    Ok(())
}

/// Split into batches of at most `size` actions, never mixing stores.
fn split_batches(actions: &[ReferenceAction], size: usize) -> Vec<&[ReferenceAction]> {
    let mut batches = Vec::new();
    let mut start = 0;
    while start < actions.len() {
        let store = actions[start].store;
        let run_end = actions[start..]
            .iter()
            .position(|a| a.store != store)
            .map_or(actions.len(), |offset| start + offset);
        for chunk in actions[start..run_end].chunks(size) {
            batches.push(chunk);
        }
        start = run_end;
    }
    batches
}

#[derive(Debug, Default)]
struct BatchTally {
    updated: u64,
    collapsed: u64,
    already_applied: u64,
}

async fn apply_batch(
    pool: &SqlitePool,
    batch: &[ReferenceAction],
) -> Result<BatchTally, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut tally = BatchTally::default();

    for action in batch {
        let store = action.store;
        let to_key = action.to_key.as_str();

        // A record is only removed while some record of the same owner still
        // holds the target key; otherwise it is rewritten in place.
        let (holder, promote_required) = match action.kind {
            ActionKind::Rewrite if store.has_cached_name() => {
                let holder = reference_repo::find_owner_record(
                    &mut *tx,
                    store,
                    &action.owner_id,
                    to_key,
                    action.record_id,
                )
                .await?;
                (holder, false)
            }
            ActionKind::Rewrite => (None, false),
            ActionKind::Collapse {
                keep_record_id,
                promote_required,
            } => {
                let holder = if reference_repo::record_holds_key(
                    &mut *tx,
                    store,
                    keep_record_id,
                    &action.owner_id,
                    to_key,
                )
                .await?
                {
                    Some(keep_record_id)
                } else {
                    let other = reference_repo::find_owner_record(
                        &mut *tx,
                        store,
                        &action.owner_id,
                        to_key,
                        action.record_id,
                    )
                    .await?;
                    if other.is_none() {
                        log::warn!(
                            "{} record {}: kept record {} no longer holds {}; rewriting instead of removing",
                            store,
                            action.record_id,
                            keep_record_id,
                            to_key
                        );
                    }
                    other
                };
                (holder, promote_required)
            }
        };

        let changed = match holder {
            Some(keep_id) => {
                let removed =
                    reference_repo::delete_reference(&mut *tx, store, action.record_id, &action.from_key)
                        .await?;
                tally.collapsed += removed;
                if removed > 0 && promote_required {
                    reference_repo::mark_requirement_required(&mut *tx, keep_id).await?;
                }
                removed
            }
            None => {
                let cached = store
                    .has_cached_name()
                    .then_some(action.to_display_name.as_str());
                let updated = reference_repo::rewrite_reference(
                    &mut *tx,
                    store,
                    action.record_id,
                    &action.from_key,
                    to_key,
                    cached,
                )
                .await?;
                tally.updated += updated;
                updated
            }
        };
        if changed == 0 {
            tally.already_applied += 1;
        }
    }

    tx.commit().await?;
    Ok(tally)
}

/// Read-only pass: classify each action against the current record state.
async fn simulate_batch(
    pool: &SqlitePool,
    batch: &[ReferenceAction],
) -> Result<BatchTally, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let mut ids: Vec<i64> = batch.iter().map(|a| a.record_id).collect();
    ids.extend(batch.iter().filter_map(|a| match a.kind {
        ActionKind::Collapse { keep_record_id, .. } => Some(keep_record_id),
        ActionKind::Rewrite => None,
    }));
    ids.sort_unstable();
    ids.dedup();
    let current: BTreeMap<i64, String> =
        reference_repo::get_keys_for_ids(&mut conn, batch[0].store, &ids)
            .await?
            .into_iter()
            .collect();

    let mut tally = BatchTally::default();
    for action in batch {
        let pending = current.get(&action.record_id) == Some(&action.from_key);
        match (&action.kind, pending) {
            (_, false) => tally.already_applied += 1,
            (ActionKind::Rewrite, true) => tally.updated += 1,
            (ActionKind::Collapse { keep_record_id, .. }, true) => {
                if current.contains_key(keep_record_id) {
                    tally.collapsed += 1;
                } else {
                    tally.updated += 1;
                }
            }
        }
    }
    log::debug!(
        "Dry run on {}: {} would update, {} would collapse, {} already applied",
        batch[0].store,
        tally.updated,
        tally.collapsed,
        tally.already_applied
    );
    Ok(tally)
}

#[cfg(test)]
#[path = "tests/runner_tests.rs"]
mod tests;
