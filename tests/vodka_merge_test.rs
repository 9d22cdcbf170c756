mod common;

use common::{init_test_db, seed_ingredient, seed_recipe, seed_reference, user_keys};
use common::{ABSOLUT, LIME_JUICE, VODKA};
use mixwise_lib::commands::identity_cmds::normalize_cmd;
use mixwise_lib::commands::merge_cmds::{plan_merge_cmd, MergeResponse};
use mixwise_lib::commands::migration_cmds::{migration_history_cmd, run_migration_cmd, PlanSource};
use mixwise_lib::database::ingredient_repo;
use mixwise_lib::database::models::ReferenceStore;
use mixwise_lib::services::merge::MergeRequest;
use mixwise_lib::services::migration::{ExecutionMode, MigrationOptions, RunVerdict};
use std::path::Path;

async fn plan_vodka_merge(pool: &sqlx::SqlitePool, path: &Path) -> String {
    let response = plan_merge_cmd(
        pool,
        MergeRequest {
            candidates: vec!["Vodka".into(), "Absolut Vodka".into()],
            survivor: Some(VODKA.into()),
        },
        Some(path),
    )
    .await
    .unwrap();
    match response {
        MergeResponse::Planned { fingerprint, .. } => fingerprint,
        other => panic!("expected a plan, got {other:?}"),
    }
}

#[tokio::test]
async fn test_vodka_merge_end_to_end() {
    let pool = init_test_db().await.pool;
    seed_ingredient(&pool, VODKA, "Vodka", Some(1)).await;
    seed_ingredient(&pool, ABSOLUT, "Absolut Vodka", Some(2)).await;
    seed_ingredient(&pool, LIME_JUICE, "Lime Juice", Some(3)).await;
    // The user owns Vodka only through the duplicate key.
    seed_reference(&pool, ReferenceStore::OwnedIngredients, "user-1", ABSOLUT).await;
    seed_reference(&pool, ReferenceStore::ShoppingList, "user-1", ABSOLUT).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vodka.json");
    let fingerprint = plan_vodka_merge(&pool, &path).await;

    let dry = run_migration_cmd(
        &pool,
        PlanSource::File(path.clone()),
        MigrationOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(dry.counts.processed, 2);
    assert_eq!(user_keys(&pool, ReferenceStore::OwnedIngredients, "user-1").await, vec![ABSOLUT]);

    let report = run_migration_cmd(
        &pool,
        PlanSource::File(path),
        MigrationOptions {
            mode: ExecutionMode::Apply,
            confirmation: Some(fingerprint[..8].to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(report.verdict, RunVerdict::Verified);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.counts.updated, 2);
    assert_eq!(report.counts.failed, 0);
    for store in [ReferenceStore::OwnedIngredients, ReferenceStore::ShoppingList] {
        assert_eq!(report.pre_counts.get(&store), Some(&1));
        assert_eq!(report.post_counts.get(&store), Some(&1));
    }

    assert_eq!(user_keys(&pool, ReferenceStore::OwnedIngredients, "user-1").await, vec![VODKA]);
    assert_eq!(user_keys(&pool, ReferenceStore::ShoppingList, "user-1").await, vec![VODKA]);

    let mut conn = pool.acquire().await.unwrap();
    assert!(ingredient_repo::get_ingredient(&mut conn, ABSOLUT)
        .await
        .unwrap()
        .is_none());
    assert!(ingredient_repo::is_key_retired(&mut conn, ABSOLUT)
        .await
        .unwrap());
    drop(conn);

    // The retired key now reports where it went instead of resolving.
    let outcomes = normalize_cmd(&pool, &[ABSOLUT.to_string(), "Absolut Vodka".to_string()])
        .await
        .unwrap();
    assert_eq!(
        outcomes[0].error.as_ref().map(|e| e.kind()),
        Some("orphaned_canonical_key")
    );
    assert!(!outcomes[1].is_resolved());

    let history = migration_history_cmd(&pool, 5).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].mode, "apply");
    assert_eq!(history[0].status, "completed");
}

#[tokio::test]
async fn test_vodka_merge_rerun_is_noop() {
    let pool = init_test_db().await.pool;
    seed_ingredient(&pool, VODKA, "Vodka", None).await;
    seed_ingredient(&pool, ABSOLUT, "Absolut Vodka", None).await;
    seed_reference(&pool, ReferenceStore::OwnedIngredients, "user-1", ABSOLUT).await;
    seed_reference(&pool, ReferenceStore::OwnedIngredients, "user-2", VODKA).await;
    seed_recipe(&pool, "screwdriver", "Screwdriver", &[(ABSOLUT, false)]).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vodka.json");
    let fingerprint = plan_vodka_merge(&pool, &path).await;
    let options = MigrationOptions {
        mode: ExecutionMode::Apply,
        confirmation: Some(fingerprint.clone()),
        ..Default::default()
    };

    let first = run_migration_cmd(&pool, PlanSource::File(path.clone()), options.clone())
        .await
        .unwrap();
    assert_eq!(first.counts.updated, 2);

    let second = run_migration_cmd(&pool, PlanSource::File(path), options)
        .await
        .unwrap();
    assert_eq!(second.verdict, RunVerdict::Verified);
    assert_eq!(second.counts.updated, 0);
    assert_eq!(second.counts.already_applied, 2);
    assert_eq!(second.exit_code(), 0);

    assert_eq!(user_keys(&pool, ReferenceStore::OwnedIngredients, "user-1").await, vec![VODKA]);
    assert_eq!(user_keys(&pool, ReferenceStore::OwnedIngredients, "user-2").await, vec![VODKA]);
}
