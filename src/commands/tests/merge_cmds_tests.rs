use crate::commands::merge_cmds::{plan_merge_cmd, MergeResponse};
use crate::commands::migration_cmds::read_plan;
use crate::database::models::ReferenceStore;
use crate::services::merge::MergeRequest;
use crate::test_utils::{
    init_test_db, seed_ingredient, seed_ownership, ABSOLUT, GIN, VODKA,
};
use sqlx::SqlitePool;

async fn seed(pool: &SqlitePool) {
    seed_ingredient(pool, VODKA, "Vodka", Some(101)).await;
    seed_ingredient(pool, ABSOLUT, "Absolut Vodka", Some(102)).await;
    seed_ingredient(pool, GIN, "Gin", None).await;
    seed_ownership(pool, ReferenceStore::OwnedIngredients, "alice", ABSOLUT).await;
}

fn request(candidates: &[&str], survivor: Option<&str>) -> MergeRequest {
    MergeRequest {
        candidates: candidates.iter().map(|c| c.to_string()).collect(),
        survivor: survivor.map(str::to_string),
    }
}

#[tokio::test]
async fn test_plan_merge_cmd_writes_plan_file() {
    let pool = init_test_db().await.pool;
    seed(&pool).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vodka.plan.json");

    let response = plan_merge_cmd(
        &pool,
        request(&["Vodka", "Absolut Vodka"], Some(VODKA)),
        Some(&path),
    )
    .await
    .unwrap();

    let MergeResponse::Planned {
        fingerprint,
        action_count,
        collapse_count,
        plan_path,
        ..
    } = response
    else {
        panic!("expected a plan, got {response:?}");
    };
    assert_eq!(action_count, 1);
    assert_eq!(collapse_count, 0);
    assert_eq!(plan_path, Some(path.display().to_string()));

    let saved = read_plan(&path).unwrap();
    assert_eq!(saved.kind(), "merge");
    assert_eq!(saved.fingerprint(), fingerprint);
    assert!(saved.verify_fingerprint());
}

#[tokio::test]
async fn test_plan_merge_cmd_refuses_without_survivor() {
    let pool = init_test_db().await.pool;
    seed(&pool).await;

    let response = plan_merge_cmd(&pool, request(&["Vodka", "Absolut Vodka"], None), None)
        .await
        .unwrap();

    assert!(response.is_refused());
    let MergeResponse::Refused {
        candidates,
        suggestion,
        ..
    } = response
    else {
        unreachable!();
    };
    assert_eq!(candidates.len(), 2);
    assert!(suggestion.is_some());
}

#[tokio::test]
async fn test_plan_merge_cmd_refuses_three_way_duplicate() {
    let pool = init_test_db().await.pool;
    seed(&pool).await;

    let response = plan_merge_cmd(
        &pool,
        request(&["Vodka", "Absolut Vodka", "Gin"], Some(VODKA)),
        None,
    )
    .await
    .unwrap();

    match response {
        MergeResponse::Refused {
            error, candidates, ..
        } => {
            assert!(error.contains("manual review"));
            assert_eq!(candidates.len(), 3);
        }
        other => panic!("expected refusal, got {other:?}"),
    }
}

#[tokio::test]
async fn test_plan_merge_cmd_already_merged_writes_nothing() {
    let pool = init_test_db().await.pool;
    seed(&pool).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noop.json");

    let response = plan_merge_cmd(&pool, request(&["Vodka", "101"], None), Some(&path))
        .await
        .unwrap();

    assert!(matches!(response, MergeResponse::AlreadyMerged { .. }));
    assert!(!path.exists());
}
