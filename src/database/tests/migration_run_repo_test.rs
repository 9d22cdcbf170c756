use super::*;

#[tokio::test]
async fn test_insert_and_finish_run() {
    let pool = crate::test_utils::init_test_db().await.pool;

    insert_run(&pool, "run-1", "merge", "abc123", "apply", "2026-10-18T10:00:00Z")
        .await
        .unwrap();
    let updated = finish_run(
        &pool,
        "run-1",
        "completed",
        r#"{"processed":2}"#,
        "2026-10-18T10:00:01Z",
    )
    .await
    .unwrap();
    assert_eq!(updated, 1);

    let runs = get_recent_runs(&pool, 10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, "completed");
    assert_eq!(runs[0].plan_kind, "merge");
    assert!(runs[0].finished_at.is_some());
}

#[tokio::test]
async fn test_finish_unknown_run_updates_nothing() {
    let pool = crate::test_utils::init_test_db().await.pool;
    let updated = finish_run(&pool, "missing", "completed", "{}", "2026-10-18T10:00:00Z")
        .await
        .unwrap();
    assert_eq!(updated, 0);
}
