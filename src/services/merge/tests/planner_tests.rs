use super::*;
use crate::database::models::StoredReference;
use crate::services::identity::IdentityMap;
use crate::services::merge::MergeError;
use crate::services::migration::plan::{MigrationPlan, StoreSnapshot};
use crate::test_utils::{ingredient, ABSOLUT, GIN, LIME_JUICE, VODKA};
use crate::types::errors::ResolveError;

fn map() -> IdentityMap {
    IdentityMap::build(
        &[
            ingredient(VODKA, "Vodka", Some(101)),
            ingredient(ABSOLUT, "Absolut Vodka", Some(102)),
            ingredient(LIME_JUICE, "Lime Juice", None),
        ],
        &[],
    )
}

fn record(id: i64, owner: &str, key: &str, is_optional: bool) -> StoredReference {
    StoredReference {
        id,
        owner_id: owner.to_string(),
        ingredient_key: key.to_string(),
        is_optional,
    }
}

fn snapshots() -> Vec<StoreSnapshot> {
    vec![
        StoreSnapshot {
            store: ReferenceStore::OwnedIngredients,
            records: vec![
                record(1, "alice", VODKA, false),
                record(2, "alice", ABSOLUT, false),
                record(3, "bob", "102", false),
                record(4, "bob", LIME_JUICE, false),
            ],
        },
        StoreSnapshot {
            store: ReferenceStore::ShoppingList,
            records: vec![record(1, "alice", "Absolut Vodka", false)],
        },
        StoreSnapshot {
            store: ReferenceStore::RecipeIngredients,
            records: vec![
                record(1, "screwdriver", VODKA, true),
                record(2, "screwdriver", ABSOLUT, false),
                record(3, "cosmo", ABSOLUT, false),
            ],
        },
    ]
}

fn request(candidates: &[&str], survivor: Option<&str>) -> MergeRequest {
    MergeRequest {
        candidates: candidates.iter().map(|c| c.to_string()).collect(),
        survivor: survivor.map(str::to_string),
    }
}

fn planned(outcome: MergeOutcome) -> MergePlan {
    match outcome {
        MergeOutcome::Planned(plan) => *plan,
        other => panic!("expected a plan, got {other:?}"),
    }
}

#[test]
fn test_plan_merge_rewrites_and_collapses_per_owner() {
    let outcome = plan_merge(
        &map(),
        &request(&["Vodka", "Absolut Vodka"], Some("Vodka")),
        &snapshots(),
    )
    .unwrap();
    let plan = planned(outcome);

    assert_eq!(plan.survivor.key.as_str(), VODKA);
    assert_eq!(plan.retiring.key.as_str(), ABSOLUT);
    assert_eq!(plan.actions.len(), 5);

    let owned: Vec<_> = plan
        .actions
        .iter()
        .filter(|a| a.store == ReferenceStore::OwnedIngredients)
        .collect();
    assert_eq!(owned.len(), 2);
    assert_eq!(owned[0].record_id, 2);
    assert_eq!(
        owned[0].kind,
        ActionKind::Collapse {
            keep_record_id: 1,
            promote_required: false
        }
    );
    assert_eq!(owned[1].record_id, 3);
    assert_eq!(owned[1].from_key, "102");
    assert_eq!(owned[1].kind, ActionKind::Rewrite);

    let shopping: Vec<_> = plan
        .actions
        .iter()
        .filter(|a| a.store == ReferenceStore::ShoppingList)
        .collect();
    assert_eq!(shopping.len(), 1);
    assert_eq!(shopping[0].from_key, "Absolut Vodka");
    assert_eq!(shopping[0].to_display_name, "Vodka");
}

#[test]
fn test_plan_merge_promotes_required_on_recipe_collapse() {
    let plan = planned(
        plan_merge(
            &map(),
            &request(&["Vodka", "Absolut Vodka"], Some(VODKA)),
            &snapshots(),
        )
        .unwrap(),
    );

    let recipe: Vec<_> = plan
        .actions
        .iter()
        .filter(|a| a.store == ReferenceStore::RecipeIngredients)
        .collect();
    assert_eq!(recipe.len(), 2);
    assert_eq!(
        recipe[0].kind,
        ActionKind::Collapse {
            keep_record_id: 1,
            promote_required: true
        }
    );
    assert_eq!(recipe[1].owner_id, "cosmo");
    assert_eq!(recipe[1].kind, ActionKind::Rewrite);
}

#[test]
fn test_plan_merge_records_store_counts_and_fingerprint() {
    let plan = planned(
        plan_merge(
            &map(),
            &request(&["Vodka", "Absolut Vodka"], Some("Vodka")),
            &snapshots(),
        )
        .unwrap(),
    );

    assert_eq!(plan.store_counts[&ReferenceStore::OwnedIngredients], 4);
    assert_eq!(plan.store_counts[&ReferenceStore::ShoppingList], 1);
    assert_eq!(plan.store_counts[&ReferenceStore::RecipeIngredients], 3);
    assert_eq!(plan.fingerprint.len(), 32);
    assert!(MigrationPlan::Merge(plan).verify_fingerprint());
}

#[test]
fn test_plan_merge_reverse_survivor() {
    let plan = planned(
        plan_merge(
            &map(),
            &request(&["Vodka", "Absolut Vodka"], Some("Absolut Vodka")),
            &snapshots(),
        )
        .unwrap(),
    );

    assert_eq!(plan.survivor.key.as_str(), ABSOLUT);
    // alice's Vodka record collapses into her Absolut record.
    let first = &plan.actions[0];
    assert_eq!(first.record_id, 1);
    assert_eq!(
        first.kind,
        ActionKind::Collapse {
            keep_record_id: 2,
            promote_required: false
        }
    );
}

#[test]
fn test_plan_merge_single_row_is_already_merged() {
    let outcome = plan_merge(
        &map(),
        &request(&["Vodka", "vodka", "101"], None),
        &snapshots(),
    )
    .unwrap();

    match outcome {
        MergeOutcome::AlreadyMerged { ingredient } => {
            assert_eq!(ingredient.key.as_str(), VODKA)
        }
        other => panic!("expected AlreadyMerged, got {other:?}"),
    }
}

#[test]
fn test_plan_merge_requires_survivor_with_suggestion() {
    let err = plan_merge(
        &map(),
        &request(&["Vodka", "Absolut Vodka"], None),
        &snapshots(),
    )
    .unwrap_err();

    match err {
        MergeError::SurvivorRequired {
            candidates,
            suggestion,
        } => {
            assert_eq!(candidates.len(), 2);
            assert_eq!(suggestion.unwrap().key.as_str(), VODKA);
        }
        other => panic!("expected SurvivorRequired, got {other:?}"),
    }
}

#[test]
fn test_plan_merge_rejects_survivor_outside_candidates() {
    let err = plan_merge(
        &map(),
        &request(&["Vodka", "Absolut Vodka"], Some("Lime Juice")),
        &snapshots(),
    )
    .unwrap_err();

    assert!(matches!(err, MergeError::SurvivorNotCandidate { .. }));
}

#[test]
fn test_plan_merge_refuses_three_live_rows() {
    let map = IdentityMap::build(
        &[
            ingredient(VODKA, "Vodka", None),
            ingredient(ABSOLUT, "Absolut Vodka", None),
            ingredient(GIN, "vodka!", None),
        ],
        &[],
    );

    let err = plan_merge(
        &map,
        &request(&["Vodka", "Absolut Vodka"], Some("Absolut Vodka")),
        &[],
    )
    .unwrap_err();

    match err {
        MergeError::AmbiguousDuplicate { candidates } => assert_eq!(candidates.len(), 3),
        other => panic!("expected AmbiguousDuplicate, got {other:?}"),
    }
}

#[test]
fn test_plan_merge_latent_duplicate_pair_from_one_name() {
    let map = IdentityMap::build(
        &[
            ingredient(VODKA, "Vodka", None),
            ingredient(GIN, "VODKA", None),
        ],
        &[],
    );

    let plan = planned(plan_merge(&map, &request(&["vodka"], Some(VODKA)), &[]).unwrap());

    assert_eq!(plan.retiring.key.as_str(), GIN);
    assert!(plan.actions.is_empty());
}

#[test]
fn test_plan_merge_unresolved_candidate() {
    let err = plan_merge(
        &map(),
        &request(&["Vodka", "Blue Curacao"], Some("Vodka")),
        &snapshots(),
    )
    .unwrap_err();

    match err {
        MergeError::UnresolvedCandidate { name, source } => {
            assert_eq!(name, "Blue Curacao");
            assert!(matches!(source, ResolveError::UnresolvedIdentifier { .. }));
        }
        other => panic!("expected UnresolvedCandidate, got {other:?}"),
    }
}

#[test]
fn test_plan_merge_empty_candidates() {
    let err = plan_merge(&map(), &request(&[" ", ""], None), &[]).unwrap_err();
    assert!(matches!(err, MergeError::EmptyCandidates));
}

#[tokio::test]
async fn test_plan_merge_from_store_reads_snapshots() {
    let pool = crate::test_utils::init_test_db().await.pool;
    crate::test_utils::seed_ingredient(&pool, VODKA, "Vodka", None).await;
    crate::test_utils::seed_ingredient(&pool, ABSOLUT, "Absolut Vodka", None).await;
    crate::test_utils::seed_ownership(&pool, ReferenceStore::OwnedIngredients, "alice", ABSOLUT)
        .await;

    let map = crate::services::identity::load_identity_map(&pool).await.unwrap();
    let plan = planned(
        plan_merge_from_store(&pool, &map, &request(&["Vodka", "Absolut Vodka"], Some("Vodka")))
            .await
            .unwrap(),
    );

    assert_eq!(plan.actions.len(), 1);
    assert_eq!(plan.actions[0].kind, ActionKind::Rewrite);
    assert_eq!(plan.store_counts[&ReferenceStore::OwnedIngredients], 1);
}
