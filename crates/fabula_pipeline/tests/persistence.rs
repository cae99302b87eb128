//! Idempotent-persistence scenarios against both store flavors.

use fabula_core::{ChapterPlanRecord, EntityKind, IndexRange, NormalizedRecord};
use fabula_interface::RecordStore;
use fabula_pipeline::IdempotentPersister;
use fabula_storage::MemoryStore;

fn plan(n: u32, title: &str, summary: &str) -> NormalizedRecord {
    NormalizedRecord::ChapterPlan(ChapterPlanRecord {
        chapter_num: n,
        title: title.to_string(),
        summary: summary.to_string(),
        goal: None,
    })
}

fn batch(start: u32, end: u32) -> Vec<NormalizedRecord> {
    (start..=end)
        .map(|n| plan(n, &format!("Fresh Title {n}"), "Newly generated."))
        .collect()
}

async fn stored_title(store: &MemoryStore, n: u32) -> String {
    let NormalizedRecord::ChapterPlan(c) = store
        .fetch(EntityKind::ChapterPlan, &n.to_string())
        .await
        .unwrap()
        .unwrap()
    else {
        panic!("expected a chapter plan");
    };
    c.title
}

#[tokio::test]
async fn second_persist_is_a_no_op() {
    let store = MemoryStore::new();
    let persister = IdempotentPersister::new(&store);
    let range = IndexRange::new(1, 5);

    let first = persister
        .persist(EntityKind::ChapterPlan, range, &batch(1, 5), false)
        .await
        .unwrap();
    assert_eq!(first.inserted, 5);
    assert_eq!(first.skipped, 0);

    let second = persister
        .persist(EntityKind::ChapterPlan, range, &batch(1, 5), false)
        .await
        .unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, 5);
    assert_eq!(store.count(EntityKind::ChapterPlan).await, 5);
}

#[tokio::test]
async fn strong_stored_records_survive_without_force() {
    let store = MemoryStore::new();
    store
        .seed(plan(3, "Hand-Edited Title", "Carefully revised by the author."))
        .await;
    let persister = IdempotentPersister::new(&store);

    let outcome = persister
        .persist(EntityKind::ChapterPlan, IndexRange::new(1, 5), &batch(1, 5), false)
        .await
        .unwrap();
    assert_eq!(outcome.inserted, 4);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(stored_title(&store, 3).await, "Hand-Edited Title");
}

#[tokio::test]
async fn empty_equivalent_stored_record_is_replaced() {
    let store = MemoryStore::new();
    // Default title and no summary: a stub left by an earlier degraded run.
    store
        .seed(plan(3, &ChapterPlanRecord::default_title(3), ""))
        .await;
    let persister = IdempotentPersister::new(&store);

    let outcome = persister
        .persist(EntityKind::ChapterPlan, IndexRange::new(1, 5), &batch(1, 5), false)
        .await
        .unwrap();
    assert_eq!(outcome.inserted, 5);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(stored_title(&store, 3).await, "Fresh Title 3");
}

#[tokio::test]
async fn force_clears_the_range_first() {
    let store = MemoryStore::new();
    store
        .seed(plan(3, "Hand-Edited Title", "Carefully revised by the author."))
        .await;
    let persister = IdempotentPersister::new(&store);

    let outcome = persister
        .persist(EntityKind::ChapterPlan, IndexRange::new(1, 5), &batch(1, 5), true)
        .await
        .unwrap();
    assert_eq!(outcome.inserted, 5);
    assert_eq!(stored_title(&store, 3).await, "Fresh Title 3");
}

#[tokio::test]
async fn fallback_path_without_conflict_clause() {
    let store = MemoryStore::without_insert_or_ignore();
    let persister = IdempotentPersister::new(&store);
    let range = IndexRange::new(1, 5);

    let first = persister
        .persist(EntityKind::ChapterPlan, range, &batch(1, 5), false)
        .await
        .unwrap();
    assert_eq!(first.inserted, 5);

    let second = persister
        .persist(EntityKind::ChapterPlan, range, &batch(1, 5), false)
        .await
        .unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, 5);
}

#[tokio::test]
async fn duplicate_keys_within_a_batch_collapse() {
    let store = MemoryStore::new();
    let persister = IdempotentPersister::new(&store);
    let mut records = batch(1, 3);
    records.push(plan(2, "Late Duplicate", "Same natural key as chapter 2."));

    let outcome = persister
        .persist(EntityKind::ChapterPlan, IndexRange::new(1, 3), &records, false)
        .await
        .unwrap();
    assert_eq!(outcome.inserted, 3);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(stored_title(&store, 2).await, "Fresh Title 2");
}
