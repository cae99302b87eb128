//! End-to-end range-job scenarios: planner, escalation, consistency, and
//! persistence working against the in-memory store.

use async_trait::async_trait;
use fabula_core::{
    EntityKind, GenerateRequest, GenerateResponse, IndexRange, NormalizedRecord,
    RangeJobRequest, RangeJobRequestBuilder,
};
use fabula_error::{
    FabulaErrorKind, FabulaResult, GenerationError, GenerationErrorKind, PipelineErrorKind,
};
use fabula_interface::{GenerationDriver, RecordStore};
use fabula_pipeline::{ConsistencyEnforcer, RangeBatchPlanner};
use fabula_storage::MemoryStore;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Pull the requested index range back out of a batch prompt.
fn parse_range(prompt: &str) -> Option<(u32, u32)> {
    let rest = prompt.split("from ").nth(1)?;
    let mut words = rest.split_whitespace();
    let start: u32 = words.next()?.parse().ok()?;
    words.next()?; // "to"
    let end: u32 = words.next()?.parse().ok()?;
    Some((start, end))
}

fn chapters_json(start: u32, end: u32, summary_suffix: &str) -> String {
    let items: Vec<_> = (start..=end)
        .map(|n| {
            serde_json::json!({
                "chapter_num": n,
                "title": format!("Chapter Title {n}"),
                "summary": format!("Events of chapter {n} unfold.{summary_suffix}"),
            })
        })
        .collect();
    serde_json::json!({ "chapters": items }).to_string()
}

/// Driver that serves whatever chapter range the prompt asks for.
///
/// Spans wider than `timeout_above` fail with timeout-shaped errors;
/// a batch starting at `unavailable_from` fails hard. Prompts without a
/// range (repair, consistency) get unusable prose back.
#[derive(Default)]
struct ChapterDriver {
    timeout_above: Option<u32>,
    unavailable_from: Option<u32>,
    summary_suffix: String,
    calls: AtomicUsize,
}

impl ChapterDriver {
    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationDriver for ChapterDriver {
    async fn generate(&self, req: &GenerateRequest) -> FabulaResult<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some((start, end)) = parse_range(&req.prompt) else {
            return Ok(GenerateResponse {
                text: "I cannot help with that.".to_string(),
            });
        };
        if let Some(limit) = self.timeout_above
            && end - start + 1 > limit
        {
            return Err(GenerationError::new(GenerationErrorKind::classify(
                "upstream request timed out",
            )))?;
        }
        if self.unavailable_from == Some(start) {
            return Err(GenerationError::new(GenerationErrorKind::ServiceUnavailable(
                "503 overloaded".to_string(),
            )))?;
        }
        Ok(GenerateResponse {
            text: chapters_json(start, end, &self.summary_suffix),
        })
    }

    fn provider_name(&self) -> &'static str {
        "chapter-stub"
    }
}

/// Driver that never produces anything parseable.
struct ProseDriver {
    calls: AtomicUsize,
}

#[async_trait]
impl GenerationDriver for ProseDriver {
    async fn generate(&self, _req: &GenerateRequest) -> FabulaResult<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GenerateResponse {
            text: "Here are some thoughts about your story, in prose.".to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "prose-stub"
    }
}

/// Driver that records every prompt and serves a fixed three-phase outline.
#[derive(Default)]
struct OutlineDriver {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl GenerationDriver for OutlineDriver {
    async fn generate(&self, req: &GenerateRequest) -> FabulaResult<GenerateResponse> {
        self.prompts.lock().unwrap().push(req.prompt.clone());
        let items: Vec<_> = ["Act One", "Act Two", "Act Three"]
            .iter()
            .enumerate()
            .map(|(i, label)| {
                serde_json::json!({
                    "phase": i + 1,
                    "label": label,
                    "summary": format!("{label} carries the story forward."),
                })
            })
            .collect();
        Ok(GenerateResponse {
            text: serde_json::json!({ "outline": items }).to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "outline-stub"
    }
}

fn chapter_request(start: u32, end: u32, batch_size: u32) -> RangeJobRequest {
    RangeJobRequestBuilder::default()
        .kind(EntityKind::ChapterPlan)
        .range(IndexRange::new(start, end))
        .batch_size(batch_size)
        .build()
        .unwrap()
}

#[tokio::test]
async fn covers_range_in_ordered_batches() {
    init_tracing();
    let driver = ChapterDriver::default();
    let store = MemoryStore::new();
    let planner = RangeBatchPlanner::new(&driver, &store);

    let summary = planner.run(&chapter_request(1, 45, 20)).await.unwrap();

    assert_eq!(summary.success_batches, 3);
    assert_eq!(summary.planned_batches, 3);
    assert_eq!(summary.total_inserted(), 45);
    assert_eq!(summary.retry_count, 0);
    assert!(summary.failed_range.is_none());
    assert!(!summary.degraded);
    assert_eq!(driver.call_count(), 3);
    assert_eq!(store.count(EntityKind::ChapterPlan).await, 45);
}

#[tokio::test]
async fn timeouts_shrink_batch_size_then_recover() {
    init_tracing();
    // Spans wider than 20 indices time out; 40 and 30 fail, 20 succeeds.
    let driver = ChapterDriver {
        timeout_above: Some(20),
        ..ChapterDriver::default()
    };
    let store = MemoryStore::new();
    let planner = RangeBatchPlanner::new(&driver, &store);

    let summary = planner.run(&chapter_request(1, 45, 40)).await.unwrap();

    assert!(summary.retry_count >= 2);
    assert!(summary.failed_range.is_none());
    assert_eq!(summary.total_inserted(), 45);
    // Shrunk size sticks: [1,20], [21,40], [41,45].
    assert_eq!(summary.success_batches, 3);
    assert_eq!(store.count(EntityKind::ChapterPlan).await, 45);
    for n in 1..=45 {
        assert!(
            store
                .fetch(EntityKind::ChapterPlan, &n.to_string())
                .await
                .unwrap()
                .is_some(),
            "chapter {n} missing"
        );
    }
}

#[tokio::test]
async fn shrink_exhaustion_reports_failed_range() {
    init_tracing();
    let driver = ChapterDriver {
        timeout_above: Some(0),
        ..ChapterDriver::default()
    };
    let store = MemoryStore::new();
    let planner = RangeBatchPlanner::new(&driver, &store);

    let summary = planner.run(&chapter_request(1, 45, 40)).await.unwrap();

    assert_eq!(summary.failed_range, Some(IndexRange::new(1, 45)));
    // Ladder below 40: one attempt each at 30, 20, 10, 5.
    assert_eq!(summary.retry_count, 4);
    assert_eq!(summary.total_inserted(), 0);
    assert_eq!(driver.call_count(), 5);
    assert_eq!(store.count(EntityKind::ChapterPlan).await, 0);
}

#[tokio::test]
async fn hard_service_failure_aborts_with_remaining_range() {
    init_tracing();
    let driver = ChapterDriver {
        unavailable_from: Some(21),
        ..ChapterDriver::default()
    };
    let store = MemoryStore::new();
    let planner = RangeBatchPlanner::new(&driver, &store);

    let summary = planner.run(&chapter_request(1, 45, 20)).await.unwrap();

    assert_eq!(summary.success_batches, 1);
    assert_eq!(summary.total_inserted(), 20);
    assert_eq!(summary.failed_range, Some(IndexRange::new(21, 45)));
    assert_eq!(store.count(EntityKind::ChapterPlan).await, 20);
}

#[tokio::test]
async fn mandatory_scope_with_no_records_is_a_hard_error() {
    init_tracing();
    let driver = ProseDriver {
        calls: AtomicUsize::new(0),
    };
    let store = MemoryStore::new();
    let planner = RangeBatchPlanner::new(&driver, &store);
    let request = RangeJobRequestBuilder::default()
        .kind(EntityKind::ChapterPlan)
        .range(IndexRange::new(1, 10))
        .batch_size(10u32)
        .mandatory(true)
        .build()
        .unwrap();

    let err = planner.run(&request).await.unwrap_err();
    assert!(matches!(
        err.kind(),
        FabulaErrorKind::Pipeline(e)
            if matches!(&e.kind, PipelineErrorKind::MandatoryScopeEmpty(_))
    ));
    // One batch call plus at most two escalation calls.
    assert_eq!(driver.calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.count(EntityKind::ChapterPlan).await, 0);
}

#[tokio::test]
async fn optional_scope_degrades_to_empty() {
    init_tracing();
    let driver = ProseDriver {
        calls: AtomicUsize::new(0),
    };
    let store = MemoryStore::new();
    let planner = RangeBatchPlanner::new(&driver, &store);

    let summary = planner.run(&chapter_request(1, 10, 10)).await.unwrap();

    assert!(summary.degraded);
    assert_eq!(summary.total_inserted(), 0);
    assert!(summary.failed_range.is_none());
    assert_eq!(summary.success_batches, 1);
}

#[tokio::test]
async fn rerunning_a_completed_job_inserts_nothing() {
    init_tracing();
    let driver = ChapterDriver::default();
    let store = MemoryStore::new();
    let planner = RangeBatchPlanner::new(&driver, &store);
    let request = chapter_request(1, 30, 15);

    let first = planner.run(&request).await.unwrap();
    assert_eq!(first.total_inserted(), 30);

    let second = planner.run(&request).await.unwrap();
    assert_eq!(second.total_inserted(), 0);
    assert_eq!(second.skipped_by_kind.values().sum::<usize>(), 30);
    assert_eq!(store.count(EntityKind::ChapterPlan).await, 30);
}

#[tokio::test]
async fn invalid_requests_are_rejected_up_front() {
    init_tracing();
    let driver = ChapterDriver::default();
    let store = MemoryStore::new();
    let planner = RangeBatchPlanner::new(&driver, &store);

    let inverted = planner.run(&chapter_request(5, 4, 10)).await.unwrap_err();
    assert!(matches!(
        inverted.kind(),
        FabulaErrorKind::Pipeline(e)
            if matches!(&e.kind, PipelineErrorKind::InvalidRange { start: 5, end: 4 })
    ));

    let zero = planner.run(&chapter_request(1, 10, 0)).await.unwrap_err();
    assert!(matches!(
        zero.kind(),
        FabulaErrorKind::Pipeline(e) if matches!(&e.kind, PipelineErrorKind::ZeroBatchSize)
    ));
    assert_eq!(driver.call_count(), 0);
}

#[tokio::test]
async fn outline_jobs_carry_structure_preset_labels() {
    init_tracing();
    let driver = OutlineDriver::default();
    let store = MemoryStore::new();
    let planner = RangeBatchPlanner::new(&driver, &store);
    let request = RangeJobRequestBuilder::default()
        .kind(EntityKind::OutlinePhase)
        .range(IndexRange::new(1, 3))
        .batch_size(3u32)
        .structure("three_act".to_string())
        .build()
        .unwrap();

    let summary = planner.run(&request).await.unwrap();
    assert_eq!(summary.total_inserted(), 3);

    let prompt = driver.prompts.lock().unwrap().first().cloned().unwrap();
    assert!(prompt.contains("Use these phase labels in order: Act One, Act Two, Act Three."));
}

#[tokio::test]
async fn range_at_the_index_ceiling_terminates() {
    init_tracing();
    let driver = ChapterDriver::default();
    let store = MemoryStore::new();
    let planner = RangeBatchPlanner::new(&driver, &store);

    let summary = planner
        .run(&chapter_request(u32::MAX - 4, u32::MAX, 40))
        .await
        .unwrap();

    assert_eq!(summary.success_batches, 1);
    assert_eq!(summary.total_inserted(), 5);
    assert!(summary.failed_range.is_none());
    assert_eq!(store.count(EntityKind::ChapterPlan).await, 5);
}

#[tokio::test]
async fn enforcer_scrubs_premature_mentions_before_persisting() {
    init_tracing();
    // Every summary name-drops a character first allowed at chapter 100.
    // The driver cannot fix consistency prompts, so the deterministic
    // substitution path must run.
    let driver = ChapterDriver {
        summary_suffix: " The Pale Broker watches.".to_string(),
        ..ChapterDriver::default()
    };
    let store = MemoryStore::new();
    let mut earliest = BTreeMap::new();
    earliest.insert("The Pale Broker".to_string(), 100);
    let planner = RangeBatchPlanner::new(&driver, &store)
        .with_enforcer(ConsistencyEnforcer::new(earliest));

    let summary = planner.run(&chapter_request(1, 10, 10)).await.unwrap();
    assert_eq!(summary.total_inserted(), 10);

    let stored = store
        .fetch(EntityKind::ChapterPlan, "3")
        .await
        .unwrap()
        .unwrap();
    let NormalizedRecord::ChapterPlan(plan) = stored else {
        panic!("expected a chapter plan");
    };
    assert!(!plan.summary.contains("The Pale Broker"));
    assert!(plan.summary.contains("someone"));
}
