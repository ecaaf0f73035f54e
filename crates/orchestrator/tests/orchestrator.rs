mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::{batch, FakeRunner, ITEM_DURATION};
use storyreel_core::batch::{BatchItemStatus, BatchStatus};
use storyreel_core::error::CoreError;
use storyreel_orchestrator::control::BatchControl;
use storyreel_orchestrator::orchestrator::BatchOrchestrator;
use storyreel_orchestrator::runner::ItemError;
use storyreel_orchestrator::store::BatchStore;
use tokio::task::JoinHandle;

fn start(
    store: &Arc<BatchStore>,
    runner: &Arc<FakeRunner>,
    batch_id: &str,
) -> (Arc<BatchControl>, JoinHandle<Result<BatchStatus, CoreError>>) {
    let orchestrator = BatchOrchestrator::new(Arc::clone(store), runner.clone());
    let control = Arc::new(BatchControl::new());
    let task_control = Arc::clone(&control);
    let batch_id = batch_id.to_string();
    let handle = tokio::spawn(async move { orchestrator.run(&batch_id, &task_control).await });
    (control, handle)
}

async fn advance(d: Duration) {
    tokio::time::sleep(d).await;
}

// ---------------------------------------------------------------------------
// Completion and partial failure
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn processes_every_item_in_order() {
    let store = Arc::new(BatchStore::default());
    store.insert(batch("b1", &["A", "B", "C"]));
    let runner = Arc::new(FakeRunner::watching(Arc::clone(&store)));

    let (_control, handle) = start(&store, &runner, "b1");
    assert_eq!(handle.await.unwrap().unwrap(), BatchStatus::Completed);

    let batch = store.get("b1").unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.completed_items, 3);
    assert_eq!(batch.failed_items, 0);
    assert_eq!(batch.progress, 1.0);
    assert_eq!(batch.current_item_index, 3);
    assert!(batch.started_at.is_some());
    assert!(batch.completed_at.is_some());
    assert_eq!(runner.started_titles(), vec!["A", "B", "C"]);

    for item in &batch.items {
        assert_eq!(item.status, BatchItemStatus::Completed);
        assert_eq!(item.job_id.as_deref(), Some(format!("job-{}", item.id).as_str()));
        assert_eq!(item.video_path.as_deref(), Some(format!("/videos/{}.mp4", item.id).as_str()));
        assert!(item.duration_seconds.is_some());
    }
}

#[tokio::test(start_paused = true)]
async fn failed_item_does_not_stop_the_batch() {
    let store = Arc::new(BatchStore::default());
    store.insert(batch("b1", &["A", "B", "C"]));
    let runner = Arc::new(FakeRunner::new().fail("B", ItemError::Item("quota exceeded".into())));

    let (_control, handle) = start(&store, &runner, "b1");
    assert_eq!(handle.await.unwrap().unwrap(), BatchStatus::Completed);

    let batch = store.get("b1").unwrap();
    assert_eq!(batch.completed_items, 2);
    assert_eq!(batch.failed_items, 1);
    assert!((batch.progress - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(batch.items[1].status, BatchItemStatus::Failed);
    assert_eq!(batch.items[1].error.as_deref(), Some("quota exceeded"));
    assert_eq!(batch.items[2].status, BatchItemStatus::Completed);
    assert!(batch.error.is_none());
    batch.check_invariants().unwrap();
}

#[tokio::test(start_paused = true)]
async fn batch_completes_even_when_every_item_fails() {
    let store = Arc::new(BatchStore::default());
    store.insert(batch("b1", &["A", "B"]));
    let runner = Arc::new(
        FakeRunner::new()
            .fail("A", ItemError::Item("bad script".into()))
            .fail("B", ItemError::Item("bad script".into())),
    );

    let (_control, handle) = start(&store, &runner, "b1");
    assert_eq!(handle.await.unwrap().unwrap(), BatchStatus::Completed);

    let batch = store.get("b1").unwrap();
    assert_eq!(batch.failed_items, 2);
    assert_eq!(batch.progress, 0.0);
}

#[tokio::test(start_paused = true)]
async fn item_errors_are_truncated() {
    let store = Arc::new(BatchStore::default());
    store.insert(batch("b1", &["A"]));
    let runner = Arc::new(FakeRunner::new().fail("A", ItemError::Item("x".repeat(800))));

    let (_control, handle) = start(&store, &runner, "b1");
    handle.await.unwrap().unwrap();

    let error = store.get("b1").unwrap().items[0].error.clone().unwrap();
    assert_eq!(error.chars().count(), 500);
}

#[tokio::test(start_paused = true)]
async fn engine_loss_fails_the_batch_and_skips_the_rest() {
    let store = Arc::new(BatchStore::default());
    store.insert(batch("b1", &["A", "B", "C"]));
    let runner = Arc::new(FakeRunner::new().fail(
        "B",
        ItemError::Infrastructure("Lost contact with execution engine: request timed out".into()),
    ));

    let (_control, handle) = start(&store, &runner, "b1");
    assert_eq!(handle.await.unwrap().unwrap(), BatchStatus::Failed);

    let batch = store.get("b1").unwrap();
    assert_eq!(batch.status, BatchStatus::Failed);
    assert!(batch.error.as_deref().unwrap().contains("Lost contact"));
    assert_eq!(batch.items[0].status, BatchItemStatus::Completed);
    assert_eq!(batch.items[1].status, BatchItemStatus::Failed);
    assert_eq!(batch.items[2].status, BatchItemStatus::Skipped);
    assert_eq!(runner.started_titles(), vec!["A", "B"]);
}

#[tokio::test(start_paused = true)]
async fn at_most_one_item_runs_at_a_time() {
    let store = Arc::new(BatchStore::default());
    store.insert(batch("b1", &["A", "B", "C", "D"]));
    let runner = Arc::new(FakeRunner::watching(Arc::clone(&store)));

    let (_control, handle) = start(&store, &runner, "b1");
    handle.await.unwrap().unwrap();

    assert_eq!(runner.max_running(), 1);
    assert!(runner.violations.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn running_item_reports_into_the_store() {
    let store = Arc::new(BatchStore::default());
    store.insert(batch("b1", &["A", "B"]));
    let runner = Arc::new(FakeRunner::new());

    let (_control, handle) = start(&store, &runner, "b1");
    advance(Duration::from_secs(1)).await;

    let batch = store.get("b1").unwrap();
    assert_eq!(batch.status, BatchStatus::Processing);
    let current = batch.current_item().unwrap();
    assert_eq!(current.title, "A");
    assert_eq!(current.progress, 0.5);
    assert_eq!(current.current_step, "Generating narration");
    assert_eq!(current.job_id.as_deref(), Some("job-b1_0"));
    assert_eq!(batch.items[1].status, BatchItemStatus::Pending);

    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn missing_batch_is_not_found() {
    let store = Arc::new(BatchStore::default());
    let runner = Arc::new(FakeRunner::new());

    let (_control, handle) = start(&store, &runner, "nope");
    assert_matches!(handle.await.unwrap(), Err(CoreError::NotFound { .. }));
}

// ---------------------------------------------------------------------------
// Pause, resume, cancel
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn pause_lets_the_running_item_finish_then_holds() {
    let store = Arc::new(BatchStore::default());
    store.insert(batch("b1", &["A", "B", "C"]));
    let runner = Arc::new(FakeRunner::new());

    let (control, handle) = start(&store, &runner, "b1");
    advance(Duration::from_secs(5)).await;
    control.pause();

    // Still processing until A finishes.
    assert_eq!(store.get("b1").unwrap().status, BatchStatus::Processing);

    advance(Duration::from_secs(60)).await;
    let batch = store.get("b1").unwrap();
    assert_eq!(batch.status, BatchStatus::Paused);
    assert_eq!(batch.current_item_index, 1);
    assert_eq!(batch.items[0].status, BatchItemStatus::Completed);
    assert_eq!(batch.items[1].status, BatchItemStatus::Pending);
    assert_eq!(batch.processing_count(), 0);
    assert_eq!(runner.started_titles(), vec!["A"]);

    control.resume();
    assert_eq!(handle.await.unwrap().unwrap(), BatchStatus::Completed);
    assert_eq!(runner.started_titles(), vec!["A", "B", "C"]);
    assert_eq!(store.get("b1").unwrap().completed_items, 3);
}

#[tokio::test(start_paused = true)]
async fn pause_during_the_last_item_still_completes() {
    let store = Arc::new(BatchStore::default());
    store.insert(batch("b1", &["A", "B"]));
    let runner = Arc::new(FakeRunner::new());

    let (control, handle) = start(&store, &runner, "b1");
    advance(ITEM_DURATION + Duration::from_secs(5)).await;
    assert_eq!(runner.started_titles(), vec!["A", "B"]);
    control.pause();

    let status = tokio::time::timeout(Duration::from_secs(600), handle)
        .await
        .expect("batch should finish without a resume")
        .unwrap()
        .unwrap();
    assert_eq!(status, BatchStatus::Completed);

    let batch = store.get("b1").unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.completed_items, 2);
    assert_eq!(batch.current_item_index, 2);
}

#[tokio::test(start_paused = true)]
async fn cancel_interrupts_the_running_item() {
    let store = Arc::new(BatchStore::default());
    store.insert(batch("b1", &["A", "B", "C"]));
    let runner = Arc::new(FakeRunner::new());

    let (control, handle) = start(&store, &runner, "b1");
    advance(Duration::from_secs(5)).await;
    control.cancel();

    assert_eq!(handle.await.unwrap().unwrap(), BatchStatus::Cancelled);

    let batch = store.get("b1").unwrap();
    assert_eq!(batch.status, BatchStatus::Cancelled);
    assert_eq!(batch.completed_items, 0);
    assert_eq!(batch.skipped_items(), 3);
    assert_eq!(batch.items[0].error.as_deref(), Some("Cancelled while processing"));
    assert!(batch.completed_at.is_some());
    assert_eq!(runner.started_titles(), vec!["A"]);
    batch.check_invariants().unwrap();
}

#[tokio::test(start_paused = true)]
async fn cancel_while_paused_skips_remaining_items() {
    let store = Arc::new(BatchStore::default());
    store.insert(batch("b1", &["A", "B", "C"]));
    let runner = Arc::new(FakeRunner::new());

    let (control, handle) = start(&store, &runner, "b1");
    advance(Duration::from_secs(1)).await;
    control.pause();
    advance(ITEM_DURATION).await;
    assert_eq!(store.get("b1").unwrap().status, BatchStatus::Paused);

    control.cancel();
    assert_eq!(handle.await.unwrap().unwrap(), BatchStatus::Cancelled);

    let batch = store.get("b1").unwrap();
    assert_eq!(batch.completed_items, 1);
    assert_eq!(batch.items[1].status, BatchItemStatus::Skipped);
    assert_eq!(batch.items[2].status, BatchItemStatus::Skipped);
    assert!((batch.progress - 1.0 / 3.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn resume_before_the_item_finishes_keeps_processing() {
    let store = Arc::new(BatchStore::default());
    store.insert(batch("b1", &["A", "B"]));
    let runner = Arc::new(FakeRunner::new());

    let (control, handle) = start(&store, &runner, "b1");
    advance(Duration::from_secs(2)).await;
    control.pause();
    advance(Duration::from_secs(2)).await;
    control.resume();

    assert_eq!(handle.await.unwrap().unwrap(), BatchStatus::Completed);
    assert_eq!(runner.started_titles(), vec!["A", "B"]);
}
