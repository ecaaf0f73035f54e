#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use storyreel_core::batch::{Batch, BatchItem};
use storyreel_orchestrator::runner::{
    ItemContext, ItemError, ItemOutput, ItemReporter, ItemRunner,
};
use storyreel_orchestrator::store::BatchStore;
use tokio_util::sync::CancellationToken;

/// Every fake item takes this long unless told otherwise.
pub const ITEM_DURATION: Duration = Duration::from_secs(10);

/// A pending batch with one item per title.
pub fn batch(id: &str, titles: &[&str]) -> Batch {
    let items = titles
        .iter()
        .enumerate()
        .map(|(i, title)| BatchItem::new(id, i, *title, format!("Text for {title}")))
        .collect();
    Batch::new(id, format!("Batch {id}"), items, Utc::now())
}

/// Item runner fake. Each item sleeps for [`ITEM_DURATION`], then returns
/// the outcome scripted for its title (success by default).
///
/// When given a store, it checks at every item start that no other item of
/// the batch is processing.
#[derive(Default)]
pub struct FakeRunner {
    outcomes: Mutex<HashMap<String, Result<ItemOutput, ItemError>>>,
    store: Option<Arc<BatchStore>>,
    pub started: Mutex<Vec<String>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
    pub violations: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watching(store: Arc<BatchStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::default()
        }
    }

    pub fn fail(self, title: &str, error: ItemError) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .insert(title.to_string(), Err(error));
        self
    }

    pub fn started_titles(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    fn check_exclusive(&self, item: &BatchItem) {
        let Some(store) = &self.store else { return };
        let batch_id = item.id.rsplit_once('_').map(|(b, _)| b).unwrap_or_default();
        if let Some(batch) = store.get(batch_id) {
            if let Err(e) = batch.check_invariants() {
                self.violations.lock().unwrap().push(e.to_string());
            }
            if batch.current_item().map(|i| i.id.as_str()) != Some(item.id.as_str()) {
                self.violations
                    .lock()
                    .unwrap()
                    .push(format!("{} is not the current item", item.id));
            }
        }
    }
}

#[async_trait]
impl ItemRunner for FakeRunner {
    async fn run_item(
        &self,
        item: &BatchItem,
        _context: &ItemContext,
        reporter: &dyn ItemReporter,
        cancel: &CancellationToken,
    ) -> Result<ItemOutput, ItemError> {
        self.started.lock().unwrap().push(item.title.clone());
        self.check_exclusive(item);

        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now_running, Ordering::SeqCst);

        let job_id = format!("job-{}", item.id);
        reporter.job_started(&job_id);
        reporter.progress(0.5, "Generating narration");

        let interrupted = tokio::select! {
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(ITEM_DURATION) => false,
        };
        self.running.fetch_sub(1, Ordering::SeqCst);

        if interrupted {
            return Err(ItemError::Cancelled);
        }

        self.outcomes
            .lock()
            .unwrap()
            .get(&item.title)
            .cloned()
            .unwrap_or_else(|| {
                Ok(ItemOutput {
                    job_id: Some(job_id),
                    video_path: Some(format!("/videos/{}.mp4", item.id)),
                })
            })
    }
}
