#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use storyreel_client::api::EngineApiError;
use storyreel_client::engine::JobEngine;
use storyreel_core::job::{CreateJobRequest, CreateJobResponse, Job, JobResult, JobStatus};

/// A job in `status` with the given progress.
pub fn job(id: &str, status: JobStatus, progress: f64) -> Job {
    Job {
        status,
        progress,
        ..Job::pending(id, Utc::now())
    }
}

pub fn result_for(id: &str) -> JobResult {
    JobResult {
        job_id: id.to_string(),
        status: JobStatus::Completed,
        video_path: Some(format!("/videos/{id}.mp4")),
        video_url: None,
        duration_seconds: Some(42.0),
        scenes_count: Some(6),
        file_size: Some(1024),
        processing_time_seconds: Some(120.0),
    }
}

pub fn server_error() -> EngineApiError {
    EngineApiError::Api {
        status: 500,
        body: "internal error".into(),
    }
}

/// Job engine fake driven by per-job scripts of fetch results.
///
/// When a job's script runs dry the last successful observation is
/// repeated. Created jobs are numbered `job-1`, `job-2`, ...
#[derive(Default)]
pub struct ScriptedEngine {
    scripts: Mutex<HashMap<String, VecDeque<Result<Job, EngineApiError>>>>,
    last_seen: Mutex<HashMap<String, Job>>,
    results: Mutex<VecDeque<Result<JobResult, EngineApiError>>>,
    create_error: Mutex<Option<EngineApiError>>,
    created: AtomicUsize,
    pub get_calls: Mutex<Vec<tokio::time::Instant>>,
    pub result_calls: AtomicUsize,
    pub cancelled: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, job_id: &str, responses: Vec<Result<Job, EngineApiError>>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(job_id.to_string(), responses.into());
    }

    pub fn script_results(&self, responses: Vec<Result<JobResult, EngineApiError>>) {
        *self.results.lock().unwrap() = responses.into();
    }

    pub fn fail_create(&self, error: EngineApiError) {
        *self.create_error.lock().unwrap() = Some(error);
    }

    pub fn get_count(&self) -> usize {
        self.get_calls.lock().unwrap().len()
    }

    pub fn result_count(&self) -> usize {
        self.result_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobEngine for ScriptedEngine {
    async fn create_job(
        &self,
        _request: &CreateJobRequest,
    ) -> Result<CreateJobResponse, EngineApiError> {
        if let Some(error) = self.create_error.lock().unwrap().take() {
            return Err(error);
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CreateJobResponse {
            job_id: format!("job-{n}"),
            status: JobStatus::Pending,
            message: None,
            estimated_duration_seconds: None,
        })
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, EngineApiError> {
        self.get_calls.lock().unwrap().push(tokio::time::Instant::now());

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(job_id)
            .and_then(VecDeque::pop_front);

        match next {
            Some(Ok(job)) => {
                self.last_seen
                    .lock()
                    .unwrap()
                    .insert(job_id.to_string(), job.clone());
                Ok(job)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last_seen
                .lock()
                .unwrap()
                .get(job_id)
                .cloned()
                .ok_or(EngineApiError::Api {
                    status: 404,
                    body: format!("Job {job_id} not found"),
                }),
        }
    }

    async fn get_result(&self, job_id: &str) -> Result<JobResult, EngineApiError> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(result_for(job_id)))
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), EngineApiError> {
        self.cancelled.lock().unwrap().push(job_id.to_string());
        Ok(())
    }
}
