//! Trait seams over the remote services.
//!
//! The poller, watcher and orchestrator depend on these traits rather than
//! on the HTTP clients, so tests can script engine behaviour.

use async_trait::async_trait;
use storyreel_core::batch::Batch;
use storyreel_core::job::{CreateJobRequest, CreateJobResponse, Job, JobResult};

use crate::api::{BatchApi, EngineApi, EngineApiError};

/// Operations consumed from the job execution engine.
#[async_trait]
pub trait JobEngine: Send + Sync {
    async fn create_job(
        &self,
        request: &CreateJobRequest,
    ) -> Result<CreateJobResponse, EngineApiError>;

    async fn get_job(&self, job_id: &str) -> Result<Job, EngineApiError>;

    /// Only valid once the job reported `completed`.
    async fn get_result(&self, job_id: &str) -> Result<JobResult, EngineApiError>;

    /// Best-effort request to move the job toward `cancelled`.
    async fn cancel_job(&self, job_id: &str) -> Result<(), EngineApiError>;
}

/// Read access to batch records, for detail views.
#[async_trait]
pub trait BatchSource: Send + Sync {
    async fn get_batch(&self, batch_id: &str) -> Result<Batch, EngineApiError>;
}

#[async_trait]
impl JobEngine for EngineApi {
    async fn create_job(
        &self,
        request: &CreateJobRequest,
    ) -> Result<CreateJobResponse, EngineApiError> {
        EngineApi::create_job(self, request).await
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, EngineApiError> {
        EngineApi::get_job(self, job_id).await
    }

    async fn get_result(&self, job_id: &str) -> Result<JobResult, EngineApiError> {
        EngineApi::get_result(self, job_id).await
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), EngineApiError> {
        EngineApi::cancel_job(self, job_id).await
    }
}

#[async_trait]
impl BatchSource for BatchApi {
    async fn get_batch(&self, batch_id: &str) -> Result<Batch, EngineApiError> {
        self.get(batch_id).await
    }
}
