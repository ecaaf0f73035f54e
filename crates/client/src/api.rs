//! REST clients for the job execution engine and the batch service.
//!
//! Both wrap a shared [`reqwest::Client`] with a per-request timeout. The
//! `Display` text of [`EngineApiError`] is what the poller's retry
//! classifier inspects, so timeout and busy conditions keep those words in
//! their messages.

use std::time::Duration;

use serde::Deserialize;
use storyreel_core::batch::{
    Batch, BatchListResponse, BatchStatus, CreateBatchRequest, CreateBatchResponse,
};
use storyreel_core::estimation::BatchAnalysis;
use storyreel_core::job::{CreateJobRequest, CreateJobResponse, Job, JobResult};
use storyreel_core::retry::ErrorClass;

/// Errors from the engine and batch service REST layer.
#[derive(Debug, thiserror::Error)]
pub enum EngineApiError {
    /// No response within the request timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered 503.
    #[error("server busy (503): {0}")]
    Busy(String),

    /// Any other non-2xx status code.
    #[error("Engine API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The HTTP request itself failed (DNS, TLS, protocol).
    #[error("HTTP request failed: {0}")]
    Request(reqwest::Error),

    /// The server could not be reached at all.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A 2xx response whose body did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for EngineApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Request(err)
        }
    }
}

impl EngineApiError {
    /// Retry class of this error, derived from its message.
    pub fn class(&self) -> ErrorClass {
        ErrorClass::from_message(&self.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// The remote service itself is unavailable, as opposed to rejecting
    /// one request.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout | Self::Busy(_))
    }
}

/// `{ "data": ... }` envelope used by the batch service.
#[derive(Debug, Deserialize)]
struct DataResponse<T> {
    data: T,
}

/// Build the shared HTTP client.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, EngineApiError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

// ---------------------------------------------------------------------------
// Job execution engine
// ---------------------------------------------------------------------------

/// HTTP client for the job execution engine.
#[derive(Clone)]
pub struct EngineApi {
    client: reqwest::Client,
    base_url: String,
}

impl EngineApi {
    /// * `base_url` - e.g. `http://localhost:8000`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, EngineApiError> {
        Ok(Self::with_client(build_http_client(timeout)?, base_url))
    }

    /// Reuse an existing [`reqwest::Client`] (connection pooling).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /api/video/generate`
    pub async fn create_job(
        &self,
        request: &CreateJobRequest,
    ) -> Result<CreateJobResponse, EngineApiError> {
        let response = self
            .client
            .post(format!("{}/api/video/generate", self.base_url))
            .json(request)
            .send()
            .await?;

        parse_response(response).await
    }

    /// `GET /api/jobs/{id}/status`
    pub async fn get_job(&self, job_id: &str) -> Result<Job, EngineApiError> {
        let response = self
            .client
            .get(format!("{}/api/jobs/{}/status", self.base_url, job_id))
            .send()
            .await?;

        parse_response(response).await
    }

    /// `GET /api/jobs/{id}/result`. Only valid once the job is completed.
    pub async fn get_result(&self, job_id: &str) -> Result<JobResult, EngineApiError> {
        let response = self
            .client
            .get(format!("{}/api/jobs/{}/result", self.base_url, job_id))
            .send()
            .await?;

        parse_response(response).await
    }

    /// `POST /api/jobs/{id}/cancel`. Best effort on the engine side.
    pub async fn cancel_job(&self, job_id: &str) -> Result<(), EngineApiError> {
        let response = self
            .client
            .post(format!("{}/api/jobs/{}/cancel", self.base_url, job_id))
            .send()
            .await?;

        check_status(response).await
    }

    /// `DELETE /api/jobs/{id}`
    pub async fn delete_job(&self, job_id: &str) -> Result<(), EngineApiError> {
        let response = self
            .client
            .delete(format!("{}/api/jobs/{}", self.base_url, job_id))
            .send()
            .await?;

        check_status(response).await
    }
}

// ---------------------------------------------------------------------------
// Batch service
// ---------------------------------------------------------------------------

/// HTTP client for the batch service (`/api/v1/batches`).
#[derive(Clone)]
pub struct BatchApi {
    client: reqwest::Client,
    base_url: String,
}

impl BatchApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, EngineApiError> {
        Ok(Self::with_client(build_http_client(timeout)?, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/batches{}", self.base_url, path)
    }

    pub async fn analyze(&self, request: &CreateBatchRequest) -> Result<BatchAnalysis, EngineApiError> {
        let response = self
            .client
            .post(self.url("/analyze"))
            .json(request)
            .send()
            .await?;

        parse_data(response).await
    }

    pub async fn create(
        &self,
        request: &CreateBatchRequest,
    ) -> Result<CreateBatchResponse, EngineApiError> {
        let response = self.client.post(self.url("")).json(request).send().await?;
        parse_data(response).await
    }

    pub async fn list(
        &self,
        status: Option<BatchStatus>,
        limit: Option<usize>,
    ) -> Result<BatchListResponse, EngineApiError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        let response = self.client.get(self.url("")).query(&query).send().await?;
        parse_data(response).await
    }

    pub async fn get(&self, batch_id: &str) -> Result<Batch, EngineApiError> {
        let response = self
            .client
            .get(self.url(&format!("/{batch_id}")))
            .send()
            .await?;

        parse_data(response).await
    }

    pub async fn pause(&self, batch_id: &str) -> Result<Batch, EngineApiError> {
        self.control(batch_id, "pause").await
    }

    pub async fn resume(&self, batch_id: &str) -> Result<Batch, EngineApiError> {
        self.control(batch_id, "resume").await
    }

    pub async fn cancel(&self, batch_id: &str) -> Result<Batch, EngineApiError> {
        self.control(batch_id, "cancel").await
    }

    pub async fn delete(&self, batch_id: &str) -> Result<(), EngineApiError> {
        let response = self
            .client
            .delete(self.url(&format!("/{batch_id}")))
            .send()
            .await?;

        check_status(response).await
    }

    async fn control(&self, batch_id: &str, action: &str) -> Result<Batch, EngineApiError> {
        let response = self
            .client
            .post(self.url(&format!("/{batch_id}/{action}")))
            .send()
            .await?;

        parse_data(response).await
    }
}

// ---- private helpers ----

/// Map non-2xx responses to [`EngineApiError`], keeping the body text.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, EngineApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());

    if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
        return Err(EngineApiError::Busy(body));
    }
    Err(EngineApiError::Api {
        status: status.as_u16(),
        body,
    })
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, EngineApiError> {
    let response = ensure_success(response).await?;
    Ok(response.json::<T>().await?)
}

async fn parse_data<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, EngineApiError> {
    let envelope: DataResponse<T> = parse_response(response).await?;
    Ok(envelope.data)
}

async fn check_status(response: reqwest::Response) -> Result<(), EngineApiError> {
    ensure_success(response).await?;
    Ok(())
}
