use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Deserializer};
use tracker_core::{
    derived_progress, Batch, BatchSnapshot, BatchStatus, ControlAction, Job, JobStatus,
};
use tracker_logging::{tracker_debug, tracker_warn};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Server root, e.g. `http://localhost:8000`.
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            bearer_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http status {code}: {detail}")]
    Status { code: u16, detail: String },
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// Request/response side of the orchestration service.
#[async_trait::async_trait]
pub trait SnapshotApi: Send + Sync {
    async fn get_batch(&self, batch_id: &str) -> Result<BatchSnapshot, ApiError>;

    async fn control(&self, batch_id: &str, action: ControlAction) -> Result<(), ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestSnapshotApi {
    settings: ApiSettings,
    client: reqwest::Client,
}

impl ReqwestSnapshotApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn batch_url(
        &self,
        batch_id: &str,
        action: Option<ControlAction>,
    ) -> Result<reqwest::Url, ApiError> {
        let base = self.settings.base_url.trim_end_matches('/');
        let raw = match action {
            Some(action) => format!("{base}/api/batches/{batch_id}/{}", action.as_str()),
            None => format!("{base}/api/batches/{batch_id}"),
        };
        reqwest::Url::parse(&raw).map_err(|err| ApiError::InvalidUrl(err.to_string()))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.settings.bearer_token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }
}

#[async_trait::async_trait]
impl SnapshotApi for ReqwestSnapshotApi {
    async fn get_batch(&self, batch_id: &str) -> Result<BatchSnapshot, ApiError> {
        let url = self.batch_url(batch_id, None)?;
        tracker_debug!("GET {}", url);
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body = read_success_body(response).await?;
        let wire: BatchDetailWire =
            serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))?;
        Ok(wire.into_snapshot())
    }

    async fn control(&self, batch_id: &str, action: ControlAction) -> Result<(), ApiError> {
        let url = self.batch_url(batch_id, Some(action))?;
        tracker_debug!("POST {}", url);
        let response = self
            .authorize(self.client.post(url))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_success_body(response).await.map(|_| ())
    }
}

async fn read_success_body(response: reqwest::Response) -> Result<String, ApiError> {
    let status = response.status();
    let body = response.text().await.map_err(map_reqwest_error)?;
    if status.is_success() {
        return Ok(body);
    }
    Err(ApiError::Status {
        code: status.as_u16(),
        detail: error_detail(&body).unwrap_or_else(|| status.to_string()),
    })
}

/// Error bodies look like `{"detail": "..."}`; validation errors carry a list.
fn error_detail(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: serde_json::Value,
    }
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        serde_json::Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::Timeout(err.to_string());
    }
    if err.is_decode() {
        return ApiError::Decode(err.to_string());
    }
    ApiError::Network(err.to_string())
}

#[derive(Debug, Deserialize)]
struct BatchDetailWire {
    id: String,
    #[serde(default)]
    name: Option<String>,
    status: BatchStatus,
    #[serde(default)]
    total_episodes: u32,
    #[serde(default)]
    completed_episodes: u32,
    #[serde(default)]
    failed_episodes: u32,
    #[serde(default)]
    estimated_cost_cents: Option<i64>,
    #[serde(default)]
    actual_cost_cents: i64,
    #[serde(default)]
    jobs: Vec<JobSummaryWire>,
}

#[derive(Debug, Deserialize)]
struct JobSummaryWire {
    id: String,
    #[serde(default)]
    episode_id: String,
    #[serde(default)]
    episode_title: Option<String>,
    #[serde(deserialize_with = "lenient_job_status")]
    status: JobStatus,
    #[serde(default)]
    progress: u8,
    #[serde(default)]
    current_step: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    cost_cents: Option<i64>,
}

/// One unfamiliar job status must not cost the whole snapshot.
fn lenient_job_status<'de, D>(deserializer: D) -> Result<JobStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(
        serde_json::from_value(serde_json::Value::String(raw.clone())).unwrap_or_else(|_| {
            tracker_warn!("unknown job status {:?} in snapshot", raw);
            JobStatus::Unknown
        }),
    )
}

impl BatchDetailWire {
    fn into_snapshot(self) -> BatchSnapshot {
        let batch = Batch {
            progress: derived_progress(
                self.completed_episodes,
                self.failed_episodes,
                self.total_episodes,
            )
            .min(1.0),
            id: self.id,
            name: self.name,
            status: self.status,
            total: self.total_episodes,
            completed: self.completed_episodes,
            failed: self.failed_episodes,
            estimated_cost_cents: self.estimated_cost_cents,
            actual_cost_cents: self.actual_cost_cents,
        };
        let jobs = self
            .jobs
            .into_iter()
            .map(|job| Job {
                id: job.id,
                batch_id: batch.id.clone(),
                episode_id: job.episode_id,
                episode_title: job.episode_title,
                status: job.status,
                progress: job.progress.min(100),
                current_step: job.current_step.filter(|step| !step.is_empty()),
                error_message: job.error_message,
                cost_cents: job.cost_cents,
            })
            .collect();
        BatchSnapshot::new(batch, jobs)
    }
}
