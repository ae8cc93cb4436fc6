use super::dto::{CancelJobResponse, JobStatusResponse, ProcessVideoRequest, ProcessVideoResponse};
use super::model::Job;
use crate::common::response::ApiError;
use crate::error::PipelineError;
use crate::state::AppState;
use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

const RECENT_JOBS_LIMIT: i64 = 50;

#[derive(Debug, Error)]
pub enum JobServiceError {
    #[error("{0}")]
    Invalid(String),

    #[error("Job not found")]
    NotFound,

    #[error("Job is not running")]
    NotRunning,

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<JobServiceError> for ApiError {
    fn from(e: JobServiceError) -> Self {
        let status = match &e {
            JobServiceError::Invalid(_) => StatusCode::BAD_REQUEST,
            JobServiceError::NotFound => StatusCode::NOT_FOUND,
            JobServiceError::NotRunning => StatusCode::CONFLICT,
            JobServiceError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(e.to_string(), status)
    }
}

pub struct JobService;

impl JobService {
    pub async fn process_video(
        state: AppState,
        req: ProcessVideoRequest,
    ) -> Result<ProcessVideoResponse, JobServiceError> {
        req.validate()
            .map_err(|e| JobServiceError::Invalid(e.to_string()))?;
        if req.source_reference.trim().is_empty() {
            return Err(JobServiceError::Invalid(
                "sourceReference must not be empty".to_string(),
            ));
        }

        let job = state.pipeline.start(req.source_reference).await?;

        Ok(ProcessVideoResponse::started(job.id))
    }

    pub async fn get_job(state: AppState, id: Uuid) -> Result<Job, JobServiceError> {
        state
            .jobs
            .find_by_id(id)
            .await?
            .ok_or(JobServiceError::NotFound)
    }

    pub async fn job_status(
        state: AppState,
        id: Uuid,
    ) -> Result<JobStatusResponse, JobServiceError> {
        Self::get_job(state, id).await.map(JobStatusResponse::from)
    }

    pub async fn list_jobs(state: AppState) -> Result<Vec<Job>, JobServiceError> {
        Ok(state.jobs.list_recent(RECENT_JOBS_LIMIT).await?)
    }

    pub async fn cancel_job(
        state: AppState,
        id: Uuid,
    ) -> Result<CancelJobResponse, JobServiceError> {
        let job = Self::get_job(state.clone(), id).await?;
        if job.status.is_terminal() || !state.pipeline.cancel(id).await {
            return Err(JobServiceError::NotRunning);
        }

        Ok(CancelJobResponse {
            message: "Cancellation requested".to_string(),
            job_id: id,
        })
    }
}
