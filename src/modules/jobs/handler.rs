use crate::common::response::{ApiError, ApiSuccess, ErrorResponse};
use crate::modules::jobs::dto::*;
use crate::modules::jobs::model::Job;
use crate::modules::jobs::service::JobService;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/process-video",
    request_body = ProcessVideoRequest,
    responses(
        (status = 202, description = "Job accepted", body = ProcessVideoResponse),
        (status = 400, description = "Bad Request", body = ErrorResponse),
        (status = 500, description = "Source could not be fetched", body = ErrorResponse)
    ),
    tag = "Jobs"
)]
pub async fn process_video(
    State(state): State<AppState>,
    payload: Result<Json<ProcessVideoRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(body) => body,
        Err(e) => return ApiError(e.body_text(), StatusCode::BAD_REQUEST).into_response(),
    };

    info!("🎬 Processing request for {}", req.source_reference);
    match JobService::process_video(state, req).await {
        Ok(res) => ApiSuccess(res, StatusCode::ACCEPTED).into_response(),
        Err(e) => {
            error!("❌ Failed to start job: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/job-status/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Current job status", body = JobStatusResponse),
        (status = 404, description = "Job Not Found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    ),
    tag = "Jobs"
)]
pub async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match JobService::job_status(state, id).await {
        Ok(res) => ApiSuccess(res, StatusCode::OK).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/jobs",
    responses(
        (status = 200, description = "Most recent jobs", body = Vec<Job>),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    ),
    tag = "Jobs"
)]
pub async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    match JobService::list_jobs(state).await {
        Ok(res) => ApiSuccess(res, StatusCode::OK).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Full job record", body = Job),
        (status = 404, description = "Job Not Found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    ),
    tag = "Jobs"
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match JobService::get_job(state, id).await {
        Ok(res) => ApiSuccess(res, StatusCode::OK).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/jobs/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 202, description = "Cancellation requested", body = CancelJobResponse),
        (status = 404, description = "Job Not Found", body = ErrorResponse),
        (status = 409, description = "Job is not running", body = ErrorResponse)
    ),
    tag = "Jobs"
)]
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match JobService::cancel_job(state, id).await {
        Ok(res) => {
            info!("🛑 Cancellation requested for job {}", id);
            ApiSuccess(res, StatusCode::ACCEPTED).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
