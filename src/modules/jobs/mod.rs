use axum::Router;
use axum::routing::{get, post};
use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod model;
pub mod repository;
pub mod service;
pub mod stream_handler;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/process-video", post(handler::process_video))
        .route("/job-status/{id}", get(handler::job_status))
        .route("/video-status/{id}", get(handler::job_status))
        .route("/jobs", get(handler::list_jobs))
        .route("/jobs/{id}", get(handler::get_job))
        .route("/jobs/{id}/cancel", post(handler::cancel_job))
        .route("/jobs/{id}/short", get(stream_handler::stream_short))
}
