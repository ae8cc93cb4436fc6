use utoipa::OpenApi;
use crate::common::response::ErrorResponse;
use crate::modules::jobs::dto::*;
use crate::modules::jobs::model::{Job, JobStatus};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::jobs::handler::process_video,
        crate::modules::jobs::handler::job_status,
        crate::modules::jobs::handler::list_jobs,
        crate::modules::jobs::handler::get_job,
        crate::modules::jobs::handler::cancel_job,
        crate::modules::jobs::stream_handler::stream_short,
    ),
    components(
        schemas(
            ProcessVideoRequest, ProcessVideoResponse, JobStatusResponse, CancelJobResponse,
            Job, JobStatus, ErrorResponse,
        )
    ),
    tags(
        (name = "Jobs", description = "Video summarization jobs")
    )
)]
pub struct ApiDoc;
