use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;
use super::model::{Job, JobStatus};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessVideoRequest {
    /// URL of the video to process. `youtubeUrl` is accepted as an alias.
    #[serde(alias = "youtubeUrl")]
    #[validate(length(min = 1, message = "sourceReference must not be empty"))]
    pub source_reference: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessVideoResponse {
    pub message: String,
    pub job_id: Uuid,
    /// Same value as `jobId`, under the name the polling web client reads.
    pub video_id: Uuid,
}

impl ProcessVideoResponse {
    pub fn started(job_id: Uuid) -> Self {
        Self {
            message: "Video processing started".to_string(),
            job_id,
            video_id: job_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_video_location: Option<String>,
    /// Playable URL of the clip once the job is completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        let short_video_url = match (&job.status, &job.short_video_location) {
            (JobStatus::Completed, Some(_)) => Some(short_video_url(job.id)),
            _ => None,
        };

        Self {
            status: job.status,
            short_video_location: job.short_video_location,
            short_video_url,
            error: job.error,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelJobResponse {
    pub message: String,
    pub job_id: Uuid,
}

pub fn short_video_url(job_id: Uuid) -> String {
    format!("/api/jobs/{}/short", job_id)
}
