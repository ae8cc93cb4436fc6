use crate::error::PipelineResult;
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncRead;
use uuid::Uuid;

pub mod local;
pub mod s3;

pub const CLIP_CONTENT_TYPE: &str = "video/mp4";

/// An opened artifact, ready to be streamed back to a client.
pub struct ArtifactObject {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    pub content_type: String,
    pub content_length: Option<i64>,
    pub content_range: Option<String>,
    pub e_tag: Option<String>,
}

/// Addressable storage for finished clips.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Stores the clip at `local_path` for `job_id`, returning its location.
    async fn publish(&self, job_id: Uuid, local_path: &Path) -> PipelineResult<String>;

    /// Opens a previously published location. `range` is a raw HTTP Range header value.
    async fn open(&self, location: &str, range: Option<String>) -> PipelineResult<ArtifactObject>;
}

pub fn clip_key(job_id: Uuid) -> String {
    format!("shorts/{}.mp4", job_id)
}
