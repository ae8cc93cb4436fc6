use super::{ArtifactObject, ArtifactStore, CLIP_CONTENT_TYPE, clip_key};
use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
    pub bucket: String,
}

impl StorageService {
    pub async fn new(
        endpoint: &str,
        bucket: &str,
        access_key: &str,
        secret_key: &str
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .build();

        let client = Client::from_conf(config);

        info!("✅ Connected to S3 (MinIO)");

        Self {
            client,
            bucket: bucket.to_string(),
        }
    }

    pub async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> PipelineResult<()> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| {
                PipelineError::persistence(format!("Failed to read {}: {}", path.display(), e))
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| PipelineError::persistence(format!("Failed to upload {}: {}", key, e)))?;

        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for StorageService {
    async fn publish(&self, job_id: Uuid, local_path: &Path) -> PipelineResult<String> {
        let key = clip_key(job_id);
        self.put_file(&key, local_path, CLIP_CONTENT_TYPE).await?;
        info!("⬆️ Uploaded clip to s3://{}/{}", self.bucket, key);
        Ok(key)
    }

    async fn open(&self, location: &str, range: Option<String>) -> PipelineResult<ArtifactObject> {
        let mut req = self.client
            .get_object()
            .bucket(&self.bucket)
            .key(location);

        if let Some(r) = range {
            req = req.range(r);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| {
                PipelineError::persistence(format!("Failed to fetch {}: {}", location, e))
            })?;

        Ok(ArtifactObject {
            content_type: resp
                .content_type()
                .unwrap_or(CLIP_CONTENT_TYPE)
                .to_string(),
            content_length: resp.content_length(),
            content_range: resp.content_range().map(str::to_string),
            e_tag: resp.e_tag().map(str::to_string),
            reader: Box::new(resp.body.into_async_read()),
        })
    }
}
