use super::{ArtifactObject, ArtifactStore, CLIP_CONTENT_TYPE, clip_key};
use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;
use uuid::Uuid;

/// Stores clips under a directory on the local filesystem.
///
/// Locations are keys relative to `root`, so they stay valid if the directory moves.
/// Range requests are not supported; `open` always serves the whole file.
#[derive(Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, location: &str) -> PipelineResult<PathBuf> {
        let relative = Path::new(location);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(PipelineError::persistence(format!(
                "Invalid artifact location: {}",
                location
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn publish(&self, job_id: Uuid, local_path: &Path) -> PipelineResult<String> {
        let key = clip_key(job_id);
        let target = self.resolve(&key)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| {
                    PipelineError::persistence(format!(
                        "Failed to create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
        }

        fs::copy(local_path, &target)
            .await
            .map_err(|e| PipelineError::persistence(format!("Failed to store clip: {}", e)))?;

        info!("📁 Stored clip at {}", target.display());
        Ok(key)
    }

    async fn open(&self, location: &str, _range: Option<String>) -> PipelineResult<ArtifactObject> {
        let path = self.resolve(location)?;
        let file = fs::File::open(&path)
            .await
            .map_err(|e| {
                PipelineError::persistence(format!("Failed to open {}: {}", location, e))
            })?;
        let len = file
            .metadata()
            .await
            .map_err(|e| PipelineError::persistence(e.to_string()))?
            .len();

        Ok(ArtifactObject {
            reader: Box::new(file),
            content_type: CLIP_CONTENT_TYPE.to_string(),
            content_length: Some(len as i64),
            content_range: None,
            e_tag: None,
        })
    }
}
