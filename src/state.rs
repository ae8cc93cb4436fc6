use crate::infrastructure::storage::ArtifactStore;
use crate::modules::jobs::repository::JobRepository;
use crate::workers::pipeline::PipelineRunner;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<dyn JobRepository>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub pipeline: PipelineRunner,
}

impl AppState {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        artifacts: Arc<dyn ArtifactStore>,
        pipeline: PipelineRunner,
    ) -> Self {
        Self {
            jobs,
            artifacts,
            pipeline,
        }
    }
}
