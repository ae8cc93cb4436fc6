//! Fakes and fixtures shared by the unit tests.

use crate::error::{PipelineError, PipelineResult};
use crate::infrastructure::storage::local::LocalArtifactStore;
use crate::modules::jobs::model::Job;
use crate::modules::jobs::repository::{JobRepository, MemoryJobRepository};
use crate::state::AppState;
use crate::workers::pipeline::PipelineRunner;
use crate::workers::stages::{
    ClipOutput, ClipRequest, ClipStage, ExtractRequest, FetchedSource, PipelineStages,
    SourceMetadata, SourcePayload, Stage, SummaryRequest,
};
use async_trait::async_trait;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

type Behavior<I, O> = Box<dyn Fn(I) -> PipelineResult<O> + Send + Sync>;

/// A stage whose behaviour is a closure. Counts its invocations.
pub struct FakeStage<I, O> {
    name: &'static str,
    calls: AtomicUsize,
    delay: Option<Duration>,
    behavior: Behavior<I, O>,
}

impl<I, O> FakeStage<I, O> {
    pub fn new(
        name: &'static str,
        behavior: impl Fn(I) -> PipelineResult<O> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: AtomicUsize::new(0),
            delay: None,
            behavior: Box::new(behavior),
        })
    }

    /// Like [`FakeStage::new`], but sleeps for `delay` before running `behavior`.
    pub fn delayed(
        name: &'static str,
        delay: Duration,
        behavior: impl Fn(I) -> PipelineResult<O> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: AtomicUsize::new(0),
            delay: Some(delay),
            behavior: Box::new(behavior),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<I, O> Stage for FakeStage<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    type Input = I;
    type Output = O;

    fn name(&self) -> &'static str {
        self.name
    }

    async fn execute(&self, input: I) -> PipelineResult<O> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.behavior)(input)
    }
}

fn write(path: &Path, bytes: &[u8]) -> PipelineResult<()> {
    std::fs::write(path, bytes).map_err(|e| PipelineError::persistence(e.to_string()))
}

/// Fetches a fake video of a fixed duration, or fails with a fixed reason.
pub fn fake_fetcher(
    duration_seconds: i32,
    failure: Option<String>,
) -> Arc<FakeStage<String, FetchedSource>> {
    FakeStage::new("fetch", move |reference: String| {
        if let Some(reason) = &failure {
            return Err(PipelineError::fetch(&reference, reason.clone()));
        }
        Ok(FetchedSource {
            metadata: SourceMetadata {
                id: format!("vid-{}", reference.len()),
                title: Some("Fake video".to_string()),
                duration_seconds,
                extension: "mp4".to_string(),
            },
            payload: SourcePayload::from_reader(reference, Cursor::new(b"fake video".to_vec())),
        })
    })
}

pub struct TestStages {
    pub fetcher: Arc<FakeStage<String, FetchedSource>>,
    pub extractor: Arc<FakeStage<ExtractRequest, PathBuf>>,
    pub transcriber: Arc<FakeStage<PathBuf, String>>,
    pub summarizer: Arc<FakeStage<SummaryRequest, String>>,
    pub clipper: Arc<FakeStage<ClipRequest, ClipOutput>>,
    /// Replaces the fake clipper when set, e.g. with the real ffmpeg stage.
    pub clipper_override: Option<ClipStage>,
}

impl TestStages {
    /// Every stage succeeds; the source is `duration_seconds` long.
    pub fn new(duration_seconds: i32) -> Self {
        Self {
            fetcher: fake_fetcher(duration_seconds, None),
            extractor: FakeStage::new("extract", |req: ExtractRequest| {
                write(&req.audio_path, b"fake audio")?;
                Ok(req.audio_path)
            }),
            transcriber: FakeStage::new("transcribe", |_audio: PathBuf| {
                Ok("transcript".to_string())
            }),
            summarizer: FakeStage::new("summarize", |req: SummaryRequest| {
                Ok(format!("summary of: {}", req.transcript))
            }),
            clipper: FakeStage::new("clip", |req: ClipRequest| {
                write(&req.output_path, b"fake clip")?;
                Ok(ClipOutput {
                    path: req.output_path,
                    duration_seconds: req.duration_seconds,
                })
            }),
            clipper_override: None,
        }
    }

    pub fn failing_fetch(mut self, reason: &str) -> Self {
        self.fetcher = fake_fetcher(0, Some(reason.to_string()));
        self
    }

    pub fn failing_transcriber(mut self, reason: &str) -> Self {
        let reason = reason.to_string();
        self.transcriber = FakeStage::new("transcribe", move |_audio: PathBuf| {
            Err(PipelineError::Transcription(reason.clone()))
        });
        self
    }

    /// Transcription succeeds but cancels `token` while it runs.
    pub fn cancelling_transcriber(mut self, token: CancellationToken) -> Self {
        self.transcriber = FakeStage::new("transcribe", move |_audio: PathBuf| {
            token.cancel();
            Ok("transcript".to_string())
        });
        self
    }

    /// Transcription succeeds only after `delay`.
    pub fn slow_transcriber(mut self, delay: Duration) -> Self {
        self.transcriber = FakeStage::delayed("transcribe", delay, |_audio: PathBuf| {
            Ok("transcript".to_string())
        });
        self
    }

    fn into_stages(self) -> PipelineStages {
        PipelineStages {
            fetcher: self.fetcher,
            extractor: self.extractor,
            transcriber: self.transcriber,
            summarizer: self.summarizer,
            clipper: match self.clipper_override {
                Some(clipper) => clipper,
                None => self.clipper,
            },
        }
    }
}

pub struct Harness {
    pub runner: PipelineRunner,
    pub jobs: Arc<MemoryJobRepository>,
    pub artifacts: Arc<LocalArtifactStore>,
    dir: TempDir,
}

impl Harness {
    pub fn new(stages: TestStages) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let jobs = Arc::new(MemoryJobRepository::new());
        let artifacts = Arc::new(LocalArtifactStore::new(dir.path().join("videos")));
        let runner = PipelineRunner::new(
            stages.into_stages(),
            jobs.clone(),
            artifacts.clone(),
            dir.path().join("work"),
        );

        Self {
            runner,
            jobs,
            artifacts,
            dir,
        }
    }

    pub fn work_dir(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.dir.path().join("videos")
    }

    pub fn state(&self) -> AppState {
        AppState::new(
            self.jobs.clone(),
            self.artifacts.clone(),
            self.runner.clone(),
        )
    }

    /// Polls the store until the job reaches a terminal state.
    pub async fn wait_for_terminal(&self, id: Uuid) -> Job {
        for _ in 0..200 {
            if let Some(job) = self.jobs.find_by_id(id).await.expect("find job") {
                if job.status.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} did not finish", id);
    }
}
