use crate::error::{PipelineError, PipelineResult};
use crate::infrastructure::storage::ArtifactStore;
use crate::modules::jobs::model::{Job, JobEvent, SHORT_DURATION_SECONDS};
use crate::modules::jobs::repository::JobRepository;
use crate::workers::stages::{
    ClipRequest, ExtractRequest, FetchedSource, PipelineStages, Stage, SummaryRequest,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};
use uuid::Uuid;

/// A job whose source has been resolved and whose record is `downloading`.
#[derive(Debug)]
pub struct AcceptedJob {
    pub job: Job,
    source: FetchedSource,
}

/// Job-scoped working files. Every path lives under `{work_dir}/{job_id}/`.
struct JobPaths {
    dir: PathBuf,
    source: PathBuf,
    audio: PathBuf,
    short: PathBuf,
}

impl JobPaths {
    fn new(work_dir: &Path, job_id: Uuid, extension: &str) -> Self {
        let ext: String = extension
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        let ext = if ext.is_empty() { "mp4".to_string() } else { ext };

        let dir = work_dir.join(job_id.to_string());
        Self {
            source: dir.join(format!("source.{}", ext)),
            audio: dir.join("audio.mp3"),
            short: dir.join("short.mp4"),
            dir,
        }
    }
}

struct RunnerInner {
    stages: PipelineStages,
    jobs: Arc<dyn JobRepository>,
    artifacts: Arc<dyn ArtifactStore>,
    work_dir: PathBuf,
    shutdown: CancellationToken,
    running: Mutex<HashMap<Uuid, CancellationToken>>,
    tasks: TaskTracker,
}

/// Sequences the pipeline stages for each job and keeps its record current.
///
/// A job's record is only ever written by the task driving that job.
#[derive(Clone)]
pub struct PipelineRunner {
    inner: Arc<RunnerInner>,
}

fn checkpoint(token: &CancellationToken) -> PipelineResult<()> {
    if token.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    Ok(())
}

impl PipelineRunner {
    pub fn new(
        stages: PipelineStages,
        jobs: Arc<dyn JobRepository>,
        artifacts: Arc<dyn ArtifactStore>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                stages,
                jobs,
                artifacts,
                work_dir: work_dir.into(),
                shutdown: CancellationToken::new(),
                running: Mutex::new(HashMap::new()),
                tasks: TaskTracker::new(),
            }),
        }
    }

    /// Accepts a job and hands the rest of the pipeline to a background task.
    pub async fn start(&self, source_reference: String) -> PipelineResult<Job> {
        let token = self.inner.shutdown.child_token();
        let accepted = self.accept(source_reference, &token).await?;
        let job = accepted.job.clone();

        self.inner
            .running
            .lock()
            .await
            .insert(job.id, token.clone());

        let runner = self.clone();
        self.inner.tasks.spawn(async move {
            runner.drive(accepted, token).await;
        });

        Ok(job)
    }

    /// Creates the record and fetches the source. On failure the record is left `failed`.
    pub async fn accept(
        &self,
        source_reference: String,
        token: &CancellationToken,
    ) -> PipelineResult<AcceptedJob> {
        let mut job = Job::new(source_reference.trim());
        self.inner.jobs.insert(&job).await?;
        info!("📥 Job {} created for {}", job.id, job.source_reference);

        let fetched = match checkpoint(token) {
            Ok(()) => {
                self.run_stage(
                    job.id,
                    &self.inner.stages.fetcher,
                    job.source_reference.clone(),
                    token,
                )
                .await
            }
            Err(e) => Err(e),
        };

        let source = match fetched {
            Ok(source) => source,
            Err(e) => {
                self.fail(&mut job, &e).await;
                return Err(e);
            }
        };

        let event = JobEvent::FetchOk {
            source_video_id: source.metadata.id.clone(),
            duration_seconds: source.metadata.duration_seconds,
        };
        if let Err(e) = self.advance(&mut job, event).await {
            self.fail(&mut job, &e).await;
            return Err(e);
        }

        Ok(AcceptedJob { job, source })
    }

    /// Runs download, extract, transcribe, summarize and clip in order.
    /// Returns the record in its terminal state.
    pub async fn drive(&self, accepted: AcceptedJob, token: CancellationToken) -> Job {
        let AcceptedJob { mut job, source } = accepted;
        let started = Instant::now();

        match self.run_stages(&mut job, source, &token).await {
            Ok(()) => info!(
                "✅ Job {} completed in {:.1}s",
                job.id,
                started.elapsed().as_secs_f64()
            ),
            Err(e) => {
                error!("❌ Job {} failed during {}: {}", job.id, e.kind(), e);
                self.fail(&mut job, &e).await;
            }
        }

        self.inner.running.lock().await.remove(&job.id);
        job
    }

    /// Signals a running job to stop at its next stage boundary.
    pub async fn cancel(&self, job_id: Uuid) -> bool {
        match self.inner.running.lock().await.get(&job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every running job.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    /// Waits until every spawned job has recorded its terminal state.
    pub async fn wait_for_jobs(&self) {
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
    }

    async fn run_stages(
        &self,
        job: &mut Job,
        source: FetchedSource,
        token: &CancellationToken,
    ) -> PipelineResult<()> {
        let stages = &self.inner.stages;
        let FetchedSource { metadata, payload } = source;
        let paths = JobPaths::new(&self.inner.work_dir, job.id, &metadata.extension);

        tokio::fs::create_dir_all(&paths.dir).await.map_err(|e| {
            PipelineError::persistence(format!("Failed to create {}: {}", paths.dir.display(), e))
        })?;

        checkpoint(token)?;
        info!("⬇️ Downloading {} for job {}", metadata.id, job.id);
        let bytes = payload.persist_to(&paths.source).await?;
        info!("⬇️ Downloaded {} bytes for job {}", bytes, job.id);
        self.advance(job, JobEvent::DownloadComplete).await?;

        checkpoint(token)?;
        let audio = self
            .run_stage(
                job.id,
                &stages.extractor,
                ExtractRequest {
                    video_path: paths.source.clone(),
                    audio_path: paths.audio.clone(),
                },
                token,
            )
            .await?;
        self.advance(job, JobEvent::ExtractOk).await?;

        checkpoint(token)?;
        let transcript = self
            .run_stage(job.id, &stages.transcriber, audio, token)
            .await?;
        self.advance(job, JobEvent::TranscribeOk).await?;

        checkpoint(token)?;
        let summary = self
            .run_stage(
                job.id,
                &stages.summarizer,
                SummaryRequest {
                    transcript,
                    target_duration_seconds: SHORT_DURATION_SECONDS,
                },
                token,
            )
            .await?;
        self.advance(
            job,
            JobEvent::SummarizeOk {
                summary: summary.clone(),
            },
        )
        .await?;

        checkpoint(token)?;
        let clip = self
            .run_stage(
                job.id,
                &stages.clipper,
                ClipRequest {
                    source_path: paths.source.clone(),
                    output_path: paths.short.clone(),
                    source_duration_seconds: metadata.duration_seconds,
                    start_seconds: 0,
                    duration_seconds: SHORT_DURATION_SECONDS,
                    summary,
                },
                token,
            )
            .await?;

        let location = self.inner.artifacts.publish(job.id, &clip.path).await?;
        self.advance(
            job,
            JobEvent::ClipOk {
                location,
                duration_seconds: clip.duration_seconds,
            },
        )
        .await?;

        if let Err(e) = tokio::fs::remove_dir_all(&paths.dir).await {
            warn!("Failed to clean up {}: {}", paths.dir.display(), e);
        }

        Ok(())
    }

    async fn run_stage<I, O>(
        &self,
        job_id: Uuid,
        stage: &Arc<dyn Stage<Input = I, Output = O>>,
        input: I,
        token: &CancellationToken,
    ) -> PipelineResult<O>
    where
        I: Send + 'static,
        O: Send + 'static,
    {
        let started = Instant::now();
        info!("▶️ Job {} stage {} started", job_id, stage.name());

        // Dropping the stage future kills any child process it spawned.
        let result = tokio::select! {
            biased;
            result = stage.execute(input) => result,
            _ = token.cancelled() => Err(PipelineError::Cancelled),
        };
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(_) => info!(
                "Job {} stage {} finished in {:.1}s",
                job_id,
                stage.name(),
                elapsed
            ),
            Err(PipelineError::Transcode {
                stderr: Some(stderr),
                exit_code,
                ..
            }) => warn!(
                "Job {} stage {} failed after {:.1}s (exit code {:?}): {}",
                job_id,
                stage.name(),
                elapsed,
                exit_code,
                stderr
            ),
            Err(e) => warn!(
                "Job {} stage {} failed after {:.1}s: {}",
                job_id,
                stage.name(),
                elapsed,
                e
            ),
        }

        result
    }

    /// Applies `event` and persists it. `job` is only replaced once the write succeeded.
    async fn advance(&self, job: &mut Job, event: JobEvent) -> PipelineResult<()> {
        let mut next = job.clone();
        next.apply(event)
            .map_err(|e| PipelineError::persistence(e.to_string()))?;
        self.inner.jobs.update(&mut next).await?;

        if next.status != job.status {
            info!("Job {} is now {}", job.id, next.status);
        }
        *job = next;
        Ok(())
    }

    async fn fail(&self, job: &mut Job, err: &PipelineError) {
        let mut next = job.clone();
        if next
            .apply(JobEvent::Failed {
                reason: err.to_string(),
            })
            .is_err()
        {
            return;
        }

        match self.inner.jobs.update(&mut next).await {
            Ok(()) => *job = next,
            Err(e) => error!("Failed to record failure of job {}: {}", job.id, e),
        }
    }
}
