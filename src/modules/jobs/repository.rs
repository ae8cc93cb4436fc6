use super::model::{Job, JobRow};
use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Create/update/read access to Job Records.
///
/// `update` is an optimistic write: it only succeeds when the stored version
/// still equals `job.version`, and bumps the version on success.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn insert(&self, job: &Job) -> PipelineResult<()>;

    async fn update(&self, job: &mut Job) -> PipelineResult<()>;

    async fn find_by_id(&self, id: Uuid) -> PipelineResult<Option<Job>>;

    async fn list_recent(&self, limit: i64) -> PipelineResult<Vec<Job>>;

    /// Marks every non-terminal record as failed. Returns how many were touched.
    async fn fail_unfinished(&self, reason: &str) -> PipelineResult<u64>;
}

fn conflict(id: Uuid, version: i64) -> PipelineError {
    PipelineError::persistence(format!(
        "Job {} was modified concurrently (expected version {})",
        id, version
    ))
}

pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn insert(&self, job: &Job) -> PipelineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, source_reference, status, created_at, updated_at, version)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(job.id)
        .bind(&job.source_reference)
        .bind(job.status.as_str())
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, job: &mut Job) -> PipelineResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET source_video_id = $1,
                original_duration_seconds = $2,
                short_duration_seconds = $3,
                status = $4,
                short_video_location = $5,
                summary = $6,
                error = $7,
                updated_at = $8,
                version = version + 1
            WHERE id = $9 AND version = $10
            "#,
        )
        .bind(&job.source_video_id)
        .bind(job.original_duration_seconds)
        .bind(job.short_duration_seconds)
        .bind(job.status.as_str())
        .bind(&job.short_video_location)
        .bind(&job.summary)
        .bind(&job.error)
        .bind(job.updated_at)
        .bind(job.id)
        .bind(job.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(conflict(job.id, job.version));
        }

        job.version += 1;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> PipelineResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Job::try_from)
            .transpose()
            .map_err(PipelineError::Persistence)
    }

    async fn list_recent(&self, limit: i64) -> PipelineResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM jobs ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(Job::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(PipelineError::Persistence)
    }

    async fn fail_unfinished(&self, reason: &str) -> PipelineResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed', error = $1, updated_at = NOW(), version = version + 1
            WHERE status NOT IN ('completed', 'failed')
            "#,
        )
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

/// Process-local store used when no database is configured.
#[derive(Default)]
pub struct MemoryJobRepository {
    jobs: RwLock<HashMap<Uuid, Job>>,
    #[cfg(test)]
    history: RwLock<HashMap<Uuid, Vec<super::model::JobStatus>>>,
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every status persisted for `id`, in write order.
    #[cfg(test)]
    pub async fn history(&self, id: Uuid) -> Vec<super::model::JobStatus> {
        self.history.read().await.get(&id).cloned().unwrap_or_default()
    }

    #[cfg(test)]
    async fn record(&self, job: &Job) {
        self.history
            .write()
            .await
            .entry(job.id)
            .or_default()
            .push(job.status);
    }

    #[cfg(not(test))]
    async fn record(&self, _job: &Job) {}
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn insert(&self, job: &Job) -> PipelineResult<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(PipelineError::persistence(format!(
                "Job {} already exists",
                job.id
            )));
        }
        jobs.insert(job.id, job.clone());
        drop(jobs);

        self.record(job).await;
        Ok(())
    }

    async fn update(&self, job: &mut Job) -> PipelineResult<()> {
        let mut jobs = self.jobs.write().await;
        let stored = jobs
            .get_mut(&job.id)
            .ok_or_else(|| PipelineError::persistence(format!("Job {} not found", job.id)))?;

        if stored.version != job.version {
            return Err(conflict(job.id, job.version));
        }

        job.version += 1;
        *stored = job.clone();
        drop(jobs);

        self.record(job).await;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> PipelineResult<Option<Job>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn list_recent(&self, limit: i64) -> PipelineResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit.max(0) as usize);
        Ok(jobs)
    }

    async fn fail_unfinished(&self, reason: &str) -> PipelineResult<u64> {
        let mut jobs = self.jobs.write().await;
        let mut touched = 0;

        for job in jobs.values_mut().filter(|j| !j.status.is_terminal()) {
            job.apply(super::model::JobEvent::Failed {
                reason: reason.to_string(),
            })
            .map_err(|e| PipelineError::persistence(e.to_string()))?;
            job.version += 1;
            touched += 1;
        }

        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::jobs::model::{JobEvent, JobStatus};

    #[tokio::test]
    async fn update_bumps_version_and_persists_fields() {
        let repo = MemoryJobRepository::new();
        let mut job = Job::new("https://youtu.be/a");
        repo.insert(&job).await.unwrap();

        job.apply(JobEvent::FetchOk {
            source_video_id: "a".to_string(),
            duration_seconds: 42,
        })
        .unwrap();
        repo.update(&mut job).await.unwrap();

        let stored = repo.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(job.version, 1);
        assert_eq!(stored.status, JobStatus::Downloading);
        assert_eq!(stored.original_duration_seconds, Some(42));
    }

    #[tokio::test]
    async fn stale_writer_is_rejected() {
        let repo = MemoryJobRepository::new();
        let mut owner = Job::new("r");
        repo.insert(&owner).await.unwrap();
        let mut stale = owner.clone();

        owner
            .apply(JobEvent::Failed {
                reason: "x".to_string(),
            })
            .unwrap();
        repo.update(&mut owner).await.unwrap();

        stale.summary = Some("late write".to_string());
        let err = repo.update(&mut stale).await.unwrap_err();
        assert!(matches!(err, PipelineError::Persistence(_)));
        assert_eq!(
            repo.find_by_id(owner.id).await.unwrap().unwrap().status,
            JobStatus::Failed
        );
    }

    #[tokio::test]
    async fn duplicate_insert_fails() {
        let repo = MemoryJobRepository::new();
        let job = Job::new("r");
        repo.insert(&job).await.unwrap();
        assert!(repo.insert(&job).await.is_err());
    }

    #[tokio::test]
    async fn fail_unfinished_only_touches_live_jobs() {
        let repo = MemoryJobRepository::new();

        let live = Job::new("live");
        repo.insert(&live).await.unwrap();

        let mut done = Job::new("done");
        repo.insert(&done).await.unwrap();
        done.apply(JobEvent::Failed {
            reason: "earlier".to_string(),
        })
        .unwrap();
        repo.update(&mut done).await.unwrap();

        let touched = repo.fail_unfinished("interrupted").await.unwrap();
        assert_eq!(touched, 1);

        let live = repo.find_by_id(live.id).await.unwrap().unwrap();
        assert_eq!(live.status, JobStatus::Failed);
        assert_eq!(live.error.as_deref(), Some("interrupted"));

        let done = repo.find_by_id(done.id).await.unwrap().unwrap();
        assert_eq!(done.error.as_deref(), Some("earlier"));
    }

    #[tokio::test]
    async fn list_recent_is_newest_first_and_limited() {
        let repo = MemoryJobRepository::new();
        let mut ids = Vec::new();
        for i in 0..3 {
            let mut job = Job::new(format!("r{}", i));
            job.created_at += time::Duration::seconds(i);
            ids.push(job.id);
            repo.insert(&job).await.unwrap();
        }

        let listed = repo.list_recent(2).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, ids[2]);
        assert_eq!(listed[1].id, ids[1]);
    }
}
