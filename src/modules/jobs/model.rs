use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Fixed length of the generated clip.
pub const SHORT_DURATION_SECONDS: i32 = 60;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Created,
    Downloading,
    Processing,
    Completed,
    Failed,
}

/// Outcome of a pipeline step, fed to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    FetchOk {
        source_video_id: String,
        duration_seconds: i32,
    },
    DownloadComplete,
    ExtractOk,
    TranscribeOk,
    SummarizeOk { summary: String },
    ClipOk {
        location: String,
        duration_seconds: i32,
    },
    Failed { reason: String },
}

#[derive(Debug, Error, PartialEq)]
#[error("Illegal transition from {from} on {event}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub event: &'static str,
}

impl JobEvent {
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::FetchOk { .. } => "fetch_ok",
            JobEvent::DownloadComplete => "download_complete",
            JobEvent::ExtractOk => "extract_ok",
            JobEvent::TranscribeOk => "transcribe_ok",
            JobEvent::SummarizeOk { .. } => "summarize_ok",
            JobEvent::ClipOk { .. } => "clip_ok",
            JobEvent::Failed { .. } => "stage_error",
        }
    }
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Downloading => "downloading",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Next status for `event`, or an error when the event is not legal here.
    pub fn next(self, event: &JobEvent) -> Result<JobStatus, TransitionError> {
        let next = match (self, event) {
            (JobStatus::Completed | JobStatus::Failed, _) => None,
            (_, JobEvent::Failed { .. }) => Some(JobStatus::Failed),
            (JobStatus::Created, JobEvent::FetchOk { .. }) => Some(JobStatus::Downloading),
            (JobStatus::Downloading, JobEvent::DownloadComplete) => Some(JobStatus::Processing),
            (
                JobStatus::Processing,
                JobEvent::ExtractOk | JobEvent::TranscribeOk | JobEvent::SummarizeOk { .. },
            ) => Some(JobStatus::Processing),
            (JobStatus::Processing, JobEvent::ClipOk { .. }) => Some(JobStatus::Completed),
            _ => None,
        };

        next.ok_or(TransitionError {
            from: self,
            event: event.name(),
        })
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(JobStatus::Created),
            "downloading" => Ok(JobStatus::Downloading),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("Unknown job status: {}", other)),
        }
    }
}

/// The Job Record: progress of one source video through the pipeline.
#[derive(Debug, Serialize, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub source_reference: String,
    pub source_video_id: Option<String>,
    pub original_duration_seconds: Option<i32>,
    pub short_duration_seconds: Option<i32>,
    pub status: JobStatus,
    pub short_video_location: Option<String>,
    pub summary: Option<String>,
    pub error: Option<String>,
    #[schema(value_type = String, format = DateTime)]
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[schema(value_type = String, format = DateTime)]
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(skip)]
    pub version: i64,
}

impl Job {
    pub fn new(source_reference: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            source_reference: source_reference.into(),
            source_video_id: None,
            original_duration_seconds: None,
            short_duration_seconds: None,
            status: JobStatus::Created,
            short_video_location: None,
            summary: None,
            error: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Applies `event` to the record. Returns whether the status changed.
    pub fn apply(&mut self, event: JobEvent) -> Result<bool, TransitionError> {
        let next = self.status.next(&event)?;
        let changed = next != self.status;

        match event {
            JobEvent::FetchOk {
                source_video_id,
                duration_seconds,
            } => {
                self.source_video_id = Some(source_video_id);
                self.original_duration_seconds = Some(duration_seconds);
            }
            JobEvent::SummarizeOk { summary } => self.summary = Some(summary),
            JobEvent::ClipOk {
                location,
                duration_seconds,
            } => {
                self.short_video_location = Some(location);
                self.short_duration_seconds = Some(duration_seconds);
            }
            JobEvent::Failed { reason } => self.error = Some(reason),
            JobEvent::DownloadComplete | JobEvent::ExtractOk | JobEvent::TranscribeOk => {}
        }

        self.status = next;
        self.updated_at = OffsetDateTime::now_utc();
        Ok(changed)
    }
}

/// Row shape of the `jobs` table.
#[derive(Debug, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub source_reference: String,
    pub source_video_id: Option<String>,
    pub original_duration_seconds: Option<i32>,
    pub short_duration_seconds: Option<i32>,
    pub status: String,
    pub short_video_location: Option<String>,
    pub summary: Option<String>,
    pub error: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub version: i64,
}

impl TryFrom<JobRow> for Job {
    type Error = String;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            source_reference: row.source_reference,
            source_video_id: row.source_video_id,
            original_duration_seconds: row.original_duration_seconds,
            short_duration_seconds: row.short_duration_seconds,
            status: row.status.parse()?,
            short_video_location: row.short_video_location,
            summary: row.summary,
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch_ok(duration: i32) -> JobEvent {
        JobEvent::FetchOk {
            source_video_id: "abc123".to_string(),
            duration_seconds: duration,
        }
    }

    fn clip_ok() -> JobEvent {
        JobEvent::ClipOk {
            location: "shorts/x.mp4".to_string(),
            duration_seconds: SHORT_DURATION_SECONDS,
        }
    }

    fn failed() -> JobEvent {
        JobEvent::Failed {
            reason: "boom".to_string(),
        }
    }

    #[test]
    fn happy_path_walks_every_status_in_order() {
        let mut job = Job::new("https://youtu.be/abc123");
        let mut seen = vec![job.status];

        for event in [
            fetch_ok(300),
            JobEvent::DownloadComplete,
            JobEvent::ExtractOk,
            JobEvent::TranscribeOk,
            JobEvent::SummarizeOk {
                summary: "short".to_string(),
            },
            clip_ok(),
        ] {
            job.apply(event).unwrap();
            if seen.last() != Some(&job.status) {
                seen.push(job.status);
            }
        }

        assert_eq!(
            seen,
            vec![
                JobStatus::Created,
                JobStatus::Downloading,
                JobStatus::Processing,
                JobStatus::Completed
            ]
        );
        assert_eq!(job.original_duration_seconds, Some(300));
        assert_eq!(job.short_duration_seconds, Some(SHORT_DURATION_SECONDS));
        assert_eq!(job.short_video_location.as_deref(), Some("shorts/x.mp4"));
        assert_eq!(job.summary.as_deref(), Some("short"));
        assert!(job.error.is_none());
    }

    #[test]
    fn self_transitions_inside_processing_report_no_change() {
        let mut job = Job::new("r");
        job.apply(fetch_ok(90)).unwrap();
        assert!(job.apply(JobEvent::DownloadComplete).unwrap());
        assert!(!job.apply(JobEvent::ExtractOk).unwrap());
        assert!(!job.apply(JobEvent::TranscribeOk).unwrap());
    }

    #[test]
    fn any_non_terminal_state_can_fail() {
        for status in [
            JobStatus::Created,
            JobStatus::Downloading,
            JobStatus::Processing,
        ] {
            assert_eq!(status.next(&failed()), Ok(JobStatus::Failed));
        }
    }

    #[test]
    fn terminal_states_reject_every_event() {
        let events = [
            fetch_ok(10),
            JobEvent::DownloadComplete,
            JobEvent::ExtractOk,
            JobEvent::TranscribeOk,
            JobEvent::SummarizeOk {
                summary: String::new(),
            },
            clip_ok(),
            failed(),
        ];
        for status in [JobStatus::Completed, JobStatus::Failed] {
            for event in &events {
                assert!(status.next(event).is_err(), "{} accepted {}", status, event.name());
            }
        }
    }

    #[test]
    fn out_of_order_events_are_rejected() {
        assert_eq!(
            JobStatus::Created.next(&JobEvent::DownloadComplete),
            Err(TransitionError {
                from: JobStatus::Created,
                event: "download_complete"
            })
        );
        assert!(JobStatus::Downloading.next(&JobEvent::ExtractOk).is_err());
        assert!(JobStatus::Downloading.next(&clip_ok()).is_err());
        assert!(JobStatus::Processing.next(&fetch_ok(1)).is_err());
    }

    #[test]
    fn completed_record_is_frozen() {
        let mut job = Job::new("r");
        job.apply(fetch_ok(120)).unwrap();
        job.apply(JobEvent::DownloadComplete).unwrap();
        job.apply(clip_ok()).unwrap();
        let frozen = job.clone();

        assert!(job.apply(failed()).is_err());
        assert_eq!(job, frozen);
    }

    #[test]
    fn failure_records_reason_and_never_sets_short_duration() {
        let mut job = Job::new("r");
        job.apply(fetch_ok(120)).unwrap();
        job.apply(failed()).unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));
        assert!(job.short_duration_seconds.is_none());
    }

    #[test]
    fn status_string_roundtrips_through_row() {
        for status in [
            JobStatus::Created,
            JobStatus::Downloading,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>(), Ok(status));
        }
        assert!("READY".parse::<JobStatus>().is_err());
    }

    #[test]
    fn serializes_camel_case_without_version() {
        let job = Job::new("https://youtu.be/abc123");
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["sourceReference"], "https://youtu.be/abc123");
        assert_eq!(value["status"], "created");
        assert!(value.get("version").is_none());
    }
}
