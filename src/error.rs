use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failure kinds of the video pipeline. Every kind is terminal for the job it occurs in.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Fetch failed for {reference}: {reason}")]
    Fetch { reference: String, reason: String },

    #[error("Transcode failed: {message}")]
    Transcode {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Summarization failed: {0}")]
    Summarization(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Job cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn fetch(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    pub fn transcode(message: impl Into<String>) -> Self {
        Self::Transcode {
            message: message.into(),
            stderr: None,
            exit_code: None,
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Short machine name of the failure kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Fetch { .. } => "fetch",
            PipelineError::Transcode { .. } => "transcode",
            PipelineError::Transcription(_) => "transcription",
            PipelineError::Summarization(_) => "summarization",
            PipelineError::Persistence(_) => "persistence",
            PipelineError::Cancelled => "cancelled",
        }
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(e: sqlx::Error) -> Self {
        PipelineError::Persistence(e.to_string())
    }
}
