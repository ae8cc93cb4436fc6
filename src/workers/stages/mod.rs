//! Pipeline stages.
//!
//! Each stage is a single external call behind the same capability,
//! `Stage::execute(input) -> output`, so the orchestrator can be driven by
//! fakes in tests.

use crate::error::PipelineResult;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

pub mod clipper;
pub mod extractor;
pub mod fetcher;
mod ffmpeg;
pub mod summarizer;
pub mod transcriber;

pub use clipper::FfmpegClipGenerator;
pub use extractor::FfmpegExtractor;
pub use fetcher::{FetchedSource, SourceMetadata, SourcePayload, YtDlpFetcher};
pub use summarizer::OpenAiSummarizer;
pub use transcriber::OpenAiTranscriber;

#[async_trait]
pub trait Stage: Send + Sync {
    type Input: Send + 'static;
    type Output: Send + 'static;

    fn name(&self) -> &'static str;

    async fn execute(&self, input: Self::Input) -> PipelineResult<Self::Output>;
}

#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub video_path: PathBuf,
    pub audio_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub transcript: String,
    /// Prompt hint only; the summary length is not enforced.
    pub target_duration_seconds: i32,
}

#[derive(Debug, Clone)]
pub struct ClipRequest {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub source_duration_seconds: i32,
    pub start_seconds: i32,
    pub duration_seconds: i32,
    /// Carried for completeness; clip selection does not read it.
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipOutput {
    pub path: PathBuf,
    pub duration_seconds: i32,
}

pub type FetchStage = Arc<dyn Stage<Input = String, Output = FetchedSource>>;
pub type ExtractStage = Arc<dyn Stage<Input = ExtractRequest, Output = PathBuf>>;
pub type TranscribeStage = Arc<dyn Stage<Input = PathBuf, Output = String>>;
pub type SummarizeStage = Arc<dyn Stage<Input = SummaryRequest, Output = String>>;
pub type ClipStage = Arc<dyn Stage<Input = ClipRequest, Output = ClipOutput>>;

/// The five stage implementations one pipeline run uses.
#[derive(Clone)]
pub struct PipelineStages {
    pub fetcher: FetchStage,
    pub extractor: ExtractStage,
    pub transcriber: TranscribeStage,
    pub summarizer: SummarizeStage,
    pub clipper: ClipStage,
}
