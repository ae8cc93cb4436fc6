use super::{ExtractRequest, Stage, ffmpeg};
use crate::error::PipelineResult;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;

/// Demuxes the audio track of a video into an MP3 file.
pub struct FfmpegExtractor {
    ffmpeg_path: String,
}

impl FfmpegExtractor {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    fn args(req: &ExtractRequest) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-i".into(),
            req.video_path.clone().into(),
            "-vn".into(),
            "-acodec".into(),
            "libmp3lame".into(),
            req.audio_path.clone().into(),
        ]
    }
}

#[async_trait]
impl Stage for FfmpegExtractor {
    type Input = ExtractRequest;
    type Output = PathBuf;

    fn name(&self) -> &'static str {
        "extract"
    }

    async fn execute(&self, input: ExtractRequest) -> PipelineResult<PathBuf> {
        ffmpeg::run(&self.ffmpeg_path, Self::args(&input)).await?;
        Ok(input.audio_path)
    }
}
