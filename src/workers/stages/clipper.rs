use super::{ClipOutput, ClipRequest, Stage, ffmpeg};
use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use std::ffi::OsString;

/// Cuts a fixed window out of the source video.
///
/// Sources shorter than the end of the window are rejected before ffmpeg runs.
pub struct FfmpegClipGenerator {
    ffmpeg_path: String,
}

impl FfmpegClipGenerator {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    fn check_window(req: &ClipRequest) -> PipelineResult<()> {
        if req.start_seconds < 0 || req.duration_seconds <= 0 {
            return Err(PipelineError::transcode(format!(
                "Invalid clip window: start {}s, duration {}s",
                req.start_seconds, req.duration_seconds
            )));
        }

        let end = req.start_seconds + req.duration_seconds;
        if req.source_duration_seconds < end {
            return Err(PipelineError::transcode(format!(
                "Source is {}s long, shorter than the {}s clip window",
                req.source_duration_seconds, end
            )));
        }

        Ok(())
    }

    fn args(req: &ClipRequest) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-ss".into(),
            req.start_seconds.to_string().into(),
            "-i".into(),
            req.source_path.clone().into(),
            "-t".into(),
            req.duration_seconds.to_string().into(),
            req.output_path.clone().into(),
        ]
    }
}

#[async_trait]
impl Stage for FfmpegClipGenerator {
    type Input = ClipRequest;
    type Output = ClipOutput;

    fn name(&self) -> &'static str {
        "clip"
    }

    async fn execute(&self, input: ClipRequest) -> PipelineResult<ClipOutput> {
        Self::check_window(&input)?;
        ffmpeg::run(&self.ffmpeg_path, Self::args(&input)).await?;

        Ok(ClipOutput {
            path: input.output_path,
            duration_seconds: input.duration_seconds,
        })
    }
}
