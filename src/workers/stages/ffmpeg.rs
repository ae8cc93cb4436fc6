use crate::error::{PipelineError, PipelineResult};
use std::ffi::OsString;
use tokio::process::Command;
use tracing::debug;

const STDERR_TAIL: usize = 2000;
const MESSAGE_TAIL: usize = 300;

/// Runs ffmpeg to completion. A non-zero exit is a transcode failure.
pub(super) async fn run(binary: &str, args: Vec<OsString>) -> PipelineResult<()> {
    debug!("Running {} {:?}", binary, args);

    let output = Command::new(binary)
        .args(&args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| PipelineError::transcode(format!("Failed to start {}: {}", binary, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail = tail_str(&stderr, STDERR_TAIL);
        let last_line = tail.lines().rev().find(|l| !l.trim().is_empty());

        let mut message = format!("{} exited with {}", binary, output.status);
        if let Some(line) = last_line {
            message.push_str(": ");
            message.push_str(tail_str(line.trim(), MESSAGE_TAIL));
        }

        return Err(PipelineError::Transcode {
            message,
            stderr: Some(tail.trim().to_string()),
            exit_code: output.status.code(),
        });
    }

    Ok(())
}

/// The last `max` bytes of `s`, moved forward to a char boundary.
fn tail_str(s: &str, max: usize) -> &str {
    let mut start = s.len().saturating_sub(max);
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
