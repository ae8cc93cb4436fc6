use super::Stage;
use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct SourceMetadata {
    pub id: String,
    pub title: Option<String>,
    pub duration_seconds: i32,
    /// Container extension of the payload, e.g. `mp4`.
    pub extension: String,
}

/// Readable video payload. Nothing touches the disk until [`SourcePayload::persist_to`].
pub struct SourcePayload {
    reference: String,
    reader: Box<dyn AsyncRead + Send + Unpin>,
    process: Option<DownloadProcess>,
}

struct DownloadProcess {
    child: Child,
    stderr: JoinHandle<String>,
}

#[derive(Debug)]
pub struct FetchedSource {
    pub metadata: SourceMetadata,
    pub payload: SourcePayload,
}

impl fmt::Debug for SourcePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourcePayload")
            .field("reference", &self.reference)
            .field("process", &self.process.is_some())
            .finish()
    }
}

impl SourcePayload {
    pub fn from_reader(
        reference: impl Into<String>,
        reader: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        Self {
            reference: reference.into(),
            reader: Box::new(reader),
            process: None,
        }
    }

    /// Streams the payload into `path` and returns the number of bytes written.
    ///
    /// When the payload comes from a downloader process, its exit status is
    /// checked after the stream ends.
    pub async fn persist_to(mut self, path: &Path) -> PipelineResult<u64> {
        let mut file = tokio::fs::File::create(path).await.map_err(|e| {
            PipelineError::persistence(format!("Failed to create {}: {}", path.display(), e))
        })?;

        let written = tokio::io::copy(&mut self.reader, &mut file)
            .await
            .map_err(|e| {
                PipelineError::fetch(&self.reference, format!("download interrupted: {}", e))
            })?;
        file.flush()
            .await
            .map_err(|e| {
                PipelineError::persistence(format!("Failed to flush {}: {}", path.display(), e))
            })?;

        if let Some(mut process) = self.process.take() {
            let status = process
                .child
                .wait()
                .await
                .map_err(|e| PipelineError::fetch(&self.reference, e.to_string()))?;
            if !status.success() {
                let stderr = process.stderr.await.unwrap_or_default();
                return Err(PipelineError::fetch(
                    &self.reference,
                    format!("downloader exited with {}: {}", status, stderr.trim()),
                ));
            }
        }

        if written == 0 {
            return Err(PipelineError::fetch(&self.reference, "empty video payload"));
        }

        Ok(written)
    }
}

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: String,
    title: Option<String>,
    duration: Option<f64>,
    ext: Option<String>,
}

/// Resolves video URLs with the `yt-dlp` binary.
pub struct YtDlpFetcher {
    ytdlp_path: String,
}

impl YtDlpFetcher {
    pub fn new(ytdlp_path: impl Into<String>) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
        }
    }

    fn validate(reference: &str) -> PipelineResult<Url> {
        let url = Url::parse(reference.trim())
            .map_err(|e| PipelineError::fetch(reference, format!("invalid URL: {}", e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(PipelineError::fetch(
                reference,
                format!("unsupported scheme: {}", other),
            )),
        }
    }

    fn start_error(&self, url: &Url, e: std::io::Error) -> PipelineError {
        PipelineError::fetch(
            url.as_str(),
            format!("failed to start {}: {}", self.ytdlp_path, e),
        )
    }

    async fn metadata(&self, url: &Url) -> PipelineResult<SourceMetadata> {
        let output = Command::new(&self.ytdlp_path)
            .args([
                "--dump-single-json",
                "--no-download",
                "--no-playlist",
                "--no-warnings",
            ])
            .arg(url.as_str())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.start_error(url, e))?;

        if !output.status.success() {
            return Err(PipelineError::fetch(
                url.as_str(),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        parse_metadata(url.as_str(), &output.stdout)
    }

    fn spawn_download(&self, url: &Url) -> PipelineResult<SourcePayload> {
        let mut child = Command::new(&self.ytdlp_path)
            .args([
                "-f",
                "best",
                "--no-playlist",
                "--no-warnings",
                "--quiet",
                "-o",
                "-",
            ])
            .arg(url.as_str())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.start_error(url, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PipelineError::fetch(url.as_str(), "downloader stdout unavailable"))?;
        let stderr_pipe = child.stderr.take();
        let stderr = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut pipe) = stderr_pipe {
                let _ = pipe.read_to_string(&mut buf).await;
            }
            buf
        });

        Ok(SourcePayload {
            reference: url.to_string(),
            reader: Box::new(stdout),
            process: Some(DownloadProcess { child, stderr }),
        })
    }
}

/// Parses `yt-dlp --dump-single-json` output. Durations are truncated to whole seconds.
pub fn parse_metadata(reference: &str, json: &[u8]) -> PipelineResult<SourceMetadata> {
    let info: YtDlpInfo = serde_json::from_slice(json)
        .map_err(|e| PipelineError::fetch(reference, format!("unreadable metadata: {}", e)))?;

    let duration = info
        .duration
        .filter(|d| d.is_finite() && *d >= 0.0 && *d <= i32::MAX as f64)
        .ok_or_else(|| PipelineError::fetch(reference, "video duration is unknown"))?;

    Ok(SourceMetadata {
        id: info.id,
        title: info.title,
        duration_seconds: duration.trunc() as i32,
        extension: info.ext.unwrap_or_else(|| "mp4".to_string()),
    })
}

#[async_trait]
impl Stage for YtDlpFetcher {
    type Input = String;
    type Output = FetchedSource;

    fn name(&self) -> &'static str {
        "fetch"
    }

    async fn execute(&self, reference: String) -> PipelineResult<FetchedSource> {
        let url = Self::validate(&reference)?;

        let metadata = self.metadata(&url).await?;
        info!(
            "🔎 Resolved {} -> {} \"{}\" ({}s)",
            url,
            metadata.id,
            metadata.title.as_deref().unwrap_or("untitled"),
            metadata.duration_seconds
        );

        let payload = self.spawn_download(&url)?;
        debug!("Download stream opened for {}", metadata.id);

        Ok(FetchedSource { metadata, payload })
    }
}
