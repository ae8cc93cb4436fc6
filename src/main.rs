use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod common;
mod config;
mod docs;
mod error;
mod infrastructure;
mod modules;
mod routes;
mod state;
#[cfg(test)]
mod testing;
mod workers;

use config::settings::AppConfig;
use infrastructure::db::pool::connect_to_db;
use infrastructure::openai::{OpenAiClient, OpenAiConfig};
use infrastructure::storage::ArtifactStore;
use infrastructure::storage::local::LocalArtifactStore;
use infrastructure::storage::s3::StorageService;
use modules::jobs::repository::{JobRepository, MemoryJobRepository, PgJobRepository};
use state::AppState;
use workers::pipeline::PipelineRunner;
use workers::stages::{
    FfmpegClipGenerator, FfmpegExtractor, OpenAiSummarizer, OpenAiTranscriber, PipelineStages,
    YtDlpFetcher,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🚀 Starting server...");

    let config = AppConfig::new().context("Failed to load configuration")?;

    let jobs: Arc<dyn JobRepository> = match &config.database_url {
        Some(url) => Arc::new(PgJobRepository::new(
            connect_to_db(url).await.context("Failed to connect to PostgreSQL")?,
        )),
        None => {
            warn!("⚠️ DATABASE_URL not set, job records are kept in memory");
            warn!("⚠️ In-memory records are never evicted and do not survive a restart");
            Arc::new(MemoryJobRepository::new())
        }
    };

    let artifacts: Arc<dyn ArtifactStore> = match &config.minio {
        Some(minio) => Arc::new(
            StorageService::new(&minio.url, &minio.bucket, &minio.access_key, &minio.secret_key)
                .await,
        ),
        None => {
            warn!(
                "⚠️ MINIO_ENDPOINT not set, clips are stored under {}",
                config.output_dir.display()
            );
            Arc::new(LocalArtifactStore::new(config.output_dir.clone()))
        }
    };

    let interrupted = jobs
        .fail_unfinished("interrupted by server restart")
        .await
        .context("Failed to recover unfinished jobs")?;
    if interrupted > 0 {
        warn!("⚠️ Marked {} unfinished job(s) as failed", interrupted);
    }

    for binary in [&config.ffmpeg_path, &config.ytdlp_path] {
        match which::which(binary) {
            Ok(path) => info!("✅ Found {}", path.display()),
            Err(_) => warn!(
                "⚠️ {} not found on PATH, jobs will fail until it is installed",
                binary
            ),
        }
    }

    let openai = OpenAiClient::new(OpenAiConfig {
        api_key: config.openai_api_key.clone(),
        base_url: config.openai_base_url.clone(),
        transcription_model: config.openai_transcription_model.clone(),
        chat_model: config.openai_chat_model.clone(),
    })
    .context("Failed to build OpenAI client")?;

    let stages = PipelineStages {
        fetcher: Arc::new(YtDlpFetcher::new(config.ytdlp_path.clone())),
        extractor: Arc::new(FfmpegExtractor::new(config.ffmpeg_path.clone())),
        transcriber: Arc::new(OpenAiTranscriber::new(openai.clone())),
        summarizer: Arc::new(OpenAiSummarizer::new(openai)),
        clipper: Arc::new(FfmpegClipGenerator::new(config.ffmpeg_path.clone())),
    };

    let pipeline = PipelineRunner::new(
        stages,
        jobs.clone(),
        artifacts.clone(),
        config.work_dir.clone(),
    );
    let state = AppState::new(jobs, artifacts, pipeline.clone());

    let app = app::create_app(state).await;

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("✅ Server running on http://{}", addr);
    info!("📚 API docs at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(pipeline.clone()))
        .await
        .context("Server error")?;

    pipeline.shutdown();
    pipeline.wait_for_jobs().await;

    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal(pipeline: PipelineRunner) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("⚠️ Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("🛑 Shutdown requested, cancelling running jobs");
    pipeline.shutdown();
}
