use serde::Deserialize;
use std::path::PathBuf;
use crate::config::env::{self, EnvKey};

/// S3/MinIO settings. Present only when `MINIO_ENDPOINT` is configured.
#[derive(Clone, Debug, Deserialize)]
pub struct MinioConfig {
    pub url: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub database_url: Option<String>,
    pub minio: Option<MinioConfig>,
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_transcription_model: String,
    pub openai_chat_model: String,
    pub ffmpeg_path: String,
    pub ytdlp_path: String,
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        let minio = match env::get_opt(EnvKey::MinioUrl) {
            Some(url) => Some(MinioConfig {
                url,
                bucket: env::get_or(EnvKey::MinioBucket, "videos"),
                access_key: env::get(EnvKey::MinioAccessKey)?,
                secret_key: env::get(EnvKey::MinioSecretKey)?,
            }),
            None => None,
        };

        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000),
            database_url: env::get_opt(EnvKey::DatabaseUrl),
            minio,
            work_dir: PathBuf::from(env::get_or(EnvKey::WorkDir, "./data/work")),
            output_dir: PathBuf::from(env::get_or(EnvKey::OutputDir, "./data/videos")),
            openai_api_key: env::get(EnvKey::OpenAiApiKey)?,
            openai_base_url: env::get_or(EnvKey::OpenAiBaseUrl, "https://api.openai.com/v1"),
            openai_transcription_model: env::get_or(EnvKey::OpenAiTranscriptionModel, "whisper-1"),
            openai_chat_model: env::get_or(EnvKey::OpenAiChatModel, "gpt-3.5-turbo"),
            ffmpeg_path: env::get_or(EnvKey::FfmpegPath, "ffmpeg"),
            ytdlp_path: env::get_or(EnvKey::YtDlpPath, "yt-dlp"),
        })
    }
}
