use super::Stage;
use crate::error::{PipelineError, PipelineResult};
use crate::infrastructure::openai::OpenAiClient;
use async_trait::async_trait;
use std::path::PathBuf;

pub struct OpenAiTranscriber {
    client: OpenAiClient,
}

impl OpenAiTranscriber {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Stage for OpenAiTranscriber {
    type Input = PathBuf;
    type Output = String;

    fn name(&self) -> &'static str {
        "transcribe"
    }

    async fn execute(&self, audio_path: PathBuf) -> PipelineResult<String> {
        self.client
            .transcribe(&audio_path)
            .await
            .map_err(|e| PipelineError::Transcription(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::openai::OpenAiConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn service_outage_maps_to_transcription_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(OpenAiConfig {
            api_key: "k".to_string(),
            base_url: server.uri(),
            transcription_model: "whisper-1".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
        })
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("audio.mp3");
        tokio::fs::write(&audio, b"x").await.unwrap();

        let err = OpenAiTranscriber::new(client).execute(audio).await.unwrap_err();
        assert!(matches!(err, PipelineError::Transcription(_)));
    }
}
