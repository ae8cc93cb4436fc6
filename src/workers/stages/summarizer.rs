use super::{Stage, SummaryRequest};
use crate::error::{PipelineError, PipelineResult};
use crate::infrastructure::openai::OpenAiClient;
use async_trait::async_trait;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes video content.";

pub struct OpenAiSummarizer {
    client: OpenAiClient,
}

impl OpenAiSummarizer {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }

    fn user_prompt(req: &SummaryRequest) -> String {
        format!(
            "Summarize the following video transcription in {} seconds of content: {}",
            req.target_duration_seconds, req.transcript
        )
    }
}

#[async_trait]
impl Stage for OpenAiSummarizer {
    type Input = SummaryRequest;
    type Output = String;

    fn name(&self) -> &'static str {
        "summarize"
    }

    async fn execute(&self, input: SummaryRequest) -> PipelineResult<String> {
        self.client
            .complete(SYSTEM_PROMPT, &Self::user_prompt(&input))
            .await
            .map_err(|e| PipelineError::Summarization(e.to_string()))
    }
}
