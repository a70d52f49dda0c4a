//! Question answering over retrieved chunks.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::retriever::Retriever;
use crate::error::{LlmError, SearchError};
use crate::models::{Chunk, LlmConfig};

pub const SYSTEM_PROMPT: &str = "You are a codebase QA assistant answering questions about one \
repository's source code. You receive code and documentation snippets as context; answer using \
only that context. If you are not sure, say so. When referring to code, name the file path and, \
where possible, the function or class.";

/// Shown when retrieval finds nothing to answer from.
pub const NO_CONTEXT_MESSAGE: &str =
    "I could not find relevant code or docs for that question in this repository.";

/// Generates text from a system and a user prompt.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(config.model.clone()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl AnswerGenerator for ChatCompletionClient {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(LlmError::ServerError(format!("{}: {}", status, text)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))
    }
}

/// Result of answering one question.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Answered { text: String, sources: Vec<Chunk> },
    /// Retrieval found nothing; the generator was not called.
    NoRelevantContent,
}

impl Answer {
    pub fn text(&self) -> &str {
        match self {
            Answer::Answered { text, .. } => text,
            Answer::NoRelevantContent => NO_CONTEXT_MESSAGE,
        }
    }

    pub fn sources(&self) -> &[Chunk] {
        match self {
            Answer::Answered { sources, .. } => sources,
            Answer::NoRelevantContent => &[],
        }
    }
}

/// Context block for the prompt: one headed section per chunk.
pub fn build_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| {
            format!(
                "File: {} | Chunk ID: {} | Lines {}-{}\n{}",
                c.path, c.chunk_id, c.start_line, c.end_line, c.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

pub fn build_user_prompt(question: &str, chunks: &[Chunk]) -> String {
    format!(
        "User question:\n{}\n\nContext from repository:\n{}",
        question.trim(),
        build_context(chunks)
    )
}

pub struct QaEngine<G> {
    retriever: Retriever,
    generator: G,
    top_k: usize,
}

impl<G: AnswerGenerator> QaEngine<G> {
    pub fn new(retriever: Retriever, generator: G, top_k: usize) -> Self {
        Self {
            retriever,
            generator,
            top_k,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub async fn answer(&self, question: &str) -> Result<Answer, SearchError> {
        let sources = self.retriever.retrieve(question, self.top_k).await?;
        if sources.is_empty() {
            return Ok(Answer::NoRelevantContent);
        }

        debug!(sources = sources.len(), "generating answer");
        let prompt = build_user_prompt(question, &sources);
        let text = self.generator.generate(SYSTEM_PROMPT, &prompt).await?;

        Ok(Answer::Answered { text, sources })
    }
}
