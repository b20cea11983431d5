//! Answer synthesis: grounded prompt, model call, tolerant parsing.
//!
//! The stage renders retrieved chunks with their citations into a single
//! instruction prompt, invokes the [`CompletionModel`], and extracts the
//! brace-delimited JSON object the model was asked to return. Every
//! failure at this boundary — network, rate limit, malformed output — is
//! folded into an in-band `"Error: ..."` response with citation
//! `"Unknown"`; synthesis never raises to the coordinator.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::SynthesisConfig;
use crate::embedding::post_json_with_retry;
use crate::models::{ChunkMetadata, RetrievedChunk};

/// Format citation metadata into a human-readable string.
///
/// Field order is fixed: page, paragraph, slide, table, row, source file;
/// only present fields are rendered, joined with `", "`. No fields at all
/// renders as `"Unknown"`.
pub fn format_citation(meta: &ChunkMetadata) -> String {
    let mut parts = Vec::new();
    if let Some(page) = meta.pos.page {
        parts.push(format!("Page {}", page));
    }
    if let Some(paragraph) = meta.pos.paragraph {
        parts.push(format!("Para {}", paragraph));
    }
    if let Some(slide) = meta.pos.slide {
        parts.push(format!("Slide {}", slide));
    }
    if let Some(table) = meta.pos.table {
        parts.push(format!("Table {}", table));
    }
    if let Some(row) = meta.pos.row {
        parts.push(format!("Row {}", row));
    }
    if !meta.source_file.is_empty() {
        parts.push(format!("Source: {}", meta.source_file));
    }
    if parts.is_empty() {
        "Unknown".to_string()
    } else {
        parts.join(", ")
    }
}

/// Build the grounded instruction prompt from the retrieved chunks, in
/// retrieval order (ranks are 1-based).
pub fn build_prompt(user_query: &str, top_chunks: &[RetrievedChunk]) -> String {
    let formatted: Vec<String> = top_chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "[Chunk {} | Citation: {}], text: {}",
                i + 1,
                format_citation(&chunk.metadata),
                chunk.text.trim()
            )
        })
        .collect();

    format!(
        "You are a factual AI assistant. Given the following document chunks with \
their citations and text and a user question, perform two tasks:\n\
\n\
1. Extract a complete, accurate answer using the original terms, numbers, and clauses.\n\
2. Provide the citation by referencing the provided citations.\n\
\n\
Chunks:\n{}\n\
\n\
Question:\n{}\n\
\n\
Return only JSON in one line, e.g.:\n\
{{\"answer\":\"...\", \"citation\":\"Page 2, Para 4, Source: abc.pdf\"}}\n",
        formatted.join("\n"),
        user_query
    )
}

/// The structured object the model is asked to return.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredAnswer {
    pub answer: String,
    pub citation: String,
}

/// Why a raw model response could not be parsed into a [`StructuredAnswer`].
#[derive(Debug)]
pub enum AnswerParseError {
    /// No `{...}` span anywhere in the response.
    NoJsonObject,
    /// The extracted span was not a valid JSON object.
    InvalidJson(String),
}

impl std::fmt::Display for AnswerParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerParseError::NoJsonObject => write!(f, "no JSON object in model response"),
            AnswerParseError::InvalidJson(e) => write!(f, "invalid JSON in model response: {}", e),
        }
    }
}

impl std::error::Error for AnswerParseError {}

/// Extract and parse the brace-delimited JSON object from a raw model
/// response. Models often wrap the JSON in extra prose; everything
/// outside the outermost `{...}` span is ignored. A missing `citation`
/// key defaults to `"Unknown"`, a missing `answer` to the empty string.
pub fn parse_structured_answer(raw: &str) -> Result<StructuredAnswer, AnswerParseError> {
    let start = raw.find('{').ok_or(AnswerParseError::NoJsonObject)?;
    let end = raw.rfind('}').ok_or(AnswerParseError::NoJsonObject)?;
    if end < start {
        return Err(AnswerParseError::NoJsonObject);
    }

    let value: serde_json::Value = serde_json::from_str(&raw[start..=end])
        .map_err(|e| AnswerParseError::InvalidJson(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| AnswerParseError::InvalidJson("not a JSON object".to_string()))?;

    Ok(StructuredAnswer {
        answer: obj
            .get("answer")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
        citation: obj
            .get("citation")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown")
            .to_string(),
    })
}

/// Prompt-to-text boundary for the language model.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Model identifier (e.g. `"llama-3.3-70b-versatile"`).
    fn model_name(&self) -> &str;

    /// Complete a prompt; may fail with network/auth/rate-limit errors,
    /// all of which the synthesis stage treats as recoverable.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// [`CompletionModel`] for OpenAI-compatible chat completion APIs
/// (OpenAI, Groq, Ollama's `/v1` endpoint).
pub struct ChatCompletionModel {
    base_url: String,
    model: String,
    temperature: f64,
    api_key: Option<String>,
    max_retries: u32,
    client: reqwest::Client,
}

impl ChatCompletionModel {
    /// # Errors
    ///
    /// Fails if the configured API key environment variable is named but
    /// not set.
    pub fn new(config: &SynthesisConfig) -> Result<Self> {
        let api_key = match &config.api_key_env {
            Some(var) => match std::env::var(var) {
                Ok(key) => Some(key),
                Err(_) => bail!("{} environment variable not set", var),
            },
            None => None,
        };
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key,
            max_retries: config.max_retries,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
        })
    }
}

#[async_trait]
impl CompletionModel for ChatCompletionModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
        });

        let json = post_json_with_retry(
            || {
                let mut req = self
                    .client
                    .post(format!("{}/chat/completions", self.base_url))
                    .json(&body);
                if let Some(key) = &self.api_key {
                    req = req.header("Authorization", format!("Bearer {}", key));
                }
                req
            },
            self.max_retries,
            "chat completions API",
        )
        .await?;

        json.pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| anyhow::anyhow!("invalid chat completion response: missing content"))
    }
}

/// The synthesis stage's result payload: always well-formed, with
/// failures carried in-band as `"Error: ..."` response text.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAnswer {
    pub response: String,
    pub citation: String,
    pub query: String,
}

pub struct SynthesisStage {
    model: Arc<dyn CompletionModel>,
}

impl SynthesisStage {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    /// Synthesize a cited answer from the retrieved chunks.
    ///
    /// Never fails: call and parse errors degrade to a visible error
    /// message with citation `"Unknown"`.
    pub async fn answer(
        &self,
        user_query: &str,
        top_chunks: &[RetrievedChunk],
    ) -> SynthesizedAnswer {
        let prompt = build_prompt(user_query, top_chunks);

        let outcome = match self.model.complete(&prompt).await {
            Ok(raw) => parse_structured_answer(&raw).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(parsed) => SynthesizedAnswer {
                response: parsed.answer,
                citation: parsed.citation,
                query: user_query.to_string(),
            },
            Err(description) => SynthesizedAnswer {
                response: format!("Error: {}", description),
                citation: "Unknown".to_string(),
                query: user_query.to_string(),
            },
        }
    }
}
