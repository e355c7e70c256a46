pub mod tone;

use std::env;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_stream::try_stream;
use async_trait::async_trait;
use base64::Engine;
use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::warn;

use crate::tone::tone_directive;

/// Media type declared for every inline image payload. Turn images
/// arrive as JPEG data-URL captures from the camera feed.
pub const IMAGE_MEDIA_TYPE: &str = "image/jpeg";

/// One describe-image request: everything the remote model needs to
/// narrate a single turn.
#[derive(Debug, Clone)]
pub struct DescribeRequest {
    pub image_bytes: Vec<u8>,
    pub persona: String,
    pub tone_level: u8,
    pub history: Vec<String>,
}

/// Ordered, finite, single-use sequence of text fragments. A remote
/// failure surfaces as an `Err` item; the caller decides how to render
/// it instead of the stream hiding it behind a sentinel string.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Seam to the remote vision/language model. One call per turn.
#[async_trait]
pub trait DescribeBackend: Send + Sync {
    async fn stream_description(&self, system: String, user: String, image_b64: String)
        -> Result<TextStream>;
}

/// Wraps a [`DescribeBackend`] and owns the prompt construction:
/// persona voice, tone directive, sentence-marker output format and
/// prior narration history.
pub struct DescriptionGenerator {
    backend: Arc<dyn DescribeBackend>,
    marker: String,
}

impl DescriptionGenerator {
    pub fn new(backend: Arc<dyn DescribeBackend>, marker: impl Into<String>) -> Self {
        Self {
            backend,
            marker: marker.into(),
        }
    }

    /// Start one description stream. Never fails up front: a backend
    /// error becomes the stream's single `Err` item so the session can
    /// still report something to the client.
    pub async fn stream(&self, req: DescribeRequest) -> TextStream {
        let system = self.system_prompt(&req.persona, req.tone_level);
        let user = user_prompt(&req.persona, &req.history);
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(&req.image_bytes);

        match self.backend.stream_description(system, user, image_b64).await {
            Ok(stream) => stream,
            Err(e) => Box::pin(futures::stream::once(async move { Err(e) })),
        }
    }

    fn system_prompt(&self, persona: &str, tone_level: u8) -> String {
        format!(
            "You are {persona} and you must describe the image you are given \
             using your unique phrases, always in less than 20 words per response. \
             {} Write plain text without stylistic punctuation and end every \
             sentence with the character {}",
            tone_directive(tone_level),
            self.marker,
        )
    }
}

fn user_prompt(persona: &str, history: &[String]) -> String {
    let mut prompt = String::new();
    if !history.is_empty() {
        prompt.push_str("Your previous narrations, for context:\n");
        for entry in history {
            prompt.push_str(entry);
            prompt.push('\n');
        }
        prompt.push('\n');
    }
    prompt.push_str(&format!(
        "As {persona}, describe this image in 20 words or less."
    ));
    prompt
}

/// Request body for the Anthropic messages API.
#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u16,
    temperature: f32,
    stream: bool,
    system: &'a str,
    messages: Vec<serde_json::Value>,
}

/// Streaming client for the Anthropic messages API. Reads the API key
/// from `ANTHROPIC_API_KEY`.
pub struct AnthropicVision {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u16 = 300;

impl AnthropicVision {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY must be set in the environment")?;
        let model = env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        Ok(Self::new(api_key, model))
    }

    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.anthropic.com".into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DescribeBackend for AnthropicVision {
    async fn stream_description(
        &self,
        system: String,
        user: String,
        image_b64: String,
    ) -> Result<TextStream> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: 1.0,
            stream: true,
            system: &system,
            messages: vec![serde_json::json!({
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": IMAGE_MEDIA_TYPE,
                            "data": image_b64,
                        }
                    },
                    { "type": "text", "text": user }
                ]
            })],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .context("describe request failed")?
            .error_for_status()
            .context("describe request rejected")?;

        let mut bytes = response.bytes_stream();
        let stream = try_stream! {
            // SSE framing: accumulate bytes, hand off complete lines.
            let mut buf = String::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.context("describe stream interrupted")?;
                buf.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(pos) = buf.find('\n') {
                    let line: String = buf.drain(..=pos).collect();
                    if let Some(fragment) = parse_sse_line(line.trim_end()) {
                        yield fragment;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

/// Extract the text delta from one SSE data line, if it carries one.
fn parse_sse_line(line: &str) -> Option<String> {
    let data = line.strip_prefix("data:")?.trim();
    let event: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "unparseable SSE event");
            return None;
        }
    };
    if event.get("type").and_then(|t| t.as_str()) != Some("content_block_delta") {
        return None;
    }
    event
        .get("delta")
        .and_then(|d| d.get("text"))
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
}
