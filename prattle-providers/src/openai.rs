//! OpenAI-compatible HTTP client
//!
//! Speaks the `/chat/completions` dialect used by OpenRouter and friends,
//! in both whole-reply and server-sent-event streaming modes.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::base::{CompletionBackend, FragmentStream, Message, ProviderError, ProviderResult};

const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";

/// Chat completion request format
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    max_tokens: u32,
    temperature: f64,
}

/// Chat completion response format
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible completion client
pub struct OpenAiClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl OpenAiClient {
    /// Create a new client
    pub fn new(
        api_key: Option<String>,
        api_base: Option<String>,
        model: String,
        max_tokens: u32,
        temperature: f64,
    ) -> Self {
        let api_base = api_base
            .and_then(|base| {
                let trimmed = base.trim().trim_end_matches('/').to_string();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed)
                }
            })
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Self {
            client: Client::new(),
            api_base,
            api_key,
            model,
            max_tokens,
            temperature,
        }
    }

    fn build_request(&self, messages: Vec<Message>, stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            stream: if stream { Some(true) } else { None },
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    fn apply_headers(&self, mut req_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(api_key) = &self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }
        req_builder
    }

    async fn send(
        &self,
        request: &ChatCompletionRequest,
    ) -> ProviderResult<reqwest::Response> {
        let url = format!("{}/chat/completions", self.api_base);
        let req_builder = self.apply_headers(self.client.post(&url).json(request));
        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        Ok(response)
    }

    /// Split complete SSE events off the front of `buffer`, returning their
    /// joined `data:` payloads.
    fn parse_sse_events(buffer: &mut String) -> Vec<String> {
        let mut events = Vec::new();
        while let Some(pos) = buffer.find("\n\n") {
            let raw = buffer[..pos].to_string();
            buffer.drain(..pos + 2);

            let mut data_lines = Vec::new();
            for line in raw.lines() {
                if let Some(rest) = line.strip_prefix("data:") {
                    data_lines.push(rest.trim().to_string());
                }
            }

            if !data_lines.is_empty() {
                events.push(data_lines.join("\n"));
            }
        }
        events
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, messages: Vec<Message>) -> ProviderResult<String> {
        let request = self.build_request(messages, false);

        debug!(
            "Sending completion request to {} with model {}",
            self.api_base, self.model
        );

        let response = self.send(&request).await?;
        let response_data: ChatCompletionResponse = response.json().await?;

        let choice = response_data
            .choices
            .first()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".to_string()))?;

        Ok(choice.message.content.clone().unwrap_or_default())
    }

    async fn complete_stream(&self, messages: Vec<Message>) -> ProviderResult<FragmentStream> {
        let request = self.build_request(messages, true);

        debug!(
            "Sending streaming completion request to {} with model {}",
            self.api_base, self.model
        );

        let response = self.send(&request).await?;

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut response = response;
            let mut buffer = String::new();

            loop {
                let chunk = match response.chunk().await {
                    Ok(Some(bytes)) => bytes,
                    Ok(None) => return,
                    Err(err) => {
                        let _ = tx.send(Err(ProviderError::HttpError(err)));
                        return;
                    }
                };

                let text = String::from_utf8_lossy(&chunk);
                buffer.push_str(&text);

                for payload in Self::parse_sse_events(&mut buffer) {
                    if payload == "[DONE]" {
                        return;
                    }

                    let parsed = match serde_json::from_str::<StreamChunk>(&payload) {
                        Ok(chunk) => chunk,
                        Err(err) => {
                            let _ = tx.send(Err(ProviderError::JsonError(err)));
                            return;
                        }
                    };

                    if let Some(choice) = parsed.choices.first() {
                        if let Some(delta_text) = &choice.delta.content {
                            if tx.send(Ok(delta_text.clone())).is_err() {
                                // Consumer went away; the provider call is
                                // not interruptible from here anyway.
                                return;
                            }
                        }
                    }
                }
            }
        });

        Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })))
    }
}
