use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::{LlmProvider, ProviderRequest};
use crate::error::ServiceError;

const SERVICE: &str = "Anthropic messages";
const ENDPOINT: &str = "https://api.anthropic.com/v1/messages";

/// Model used when `--llm-provider anthropic` is picked without a model.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";

/// Completion budget; the messages API requires one.
const MAX_TOKENS: usize = 1024;

/// Messages-API provider.
pub struct AnthropicProvider {
    client: Client,
    model: String,
}

impl AnthropicProvider {
    /// Builds a client with the key and API version baked into its default headers.
    pub fn new(api_key: &str, model: String, timeout: Duration) -> Result<Self, ServiceError> {
        if api_key.trim().is_empty() {
            return Err(ServiceError::config(SERVICE, "missing Anthropic API key"));
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| ServiceError::config(SERVICE, "invalid Anthropic API key"))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| ServiceError::transport(SERVICE, err))?;
        Ok(Self { client, model })
    }
}

impl LlmProvider for AnthropicProvider {
    fn answer(&self, request: &ProviderRequest<'_>) -> Result<String, ServiceError> {
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system: request.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: vec![AnthropicContentBlock {
                    kind: "text",
                    text: request.prompt,
                }],
            }],
        };
        let resp = self
            .client
            .post(ENDPOINT)
            .json(&body)
            .send()
            .map_err(|err| ServiceError::transport(SERVICE, err))?;
        if !resp.status().is_success() {
            return Err(ServiceError::from_response(SERVICE, resp));
        }
        let parsed: AnthropicResponse = resp
            .json()
            .map_err(|err| ServiceError::malformed(SERVICE, err.to_string()))?;
        parsed.joined_text()
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<AnthropicContentBlock<'a>>,
}

#[derive(Serialize)]
struct AnthropicContentBlock<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseBlock>,
}

impl AnthropicResponse {
    fn joined_text(self) -> Result<String, ServiceError> {
        let answer = self
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicResponseBlock::Text { text } => Some(text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        if answer.is_empty() {
            return Err(ServiceError::malformed(
                SERVICE,
                "response missing text content",
            ));
        }
        Ok(answer)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}
