use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::{LlmProvider, ProviderRequest};
use crate::error::ServiceError;

const SERVICE: &str = "OpenAI chat completions";

/// Chat model used when none is configured.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";

/// Chat-completions provider for OpenAI-compatible endpoints.
pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAiProvider {
    /// Builds a client with the bearer key baked into its default headers.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: String,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        if api_key.trim().is_empty() {
            return Err(ServiceError::config(SERVICE, "missing OpenAI API key"));
        }
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| ServiceError::config(SERVICE, "invalid OpenAI API key"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| ServiceError::transport(SERVICE, err))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model,
        })
    }
}

impl LlmProvider for OpenAiProvider {
    fn answer(&self, request: &ProviderRequest<'_>) -> Result<String, ServiceError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt,
                },
            ],
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|err| ServiceError::transport(SERVICE, err))?;
        if !resp.status().is_success() {
            return Err(ServiceError::from_response(SERVICE, resp));
        }
        let parsed: ChatResponse = resp
            .json()
            .map_err(|err| ServiceError::malformed(SERVICE, err.to_string()))?;
        parsed.first_choice()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
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

impl ChatResponse {
    fn first_choice(self) -> Result<String, ServiceError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::malformed(SERVICE, "response contained no choices"))?;
        choice
            .message
            .content
            .ok_or_else(|| ServiceError::malformed(SERVICE, "first choice has no content"))
    }
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
