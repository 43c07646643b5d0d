//! Grounded answer generation over retrieved pages.

mod anthropic;
mod openai;

use std::sync::Arc;

use tracing::debug;

use crate::error::ServiceError;

pub use anthropic::{AnthropicProvider, DEFAULT_ANTHROPIC_MODEL};
pub use openai::{OpenAiProvider, DEFAULT_CHAT_MODEL};

/// System turn sent with every completion request.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Stands in for the image list when retrieval found none.
pub const NO_IMAGES_MARKER: &str = "No relevant images found";

/// Trait implemented by concrete LLM providers.
pub trait LlmProvider: Send + Sync {
    /// Sends one completion request and returns the generated text verbatim.
    fn answer(&self, request: &ProviderRequest<'_>) -> Result<String, ServiceError>;
}

/// Request envelope shared by the various providers.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRequest<'a> {
    /// System instruction.
    pub system: &'a str,
    /// User turn.
    pub prompt: &'a str,
}

/// Builds the user turn from the question, page texts and image paths.
pub fn build_prompt(query: &str, relevant_text: &[String], images: &[String]) -> String {
    let context = relevant_text.join("\n");
    let image_list = if images.is_empty() {
        NO_IMAGES_MARKER.to_string()
    } else {
        images.join(", ")
    };

    let mut prompt = String::new();
    prompt.push_str(
        "You are an AI assistant that helps users understand how to use an application.\n",
    );
    prompt.push_str("Answer the following user query based on the provided documentation.\n\n");
    prompt.push_str("User Query: ");
    prompt.push_str(query);
    prompt.push_str("\n\nRelevant Documentation:\n");
    prompt.push_str(&context);
    prompt.push_str("\n\nIf applicable, include references to the following images:\n");
    prompt.push_str(&image_list);
    prompt.push_str(
        "\n\nProvide a clear and concise answer preferably with bullet points or steps.\n",
    );
    prompt.push_str("Do not include paths to the images if they exist.\n");
    prompt
}

/// Turns retrieved context into prose with a single provider call.
#[derive(Clone)]
pub struct AnswerGenerator {
    provider: Arc<dyn LlmProvider>,
}

impl AnswerGenerator {
    /// Wraps a provider.
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Generates an answer grounded in `relevant_text`, mentioning `images` when present.
    ///
    /// No retry and no length guard: an oversized prompt fails with whatever the
    /// provider returns.
    pub fn generate_response(
        &self,
        query: &str,
        relevant_text: &[String],
        images: &[String],
    ) -> Result<String, ServiceError> {
        let prompt = build_prompt(query, relevant_text, images);
        debug!(
            chunks = relevant_text.len(),
            images = images.len(),
            prompt_chars = prompt.len(),
            "requesting completion"
        );
        self.provider.answer(&ProviderRequest {
            system: SYSTEM_PROMPT,
            prompt: &prompt,
        })
    }
}
