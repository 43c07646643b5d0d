//! Command-line and environment configuration shared by the binaries.
//!
//! Each group is a `clap::Args` struct flattened into a binary's parser, with
//! builder methods that create the long-lived service clients once at startup.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, ValueEnum};

use crate::answer::{
    AnthropicProvider, LlmProvider, OpenAiProvider, DEFAULT_ANTHROPIC_MODEL, DEFAULT_CHAT_MODEL,
};
use crate::embedder::openai::OpenAiEmbedder;
use crate::embedder::DEFAULT_EMBEDDING_MODEL;
use crate::error::ServiceError;
use crate::index::pinecone::{PineconeIndex, PineconeSettings, DEFAULT_CONTROL_URL};

/// OpenAI credentials and model selection.
#[derive(Args, Debug, Clone)]
pub struct OpenAiArgs {
    /// OpenAI API key used for embeddings and chat completions
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    /// Base URL for OpenAI-compatible endpoints
    #[arg(
        long,
        env = "GUIDEBOOK_OPENAI_BASE",
        default_value = "https://api.openai.com/v1"
    )]
    pub openai_base_url: String,

    /// Embedding model identifier
    #[arg(long, env = "GUIDEBOOK_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Optional embedding dimension override
    #[arg(long, env = "GUIDEBOOK_EMBEDDING_DIMENSIONS")]
    pub embedding_dimensions: Option<usize>,

    /// Chat model used to write answers
    #[arg(long, env = "GUIDEBOOK_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    pub chat_model: String,

    /// Seconds before a hosted API request is abandoned
    #[arg(long, env = "GUIDEBOOK_HTTP_TIMEOUT_SECS", default_value_t = 120)]
    pub http_timeout_secs: u64,
}

impl OpenAiArgs {
    /// Per-request timeout for hosted API clients.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    /// Builds the embedding client.
    pub fn build_embedder(&self) -> Result<OpenAiEmbedder, ServiceError> {
        OpenAiEmbedder::new(
            &self.openai_api_key,
            &self.openai_base_url,
            self.embedding_model.clone(),
            self.embedding_dimensions,
            self.timeout(),
        )
    }
}

/// Pinecone credentials and index selection.
#[derive(Args, Debug, Clone)]
pub struct PineconeArgs {
    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pub pinecone_api_key: String,

    /// Name of the index holding page vectors
    #[arg(long, env = "PINECONE_INDEX_NAME")]
    pub pinecone_index_name: String,

    /// Index host; resolved through the control plane when omitted
    #[arg(long, env = "PINECONE_INDEX_HOST")]
    pub pinecone_index_host: Option<String>,

    /// Namespace for reads and writes
    #[arg(long, env = "PINECONE_NAMESPACE")]
    pub pinecone_namespace: Option<String>,

    /// Control-plane base URL
    #[arg(long, env = "PINECONE_CONTROL_URL", default_value = DEFAULT_CONTROL_URL)]
    pub pinecone_control_url: String,
}

impl PineconeArgs {
    /// Connects to the configured index.
    pub fn connect_index(&self, timeout: Duration) -> Result<PineconeIndex, ServiceError> {
        PineconeIndex::connect(PineconeSettings {
            api_key: self.pinecone_api_key.clone(),
            index_name: self.pinecone_index_name.clone(),
            host: self.pinecone_index_host.clone(),
            control_url: self.pinecone_control_url.clone(),
            namespace: self.pinecone_namespace.clone(),
            timeout,
        })
    }
}

/// Which hosted chat API writes the answer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// OpenAI chat completions.
    Openai,
    /// Anthropic messages.
    Anthropic,
}

/// Answer-model selection.
#[derive(Args, Debug, Clone)]
pub struct LlmArgs {
    /// Target LLM provider
    #[arg(
        long,
        env = "GUIDEBOOK_LLM_PROVIDER",
        value_enum,
        default_value_t = ProviderKind::Openai
    )]
    pub llm_provider: ProviderKind,

    /// Anthropic API key (required with --llm-provider anthropic)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// Anthropic model identifier
    #[arg(long, env = "GUIDEBOOK_ANTHROPIC_MODEL", default_value = DEFAULT_ANTHROPIC_MODEL)]
    pub anthropic_model: String,
}

impl LlmArgs {
    /// Builds the configured provider.
    pub fn build_provider(
        &self,
        openai: &OpenAiArgs,
    ) -> Result<Arc<dyn LlmProvider>, ServiceError> {
        match self.llm_provider {
            ProviderKind::Openai => Ok(Arc::new(OpenAiProvider::new(
                &openai.openai_api_key,
                &openai.openai_base_url,
                openai.chat_model.clone(),
                openai.timeout(),
            )?)),
            ProviderKind::Anthropic => {
                let key = self.anthropic_api_key.as_deref().ok_or_else(|| {
                    ServiceError::config(
                        "Anthropic messages",
                        "ANTHROPIC_API_KEY must be set for the Anthropic provider",
                    )
                })?;
                Ok(Arc::new(AnthropicProvider::new(
                    key,
                    self.anthropic_model.clone(),
                    openai.timeout(),
                )?))
            }
        }
    }
}
