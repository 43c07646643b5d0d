//! Text embedding clients.

pub mod openai;

use crate::error::ServiceError;

/// Model used when none is configured.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Converts a string into a fixed-length vector using a hosted model.
///
/// One call per input. Inputs longer than the model accepts are the caller's
/// problem; the hosted API decides what an empty input means.
pub trait Embedder: Send + Sync {
    /// Embeds a single string.
    fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;
}
