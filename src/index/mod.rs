//! Vector index access.

pub mod pinecone;

use serde::{Deserialize, Serialize};

use crate::document::IndexRecord;
use crate::error::ServiceError;

/// Hosted nearest-neighbour index keyed by record id.
///
/// Similarity, ranking and tie-breaking all belong to the service; results are
/// passed through in the order it returns them.
pub trait VectorIndex: Send + Sync {
    /// Stores `record`, replacing any record with the same id.
    fn upsert(&self, record: &IndexRecord) -> Result<(), ServiceError>;

    /// Returns up to `top_k` records nearest to `vector`.
    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>, ServiceError>;
}

/// One nearest-neighbour hit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    /// Record id, e.g. `page-3`.
    pub id: String,
    /// Similarity reported by the index, when present.
    #[serde(default)]
    pub score: Option<f32>,
    /// Stored metadata, absent when not requested or never written.
    #[serde(default)]
    pub metadata: Option<MatchMetadata>,
}

/// Metadata as it comes back from the index. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchMetadata {
    /// Page text.
    #[serde(default)]
    pub text: Option<String>,
    /// Page number; the index stores numbers as floats.
    #[serde(default)]
    pub page: Option<f64>,
    /// Image paths stored with the page.
    #[serde(default)]
    pub images: Option<Vec<String>>,
}
