//! Query-time retrieval of page texts and their images.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::document::QueryResult;
use crate::embedder::Embedder;
use crate::error::ServiceError;
use crate::index::{QueryMatch, VectorIndex};

/// Number of pages retrieved per question when not configured.
pub const DEFAULT_TOP_K: usize = 3;

/// Embeds questions and looks up the nearest pages.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    /// Combines the long-lived embedding and index clients.
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Returns the texts of the `top_k` nearest pages and every image stored with them.
    pub fn find_relevant_content(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<QueryResult, ServiceError> {
        let vector = self.embedder.embed(query)?;
        let matches = self.index.query(&vector, top_k, true)?;
        let result = collect_matches(matches);
        debug!(
            chunks = ?result.relevant_chunks,
            images = ?result.relevant_images,
            "retrieved content"
        );
        Ok(result)
    }
}

/// Texts keep match order. Images are deduplicated, first occurrence wins, so
/// images from better matches come first.
fn collect_matches(matches: Vec<QueryMatch>) -> QueryResult {
    let mut result = QueryResult::default();
    let mut seen = HashSet::new();
    for metadata in matches.into_iter().filter_map(|m| m.metadata) {
        if let Some(text) = metadata.text {
            result.relevant_chunks.push(text);
        }
        for image in metadata.images.into_iter().flatten() {
            if seen.insert(image.clone()) {
                result.relevant_images.push(image);
            }
        }
    }
    result
}
