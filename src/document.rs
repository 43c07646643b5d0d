//! Records passed between extraction, indexing, retrieval and the HTTP boundary.

use serde::{Deserialize, Serialize};

/// Text of a single PDF page. One chunk per page with extractable text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Zero-based index of the page within the document.
    pub page_number: u32,
    /// Extracted page text.
    pub text: String,
}

/// Placement rectangle of an image on its page, in PDF user-space units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x0: f32,
    /// Bottom edge.
    pub y0: f32,
    /// Right edge.
    pub x1: f32,
    /// Top edge.
    pub y1: f32,
}

/// An image written to disk during extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedImage {
    /// Zero-based page the image was placed on.
    pub page_number: u32,
    /// Location of the written PNG, relative to the working directory when the
    /// image directory is relative.
    pub file_path: String,
    /// Where the image was drawn, when the content stream could be followed.
    pub bounding_box: Option<BoundingBox>,
}

/// Metadata stored alongside every page vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Page text, returned verbatim at query time.
    pub text: String,
    /// Zero-based page number.
    pub page: u32,
    /// Images extracted from the same page.
    pub images: Vec<String>,
}

/// Vector index entry for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    /// Stable identifier, see [`IndexRecord::id_for_page`].
    pub id: String,
    /// Embedding of the page text.
    pub vector: Vec<f32>,
    /// Payload returned with matches.
    pub metadata: ChunkMetadata,
}

impl IndexRecord {
    /// Identifier used for a page; re-ingesting overwrites the same id.
    pub fn id_for_page(page_number: u32) -> String {
        format!("page-{page_number}")
    }

    /// Builds the record for a chunk, attaching only images from the chunk's page.
    pub fn for_chunk(chunk: &TextChunk, vector: Vec<f32>, images: &[ExtractedImage]) -> Self {
        let related = images
            .iter()
            .filter(|image| image.page_number == chunk.page_number)
            .map(|image| image.file_path.clone())
            .collect();
        Self {
            id: Self::id_for_page(chunk.page_number),
            vector,
            metadata: ChunkMetadata {
                text: chunk.text.clone(),
                page: chunk.page_number,
                images: related,
            },
        }
    }
}

/// Passages and images gathered for one question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    /// Page texts in match order.
    pub relevant_chunks: Vec<String>,
    /// Image paths without duplicates.
    pub relevant_images: Vec<String>,
}

/// Body returned by `POST /ask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Generated prose.
    pub response: String,
    /// Image paths the answer may refer to.
    #[serde(default)]
    pub images: Vec<String>,
}
