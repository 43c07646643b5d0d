//! Document ingestion: extract pages and images, embed, upsert.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::document::{ExtractedImage, IndexRecord, TextChunk};
use crate::embedder::Embedder;
use crate::error::{IngestError, ServiceError};
use crate::extractor::{self, PdfDocument, SkippedImage};
use crate::index::VectorIndex;

/// Summary of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Pages with text that were embedded and upserted.
    pub pages_indexed: usize,
    /// Images written to the image directory.
    pub images_written: usize,
    /// Image placements that could not be written.
    pub skipped_images: Vec<SkippedImage>,
}

/// Populates the vector index from PDF documents, one record per page.
#[derive(Clone)]
pub struct IngestPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    image_dir: PathBuf,
}

impl IngestPipeline {
    /// Builds a pipeline writing images under `image_dir`.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        image_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            embedder,
            index,
            image_dir: image_dir.into(),
        }
    }

    /// Opens and ingests the PDF at `path`.
    pub fn ingest_path(&self, path: impl AsRef<Path>) -> Result<IngestReport, IngestError> {
        let doc = PdfDocument::open(path)?;
        self.ingest_document(&doc)
    }

    /// Extracts text and images from `doc` and indexes every page with text.
    ///
    /// Upserts happen page by page. When one fails its error is returned and
    /// the pages before it stay indexed.
    pub fn ingest_document(&self, doc: &PdfDocument) -> Result<IngestReport, IngestError> {
        let chunks = extractor::extract_text(doc);
        let outcomes = extractor::extract_images(doc, &self.image_dir)?;
        let images = extractor::saved_images(&outcomes);
        let skipped_images: Vec<SkippedImage> =
            outcomes.into_iter().filter_map(Result::err).collect();
        let pages_indexed = self.store(&chunks, &images)?;
        Ok(IngestReport {
            pages_indexed,
            images_written: images.len(),
            skipped_images,
        })
    }

    /// Embeds each chunk and upserts it as `page-{n}` with the images from the same page.
    pub fn store(
        &self,
        chunks: &[TextChunk],
        images: &[ExtractedImage],
    ) -> Result<usize, ServiceError> {
        let mut stored = 0usize;
        for chunk in chunks {
            let vector = self.embedder.embed(&chunk.text)?;
            let record = IndexRecord::for_chunk(chunk, vector, images);
            self.index.upsert(&record)?;
            stored += 1;
            info!(
                page = chunk.page_number,
                images = record.metadata.images.len(),
                "stored page"
            );
        }
        Ok(stored)
    }
}
