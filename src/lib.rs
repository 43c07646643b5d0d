#![warn(missing_docs)]
//! Core library for the guidebook question-answering service: PDF extraction,
//! embedding, vector indexing, retrieval and grounded answers.

pub mod answer;
pub mod client;
pub mod config;
pub mod document;
pub mod embedder;
pub mod error;
pub mod extractor;
pub mod index;
pub mod ingest;
pub mod retriever;
pub mod service;
pub mod telemetry;

pub use answer::{AnswerGenerator, LlmProvider, ProviderRequest};
pub use client::{render_answer, AskClient, ClientError};
pub use document::{
    Answer, BoundingBox, ChunkMetadata, ExtractedImage, IndexRecord, QueryResult, TextChunk,
};
pub use embedder::Embedder;
pub use error::{IngestError, ServiceError};
pub use extractor::{ExtractError, PdfDocument, SkippedImage};
pub use index::{MatchMetadata, QueryMatch, VectorIndex};
pub use ingest::{IngestPipeline, IngestReport};
pub use retriever::{Retriever, DEFAULT_TOP_K};
pub use service::{router, AppState};
