mod support;

use std::sync::Arc;

use guidebook::answer::NO_IMAGES_MARKER;
use guidebook::{
    AnswerGenerator, ExtractedImage, IngestError, IngestPipeline, PdfDocument, Retriever,
    ServiceError, TextChunk,
};
use pretty_assertions::assert_eq;
use support::{
    build_pdf, placed, FailingEmbedder, FailsOnCall, KeywordEmbedder, MemoryIndex,
    ScriptedProvider, TestImage, TestPage,
};

fn guide_pdf() -> Vec<u8> {
    build_pdf(vec![
        TestPage::text("Open your Profile and press Reset password").with_image(TestImage::gray(
            1,
            1,
            vec![40],
            placed(100.0, 100.0, 200.0, 120.0),
        )),
        TestPage::text("Export an invoice from the billing screen"),
    ])
}

#[test]
fn reingesting_overwrites_the_same_page_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let index = Arc::new(MemoryIndex::default());
    let pipeline = IngestPipeline::new(Arc::new(KeywordEmbedder), index.clone(), dir.path());
    let doc = PdfDocument::from_bytes(&guide_pdf()).expect("parse");

    let first = pipeline.ingest_document(&doc).expect("first run");
    let snapshot = index.record("page-0").expect("page-0 stored");
    let second = pipeline.ingest_document(&doc).expect("second run");

    assert_eq!(first, second);
    assert_eq!(first.pages_indexed, 2);
    assert_eq!(first.images_written, 1);
    assert!(first.skipped_images.is_empty());
    assert_eq!(index.len(), 2);
    assert_eq!(*index.upserts.lock().expect("lock"), 4);
    assert_eq!(index.record("page-0"), Some(snapshot));
}

#[test]
fn stored_images_come_back_with_their_page() {
    let index = Arc::new(MemoryIndex::default());
    let embedder = Arc::new(KeywordEmbedder);
    let pipeline = IngestPipeline::new(embedder.clone(), index.clone(), "unused");
    let chunks = vec![TextChunk {
        page_number: 4,
        text: "Reset your password from the profile page".to_string(),
    }];
    let images = vec![
        ExtractedImage {
            page_number: 4,
            file_path: "a.png".to_string(),
            bounding_box: None,
        },
        ExtractedImage {
            page_number: 4,
            file_path: "b.png".to_string(),
            bounding_box: None,
        },
        ExtractedImage {
            page_number: 5,
            file_path: "elsewhere.png".to_string(),
            bounding_box: None,
        },
    ];
    assert_eq!(pipeline.store(&chunks, &images).expect("store"), 1);

    let record = index.record("page-4").expect("stored");
    assert_eq!(record.metadata.page, 4);

    let found = Retriever::new(embedder, index)
        .find_relevant_content("password", 3)
        .expect("retrieve");
    assert_eq!(
        found.relevant_chunks,
        vec!["Reset your password from the profile page".to_string()]
    );
    assert_eq!(
        found.relevant_images,
        vec!["a.png".to_string(), "b.png".to_string()]
    );
}

#[test]
fn password_question_is_answered_from_the_ingested_guide() {
    let dir = tempfile::tempdir().expect("tempdir");
    let embedder = Arc::new(KeywordEmbedder);
    let index = Arc::new(MemoryIndex::default());
    let pipeline = IngestPipeline::new(embedder.clone(), index.clone(), dir.path());
    let doc = PdfDocument::from_bytes(&guide_pdf()).expect("parse");
    pipeline.ingest_document(&doc).expect("ingest");

    let retriever = Retriever::new(embedder, index);
    let found = retriever
        .find_relevant_content("How do I reset my password?", 2)
        .expect("retrieve");
    assert_eq!(found.relevant_chunks.len(), 2);
    assert!(found.relevant_chunks[0].contains("Reset password"));
    assert_eq!(found.relevant_images.len(), 1);
    assert!(found.relevant_images[0].ends_with("page_0_img_0.png"));

    let provider = Arc::new(ScriptedProvider::new("1. Open Profile\n2. Press Reset"));
    let generator = AnswerGenerator::new(provider.clone());
    let answer = generator
        .generate_response(
            "How do I reset my password?",
            &found.relevant_chunks,
            &found.relevant_images,
        )
        .expect("answer");
    assert_eq!(answer, "1. Open Profile\n2. Press Reset");
    let prompt = provider.last_prompt().expect("prompt sent");
    assert!(prompt.contains("User Query: How do I reset my password?"));
    assert!(prompt.contains(&found.relevant_images[0]));
}

#[test]
fn empty_index_still_produces_an_answer() {
    let retriever = Retriever::new(Arc::new(KeywordEmbedder), Arc::new(MemoryIndex::default()));
    let found = retriever
        .find_relevant_content("Where is the export button?", 3)
        .expect("retrieve");
    assert!(found.relevant_chunks.is_empty());
    assert!(found.relevant_images.is_empty());

    let provider = Arc::new(ScriptedProvider::new("I could not find that in the guide."));
    let generator = AnswerGenerator::new(provider.clone());
    let answer = generator
        .generate_response("Where is the export button?", &[], &[])
        .expect("answer");
    assert_eq!(answer, "I could not find that in the guide.");
    assert!(provider
        .last_prompt()
        .expect("prompt sent")
        .contains(NO_IMAGES_MARKER));
}

#[test]
fn embedding_failure_stops_ingestion() {
    let dir = tempfile::tempdir().expect("tempdir");
    let index = Arc::new(MemoryIndex::default());
    let pipeline = IngestPipeline::new(Arc::new(FailingEmbedder), index.clone(), dir.path());
    let doc = PdfDocument::from_bytes(&guide_pdf()).expect("parse");

    let err = pipeline.ingest_document(&doc).expect_err("embedding fails");
    assert!(matches!(
        err,
        IngestError::Service(ServiceError::Malformed { .. })
    ));
    assert_eq!(index.len(), 0);
}

#[test]
fn failure_on_a_later_page_keeps_earlier_pages_indexed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let index = Arc::new(MemoryIndex::default());
    let embedder = Arc::new(FailsOnCall::new(2));
    let pipeline = IngestPipeline::new(embedder, index.clone(), dir.path());
    let doc = PdfDocument::from_bytes(&guide_pdf()).expect("parse");

    let err = pipeline.ingest_document(&doc).expect_err("second page fails");
    assert!(matches!(
        err,
        IngestError::Service(ServiceError::Malformed { .. })
    ));
    assert!(index.record("page-0").is_some());
    assert!(index.record("page-1").is_none());
    assert_eq!(index.len(), 1);
}

#[test]
fn ingest_path_reads_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pdf = dir.path().join("guide.pdf");
    std::fs::write(&pdf, guide_pdf()).expect("write pdf");
    let index = Arc::new(MemoryIndex::default());
    let pipeline = IngestPipeline::new(
        Arc::new(KeywordEmbedder),
        index.clone(),
        dir.path().join("images"),
    );

    let report = pipeline.ingest_path(&pdf).expect("ingest");
    assert_eq!(report.pages_indexed, 2);
    assert!(dir.path().join("images").join("page_0_img_0.png").is_file());
}
