#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use guidebook::{
    Embedder, IndexRecord, LlmProvider, MatchMetadata, ProviderRequest, QueryMatch, ServiceError,
    VectorIndex,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

const KEYWORDS: [&str; 5] = ["password", "reset", "invoice", "export", "profile"];

/// Counts keyword occurrences, so texts sharing words land near each other.
pub struct KeywordEmbedder;

impl Embedder for KeywordEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let lower = text.to_lowercase();
        Ok(KEYWORDS
            .iter()
            .map(|word| lower.matches(word).count() as f32 + 0.01)
            .collect())
    }
}

/// Always fails, for error-path tests.
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, ServiceError> {
        Err(ServiceError::Malformed {
            service: "fake embeddings",
            detail: "no vector".to_string(),
        })
    }
}

/// Behaves like [`KeywordEmbedder`] until call number `fail_on` (1-based).
pub struct FailsOnCall {
    pub fail_on: usize,
    calls: AtomicUsize,
}

impl FailsOnCall {
    pub fn new(fail_on: usize) -> Self {
        Self {
            fail_on,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Embedder for FailsOnCall {
    fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return FailingEmbedder.embed(text);
        }
        KeywordEmbedder.embed(text)
    }
}

/// In-memory index ranking by dot product, ties broken by id.
#[derive(Default)]
pub struct MemoryIndex {
    pub records: Mutex<HashMap<String, IndexRecord>>,
    pub upserts: Mutex<usize>,
}

impl MemoryIndex {
    pub fn len(&self) -> usize {
        self.records.lock().expect("lock").len()
    }

    pub fn record(&self, id: &str) -> Option<IndexRecord> {
        self.records.lock().expect("lock").get(id).cloned()
    }
}

impl VectorIndex for MemoryIndex {
    fn upsert(&self, record: &IndexRecord) -> Result<(), ServiceError> {
        *self.upserts.lock().expect("lock") += 1;
        self.records
            .lock()
            .expect("lock")
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>, ServiceError> {
        let records = self.records.lock().expect("lock");
        let mut scored: Vec<(f32, &IndexRecord)> = records
            .values()
            .map(|record| {
                let score = record
                    .vector
                    .iter()
                    .zip(vector)
                    .map(|(a, b)| a * b)
                    .sum::<f32>();
                (score, record)
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, record)| QueryMatch {
                id: record.id.clone(),
                score: Some(score),
                metadata: include_metadata.then(|| MatchMetadata {
                    text: Some(record.metadata.text.clone()),
                    page: Some(f64::from(record.metadata.page)),
                    images: Some(record.metadata.images.clone()),
                }),
            })
            .collect())
    }
}

/// Records every prompt and replies with a fixed answer.
pub struct ScriptedProvider {
    pub reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().expect("lock").last().cloned()
    }
}

impl LlmProvider for ScriptedProvider {
    fn answer(&self, request: &ProviderRequest<'_>) -> Result<String, ServiceError> {
        self.prompts
            .lock()
            .expect("lock")
            .push(request.prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// An image XObject to place on a test page.
pub struct TestImage {
    pub width: i64,
    pub height: i64,
    pub samples: Vec<u8>,
    /// `cm` operands used when drawing it.
    pub matrix: [f32; 6],
}

impl TestImage {
    pub fn gray(width: i64, height: i64, samples: Vec<u8>, matrix: [f32; 6]) -> Self {
        Self {
            width,
            height,
            samples,
            matrix,
        }
    }
}

/// One page of a generated PDF.
#[derive(Default)]
pub struct TestPage {
    pub text: Option<String>,
    pub images: Vec<TestImage>,
}

impl TestPage {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            images: Vec::new(),
        }
    }

    pub fn with_image(mut self, image: TestImage) -> Self {
        self.images.push(image);
        self
    }
}

/// Serialises a small PDF with Courier text lines and DeviceGray images.
pub fn build_pdf(pages: Vec<TestPage>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let mut operations = Vec::new();
        let mut xobjects = lopdf::Dictionary::new();
        for (index, image) in page.images.iter().enumerate() {
            let name = format!("Im{index}");
            let stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => image.width,
                    "Height" => image.height,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                image.samples.clone(),
            )
            .with_compression(false);
            let image_id: ObjectId = doc.add_object(stream);
            xobjects.set(name.as_bytes().to_vec(), image_id);
            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new(
                "cm",
                image.matrix.iter().map(|v| Object::Real(*v)).collect(),
            ));
            operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
            operations.push(Operation::new("Q", vec![]));
        }
        if let Some(text) = &page.text {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![72.into(), 700.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(text.as_str())]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(
            Stream::new(dictionary! {}, content.encode().expect("encode content"))
                .with_compression(false),
        );
        let resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => xobjects,
        };
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save pdf");
    bytes
}

/// Identity-scaled placement of a `w` by `h` box at (`x`, `y`).
pub fn placed(x: f32, y: f32, w: f32, h: f32) -> [f32; 6] {
    [w, 0.0, 0.0, h, x, y]
}
