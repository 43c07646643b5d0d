//! PDF text and image extraction.
//!
//! Text is taken one page at a time; a page without extractable text yields no
//! chunk. Images are found by following each page's content stream so the
//! bounding box of every placement is known, then decoded and written as PNG.
//! Opening the document is the only fatal step: a single bad image is reported
//! as a [`SkippedImage`] and extraction moves on.

mod placement;
mod raster;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::document::{BoundingBox, ExtractedImage, TextChunk};

use self::raster::{ColorModel, RawImage};

/// Directory images are written to when no other is configured.
pub const DEFAULT_IMAGE_DIR: &str = "extracted_images";

/// Page trees deeper than this are treated as malformed.
const MAX_TREE_DEPTH: usize = 32;

/// Fatal extraction failures.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The PDF could not be parsed at all.
    #[error("failed to open PDF {source_label}: {source}")]
    Open {
        /// Path or label of the input.
        source_label: String,
        /// Parser error.
        #[source]
        source: lopdf::Error,
    },
    /// The image output directory could not be created.
    #[error("failed to create image directory {}: {source}", path.display())]
    OutputDir {
        /// Directory that was requested.
        path: PathBuf,
        /// Filesystem error.
        #[source]
        source: std::io::Error,
    },
}

/// Why an image placement did not produce a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The XObject did not resolve to a stream with sample data.
    NoStream,
    /// The stream could not be decoded or the PNG could not be written.
    Decode(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoStream => write!(f, "no valid image stream"),
            Self::Decode(detail) => write!(f, "{detail}"),
        }
    }
}

/// An image placement that was found but not written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedImage {
    /// Zero-based page number.
    pub page_number: u32,
    /// Position among the page's image placements.
    pub image_index: usize,
    /// Cause of the skip.
    pub reason: SkipReason,
}

/// Result of handling one image placement.
pub type ImageOutcome = Result<ExtractedImage, SkippedImage>;

/// Keeps only the images that were written.
pub fn saved_images(outcomes: &[ImageOutcome]) -> Vec<ExtractedImage> {
    outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().ok().cloned())
        .collect()
}

/// A parsed PDF ready for extraction.
pub struct PdfDocument {
    inner: Document,
    label: String,
}

impl PdfDocument {
    /// Parses the PDF at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let inner = Document::load(path).map_err(|source| ExtractError::Open {
            source_label: label.clone(),
            source,
        })?;
        Ok(Self { inner, label })
    }

    /// Parses a PDF held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExtractError> {
        let label = String::from("<memory>");
        let inner = Document::load_mem(bytes).map_err(|source| ExtractError::Open {
            source_label: label.clone(),
            source,
        })?;
        Ok(Self { inner, label })
    }

    /// Number of pages in the page tree.
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Pages as (zero-based number, one-based lopdf number, object id), in order.
    fn pages(&self) -> impl Iterator<Item = (u32, u32, ObjectId)> {
        self.inner
            .get_pages()
            .into_iter()
            .enumerate()
            .map(|(index, (number, id))| (index as u32, number, id))
    }
}

/// Extracts one chunk per page that has non-blank text, in page order.
pub fn extract_text(doc: &PdfDocument) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    for (page_number, lopdf_number, _) in doc.pages() {
        let text = match doc.inner.extract_text(&[lopdf_number]) {
            Ok(text) => text,
            Err(err) => {
                debug!(page = page_number, error = %err, "no decodable text on page");
                continue;
            }
        };
        // Whitespace-only pages carry nothing to embed; kept text is stored as extracted.
        if text.trim().is_empty() {
            continue;
        }
        chunks.push(TextChunk { page_number, text });
    }
    info!(
        document = %doc.label,
        pages = doc.page_count(),
        chunks = chunks.len(),
        "text extracted"
    );
    chunks
}

/// Writes every image placed on every page to `out_dir` as
/// `page_{page}_img_{index}.png`, returning one outcome per placement.
pub fn extract_images(
    doc: &PdfDocument,
    out_dir: &Path,
) -> Result<Vec<ImageOutcome>, ExtractError> {
    fs::create_dir_all(out_dir).map_err(|source| ExtractError::OutputDir {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let mut outcomes = Vec::new();
    for (page_number, _, page_id) in doc.pages() {
        let xobjects = page_xobjects(&doc.inner, page_id);
        if xobjects.is_empty() {
            continue;
        }
        let targets = image_targets(&doc.inner, page_id, &xobjects);
        for (image_index, (object, bounding_box)) in targets.into_iter().enumerate() {
            let outcome = save_image(
                &doc.inner,
                object,
                page_number,
                image_index,
                bounding_box,
                out_dir,
            );
            match &outcome {
                Ok(image) => info!(
                    page = page_number,
                    path = %image.file_path,
                    "extracted image"
                ),
                Err(skipped) => warn!(
                    page = page_number,
                    image = image_index,
                    reason = %skipped.reason,
                    "skipping image"
                ),
            }
            outcomes.push(outcome);
        }
    }
    Ok(outcomes)
}

/// Image XObjects drawn on a page, in drawing order. Falls back to resource
/// order without placement data when the content stream cannot be decoded.
fn image_targets<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    xobjects: &[(&'a [u8], &'a Object)],
) -> Vec<(&'a Object, Option<BoundingBox>)> {
    let operations = doc
        .get_page_content(page_id)
        .ok()
        .and_then(|bytes| Content::decode(&bytes).ok())
        .map(|content| content.operations);

    match operations {
        Some(operations) => placement::xobject_placements(&operations)
            .into_iter()
            .filter_map(|placement| {
                let object = xobjects
                    .iter()
                    .find(|(name, _)| *name == placement.name.as_slice())
                    .map(|(_, object)| *object);
                if object.is_none() {
                    debug!(
                        name = %String::from_utf8_lossy(&placement.name),
                        "Do references unknown XObject"
                    );
                }
                object.map(|object| (object, Some(placement.bounding_box)))
            })
            .filter(|(object, _)| !is_non_image_stream(doc, object))
            .collect(),
        None => xobjects
            .iter()
            .filter(|(_, object)| !is_non_image_stream(doc, object))
            .map(|(_, object)| (*object, None))
            .collect(),
    }
}

/// Streams with a subtype other than `/Image` (forms, PostScript) are not images.
/// Anything that is not a stream still counts so it can be reported as skipped.
fn is_non_image_stream(doc: &Document, object: &Object) -> bool {
    match resolve(doc, object) {
        Some(Object::Stream(stream)) => {
            let subtype = stream.dict.get(b"Subtype").ok().and_then(name_of);
            subtype != Some(b"Image".as_slice())
        }
        _ => false,
    }
}

fn save_image(
    doc: &Document,
    object: &Object,
    page_number: u32,
    image_index: usize,
    bounding_box: Option<BoundingBox>,
    out_dir: &Path,
) -> ImageOutcome {
    let skip = |reason| SkippedImage {
        page_number,
        image_index,
        reason,
    };
    let Some(Object::Stream(stream)) = resolve(doc, object) else {
        return Err(skip(SkipReason::NoStream));
    };
    let image =
        decode_stream(doc, stream).map_err(|detail| skip(SkipReason::Decode(detail)))?;
    let path = out_dir.join(format!("page_{page_number}_img_{image_index}.png"));
    image
        .save_with_format(&path, ImageFormat::Png)
        .map_err(|err| {
            let detail = format!("failed to write {}: {err}", path.display());
            skip(SkipReason::Decode(detail))
        })?;
    Ok(ExtractedImage {
        page_number,
        file_path: path.to_string_lossy().into_owned(),
        bounding_box,
    })
}

fn decode_stream(doc: &Document, stream: &Stream) -> Result<DynamicImage, String> {
    let filters = stream_filters(doc, &stream.dict);
    match filters.last().map(Vec::as_slice) {
        Some(b"DCTDecode") if filters.len() == 1 => {
            let decoded = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
                .map_err(|err| format!("JPEG decode failed: {err}"))?;
            Ok(normalize_color(decoded))
        }
        Some(filter @ (b"DCTDecode" | b"JPXDecode" | b"CCITTFaxDecode" | b"JBIG2Decode")) => Err(
            format!("unsupported image filter {}", String::from_utf8_lossy(filter)),
        ),
        _ => {
            let samples = if filters.is_empty() {
                stream.content.clone()
            } else {
                stream
                    .decompressed_content()
                    .map_err(|err| format!("failed to decompress samples: {err}"))?
            };
            let raw = raw_image(doc, &stream.dict, &samples)?;
            let rgb = raster::rasterize(&raw).map_err(|err| err.to_string())?;
            Ok(DynamicImage::ImageRgb8(rgb))
        }
    }
}

/// Greyscale and palette images decoded by the `image` crate become RGB.
fn normalize_color(decoded: DynamicImage) -> DynamicImage {
    if decoded.color().has_color() {
        decoded
    } else {
        DynamicImage::ImageRgb8(decoded.to_rgb8())
    }
}

fn raw_image<'a>(
    doc: &Document,
    dict: &Dictionary,
    samples: &'a [u8],
) -> Result<RawImage<'a>, String> {
    let width = dict_integer(doc, dict, b"Width").ok_or("missing /Width")?;
    let height = dict_integer(doc, dict, b"Height").ok_or("missing /Height")?;
    let is_mask = matches!(
        dict.get(b"ImageMask").ok().and_then(|o| resolve(doc, o)),
        Some(Object::Boolean(true))
    );
    let (bits_per_component, color) = if is_mask {
        (1, ColorModel::Gray)
    } else {
        let bpc = dict_integer(doc, dict, b"BitsPerComponent").unwrap_or(8);
        let color = dict
            .get(b"ColorSpace")
            .ok()
            .ok_or("missing /ColorSpace")
            .and_then(|object| color_model(doc, object, 0).ok_or("unsupported /ColorSpace"))?;
        (bpc, color)
    };
    Ok(RawImage {
        width: u32::try_from(width).map_err(|_| format!("invalid /Width {width}"))?,
        height: u32::try_from(height).map_err(|_| format!("invalid /Height {height}"))?,
        bits_per_component: u8::try_from(bits_per_component)
            .map_err(|_| format!("invalid /BitsPerComponent {bits_per_component}"))?,
        color,
        samples,
    })
}

fn color_model(doc: &Document, object: &Object, depth: usize) -> Option<ColorModel> {
    if depth > 2 {
        return None;
    }
    match resolve(doc, object)? {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Some(ColorModel::Gray),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Some(ColorModel::Rgb),
            b"DeviceCMYK" | b"CMYK" => Some(ColorModel::Cmyk),
            _ => None,
        },
        Object::Array(items) => {
            let family = items.first().and_then(name_of)?;
            match family {
                b"ICCBased" => {
                    let Some(Object::Stream(profile)) = resolve(doc, items.get(1)?) else {
                        return None;
                    };
                    let count = dict_integer(doc, &profile.dict, b"N")?;
                    ColorModel::from_component_count(count)
                }
                b"CalGray" => Some(ColorModel::Gray),
                b"CalRGB" | b"Lab" => Some(ColorModel::Rgb),
                b"Indexed" | b"I" => {
                    let base = color_model(doc, items.get(1)?, depth + 1)?;
                    let palette = match resolve(doc, items.get(3)?)? {
                        Object::String(bytes, _) => bytes.clone(),
                        Object::Stream(stream) => {
                            if stream_filters(doc, &stream.dict).is_empty() {
                                stream.content.clone()
                            } else {
                                stream.decompressed_content().ok()?
                            }
                        }
                        _ => return None,
                    };
                    Some(ColorModel::Indexed {
                        base: Box::new(base),
                        palette,
                    })
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// The page's `/XObject` resources, walking up the page tree for inherited ones.
fn page_xobjects(doc: &Document, page_id: ObjectId) -> Vec<(&[u8], &Object)> {
    let Some(resources) = inherited_resources(doc, page_id) else {
        return Vec::new();
    };
    let xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|object| resolve(doc, object));
    let Some(Object::Dictionary(xobjects)) = xobjects else {
        return Vec::new();
    };
    xobjects
        .iter()
        .map(|(name, object)| (name.as_slice(), object))
        .collect()
}

fn inherited_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return match resolve(doc, resources)? {
                Object::Dictionary(dict) => Some(dict),
                _ => None,
            };
        }
        let Ok(Object::Reference(parent)) = node.get(b"Parent") else {
            return None;
        };
        node = doc.get_dictionary(*parent).ok()?;
    }
    None
}

fn stream_filters(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter").ok().and_then(|o| resolve(doc, o)) {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|item| name_of(item).map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

fn dict_integer(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match resolve(doc, dict.get(key).ok()?)? {
        Object::Integer(value) => Some(*value),
        Object::Real(value) => Some(*value as i64),
        _ => None,
    }
}

/// Follows indirect references (bounded, so reference cycles terminate).
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    let mut current = object;
    for _ in 0..MAX_TREE_DEPTH {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

fn name_of(object: &Object) -> Option<&[u8]> {
    match object {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}
