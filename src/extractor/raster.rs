//! Turns raw PDF image samples into RGB pixels.

use image::{Rgb, RgbImage};
use thiserror::Error;

/// Colour space of an image XObject, reduced to what rasterising needs.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
    /// Palette lookup; `palette` holds `base.components()` bytes per entry.
    Indexed {
        base: Box<ColorModel>,
        palette: Vec<u8>,
    },
}

impl ColorModel {
    pub(crate) fn components(&self) -> usize {
        match self {
            ColorModel::Gray | ColorModel::Indexed { .. } => 1,
            ColorModel::Rgb => 3,
            ColorModel::Cmyk => 4,
        }
    }

    pub(crate) fn from_component_count(count: i64) -> Option<Self> {
        match count {
            1 => Some(ColorModel::Gray),
            3 => Some(ColorModel::Rgb),
            4 => Some(ColorModel::Cmyk),
            _ => None,
        }
    }
}

/// Uncompressed sample data plus the dictionary entries describing it.
#[derive(Debug)]
pub(crate) struct RawImage<'a> {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) bits_per_component: u8,
    pub(crate) color: ColorModel,
    pub(crate) samples: &'a [u8],
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum RasterError {
    #[error("image has zero width or height")]
    Empty,
    #[error("unsupported bits per component {0}")]
    BitDepth(u8),
    #[error("image of {width}x{height} is too large to rasterize")]
    TooLarge { width: u32, height: u32 },
    #[error("expected {expected} sample bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("palette index {index} outside palette of {entries} entries")]
    PaletteIndex { index: u16, entries: usize },
}

/// Rasterises samples to RGB. Greyscale, bilevel and indexed inputs come out
/// as full colour so every written file has the same pixel layout.
pub(crate) fn rasterize(raw: &RawImage<'_>) -> Result<RgbImage, RasterError> {
    if raw.width == 0 || raw.height == 0 {
        return Err(RasterError::Empty);
    }
    let bpc = raw.bits_per_component;
    if !matches!(bpc, 1 | 2 | 4 | 8 | 16) {
        return Err(RasterError::BitDepth(bpc));
    }
    let components = raw.color.components();
    let width = raw.width as usize;
    let too_large = || RasterError::TooLarge {
        width: raw.width,
        height: raw.height,
    };
    let stride = width
        .checked_mul(components)
        .and_then(|bits| bits.checked_mul(bpc as usize))
        .ok_or_else(too_large)?
        .div_ceil(8);
    let expected = stride
        .checked_mul(raw.height as usize)
        .ok_or_else(too_large)?;
    if raw.samples.len() < expected {
        return Err(RasterError::Truncated {
            expected,
            found: raw.samples.len(),
        });
    }

    let mut out = RgbImage::new(raw.width, raw.height);
    for (y, row) in raw.samples.chunks(stride).take(raw.height as usize).enumerate() {
        let values = unpack_row(row, bpc, width * components);
        for (x, pixel) in values.chunks(components).enumerate() {
            let rgb = to_rgb(&raw.color, pixel, bpc)?;
            out.put_pixel(x as u32, y as u32, rgb);
        }
    }
    Ok(out)
}

/// Splits a packed row into `count` component values of `bpc` bits each.
fn unpack_row(row: &[u8], bpc: u8, count: usize) -> Vec<u16> {
    let mut values = Vec::with_capacity(count);
    match bpc {
        8 => values.extend(row.iter().take(count).map(|b| u16::from(*b))),
        16 => values.extend(
            row.chunks_exact(2)
                .take(count)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]])),
        ),
        _ => {
            let per_byte = 8 / bpc as usize;
            let mask = (1u16 << bpc) - 1;
            'bytes: for byte in row {
                for slot in 0..per_byte {
                    if values.len() == count {
                        break 'bytes;
                    }
                    let shift = 8 - bpc as usize * (slot + 1);
                    values.push((u16::from(*byte) >> shift) & mask);
                }
            }
        }
    }
    values
}

fn scale(value: u16, bpc: u8) -> u8 {
    let max = (1u32 << bpc) - 1;
    ((u32::from(value) * 255 + max / 2) / max) as u8
}

fn to_rgb(color: &ColorModel, pixel: &[u16], bpc: u8) -> Result<Rgb<u8>, RasterError> {
    match color {
        ColorModel::Gray => {
            let v = scale(pixel[0], bpc);
            Ok(Rgb([v, v, v]))
        }
        ColorModel::Rgb => Ok(Rgb([
            scale(pixel[0], bpc),
            scale(pixel[1], bpc),
            scale(pixel[2], bpc),
        ])),
        ColorModel::Cmyk => Ok(cmyk_to_rgb([
            scale(pixel[0], bpc),
            scale(pixel[1], bpc),
            scale(pixel[2], bpc),
            scale(pixel[3], bpc),
        ])),
        ColorModel::Indexed { base, palette } => {
            let width = base.components();
            let index = pixel[0];
            let start = index as usize * width;
            let entry = palette
                .get(start..start + width)
                .ok_or(RasterError::PaletteIndex {
                    index,
                    entries: palette.len() / width,
                })?;
            let widened: Vec<u16> = entry.iter().map(|b| u16::from(*b)).collect();
            to_rgb(base, &widened, 8)
        }
    }
}

fn cmyk_to_rgb([c, m, y, k]: [u8; 4]) -> Rgb<u8> {
    let channel = |ink: u8| -> u8 {
        let value = (255 - u32::from(ink)) * (255 - u32::from(k)) / 255;
        value as u8
    };
    Rgb([channel(c), channel(m), channel(y)])
}
