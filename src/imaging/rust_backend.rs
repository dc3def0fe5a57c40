//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::ImageReader` with guessed format |
//! | Palette detection | PNG `IHDR` color type byte (decoders expand palettes) |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter |
//! | Encode → JPEG | `jpeg_encoder::Encoder` with optimized Huffman tables |

use super::backend::{
    BackendError, Candidate, DecodedPixels, Dimensions, ImageBackend, SourceImage,
};
use super::calculations::scaled_dimensions;
use super::params::EncodeParams;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage};
use jpeg_encoder::{ColorType, Encoder};
use std::io::Cursor;
use std::path::Path;
use std::sync::LazyLock;

/// Extensions the batch walker picks up, paired with the decoder they need.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Case-insensitive extension check against [`supported_input_extensions`].
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const PNG_COLOR_TYPE_INDEXED: u8 = 3;

/// True when `bytes` is a PNG whose `IHDR` declares an indexed color type.
///
/// Layout: signature (8) + chunk length (4) + `IHDR` (4) + width (4) +
/// height (4) + bit depth (1) + color type (1).
fn is_indexed_png(bytes: &[u8]) -> bool {
    bytes.len() > 25
        && bytes[..8] == PNG_SIGNATURE
        && &bytes[12..16] == b"IHDR"
        && bytes[25] == PNG_COLOR_TYPE_INDEXED
}

/// Tag decoded pixels with their color model.
fn classify(img: DynamicImage, indexed: bool) -> DecodedPixels {
    let has_alpha = img.color().has_alpha();
    if indexed {
        DecodedPixels::Palette {
            pixels: img,
            has_transparency: has_alpha,
        }
    } else if has_alpha {
        DecodedPixels::Alpha(img.into_rgba8())
    } else {
        DecodedPixels::Opaque(img.into_rgb8())
    }
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<SourceImage, BackendError> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let format = reader
            .format()
            .filter(|fmt| fmt.reading_enabled())
            .ok_or(BackendError::UnknownFormat)?;
        let img = reader
            .decode()
            .map_err(|e| BackendError::DecodeFailed(format!("{format:?}: {e}")))?;

        let indexed = format == ImageFormat::Png && is_indexed_png(bytes);
        Ok(SourceImage {
            pixels: classify(img, indexed),
            original_size: bytes.len() as u64,
        })
    }

    fn encode(&self, image: &RgbImage, params: EncodeParams) -> Result<Candidate, BackendError> {
        let (width, height) = scaled_dimensions(image.dimensions(), params.scale);

        let resized;
        let frame = if params.needs_resize() {
            resized = image::imageops::resize(image, width, height, FilterType::Lanczos3);
            &resized
        } else {
            image
        };

        let bytes = encode_jpeg(frame, params.quality.value(), true)?;
        Ok(Candidate {
            quality: params.quality.value(),
            scale: params.scale,
            dimensions: Dimensions { width, height },
            bytes,
        })
    }
}

/// Baseline JPEG, optionally with Huffman tables built from the image's own
/// symbol statistics instead of the standard Annex K tables.
fn encode_jpeg(
    frame: &RgbImage,
    quality: u8,
    optimize_huffman: bool,
) -> Result<Vec<u8>, BackendError> {
    let too_large = |_| {
        BackendError::EncodeFailed(format!(
            "{}x{} exceeds the JPEG dimension limit",
            frame.width(),
            frame.height()
        ))
    };
    let width = u16::try_from(frame.width()).map_err(too_large)?;
    let height = u16::try_from(frame.height()).map_err(too_large)?;

    let mut bytes = Vec::new();
    let mut encoder = Encoder::new(&mut bytes, quality);
    encoder.set_optimized_huffman_tables(optimize_huffman);
    encoder
        .encode(frame.as_raw(), width, height, ColorType::Rgb)
        .map_err(|e| BackendError::EncodeFailed(format!("JPEG encode failed: {e}")))?;
    Ok(bytes)
}
