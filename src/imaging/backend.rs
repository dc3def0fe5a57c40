//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the compression
//! engine needs from pixels: decode a container into classified pixels, and
//! encode one candidate at a given quality and scale.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust, built on the
//! `image` crate. Tests drive the search with a recording mock instead.

use super::params::EncodeParams;
use image::{DynamicImage, RgbImage, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unrecognized image container")]
    UnknownFormat,
    #[error("Decode failed: {0}")]
    DecodeFailed(String),
    #[error("Encode failed: {0}")]
    EncodeFailed(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Color model of a source image, assigned once at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    Opaque,
    Alpha,
    Palette { has_transparency: bool },
}

impl ColorModel {
    /// Whether pixels must be composited onto a background before encoding.
    pub fn needs_flatten(self) -> bool {
        matches!(
            self,
            ColorModel::Alpha
                | ColorModel::Palette {
                    has_transparency: true
                }
        )
    }
}

/// Decoded pixels, tagged by color model.
///
/// Palette images arrive already expanded by the decoder (RGB, or RGBA when the
/// palette carries transparency), so they hold a [`DynamicImage`].
#[derive(Debug, Clone)]
pub enum DecodedPixels {
    Opaque(RgbImage),
    Alpha(RgbaImage),
    Palette {
        pixels: DynamicImage,
        has_transparency: bool,
    },
}

impl DecodedPixels {
    pub fn color_model(&self) -> ColorModel {
        match self {
            DecodedPixels::Opaque(_) => ColorModel::Opaque,
            DecodedPixels::Alpha(_) => ColorModel::Alpha,
            DecodedPixels::Palette {
                has_transparency, ..
            } => ColorModel::Palette {
                has_transparency: *has_transparency,
            },
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        let (width, height) = match self {
            DecodedPixels::Opaque(img) => img.dimensions(),
            DecodedPixels::Alpha(img) => img.dimensions(),
            DecodedPixels::Palette { pixels, .. } => (pixels.width(), pixels.height()),
        };
        Dimensions { width, height }
    }
}

/// A decoded source image plus what the engine needs to know about its origin.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub pixels: DecodedPixels,
    /// Size of the encoded source container in bytes.
    pub original_size: u64,
}

impl SourceImage {
    pub fn color_model(&self) -> ColorModel {
        self.pixels.color_model()
    }

    pub fn dimensions(&self) -> Dimensions {
        self.pixels.dimensions()
    }
}

/// One encoded attempt. Only the candidate that ends the search survives.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub quality: u8,
    pub scale: f64,
    pub dimensions: Dimensions,
    pub bytes: Vec<u8>,
}

impl Candidate {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Trait for image processing backends.
///
/// `encode` must be deterministic: identical pixels and parameters yield
/// byte-identical output. Backends are shared across rayon workers.
pub trait ImageBackend: Sync {
    /// Decode an encoded container and classify its color model.
    fn decode(&self, bytes: &[u8]) -> Result<SourceImage, BackendError>;

    /// Resample (when `params.scale < 1`) and encode the working image.
    fn encode(&self, image: &RgbImage, params: EncodeParams) -> Result<Candidate, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::calculations::scaled_dimensions;
    use crate::imaging::params::Quality;
    use std::sync::Mutex;

    /// Mock backend that records encode calls and fakes candidate sizes.
    ///
    /// Candidate size is `width * height * quality / divisor` bytes, so it
    /// shrinks with both quality and scale like a real encoder would.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    pub struct MockBackend {
        pub divisor: u64,
        pub decode_result: Mutex<Option<SourceImage>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(usize),
        Encode {
            quality: u8,
            scale: f64,
            width: u32,
            height: u32,
            size: u64,
        },
    }

    impl Default for MockBackend {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::with_divisor(100)
        }

        pub fn with_divisor(divisor: u64) -> Self {
            Self {
                divisor,
                decode_result: Mutex::new(None),
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn with_source(source: SourceImage) -> Self {
            let backend = Self::new();
            *backend.decode_result.lock().unwrap() = Some(source);
            backend
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn encode_ops(&self) -> Vec<RecordedOp> {
            self.get_operations()
                .into_iter()
                .filter(|op| matches!(op, RecordedOp::Encode { .. }))
                .collect()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, bytes: &[u8]) -> Result<SourceImage, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(bytes.len()));

            self.decode_result
                .lock()
                .unwrap()
                .take()
                .ok_or(BackendError::UnknownFormat)
        }

        fn encode(
            &self,
            image: &RgbImage,
            params: EncodeParams,
        ) -> Result<Candidate, BackendError> {
            let (width, height) = scaled_dimensions(image.dimensions(), params.scale);
            let pixels = width as u64 * height as u64;
            let size = (pixels * params.quality.value() as u64 / self.divisor).max(1);
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                quality: params.quality.value(),
                scale: params.scale,
                width,
                height,
                size,
            });
            Ok(Candidate {
                quality: params.quality.value(),
                scale: params.scale,
                dimensions: Dimensions { width, height },
                bytes: vec![0; size as usize],
            })
        }
    }

    #[test]
    fn mock_records_encode() {
        let backend = MockBackend::new();
        let image = RgbImage::new(400, 300);

        let candidate = backend
            .encode(&image, EncodeParams::new(Quality::new(50), 0.5))
            .unwrap();
        assert_eq!(candidate.dimensions, Dimensions::new(200, 150));
        assert_eq!(candidate.size(), 200 * 150 * 50 / 100);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::Encode {
                quality: 50,
                width: 200,
                height: 150,
                ..
            }
        ));
    }

    #[test]
    fn mock_decode_without_source_errors() {
        let backend = MockBackend::new();
        assert!(matches!(
            backend.decode(b"nope"),
            Err(BackendError::UnknownFormat)
        ));
        assert_eq!(backend.get_operations(), vec![RecordedOp::Decode(4)]);
    }

    #[test]
    fn color_model_flatten_rules() {
        assert!(!ColorModel::Opaque.needs_flatten());
        assert!(ColorModel::Alpha.needs_flatten());
        assert!(
            ColorModel::Palette {
                has_transparency: true
            }
            .needs_flatten()
        );
        assert!(
            !ColorModel::Palette {
                has_transparency: false
            }
            .needs_flatten()
        );
    }

    #[test]
    fn decoded_pixels_report_dimensions() {
        let pixels = DecodedPixels::Alpha(RgbaImage::new(30, 20));
        assert_eq!(pixels.dimensions(), Dimensions::new(30, 20));
        assert_eq!(pixels.color_model(), ColorModel::Alpha);
    }
}
