//! Shared test utilities for the squish test suite.
//!
//! Synthetic images are generated in memory with the `image` crate so tests
//! never depend on fixture files. Noise comes from a fixed-seed xorshift, so
//! every run encodes the same bytes.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let photo = write_file(tmp.path(), "photo.jpg", &noisy_jpeg_bytes(800, 600, 95));
//! let result = compress_file(&RustBackend::new(), &photo, &request, &CancelToken::new())?;
//! assert_result_within_budget_or_floors(&result, &request);
//! ```

use crate::types::{CompressionRequest, CompressionResult};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};

// =========================================================================
// Pixel sources
// =========================================================================

/// Deterministic xorshift32 stream.
pub struct Noise(u32);

impl Noise {
    pub fn new(seed: u32) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u8(&mut self) -> u8 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        (x >> 24) as u8
    }
}

/// Smooth gradient: compresses well, good for encoder round trips.
pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

/// Per-pixel noise: stays large under JPEG, like a detailed photo.
pub fn noisy_rgb(width: u32, height: u32) -> RgbImage {
    let mut noise = Noise::new(width.wrapping_mul(31).wrapping_add(height));
    RgbImage::from_fn(width, height, |_, _| {
        Rgb([noise.next_u8(), noise.next_u8(), noise.next_u8()])
    })
}

/// Left half fully transparent, right half opaque noise.
pub fn half_transparent_rgba(width: u32, height: u32) -> RgbaImage {
    let mut noise = Noise::new(7);
    RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([noise.next_u8(), noise.next_u8(), noise.next_u8(), 255])
        }
    })
}

// =========================================================================
// Encoded containers
// =========================================================================

pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Vec<u8> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

/// Gradient JPEG at the given quality.
pub fn jpeg_bytes(width: u32, height: u32, quality: u8) -> Vec<u8> {
    encode_jpeg(&gradient_rgb(width, height), quality)
}

/// Noise JPEG: hundreds of KB at 800x600, like an unedited photo.
pub fn noisy_jpeg_bytes(width: u32, height: u32, quality: u8) -> Vec<u8> {
    encode_jpeg(&noisy_rgb(width, height), quality)
}

/// RGBA PNG built from [`half_transparent_rgba`].
pub fn png_rgba_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = half_transparent_rgba(width, height);
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
    bytes
}

/// Indexed 8-bit PNG: one row of palette `indices`, with an optional `tRNS`
/// chunk giving per-entry alpha.
pub fn indexed_png_bytes(palette: &[[u8; 3]], trns: Option<&[u8]>, indices: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut encoder = png::Encoder::new(&mut bytes, indices.len() as u32, 1);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_palette(palette.concat());
    if let Some(alpha) = trns {
        encoder.set_trns(alpha.to_vec());
    }
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(indices).unwrap();
    writer.finish().unwrap();
    bytes
}

/// Lossless WebP of an RGB image.
pub fn webp_bytes(img: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    WebPEncoder::new_lossless(&mut bytes)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

// =========================================================================
// Filesystem + assertions
// =========================================================================

/// Write `bytes` to `dir/name`, creating parents. Returns the full path.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Budget-or-floor check for a non-skipped result that did not hit the cap.
pub fn assert_result_within_budget_or_floors(
    result: &CompressionResult,
    request: &CompressionRequest,
) {
    assert!(!result.skipped, "expected a compressed result: {result:?}");
    if result.final_size <= request.target_bytes {
        return;
    }
    let dims = result.final_dimensions.expect("compressed result has dimensions");
    assert_eq!(result.final_quality, Some(request.min_quality), "{result:?}");
    assert!(
        dims.width <= request.min_width || dims.height <= request.min_height,
        "over budget without reaching a dimension floor: {result:?}"
    );
}
