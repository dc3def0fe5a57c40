//! High-level image operations.
//!
//! These functions combine calculations with backend execution: decode a
//! container, flatten it to the opaque RGB working image the search encodes
//! from.

use super::backend::{BackendError, ColorModel, DecodedPixels, Dimensions, ImageBackend};
use super::calculations::blend_on_white;
use image::{Rgb, RgbImage, RgbaImage};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// The opaque image every candidate is encoded from.
#[derive(Debug, Clone)]
pub struct WorkingImage {
    pub rgb: RgbImage,
    pub color_model: ColorModel,
    pub original_size: u64,
}

impl WorkingImage {
    pub fn dimensions(&self) -> Dimensions {
        let (width, height) = self.rgb.dimensions();
        Dimensions { width, height }
    }
}

/// Composite RGBA pixels onto a white background, using alpha as blend weight.
pub fn flatten_onto_white(rgba: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        Rgb([
            blend_on_white(r, a),
            blend_on_white(g, a),
            blend_on_white(b, a),
        ])
    })
}

/// Reduce decoded pixels to opaque RGB.
///
/// Only `Alpha` and `Palette { has_transparency: true }` go through the
/// composite step; everything else converts directly.
pub fn normalize(pixels: DecodedPixels) -> RgbImage {
    match pixels {
        DecodedPixels::Opaque(rgb) => rgb,
        DecodedPixels::Alpha(rgba) => flatten_onto_white(&rgba),
        DecodedPixels::Palette {
            pixels,
            has_transparency: true,
        } => flatten_onto_white(&pixels.into_rgba8()),
        DecodedPixels::Palette {
            pixels,
            has_transparency: false,
        } => pixels.into_rgb8(),
    }
}

/// Decode `bytes` with the backend and normalize to a [`WorkingImage`].
pub fn load_working_image(backend: &impl ImageBackend, bytes: &[u8]) -> Result<WorkingImage> {
    let source = backend.decode(bytes)?;
    let color_model = source.color_model();
    Ok(WorkingImage {
        rgb: normalize(source.pixels),
        color_model,
        original_size: source.original_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::imaging::backend::tests::MockBackend;
    use crate::imaging::backend::SourceImage;
    use crate::test_helpers::png_rgba_bytes;
    use image::{DynamicImage, Rgba};

    #[test]
    fn flatten_transparent_becomes_white() {
        let rgba = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 0]));
        let rgb = flatten_onto_white(&rgba);
        assert_eq!(rgb.dimensions(), (3, 2));
        assert!(rgb.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn flatten_opaque_keeps_color() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
        let rgb = flatten_onto_white(&rgba);
        assert!(rgb.pixels().all(|p| p.0 == [10, 20, 30]));
    }

    #[test]
    fn normalize_opaque_passthrough() {
        let rgb = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        assert_eq!(normalize(DecodedPixels::Opaque(rgb.clone())), rgb);
    }

    #[test]
    fn normalize_palette_without_transparency_skips_blend() {
        let mut rgba = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        // Alpha here is ignored since the palette has no transparency.
        rgba.put_pixel(1, 0, Rgba([0, 0, 0, 0]));
        let rgb = normalize(DecodedPixels::Palette {
            pixels: DynamicImage::ImageRgba8(rgba),
            has_transparency: false,
        });
        assert_eq!(rgb.get_pixel(1, 0).0, [0, 0, 0]);
    }

    #[test]
    fn normalize_palette_with_transparency_blends() {
        let rgba = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        let rgb = normalize(DecodedPixels::Palette {
            pixels: DynamicImage::ImageRgba8(rgba),
            has_transparency: true,
        });
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn load_working_image_from_alpha_png() {
        let bytes = png_rgba_bytes(40, 20);
        let working = load_working_image(&RustBackend::new(), &bytes).unwrap();
        assert_eq!(working.color_model, ColorModel::Alpha);
        assert_eq!(working.dimensions(), Dimensions::new(40, 20));
        assert_eq!(working.original_size, bytes.len() as u64);
        // Left half of the fixture is fully transparent.
        assert_eq!(working.rgb.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn load_working_image_uses_backend_decode() {
        let backend = MockBackend::with_source(SourceImage {
            pixels: DecodedPixels::Opaque(RgbImage::new(8, 6)),
            original_size: 1234,
        });
        let working = load_working_image(&backend, b"abc").unwrap();
        assert_eq!(working.original_size, 1234);
        assert_eq!(working.dimensions(), Dimensions::new(8, 6));
    }
}
