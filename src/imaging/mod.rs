//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode + classify** | `image::ImageReader`, PNG `IHDR` palette check |
//! | **Flatten alpha** | white composite, alpha as blend weight |
//! | **Resize → JPEG** | Lanczos3 + `JpegEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension, quality and blend math (unit testable)
//! - **Parameters**: Data structures describing one encode
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{
    BackendError, Candidate, ColorModel, DecodedPixels, Dimensions, ImageBackend, SourceImage,
};
pub use calculations::{at_dimension_floor, decay_quality, scaled_dimensions};
pub use operations::{WorkingImage, load_working_image, normalize};
pub use params::{EncodeParams, Quality};
pub use rust_backend::{RustBackend, is_supported_image, supported_input_extensions};
