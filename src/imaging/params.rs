//! Parameter types for image operations.
//!
//! These structs describe *what* to encode, not *how*. They are the interface
//! between the [`search`](crate::search) controller (which decides the next
//! quality/scale pair) and the [`backend`](super::backend) (which does the
//! pixel work). Swapping in a mock backend for tests leaves them untouched.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100). Clamped on construction.
//! - [`EncodeParams`]: one candidate: quality plus uniform downscale factor.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Parameters for encoding a single candidate.
///
/// `scale` is a linear factor in `(0, 1]` applied to both dimensions of the
/// working image before encoding. `1.0` means no resampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeParams {
    pub quality: Quality,
    pub scale: f64,
}

impl EncodeParams {
    pub fn new(quality: Quality, scale: f64) -> Self {
        Self { quality, scale }
    }

    /// True when the candidate should be resampled before encoding.
    pub fn needs_resize(&self) -> bool {
        self.scale < 1.0
    }
}
