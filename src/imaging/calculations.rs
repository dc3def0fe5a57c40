//! Pure calculation functions for candidate dimensions and pixel blending.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the pixel dimensions of a candidate downscaled by `scale`.
///
/// Each dimension is truncated toward zero and floored at 1 pixel, so even a
/// pathological scale never produces an empty image.
///
/// # Examples
/// ```
/// # use squish::imaging::scaled_dimensions;
/// assert_eq!(scaled_dimensions((1000, 800), 1.0), (1000, 800));
/// assert_eq!(scaled_dimensions((1000, 800), 0.85), (850, 680));
/// assert_eq!(scaled_dimensions((3, 2), 0.01), (1, 1));
/// ```
pub fn scaled_dimensions(source: (u32, u32), scale: f64) -> (u32, u32) {
    let (w, h) = source;
    if scale >= 1.0 {
        return (w, h);
    }
    let scale_edge = |edge: u32| ((edge as f64 * scale).floor() as u32).max(1);
    (scale_edge(w), scale_edge(h))
}

/// Whether either dimension has reached its floor.
///
/// The search stops shrinking once the width *or* the height is at or below
/// its minimum; it never waits for both.
pub fn at_dimension_floor(dimensions: (u32, u32), floor: (u32, u32)) -> bool {
    dimensions.0 <= floor.0 || dimensions.1 <= floor.1
}

/// Next quality step: `max(floor, ⌊quality × decay⌋)`.
///
/// For `decay` in `(0, 1)` the result is strictly below `quality` until it
/// reaches `floor`, after which it stays there.
pub fn decay_quality(quality: u8, floor: u8, decay: f64) -> u8 {
    if quality <= floor {
        return floor;
    }
    let next = (quality as f64 * decay).floor() as u8;
    next.max(floor)
}

/// Composite one color channel onto an opaque white background.
///
/// `alpha` is the blend weight of the foreground: 255 keeps `channel`
/// unchanged, 0 yields pure white.
pub fn blend_on_white(channel: u8, alpha: u8) -> u8 {
    let c = channel as u32;
    let a = alpha as u32;
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}
