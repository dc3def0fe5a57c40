//! # Squish
//!
//! Shrinks uploaded images until each fits a byte budget. Every image is
//! re-encoded as baseline JPEG, first by lowering quality and then, once
//! quality reaches its floor, by downscaling, until the result fits or both
//! floors are reached.
//!
//! # Architecture
//!
//! ```text
//! batch      walk dir  →  one compress_file per image (rayon pool)
//! compress   bytes     →  load → search → commit
//! search     RgbImage  →  candidates until accepted / floors / cap
//! commit     candidate →  temp file, optional .bak, atomic rename
//! ```
//!
//! The search is a pure state machine ([`search::advance`]) driven by a loop
//! that asks an [`imaging::ImageBackend`] for candidates. Tests drive it with a
//! mock backend whose sizes are a function of quality and pixel count, so the
//! whole decision sequence is checked without encoding a single JPEG.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Decode, normalize, resize and encode behind [`imaging::ImageBackend`] |
//! | [`search`] | Quality-then-scale search state machine |
//! | [`commit`] | Dry run, backup and atomic replacement on disk |
//! | [`compress`] | Single-image engine: size short-circuit, load, search, commit |
//! | [`batch`] | Directory walk, parallel processing, per-file failure isolation |
//! | [`config`] | `squish.toml` loading, validation and merging |
//! | [`types`] | `CompressionRequest` / `CompressionResult` shared by everything |
//! | [`cancel`] | Cooperative cancellation token |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Output Format
//!
//! Whatever comes in (JPEG, PNG, WebP) goes out as JPEG under the original
//! file name. Transparency is composited onto white before encoding, so icons
//! and screenshots stay legible instead of turning black.
//!
//! ## Quality Before Scale
//!
//! Dropping JPEG quality costs less visible detail than dropping pixels, so
//! the resolution is only touched once quality sits at `min_quality`.
//!
//! ## Never a Half-Written File
//!
//! Candidates are built in memory. The winner is written to a temporary file
//! in the destination directory and renamed over the original, so an
//! interrupted run leaves either the old file or the new one.

pub mod batch;
pub mod cancel;
pub mod commit;
pub mod compress;
pub mod config;
pub mod imaging;
pub mod output;
pub mod search;
pub mod types;

pub use cancel::CancelToken;
pub use compress::{CompressError, compress_bytes, compress_file, compress_image};
pub use types::{CompressionRequest, CompressionResult};

#[cfg(test)]
pub(crate) mod test_helpers;
