//! Shared types passed between the engine, the batch walker and the CLI.
//!
//! [`CompressionRequest`] carries every tunable of one run; nothing is read
//! from module-level state, so rayon workers can share a request freely.
//! [`CompressionResult`] is serialized into the JSON batch report.

use crate::imaging::Dimensions;
use crate::search::Attempt;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Defaults match the behavior the tool has always shipped with.
pub const DEFAULT_TARGET_KB: u64 = 8;
pub const DEFAULT_INITIAL_QUALITY: u8 = 85;
pub const DEFAULT_MIN_QUALITY: u8 = 20;
pub const DEFAULT_QUALITY_DECAY: f64 = 0.8;
pub const DEFAULT_SCALE_DECAY: f64 = 0.85;
pub const DEFAULT_MIN_EDGE: u32 = 200;
pub const DEFAULT_MAX_ITERATIONS: u32 = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid compression request: {0}")]
pub struct RequestError(pub String);

/// Everything one compression run needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionRequest {
    /// Maximum acceptable encoded size in bytes.
    pub target_bytes: u64,
    pub min_quality: u8,
    pub initial_quality: u8,
    /// Multiplier applied to quality while it is above `min_quality`.
    pub quality_decay: f64,
    pub min_width: u32,
    pub min_height: u32,
    /// Multiplier applied to scale once quality sits at its floor.
    pub scale_decay: f64,
    pub max_iterations: u32,
    pub dry_run: bool,
    pub backup: bool,
}

impl Default for CompressionRequest {
    fn default() -> Self {
        Self {
            target_bytes: DEFAULT_TARGET_KB * 1024,
            min_quality: DEFAULT_MIN_QUALITY,
            initial_quality: DEFAULT_INITIAL_QUALITY,
            quality_decay: DEFAULT_QUALITY_DECAY,
            min_width: DEFAULT_MIN_EDGE,
            min_height: DEFAULT_MIN_EDGE,
            scale_decay: DEFAULT_SCALE_DECAY,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            dry_run: false,
            backup: false,
        }
    }
}

impl CompressionRequest {
    /// Default tunables with a budget of `kb` KiB.
    pub fn with_target_kb(kb: u64) -> Self {
        Self {
            target_bytes: kb * 1024,
            ..Self::default()
        }
    }

    pub fn dimension_floor(&self) -> (u32, u32) {
        (self.min_width, self.min_height)
    }

    /// Reject tunables that would make the search non-terminating or meaningless.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.target_bytes == 0 {
            return Err(RequestError("target_bytes must be positive".into()));
        }
        for (name, q) in [
            ("min_quality", self.min_quality),
            ("initial_quality", self.initial_quality),
        ] {
            if !(1..=100).contains(&q) {
                return Err(RequestError(format!("{name} must be 1-100, got {q}")));
            }
        }
        if self.min_quality > self.initial_quality {
            return Err(RequestError(format!(
                "min_quality ({}) exceeds initial_quality ({})",
                self.min_quality, self.initial_quality
            )));
        }
        for (name, decay) in [
            ("quality_decay", self.quality_decay),
            ("scale_decay", self.scale_decay),
        ] {
            if !(decay > 0.0 && decay < 1.0) {
                return Err(RequestError(format!(
                    "{name} must be strictly between 0 and 1, got {decay}"
                )));
            }
        }
        if self.min_width == 0 || self.min_height == 0 {
            return Err(RequestError("min_width and min_height must be non-zero".into()));
        }
        if self.max_iterations == 0 {
            return Err(RequestError("max_iterations must be at least 1".into()));
        }
        Ok(())
    }
}

/// Why a file was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadySmall,
    Error,
}

/// Which terminal condition ended the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Candidate fit the budget.
    Accepted,
    /// Quality and a dimension both hit their floors.
    ForcedStop,
    /// `max_iterations` candidates were produced without meeting either.
    IterationCap,
}

/// Outcome of compressing one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionResult {
    pub original_size: u64,
    pub final_size: u64,
    pub iterations_used: u32,
    pub was_compressed: bool,
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_quality: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_dimensions: Option<Dimensions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    /// Every candidate the search encoded, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<Attempt>,
}

impl CompressionResult {
    fn untouched(original_size: u64, reason: SkipReason) -> Self {
        Self {
            original_size,
            final_size: original_size,
            iterations_used: 0,
            was_compressed: false,
            skipped: true,
            skip_reason: Some(reason),
            final_quality: None,
            final_dimensions: None,
            stop: None,
            backup_path: None,
            attempts: Vec::new(),
        }
    }

    pub fn already_small(original_size: u64) -> Self {
        Self::untouched(original_size, SkipReason::AlreadySmall)
    }

    pub fn failed(original_size: u64) -> Self {
        Self::untouched(original_size, SkipReason::Error)
    }

    /// Bytes removed from disk (negative when a best-effort result grew).
    pub fn bytes_saved(&self) -> i64 {
        self.original_size as i64 - self.final_size as i64
    }
}
