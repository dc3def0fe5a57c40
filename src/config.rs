//! Configuration module.
//!
//! Handles loading, validating, and merging `squish.toml`. Stock defaults are
//! the base layer, the user's file is merged on top, and command-line flags
//! override the merged result.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! target_kb = 8               # Size budget per image, in KiB
//!
//! [search]
//! initial_quality = 85        # First JPEG quality tried (1-100)
//! min_quality = 20            # Quality floor (1-100)
//! quality_decay = 0.8         # Quality multiplier per step
//! scale_decay = 0.85          # Scale multiplier once quality is at the floor
//! min_width = 200             # Width floor in pixels
//! min_height = 200            # Height floor in pixels
//! max_iterations = 20         # Hard cap on encodes per image
//!
//! [output]
//! dry_run = false             # Report only, never write
//! backup = false              # Keep the original as <file>.bak
//!
//! [processing]
//! max_processes = 4           # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse, override just the values you want:
//!
//! ```toml
//! [search]
//! min_width = 320
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::types::{self, CompressionRequest};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "squish.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config file {0} not found")]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration loaded from `squish.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Size budget per image, in KiB.
    pub target_kb: u64,
    pub search: SearchConfig,
    pub output: OutputConfig,
    pub processing: ProcessingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_kb: types::DEFAULT_TARGET_KB,
            search: SearchConfig::default(),
            output: OutputConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl Config {
    /// Build the per-run request these settings describe.
    pub fn to_request(&self) -> CompressionRequest {
        CompressionRequest {
            target_bytes: self.target_kb.saturating_mul(1024),
            min_quality: self.search.min_quality,
            initial_quality: self.search.initial_quality,
            quality_decay: self.search.quality_decay,
            min_width: self.search.min_width,
            min_height: self.search.min_height,
            scale_decay: self.search.scale_decay,
            max_iterations: self.search.max_iterations,
            dry_run: self.output.dry_run,
            backup: self.output.backup,
        }
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        self.to_request()
            .validate()
            .map_err(|e| ConfigError::Validation(e.0))
    }
}

/// Tunables of the quality/scale search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub initial_quality: u8,
    pub min_quality: u8,
    pub quality_decay: f64,
    pub scale_decay: f64,
    pub min_width: u32,
    pub min_height: u32,
    pub max_iterations: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            initial_quality: types::DEFAULT_INITIAL_QUALITY,
            min_quality: types::DEFAULT_MIN_QUALITY,
            quality_decay: types::DEFAULT_QUALITY_DECAY,
            scale_decay: types::DEFAULT_SCALE_DECAY,
            min_width: types::DEFAULT_MIN_EDGE,
            min_height: types::DEFAULT_MIN_EDGE,
            max_iterations: types::DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// What happens to the winning candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dry_run: bool,
    pub backup: bool,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel compression workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(Config::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults do not serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path` on top of stock defaults.
///
/// A missing file yields the defaults unless `required` is set, which is the
/// case when the user named the file explicitly.
pub fn load_config(path: &Path, required: bool) -> Result<Config, ConfigError> {
    let overlay = load_raw_config(path)?;
    if overlay.is_none() && required {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    resolve_config(stock_defaults_value()?, overlay)
}

/// Returns a fully-commented stock `squish.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Squish Configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags (--target-kb, --dry-run, --backup, --jobs) override
# the values in this file. Unknown keys will cause an error.

# Size budget per image, in KiB. Files already at or below it are skipped.
target_kb = 8

# ---------------------------------------------------------------------------
# Search
# ---------------------------------------------------------------------------
# Quality is lowered first. Once it sits at min_quality, the image is
# downscaled step by step until it fits or a dimension floor is reached.
[search]
# First JPEG quality tried (1-100).
initial_quality = 85

# Lowest JPEG quality the search will use (1-100).
min_quality = 20

# Quality is multiplied by this each step (exclusive 0-1).
quality_decay = 0.8

# Scale is multiplied by this each step once quality is at the floor.
scale_decay = 0.85

# Downscaling stops once either dimension reaches its floor.
min_width = 200
min_height = 200

# Hard cap on encode attempts per image.
max_iterations = 20

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Report what would happen without writing anything.
dry_run = false

# Keep the original next to the result as <file>.bak.
# An existing backup is never overwritten.
backup = false

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers. Omit for auto (= number of CPU cores).
# max_processes = 4
"##
}
