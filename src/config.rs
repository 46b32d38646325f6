//! Bridge configuration.
//!
//! Handles loading, validating, and merging `config.toml` files. A user file
//! only needs the keys it wants to change; everything else comes from the
//! stock defaults.
//!
//! ## Config File Location
//!
//! The CLI reads `--config <file>` when given, otherwise `config.toml` in the
//! library root. A missing default file means stock settings.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! # cache_dir = "/tmp/photo_gallery"  # Export cache directory
//!
//! [thumbnails]
//! width = 128               # Default thumbnail box
//! height = 128
//! quality = 80              # JPEG quality (1-100)
//!
//! [export]
//! quality = 100             # JPEG quality of resized exports (1-100)
//! reuse_existing = true     # Return already-exported files as is
//!
//! [processing]
//! # max_processes = 4       # Parallel export workers (default: CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! ```toml
//! [thumbnails]
//! width = 256
//! height = 256
//! ```
//!
//! Unknown keys are rejected so typos surface instead of being ignored.

use crate::cache::DEFAULT_CACHE_DIR_NAME;
use crate::imaging::Quality;
use crate::types::Dimensions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Bridge configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Export cache directory. Defaults to `photo_gallery` in the system temp dir.
    pub cache_dir: Option<PathBuf>,
    pub thumbnails: ThumbnailsConfig,
    pub export: ExportConfig,
    pub processing: ProcessingConfig,
}

impl BridgeConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thumbnails.width == 0 || self.thumbnails.height == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.width and thumbnails.height must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.thumbnails.quality) {
            return Err(ConfigError::Validation(
                "thumbnails.quality must be 1-100".into(),
            ));
        }
        if !(1..=100).contains(&self.export.quality) {
            return Err(ConfigError::Validation(
                "export.quality must be 1-100".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Directory the export cache writes into.
    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_CACHE_DIR_NAME))
    }
}

/// Default thumbnail box and encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    pub width: u32,
    pub height: u32,
    pub quality: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            quality: 80,
        }
    }
}

impl ThumbnailsConfig {
    pub fn bounds(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}

/// Export cache behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// JPEG quality of resized exports.
    pub quality: u32,
    /// Return an already-exported file instead of writing it again.
    pub reuse_existing: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            quality: 100,
            reuse_existing: true,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel export workers.
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
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(BridgeConfig::default())?)
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

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Load a config file over the stock defaults and validate the result.
///
/// A missing file yields the stock config.
pub fn load_config(path: &Path) -> Result<BridgeConfig, ConfigError> {
    let merged = match load_raw_config(path)? {
        Some(overlay) => merge_toml(stock_defaults_value()?, overlay),
        None => stock_defaults_value()?,
    };
    let config: BridgeConfig = merged.try_into()?;
    config.validate()?;
    log::debug!("loaded config {}: {:?}", path.display(), config);
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# photo-bridge configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Directory for exported (copied or resized) media files.
# Omit to use "photo_gallery" inside the system temp directory.
# cache_dir = "/tmp/photo_gallery"

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Box a thumbnail must cover when the caller gives no size.
width = 128
height = 128

# JPEG quality (1 = worst, 100 = best).
quality = 80

# ---------------------------------------------------------------------------
# Exports
# ---------------------------------------------------------------------------
[export]
# JPEG quality of resized exports. PNG sources stay lossless PNG.
quality = 100

# Return a previously exported file instead of writing it again.
reuse_existing = true

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel export workers for `photo-bridge file`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
