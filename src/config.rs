//! Configuration module.
//!
//! Handles loading, validating, and merging `thumbcache.toml`. Stock
//! defaults are the base layer; a user file in the config directory
//! overrides any subset of keys.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! cache_dir = "cache"           # Where finished thumbnails are written
//!
//! [remote]
//! cache_dir = "cache/remote"    # Local copies of remote sources
//! lifetime_secs = 86400         # Reuse a local copy this long without asking
//! timeout_secs = 10             # Network timeout for probes and downloads
//! user_agent = "thumbcache/x.y.z"
//!
//! [output]
//! jpeg_quality = 85             # Default JPEG quality (1-100)
//!
//! [limits]
//! max_pixels = 20000000         # Sources above this pixel count are refused
//!
//! [extensions]
//! gif = ".gif"
//! jpeg = ".jpg"
//! png = ".png"
//!
//! [processing]
//! max_processes = 4             # Max parallel batch workers (omit for auto)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{ImageKind, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the config file looked up in the config directory.
pub const CONFIG_FILENAME: &str = "thumbcache.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `thumbcache.toml`.
///
/// All fields have defaults; a user file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbConfig {
    /// Directory for finished thumbnails.
    pub cache_dir: PathBuf,
    pub remote: RemoteConfig,
    pub output: OutputConfig,
    pub limits: LimitsConfig,
    /// Output file extension per format, including the leading dot.
    pub extensions: ExtensionsConfig,
    pub processing: ProcessingConfig,
}

impl Default for ThumbConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            remote: RemoteConfig::default(),
            output: OutputConfig::default(),
            limits: LimitsConfig::default(),
            extensions: ExtensionsConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl ThumbConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(ConfigError::Validation(
                "output.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.limits.max_pixels == 0 {
            return Err(ConfigError::Validation(
                "limits.max_pixels must be non-zero".into(),
            ));
        }
        if self.remote.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "remote.timeout_secs must be non-zero".into(),
            ));
        }
        let exts = [
            ("gif", &self.extensions.gif),
            ("jpeg", &self.extensions.jpeg),
            ("png", &self.extensions.png),
        ];
        for (name, ext) in exts {
            if ext.len() < 2 || !ext.starts_with('.') {
                return Err(ConfigError::Validation(format!(
                    "extensions.{name} must start with '.' and name an extension"
                )));
            }
        }
        for (i, (a, ext_a)) in exts.iter().enumerate() {
            for (b, ext_b) in &exts[i + 1..] {
                if ext_a.eq_ignore_ascii_case(ext_b) {
                    return Err(ConfigError::Validation(format!(
                        "extensions.{a} and extensions.{b} must differ"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn jpeg_quality(&self) -> Quality {
        Quality::new(self.output.jpeg_quality)
    }

    /// Move the thumbnail cache to `dir`.
    ///
    /// A remote cache still at its stock location follows along as
    /// `<dir>/remote`; an explicitly configured one stays put.
    pub fn relocate_cache(&mut self, dir: PathBuf) {
        if self.remote.cache_dir == RemoteConfig::default().cache_dir {
            self.remote.cache_dir = dir.join("remote");
        }
        self.cache_dir = dir;
    }
}

/// Remote source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// Directory for local copies of remote sources.
    pub cache_dir: PathBuf,
    /// Seconds a local copy is trusted without contacting the server.
    pub lifetime_secs: u64,
    /// Network timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache/remote"),
            lifetime_secs: 86_400,
            timeout_secs: 10,
            user_agent: concat!("thumbcache/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl RemoteConfig {
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.lifetime_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// JPEG quality when the request does not set one.
    pub jpeg_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { jpeg_quality: 85 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Largest source, in pixels, that will be decoded.
    pub max_pixels: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_pixels: 20_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtensionsConfig {
    pub gif: String,
    pub jpeg: String,
    pub png: String,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            gif: ".gif".to_string(),
            jpeg: ".jpg".to_string(),
            png: ".png".to_string(),
        }
    }
}

impl ExtensionsConfig {
    pub fn for_kind(&self, kind: ImageKind) -> &str {
        match kind {
            ImageKind::Gif => &self.gif,
            ImageKind::Jpeg => &self.jpeg,
            ImageKind::Png => &self.png,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel batch workers.
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

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ThumbConfig::default())?)
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

/// Load `thumbcache.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ThumbConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ThumbConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `thumbcache.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<ThumbConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `thumbcache.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# thumbcache configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory for finished thumbnails. The first path component is replaced
# by the base URL when a request asks for a public reference.
cache_dir = "cache"

# ---------------------------------------------------------------------------
# Remote sources
# ---------------------------------------------------------------------------
[remote]
# Directory for local copies of downloaded sources.
cache_dir = "cache/remote"

# Seconds a local copy is reused without contacting the server. After that
# the server's Last-Modified time decides between reuse and download.
lifetime_secs = 86400

# Network timeout for probes and downloads, in seconds.
timeout_secs = 10

# User-Agent header sent with every request.
# user_agent = "thumbcache/<version>"

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# JPEG quality when a request does not set one (1 = worst, 100 = best).
jpeg_quality = 85

# ---------------------------------------------------------------------------
# Limits
# ---------------------------------------------------------------------------
[limits]
# Sources with more pixels than this are refused before decoding.
max_pixels = 20000000

# ---------------------------------------------------------------------------
# File extensions per output format
# ---------------------------------------------------------------------------
[extensions]
gif = ".gif"
jpeg = ".jpg"
png = ".png"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel batch workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
