//! Configuration for rotatelog
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::compression::Compression;
use crate::error::{Result, RotateError};

/// Main configuration for a rotating log writer
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Layout
    // -------------------------------------------------------------------------
    /// Path of the active log file. Retired segments live next to it:
    ///   {path}          (active)
    ///   {path}.1        (most recently retired, never compressed)
    ///   {path}.2[.ext]  ... {path}.{max_files - 1}[.ext]
    pub path: PathBuf,

    // -------------------------------------------------------------------------
    // Rotation Policy
    // -------------------------------------------------------------------------
    /// Size at which the active file is rotated
    pub capacity: Capacity,

    /// Total number of files kept, active file included.
    /// Anything below 2 disables rotation.
    pub max_files: usize,

    /// Compression applied to segments `.2` and older
    pub compression: Compression,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./rotatelog.log"),
            capacity: Capacity::Unlimited,
            max_files: 1,
            compression: Compression::None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Whether this configuration can ever rotate the active file
    pub fn rotation_enabled(&self) -> bool {
        self.max_files >= 2 && self.capacity != Capacity::Unlimited
    }

    /// Reject configurations the writer cannot open
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(RotateError::Config("log path must not be empty".to_string()));
        }
        if self.path.file_name().is_none() {
            return Err(RotateError::Config(format!(
                "log path {} does not name a file",
                self.path.display()
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the path of the active log file
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the rotation capacity
    pub fn capacity(mut self, capacity: Capacity) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Set the rotation capacity in bytes
    pub fn max_size(mut self, bytes: u64) -> Self {
        self.config.capacity = Capacity::Bytes(bytes);
        self
    }

    /// Set the total number of files to keep (active included)
    pub fn max_files(mut self, count: usize) -> Self {
        self.config.max_files = count;
        self
    }

    /// Set the compression used for older retired segments
    pub fn compression(mut self, compression: Compression) -> Self {
        self.config.compression = compression;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

// =============================================================================
// Capacity
// =============================================================================

/// Rotation threshold of the active file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capacity {
    /// Never rotate (configured as `-1`)
    #[default]
    Unlimited,

    /// Rotate once the active file holds at least this many bytes
    Bytes(u64),
}

impl Capacity {
    /// Interpret the raw numeric setting, where `-1` disables rotation
    pub fn from_bytes(value: i64) -> Result<Self> {
        match value {
            -1 => Ok(Capacity::Unlimited),
            v if v < 0 => Err(RotateError::Config(format!(
                "invalid capacity {}: must be -1 or a non-negative size",
                v
            ))),
            v => Ok(Capacity::Bytes(v as u64)),
        }
    }

    /// The threshold in bytes, if any
    pub fn bytes(self) -> Option<u64> {
        match self {
            Capacity::Unlimited => None,
            Capacity::Bytes(n) => Some(n),
        }
    }

    /// Whether a file of `size` bytes has reached this capacity
    pub fn is_reached(self, size: u64) -> bool {
        self.bytes().is_some_and(|max| size >= max)
    }
}

impl FromStr for Capacity {
    type Err = RotateError;

    /// Parses `-1` or a size with an optional binary unit: `512`, `1k`, `10mb`, `2G`
    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim().to_ascii_lowercase();
        if raw == "-1" {
            return Ok(Capacity::Unlimited);
        }

        let split = raw
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(raw.len());
        let (digits, unit) = raw.split_at(split);
        if digits.is_empty() {
            return Err(RotateError::Config(format!("invalid size: {:?}", s)));
        }

        let value: u64 = digits
            .parse()
            .map_err(|e| RotateError::Config(format!("invalid size {:?}: {}", s, e)))?;

        let multiplier: u64 = match unit.trim() {
            "" | "b" => 1,
            "k" | "kb" | "kib" => 1 << 10,
            "m" | "mb" | "mib" => 1 << 20,
            "g" | "gb" | "gib" => 1 << 30,
            "t" | "tb" | "tib" => 1 << 40,
            other => {
                return Err(RotateError::Config(format!(
                    "invalid size {:?}: unknown unit {:?}",
                    s, other
                )))
            }
        };

        value
            .checked_mul(multiplier)
            .map(Capacity::Bytes)
            .ok_or_else(|| RotateError::Config(format!("size {:?} overflows", s)))
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Unlimited => write!(f, "-1"),
            Capacity::Bytes(n) => write!(f, "{}", n),
        }
    }
}
