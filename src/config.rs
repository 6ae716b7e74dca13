//! Configuration for the view engine.
//!
//! Every section has sensible defaults, so an empty JSON object is a valid
//! configuration and hosts only spell out what they change.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, ViewError};
use crate::view::position::RowLayout;

/// Master configuration for a disassembly view session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// What is rendered into each row.
    pub show: ShowOptions,
    /// Row cache sizing.
    pub cache: CacheConfig,
    /// How blocks and holes are laid out as rows.
    pub layout: LayoutConfig,
    /// Byte source limits.
    pub io: IoConfig,
}

impl ViewConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: ViewConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.layout.max_gap_rows == Some(0) {
            return Err(ViewError::Config(
                "layout.max_gap_rows must be at least 1 when set".to_string(),
            ));
        }
        if self.io.max_row_bytes == 0 {
            return Err(ViewError::Config(
                "io.max_row_bytes must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rendering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowOptions {
    /// Substitute referenced addresses in opcode text with their labels.
    pub show_labels: bool,
}

impl Default for ShowOptions {
    fn default() -> Self {
        Self { show_labels: true }
    }
}

/// Row cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of materialized rows kept.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

/// Row layout configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Rows per block.
    pub row_layout: RowLayout,
    /// Upper bound on synthesized rows per hole; `None` keeps one row per byte.
    pub max_gap_rows: Option<u64>,
}

/// Byte source configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// Largest file a `MappedFile` will open.
    pub max_file_size: u64,
    /// Largest read performed for a single row.
    pub max_row_bytes: usize,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024 * 1024, // 1GB
            max_row_bytes: 4096,
        }
    }
}
