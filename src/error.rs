//! Error types for the disassembly view engine.
//!
//! Row queries never fail; they degrade to sentinels and placeholders. The
//! errors here only surface at the host boundary: loading configuration,
//! opening a byte source, validating a block layout or dumping a selection.

use thiserror::Error;

use crate::core::disassembler::DecoderError;
use crate::io::error::IoError;

/// Main error type for view-engine operations.
#[derive(Debug, Error)]
pub enum ViewError {
    /// Block layout rejected while building a block table
    #[error("Invalid block layout at {address:#x}: {message}")]
    InvalidLayout { address: u64, message: String },

    /// Configuration could not be interpreted
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Byte source failures
    #[error("Byte source error: {0}")]
    ByteSource(#[from] IoError),

    /// Decoder backend failures
    #[error("Decoder error: {0}")]
    Decoder(#[from] DecoderError),

    /// Selection does not cover a contiguous, file-backed range
    #[error("Selection {address:#x}+{size:#x} is not backed by a solid file range")]
    NotSolid { address: u64, size: u64 },

    /// Selection is empty
    #[error("Empty selection")]
    EmptySelection,
}

/// Result type alias for view-engine operations
pub type Result<T> = std::result::Result<T, ViewError>;
