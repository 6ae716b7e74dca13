//! Scrollable disassembly view over sparse binary images.
//!
//! Presents a binary's virtual-memory layout as a dense sequence of rows
//! (instructions, data, unmapped gaps), translating between row positions,
//! virtual addresses and file offsets, and rendering rows on demand behind
//! a bounded cache.

/// Analysis snapshots consumed by the view
pub mod analysis;
/// Configuration
pub mod config;
/// Core data types and collaborator interfaces
pub mod core;
/// Decoder backends
pub mod disasm;
/// Error types
pub mod error;
/// Byte sources
pub mod io;
/// Tracing setup
pub mod logging;
/// Position index, row materialization and caching
pub mod view;

pub use analysis::Analysis;
pub use config::ViewConfig;
pub use error::{Result, ViewError};
pub use view::{DisasmModel, SharedDisasmModel, ViewRecord};
