//! Linear row view over a sparse binary image.
//!
//! `position` translates between row positions and addresses, `materialize`
//! renders one row, `cache` keeps recently rendered rows, and `model` ties
//! them to an analysis snapshot and a byte source.

pub mod cache;
pub mod materialize;
pub mod model;
pub mod position;
pub mod record;
pub mod shared;

pub use cache::{CacheStats, RowCache};
pub use materialize::{DecoderSlot, RowContext, RowMaterializer};
pub use model::{DisasmModel, Selection};
pub use position::{Boundary, PositionIndex, RowLayout};
pub use record::{Column, ViewRecord};
pub use shared::SharedDisasmModel;
