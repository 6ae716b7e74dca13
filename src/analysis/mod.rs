//! Analysis results consumed by the view.
//!
//! The layout analyzer itself lives outside this crate; `Analysis` is the
//! snapshot it produces and the view rebuilds its index from.

pub mod snapshot;

pub use snapshot::Analysis;
