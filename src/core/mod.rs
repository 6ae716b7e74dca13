//! Core data types and collaborator interfaces.
//!
//! The view engine consumes the layout analyzer's output through the traits
//! defined here: the block index, the memory map, label and reference
//! lookups, and the instruction decoder.

pub mod block;
pub mod disassembler;
pub mod labels;
pub mod memory_map;

pub use block::{BlockDescriptor, BlockIndex, BlockKind, BlockTable};
pub use disassembler::{
    Architecture, DecodedInstruction, DecoderError, DecoderMode, DecoderProvider, Disassembler,
    Endianness,
};
pub use labels::{LabelMap, LabelTable, ReferenceMap, ReverseReferenceIndex};
pub use memory_map::{MemoryMap, MemoryRegion, RegionMap};
