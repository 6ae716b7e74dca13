//! Analysis: everything one layout-analysis pass hands to the view.
//!
//! Aggregates the block index, memory map, labels, reverse references and
//! decoder mode. A snapshot is immutable from the view's side; re-analysis
//! produces a new one that replaces it wholesale.

use std::fmt;

use crate::core::block::{BlockIndex, BlockTable};
use crate::core::disassembler::DecoderMode;
use crate::core::labels::{LabelMap, LabelTable, ReferenceMap, ReverseReferenceIndex};
use crate::core::memory_map::{MemoryMap, RegionMap};

pub struct Analysis {
    /// Classified blocks
    pub blocks: Box<dyn BlockIndex + Send>,
    /// Address/offset/relative-address translation
    pub memory_map: Box<dyn MemoryMap + Send>,
    /// Address labels
    pub labels: Box<dyn LabelTable + Send>,
    /// Instruction address → referenced addresses
    pub references: Box<dyn ReverseReferenceIndex + Send>,
    /// Architecture and byte order the decoder is opened with
    pub mode: DecoderMode,
    /// Program entry point, if known
    pub entry_point: Option<u64>,
}

impl Analysis {
    /// Snapshot with no labels, no references and an unknown architecture.
    pub fn new<B, M>(blocks: B, memory_map: M) -> Self
    where
        B: BlockIndex + Send + 'static,
        M: MemoryMap + Send + 'static,
    {
        Self {
            blocks: Box::new(blocks),
            memory_map: Box::new(memory_map),
            labels: Box::new(LabelMap::new()),
            references: Box::new(ReferenceMap::new()),
            mode: DecoderMode::default(),
            entry_point: None,
        }
    }

    /// Nothing analyzed yet.
    pub fn empty() -> Self {
        Self::new(BlockTable::new(), RegionMap::default())
    }

    pub fn with_labels<L: LabelTable + Send + 'static>(mut self, labels: L) -> Self {
        self.labels = Box::new(labels);
        self
    }

    pub fn with_references<R: ReverseReferenceIndex + Send + 'static>(mut self, refs: R) -> Self {
        self.references = Box::new(refs);
        self
    }

    pub fn with_mode(mut self, mode: DecoderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_entry_point(mut self, entry_point: u64) -> Self {
        self.entry_point = Some(entry_point);
        self
    }
}

impl Default for Analysis {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analysis")
            .field("blocks", &self.blocks.len())
            .field("mode", &self.mode)
            .field("entry_point", &self.entry_point)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::{BlockDescriptor, BlockKind};
    use crate::core::disassembler::{Architecture, Endianness};

    #[test]
    fn builder_sets_fields() {
        let blocks =
            BlockTable::from_blocks([BlockDescriptor::new(0x1000, 4, BlockKind::Opcode)]).unwrap();
        let labels: LabelMap = [(0x1000u64, "main")].into_iter().collect();
        let analysis = Analysis::new(blocks, RegionMap::flat(0x1000, 4))
            .with_labels(labels)
            .with_mode(DecoderMode::new(Architecture::X86, Endianness::Little))
            .with_entry_point(0x1000);
        assert_eq!(analysis.blocks.len(), 1);
        assert_eq!(analysis.labels.label(0x1000), Some("main"));
        assert_eq!(analysis.memory_map.address_to_offset(0x1002), Some(2));
        assert_eq!(analysis.entry_point, Some(0x1000));
        assert!(format!("{:?}", analysis).contains("X86"));
    }

    #[test]
    fn empty_has_no_blocks() {
        let analysis = Analysis::default();
        assert!(analysis.blocks.is_empty());
        assert!(analysis.references.references_from(0).is_empty());
    }
}
