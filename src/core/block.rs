//! Block descriptors and the block index produced by layout analysis.
//!
//! A block is a maximal run of addresses sharing one classification. Blocks
//! are sorted by address and never overlap; the holes between them are not
//! stored but stay addressable through the position index.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, ViewError};

/// Classification of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    /// Decoded instruction
    Opcode,
    /// Literal data span
    Data,
    /// Declared but unmapped span
    Gap,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::Opcode => write!(f, "opcode"),
            BlockKind::Data => write!(f, "data"),
            BlockKind::Gap => write!(f, "gap"),
        }
    }
}

/// One classified block of the virtual image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockDescriptor {
    pub address: u64,
    pub size: u64,
    pub kind: BlockKind,
}

impl BlockDescriptor {
    pub fn new(address: u64, size: u64, kind: BlockKind) -> Self {
        Self {
            address,
            size,
            kind,
        }
    }

    /// Exclusive end address (saturating at the top of the address space).
    pub fn end(&self) -> u64 {
        self.address.saturating_add(self.size)
    }

    /// True if `address` lies in `[self.address, self.end())`.
    pub fn contains(&self, address: u64) -> bool {
        address >= self.address && address < self.end()
    }
}

/// Read-only view of the classified layout.
pub trait BlockIndex {
    /// Block starting exactly at `address`.
    fn lookup(&self, address: u64) -> Option<BlockDescriptor>;

    /// All blocks in ascending address order.
    fn iter(&self) -> Box<dyn Iterator<Item = BlockDescriptor> + '_>;

    /// Number of blocks.
    fn len(&self) -> usize {
        self.iter().count()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `BTreeMap`-backed block index that enforces the layout invariants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTable {
    blocks: BTreeMap<u64, BlockDescriptor>,
}

impl BlockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from blocks in any order; fails on overlap or empty blocks.
    pub fn from_blocks<I>(blocks: I) -> Result<Self>
    where
        I: IntoIterator<Item = BlockDescriptor>,
    {
        let mut table = Self::new();
        for block in blocks {
            table.insert(block)?;
        }
        Ok(table)
    }

    /// Insert a block, rejecting zero sizes, address overflow and overlaps
    /// with neighbours.
    pub fn insert(&mut self, block: BlockDescriptor) -> Result<()> {
        if block.size == 0 {
            return Err(ViewError::InvalidLayout {
                address: block.address,
                message: "block has zero size".to_string(),
            });
        }
        if block.address.checked_add(block.size).is_none() {
            return Err(ViewError::InvalidLayout {
                address: block.address,
                message: format!("size {:#x} runs past the end of the address space", block.size),
            });
        }
        if let Some((_, prev)) = self.blocks.range(..=block.address).next_back() {
            if prev.end() > block.address {
                return Err(ViewError::InvalidLayout {
                    address: block.address,
                    message: format!("overlaps block at {:#x}", prev.address),
                });
            }
        }
        if let Some((_, next)) = self.blocks.range(block.address..).next() {
            if block.end() > next.address {
                return Err(ViewError::InvalidLayout {
                    address: block.address,
                    message: format!("overlaps block at {:#x}", next.address),
                });
            }
        }
        self.blocks.insert(block.address, block);
        Ok(())
    }

    /// Remove the block starting at `address`.
    pub fn remove(&mut self, address: u64) -> Option<BlockDescriptor> {
        self.blocks.remove(&address)
    }

    /// Reclassify the block starting at `address` (e.g. convert code to data).
    ///
    /// Returns the previous kind, or `None` if no block starts there.
    pub fn set_kind(&mut self, address: u64, kind: BlockKind) -> Option<BlockKind> {
        let block = self.blocks.get_mut(&address)?;
        let old = block.kind;
        block.kind = kind;
        Some(old)
    }

    /// Block whose span contains `address`.
    pub fn containing(&self, address: u64) -> Option<BlockDescriptor> {
        self.blocks
            .range(..=address)
            .next_back()
            .map(|(_, b)| *b)
            .filter(|b| b.contains(address))
    }
}

impl BlockIndex for BlockTable {
    fn lookup(&self, address: u64) -> Option<BlockDescriptor> {
        self.blocks.get(&address).copied()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = BlockDescriptor> + '_> {
        Box::new(self.blocks.values().copied())
    }

    fn len(&self) -> usize {
        self.blocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_orders_blocks() {
        let table = BlockTable::from_blocks([
            BlockDescriptor::new(0x2000, 16, BlockKind::Data),
            BlockDescriptor::new(0x1000, 4, BlockKind::Opcode),
        ])
        .unwrap();
        let addrs: Vec<u64> = table.iter().map(|b| b.address).collect();
        assert_eq!(addrs, vec![0x1000, 0x2000]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn table_rejects_overlap() {
        let mut table = BlockTable::new();
        table
            .insert(BlockDescriptor::new(0x1000, 8, BlockKind::Opcode))
            .unwrap();
        let err = table
            .insert(BlockDescriptor::new(0x1004, 4, BlockKind::Data))
            .unwrap_err();
        assert!(matches!(err, ViewError::InvalidLayout { address: 0x1004, .. }));
        let err = table
            .insert(BlockDescriptor::new(0xffc, 8, BlockKind::Data))
            .unwrap_err();
        assert!(matches!(err, ViewError::InvalidLayout { address: 0xffc, .. }));
        // Adjacent is fine.
        table
            .insert(BlockDescriptor::new(0x1008, 4, BlockKind::Data))
            .unwrap();
    }

    #[test]
    fn table_rejects_empty_block() {
        let err = BlockTable::from_blocks([BlockDescriptor::new(0, 0, BlockKind::Data)]);
        assert!(err.is_err());
    }

    #[test]
    fn table_rejects_address_overflow() {
        let err = BlockTable::from_blocks([BlockDescriptor::new(u64::MAX - 4, 0x10, BlockKind::Data)])
            .unwrap_err();
        assert!(matches!(err, ViewError::InvalidLayout { address, .. } if address == u64::MAX - 4));
        // Ending exactly at the top of the address space is fine.
        BlockTable::from_blocks([BlockDescriptor::new(u64::MAX - 0x10, 0x10, BlockKind::Data)])
            .unwrap();
    }

    #[test]
    fn lookup_is_exact_start() {
        let table =
            BlockTable::from_blocks([BlockDescriptor::new(0x1000, 4, BlockKind::Opcode)]).unwrap();
        assert!(table.lookup(0x1000).is_some());
        assert!(table.lookup(0x1001).is_none());
        assert_eq!(table.containing(0x1003).map(|b| b.address), Some(0x1000));
        assert!(table.containing(0x1004).is_none());
    }

    #[test]
    fn set_kind_reclassifies() {
        let mut table =
            BlockTable::from_blocks([BlockDescriptor::new(0x1000, 4, BlockKind::Opcode)]).unwrap();
        assert_eq!(table.set_kind(0x1000, BlockKind::Data), Some(BlockKind::Opcode));
        assert_eq!(table.lookup(0x1000).unwrap().kind, BlockKind::Data);
        assert_eq!(table.set_kind(0x2000, BlockKind::Data), None);
    }
}
