//! Position ↔ address translation over a sparse block layout.
//!
//! Rows are dense (`0..row_count`) while addresses are sparse. The index
//! keeps one boundary record per block, so memory is O(blocks) no matter how
//! large the image or its holes are. Everything between boundaries is
//! computed by linear interpolation:
//!
//! ```text
//!  rows:   | A A A A | g g g ... g | B B B ... B |  tail ...
//!  addr:   0x1000    0x1004       0x2000        0x2010
//! ```
//!
//! Holes between blocks get one synthesized row per byte (optionally capped
//! by `max_gap_rows`, in which case the hole shows the addresses closest to
//! the following block).

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::block::{BlockDescriptor, BlockIndex, BlockKind};

/// How many rows a block contributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowLayout {
    /// One row per byte of every block.
    #[default]
    ByteRows,
    /// One row per block; holes still get one row per byte.
    BlockRows,
}

/// Start of one block in both coordinate spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub position: u64,
    pub address: u64,
    pub size: u64,
    /// Rows occupied by the block: `size` or 1.
    pub rows: u64,
    pub kind: BlockKind,
}

impl Boundary {
    /// One past the last row of the block.
    pub fn end_position(&self) -> u64 {
        self.position.saturating_add(self.rows)
    }

    pub fn end_address(&self) -> u64 {
        self.address.saturating_add(self.size)
    }

    fn address_of_row(&self, position: u64) -> u64 {
        if self.rows == self.size {
            self.address + (position - self.position)
        } else {
            self.address
        }
    }

    fn row_of_address(&self, address: u64) -> u64 {
        if self.rows == self.size {
            self.position + (address - self.address)
        } else {
            self.position
        }
    }
}

/// Bidirectional position/address index for one analysis pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionIndex {
    boundaries: Vec<Boundary>,
    row_count: u64,
}

impl PositionIndex {
    /// Build the index from blocks in ascending address order.
    ///
    /// Zero-sized blocks, blocks whose end overflows the address space and
    /// blocks overlapping their predecessor are skipped.
    pub fn build(blocks: &dyn BlockIndex, layout: RowLayout, max_gap_rows: Option<u64>) -> Self {
        let mut boundaries: Vec<Boundary> = Vec::with_capacity(blocks.len());
        let mut position = 0u64;
        let mut prev_end: Option<u64> = None;

        for block in blocks.iter() {
            if block.size == 0 {
                continue;
            }
            if block.address.checked_add(block.size).is_none() {
                warn!(
                    address = block.address,
                    size = block.size,
                    "Skipping block running past the end of the address space"
                );
                continue;
            }
            if let Some(end) = prev_end {
                if block.address < end {
                    warn!(
                        address = block.address,
                        previous_end = end,
                        "Skipping block overlapping its predecessor"
                    );
                    continue;
                }
                let hole = block.address - end;
                position = position.saturating_add(match max_gap_rows {
                    Some(cap) => hole.min(cap),
                    None => hole,
                });
            }
            let rows = Self::rows_for(&block, layout);
            boundaries.push(Boundary {
                position,
                address: block.address,
                size: block.size,
                rows,
                kind: block.kind,
            });
            position = position.saturating_add(rows);
            prev_end = Some(block.end());
        }

        info!(
            blocks = boundaries.len(),
            rows = position,
            ?layout,
            "Position index built"
        );

        Self {
            boundaries,
            row_count: position,
        }
    }

    fn rows_for(block: &BlockDescriptor, layout: RowLayout) -> u64 {
        match layout {
            RowLayout::ByteRows => block.size,
            RowLayout::BlockRows => 1,
        }
    }

    /// Total number of addressable rows.
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    /// Boundary of the block whose row run contains `position`.
    pub fn block_at_position(&self, position: u64) -> Option<&Boundary> {
        let idx = self.boundaries.partition_point(|b| b.position <= position);
        idx.checked_sub(1)
            .map(|i| &self.boundaries[i])
            .filter(|b| position < b.end_position())
    }

    /// Boundary of the block whose span contains `address`.
    pub fn block_at_address(&self, address: u64) -> Option<&Boundary> {
        let idx = self.boundaries.partition_point(|b| b.address <= address);
        idx.checked_sub(1)
            .map(|i| &self.boundaries[i])
            .filter(|b| address < b.end_address())
    }

    /// Address shown at `position`. Total: positions outside `0..row_count`
    /// extrapolate past the last block; an empty index answers 0.
    pub fn position_to_address(&self, position: u64) -> u64 {
        let Some(last) = self.boundaries.last() else {
            return 0;
        };

        let idx = self.boundaries.partition_point(|b| b.position <= position);
        if let Some(block) = idx.checked_sub(1).map(|i| &self.boundaries[i]) {
            if position < block.end_position() {
                return block.address_of_row(position);
            }
        }

        match self.boundaries.get(idx) {
            // In the hole before the next block: count back from its start.
            Some(next) => next
                .address
                .saturating_sub(next.position - position),
            // Past the last block. The last known position is the final row of
            // the block; the row right after it shows the block end address.
            None => {
                let last_known = last.end_position() - 1;
                let delta = position - last_known;
                last.end_address().saturating_add(delta.saturating_sub(1))
            }
        }
    }

    /// Row showing `address`. Total and clamped at 0; an empty index answers 0.
    pub fn address_to_position(&self, address: u64) -> u64 {
        let Some(last) = self.boundaries.last() else {
            return 0;
        };

        let idx = self.boundaries.partition_point(|b| b.address <= address);
        let prev = idx.checked_sub(1).map(|i| &self.boundaries[i]);
        if let Some(block) = prev {
            if address < block.end_address() {
                return block.row_of_address(address);
            }
        }

        match self.boundaries.get(idx) {
            // In a hole (or before the first block): count back from the next block,
            // never landing on rows that belong to the previous one.
            Some(next) => {
                let pos = next.position.saturating_sub(next.address - address);
                match prev {
                    Some(p) => pos.max(p.end_position()),
                    None => pos,
                }
            }
            None => last
                .end_position()
                .saturating_add(address - last.end_address()),
        }
    }

    /// Size of the block starting exactly at `address`, 1 otherwise.
    pub fn size_at(&self, address: u64) -> u64 {
        let idx = self.boundaries.partition_point(|b| b.address < address);
        match self.boundaries.get(idx) {
            Some(b) if b.address == address => b.size,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::BlockTable;

    fn sample() -> PositionIndex {
        let table = BlockTable::from_blocks([
            BlockDescriptor::new(0x1000, 4, BlockKind::Opcode),
            BlockDescriptor::new(0x2000, 16, BlockKind::Data),
        ])
        .unwrap();
        PositionIndex::build(&table, RowLayout::ByteRows, None)
    }

    #[test]
    fn empty_index_answers_zero() {
        let idx = PositionIndex::build(&BlockTable::new(), RowLayout::ByteRows, None);
        assert_eq!(idx.row_count(), 0);
        assert_eq!(idx.position_to_address(10), 0);
        assert_eq!(idx.address_to_position(0x1000), 0);
        assert!(idx.is_empty());
    }

    #[test]
    fn row_count_covers_holes() {
        let idx = sample();
        assert_eq!(idx.row_count(), 4 + 0xffc + 16);
        assert_eq!(idx.boundaries()[1].position, 0x1000);
    }

    #[test]
    fn forward_translation() {
        let idx = sample();
        assert_eq!(idx.position_to_address(0), 0x1000);
        assert_eq!(idx.position_to_address(3), 0x1003);
        assert_eq!(idx.position_to_address(4), 0x1004);
        assert_eq!(idx.position_to_address(0xfff), 0x1fff);
        assert_eq!(idx.position_to_address(0x1000), 0x2000);
        assert_eq!(idx.position_to_address(0x100f), 0x200f);
    }

    #[test]
    fn tail_extrapolation() {
        let idx = sample();
        // Row right after the last block shows its end address.
        assert_eq!(idx.position_to_address(0x1010), 0x2010);
        assert_eq!(idx.position_to_address(0x1015), 0x2015);
        assert_eq!(idx.address_to_position(0x2010), 0x1010);
        assert_eq!(idx.address_to_position(0x2015), 0x1015);
    }

    #[test]
    fn backward_translation() {
        let idx = sample();
        assert_eq!(idx.address_to_position(0x1000), 0);
        assert_eq!(idx.address_to_position(0x1002), 2);
        assert_eq!(idx.address_to_position(0x1800), 0x800);
        assert_eq!(idx.address_to_position(0x2000), 0x1000);
        // Below the first block clamps to 0.
        assert_eq!(idx.address_to_position(0x10), 0);
    }

    #[test]
    fn block_rows_layout() {
        let table = BlockTable::from_blocks([
            BlockDescriptor::new(0x1000, 4, BlockKind::Opcode),
            BlockDescriptor::new(0x1004, 2, BlockKind::Opcode),
            BlockDescriptor::new(0x1008, 8, BlockKind::Data),
        ])
        .unwrap();
        let idx = PositionIndex::build(&table, RowLayout::BlockRows, None);
        // 1 + 1 + 2 (hole) + 1
        assert_eq!(idx.row_count(), 5);
        assert_eq!(idx.position_to_address(0), 0x1000);
        assert_eq!(idx.position_to_address(1), 0x1004);
        assert_eq!(idx.position_to_address(2), 0x1006);
        assert_eq!(idx.position_to_address(3), 0x1007);
        assert_eq!(idx.position_to_address(4), 0x1008);
        // Mid-instruction addresses land on the instruction row.
        assert_eq!(idx.address_to_position(0x1003), 0);
        assert_eq!(idx.address_to_position(0x100c), 4);
        // Tail: end + (delta - 1).
        assert_eq!(idx.position_to_address(5), 0x1010);
        assert_eq!(idx.position_to_address(7), 0x1012);
        assert_eq!(idx.address_to_position(0x1010), 5);
    }

    #[test]
    fn capped_holes_stay_monotonic() {
        let table = BlockTable::from_blocks([
            BlockDescriptor::new(0x1000, 4, BlockKind::Opcode),
            BlockDescriptor::new(0x10_0000, 4, BlockKind::Opcode),
        ])
        .unwrap();
        let idx = PositionIndex::build(&table, RowLayout::ByteRows, Some(16));
        assert_eq!(idx.row_count(), 4 + 16 + 4);
        // Hole rows show the addresses closest to the next block.
        assert_eq!(idx.position_to_address(4), 0x10_0000 - 16);
        assert_eq!(idx.position_to_address(19), 0x0f_ffff);
        // Unrepresented part of the hole maps to the first hole row.
        assert_eq!(idx.address_to_position(0x1004), 4);
        assert_eq!(idx.address_to_position(0x8_0000), 4);
        assert_eq!(idx.address_to_position(0x0f_fff0), 4);
        assert_eq!(idx.address_to_position(0x0f_ffff), 19);
    }

    /// Block index that hands out whatever it was given, unvalidated.
    struct RawBlocks(Vec<BlockDescriptor>);

    impl BlockIndex for RawBlocks {
        fn lookup(&self, address: u64) -> Option<BlockDescriptor> {
            self.0.iter().copied().find(|b| b.address == address)
        }

        fn iter(&self) -> Box<dyn Iterator<Item = BlockDescriptor> + '_> {
            Box::new(self.0.iter().copied())
        }
    }

    #[test]
    fn overflowing_block_is_skipped() {
        let raw = RawBlocks(vec![
            BlockDescriptor::new(0x1000, 4, BlockKind::Data),
            BlockDescriptor::new(u64::MAX - 4, 0x10, BlockKind::Data),
        ]);
        let idx = PositionIndex::build(&raw, RowLayout::ByteRows, None);
        assert_eq!(idx.boundaries().len(), 1);
        assert_eq!(idx.row_count(), 4);
        for pos in [0, 3, 4, 6, 0x100] {
            assert_eq!(idx.address_to_position(idx.position_to_address(pos)), pos);
        }
        assert_eq!(idx.position_to_address(6), 0x1006);
        assert_eq!(idx.position_to_address(u64::MAX), u64::MAX);
    }

    #[test]
    fn size_at_block_starts_only() {
        let idx = sample();
        assert_eq!(idx.size_at(0x1000), 4);
        assert_eq!(idx.size_at(0x2000), 16);
        assert_eq!(idx.size_at(0x1001), 1);
        assert_eq!(idx.size_at(0x3000), 1);
    }

    #[test]
    fn block_lookups() {
        let idx = sample();
        assert_eq!(idx.block_at_position(0x1005).map(|b| b.address), Some(0x2000));
        assert!(idx.block_at_position(0x10).is_none());
        assert_eq!(idx.block_at_address(0x1003).map(|b| b.kind), Some(BlockKind::Opcode));
        assert!(idx.block_at_address(0x1004).is_none());
    }
}
