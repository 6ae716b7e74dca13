#![no_main]
use disasm_view::core::block::{BlockDescriptor, BlockKind, BlockTable};
use disasm_view::view::position::{PositionIndex, RowLayout};
use libfuzzer_sys::fuzz_target;

// Each 5-byte chunk is one block: u16 hole before it, u16 size, kind.
fuzz_target!(|data: &[u8]| {
    let Some((&flags, data)) = data.split_first() else {
        return;
    };
    let layout = if flags & 1 == 0 {
        RowLayout::ByteRows
    } else {
        RowLayout::BlockRows
    };
    let cap = (flags & 2 != 0).then_some(u64::from(flags >> 2).max(1));

    let mut table = BlockTable::new();
    let mut address = 0x1000u64;
    for chunk in data.chunks_exact(5) {
        let hole = u64::from(u16::from_le_bytes([chunk[0], chunk[1]]));
        let size = u64::from(u16::from_le_bytes([chunk[2], chunk[3]])).max(1);
        let kind = match chunk[4] % 3 {
            0 => BlockKind::Opcode,
            1 => BlockKind::Data,
            _ => BlockKind::Gap,
        };
        address += hole;
        let _ = table.insert(BlockDescriptor::new(address, size, kind));
        address += size;
    }

    let idx = PositionIndex::build(&table, layout, cap);
    for b in idx.boundaries() {
        for k in [0, b.rows / 2, b.rows - 1] {
            let pos = b.position + k;
            assert_eq!(idx.address_to_position(idx.position_to_address(pos)), pos);
        }
    }

    let mut prev = 0u64;
    let step = (idx.row_count() / 256).max(1);
    let mut pos = 0u64;
    while pos < idx.row_count() + 4 {
        let addr = idx.position_to_address(pos);
        assert!(addr >= prev);
        prev = addr;
        pos += step;
    }
});
