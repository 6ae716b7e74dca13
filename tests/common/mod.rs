//! Common test utilities and helpers.
//!
//! Shared fixtures for the integration tests: a scripted decoder provider
//! with observable counters and small block layouts.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use disasm_view::core::block::{BlockDescriptor, BlockKind, BlockTable};
use disasm_view::core::disassembler::{
    Architecture, DecodedInstruction, DecoderError, DecoderMode, DecoderProvider, DecoderResult,
    Disassembler, Endianness,
};
use disasm_view::core::memory_map::RegionMap;
use disasm_view::io::SliceSource;
use disasm_view::{Analysis, DisasmModel, ViewConfig};

/// Counters shared between a test and the provider it handed to a model.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    pub opens: Arc<AtomicU64>,
    pub decodes: Arc<AtomicU64>,
}

impl Counters {
    pub fn opens(&self) -> u64 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn decodes(&self) -> u64 {
        self.decodes.load(Ordering::SeqCst)
    }
}

/// Decoder that renders its input as `mov r0, 0x<little-endian value>`.
pub struct ScriptedDecoder {
    decodes: Arc<AtomicU64>,
}

impl Disassembler for ScriptedDecoder {
    fn decode_one(&self, _address: u64, bytes: &[u8]) -> DecoderResult<DecodedInstruction> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        if bytes.is_empty() {
            return Err(DecoderError::InsufficientBytes);
        }
        let value = bytes
            .iter()
            .take(8)
            .rev()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
        Ok(DecodedInstruction {
            text: format!("mov r0, 0x{:x}", value),
            length: bytes.len(),
        })
    }

    fn max_instruction_length(&self) -> usize {
        8
    }

    fn architecture(&self) -> Architecture {
        Architecture::Unknown
    }

    fn endianness(&self) -> Endianness {
        Endianness::Little
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    pub counters: Counters,
    pub fail: bool,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl DecoderProvider for ScriptedProvider {
    type Handle = ScriptedDecoder;

    fn open(&self, mode: DecoderMode) -> DecoderResult<ScriptedDecoder> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DecoderError::UnsupportedArchitecture(mode.architecture));
        }
        Ok(ScriptedDecoder {
            decodes: Arc::clone(&self.counters.decodes),
        })
    }
}

/// `[{0x1000, 4, Opcode}, {0x2000, 16, Data}]` with a hole in between.
pub fn example_blocks() -> BlockTable {
    BlockTable::from_blocks([
        BlockDescriptor::new(0x1000, 4, BlockKind::Opcode),
        BlockDescriptor::new(0x2000, 16, BlockKind::Data),
    ])
    .expect("valid layout")
}

/// Image bytes where file offset N holds `N as u8`, loaded flat at 0x1000.
pub fn flat_image(len: usize) -> (SliceSource, RegionMap) {
    let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
    (SliceSource::new(data), RegionMap::flat(0x1000, len as u64))
}

/// Byte-per-row model over `example_blocks()` with the scripted decoder.
pub fn example_model(config: ViewConfig) -> (DisasmModel<ScriptedProvider>, Counters) {
    let (bytes, map) = flat_image(0x1010);
    let provider = ScriptedProvider::new();
    let counters = provider.counters.clone();
    let model =
        DisasmModel::with_provider(bytes, Analysis::new(example_blocks(), map), config, provider);
    (model, counters)
}

/// One data block of `rows` bytes starting at 0x1000, for cache tests.
pub fn linear_model(rows: u64, capacity: usize) -> DisasmModel<ScriptedProvider> {
    let (bytes, map) = flat_image(rows as usize);
    let blocks =
        BlockTable::from_blocks([BlockDescriptor::new(0x1000, rows, BlockKind::Data)]).unwrap();
    let mut config = ViewConfig::default();
    config.cache.capacity = capacity;
    DisasmModel::with_provider(
        bytes,
        Analysis::new(blocks, map),
        config,
        ScriptedProvider::new(),
    )
}
