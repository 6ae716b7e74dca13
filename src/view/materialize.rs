//! Row materialization: position → address → bytes → decoded, labelled row.
//!
//! Nothing in here fails. Missing offsets render a placeholder, unreadable
//! bytes render empty, an unavailable decoder leaves the opcode column empty.

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::core::block::{BlockIndex, BlockKind};
use crate::core::disassembler::{DecoderError, DecoderMode, DecoderProvider, Disassembler};
use crate::core::labels::{LabelTable, ReverseReferenceIndex};
use crate::core::memory_map::MemoryMap;
use crate::io::ByteSource;
use crate::view::position::PositionIndex;
use crate::view::record::{address_token, unbacked_placeholder, value_to_hex, ViewRecord};

/// Borrowed collaborators needed to render one row.
pub struct RowContext<'a> {
    pub index: &'a PositionIndex,
    pub blocks: &'a dyn BlockIndex,
    pub memory: &'a dyn MemoryMap,
    pub bytes: &'a dyn ByteSource,
    pub labels: &'a dyn LabelTable,
    pub references: &'a dyn ReverseReferenceIndex,
}

enum DecoderState<H> {
    Closed,
    Open(H),
    /// Open failed for the current mode; cleared by `reset` or `rebind`.
    Unavailable(DecoderError),
}

/// Lazily opened decoder handle bound to one mode.
pub struct DecoderSlot<P: DecoderProvider> {
    provider: P,
    mode: DecoderMode,
    state: DecoderState<P::Handle>,
    open_attempts: u64,
}

impl<P: DecoderProvider> DecoderSlot<P> {
    pub fn new(provider: P, mode: DecoderMode) -> Self {
        Self {
            provider,
            mode,
            state: DecoderState::Closed,
            open_attempts: 0,
        }
    }

    pub fn mode(&self) -> DecoderMode {
        self.mode
    }

    /// Open handle, opening it on first use.
    pub fn get(&mut self) -> Option<&P::Handle> {
        if matches!(self.state, DecoderState::Closed) {
            self.open_attempts += 1;
            self.state = match self.provider.open(self.mode) {
                Ok(handle) => {
                    debug!(mode = %self.mode, "Decoder opened");
                    DecoderState::Open(handle)
                }
                Err(e) => {
                    warn!(mode = %self.mode, error = %e, "Decoder unavailable; opcode column left empty");
                    DecoderState::Unavailable(e)
                }
            };
        }
        match &self.state {
            DecoderState::Open(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, DecoderState::Open(_))
    }

    /// Error from the last failed open, if the slot is in the failed state.
    pub fn last_error(&self) -> Option<&DecoderError> {
        match &self.state {
            DecoderState::Unavailable(e) => Some(e),
            _ => None,
        }
    }

    pub fn open_attempts(&self) -> u64 {
        self.open_attempts
    }

    /// Release the handle. No-op when nothing is open.
    pub fn close(&mut self) {
        if self.is_open() {
            debug!(mode = %self.mode, "Decoder closed");
        }
        self.state = DecoderState::Closed;
    }

    /// Forget a failed open so the next opcode row tries again.
    pub fn reset(&mut self) {
        if matches!(self.state, DecoderState::Unavailable(_)) {
            self.state = DecoderState::Closed;
        }
    }

    /// Bind to a new mode, closing the current handle if the mode changes.
    pub fn rebind(&mut self, mode: DecoderMode) {
        if mode != self.mode {
            self.close();
            self.mode = mode;
        } else {
            self.reset();
        }
    }
}

/// Renders rows and owns the decoder handle.
pub struct RowMaterializer<P: DecoderProvider> {
    decoder: DecoderSlot<P>,
    show_labels: bool,
    max_row_bytes: usize,
    materialized: u64,
}

impl<P: DecoderProvider> RowMaterializer<P> {
    pub fn new(provider: P, mode: DecoderMode, show_labels: bool, max_row_bytes: usize) -> Self {
        Self {
            decoder: DecoderSlot::new(provider, mode),
            show_labels,
            max_row_bytes,
            materialized: 0,
        }
    }

    pub fn decoder(&self) -> &DecoderSlot<P> {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut DecoderSlot<P> {
        &mut self.decoder
    }

    pub fn show_labels(&self) -> bool {
        self.show_labels
    }

    pub fn set_show_labels(&mut self, show: bool) {
        self.show_labels = show;
    }

    /// Number of rows rendered so far.
    pub fn materialized(&self) -> u64 {
        self.materialized
    }

    pub fn materialize(&mut self, ctx: &RowContext<'_>, position: u64) -> ViewRecord {
        self.materialized += 1;

        let address = ctx.index.position_to_address(position);
        let offset = ctx.memory.address_to_offset(address);
        let block = ctx.blocks.lookup(address);
        let size = block.map_or(1, |b| b.size);

        trace!(position, address, ?offset, size, "Materializing row");

        let mut record = ViewRecord {
            address_text: value_to_hex(address),
            ..Default::default()
        };

        let mut data = Bytes::new();
        match offset {
            Some(off) => {
                record.offset_text = value_to_hex(off);
                let len = usize::try_from(size)
                    .unwrap_or(usize::MAX)
                    .min(self.max_row_bytes);
                match ctx.bytes.read(off, len) {
                    Ok(bytes) => {
                        record.bytes_hex = hex::encode(&bytes);
                        data = bytes;
                    }
                    Err(e) => trace!(offset = off, error = %e, "Row bytes unreadable"),
                }
            }
            None => record.bytes_hex = unbacked_placeholder(size),
        }

        if block.map(|b| b.kind) == Some(BlockKind::Opcode) {
            record.opcode_text = self.opcode_text(ctx, address, &data);
        }

        record.label_text = ctx.labels.label(address).unwrap_or_default().to_string();
        record
    }

    fn opcode_text(&mut self, ctx: &RowContext<'_>, address: u64, data: &[u8]) -> String {
        let Some(decoder) = self.decoder.get() else {
            return String::new();
        };
        let mut text = match decoder.decode_one(address, data) {
            Ok(ins) => ins.text,
            Err(e) => {
                trace!(address, error = %e, "Undecodable opcode row");
                return String::new();
            }
        };
        if self.show_labels {
            // Plain textual replacement: a matching numeral elsewhere in the
            // operand text is replaced too.
            for &target in ctx.references.references_from(address) {
                if let Some(label) = ctx.labels.label(target) {
                    text = text.replace(&address_token(target), label);
                }
            }
        }
        text
    }
}
