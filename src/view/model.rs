//! DisasmModel: the row-oriented surface a scroll view talks to.
//!
//! Owns the analysis snapshot, the position index built from it, the row
//! cache and the materializer. Queries never fail; rebuilding is atomic
//! (the new index is complete before it replaces the old one) and always
//! invalidates the cache.

use std::io::Write;
use tracing::{debug, info};

use crate::analysis::Analysis;
use crate::config::ViewConfig;
use crate::core::disassembler::DecoderProvider;
use crate::disasm::BackendProvider;
use crate::error::{Result, ViewError};
use crate::io::ByteSource;
use crate::view::cache::{CacheStats, RowCache};
use crate::view::materialize::{RowContext, RowMaterializer};
use crate::view::position::PositionIndex;
use crate::view::record::ViewRecord;

/// Span of rows selected in the view, expressed in addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Address of the first selected row
    pub address: u64,
    /// Bytes from `address` to the end of the last selected row
    pub size: u64,
    /// Number of selected rows
    pub count: u64,
}

const DUMP_CHUNK: usize = 64 * 1024;

pub struct DisasmModel<P: DecoderProvider = BackendProvider> {
    config: ViewConfig,
    analysis: Analysis,
    bytes: Box<dyn ByteSource + Send>,
    index: PositionIndex,
    cache: RowCache,
    materializer: RowMaterializer<P>,
}

impl DisasmModel<BackendProvider> {
    /// Model using the built-in iced-x86/capstone decoders.
    pub fn new<S>(bytes: S, analysis: Analysis, config: ViewConfig) -> Self
    where
        S: ByteSource + Send + 'static,
    {
        Self::with_provider(bytes, analysis, config, BackendProvider::new())
    }
}

impl<P: DecoderProvider> DisasmModel<P> {
    pub fn with_provider<S>(bytes: S, analysis: Analysis, config: ViewConfig, provider: P) -> Self
    where
        S: ByteSource + Send + 'static,
    {
        let index = Self::build_index(&analysis, &config);
        let materializer = RowMaterializer::new(
            provider,
            analysis.mode,
            config.show.show_labels,
            config.io.max_row_bytes,
        );
        Self {
            cache: RowCache::new(config.cache.capacity),
            config,
            analysis,
            bytes: Box::new(bytes),
            index,
            materializer,
        }
    }

    fn build_index(analysis: &Analysis, config: &ViewConfig) -> PositionIndex {
        let span = crate::span_trace!("build_index", mode = %analysis.mode);
        let _guard = span.enter();
        PositionIndex::build(
            analysis.blocks.as_ref(),
            config.layout.row_layout,
            config.layout.max_gap_rows,
        )
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    /// Edit the snapshot in place; the view sees the edits after
    /// `reset_for_new_analysis`.
    pub fn analysis_mut(&mut self) -> &mut Analysis {
        &mut self.analysis
    }

    pub fn index(&self) -> &PositionIndex {
        &self.index
    }

    /// Total number of rows.
    pub fn row_count(&self) -> u64 {
        self.index.row_count()
    }

    /// Rendered row at `position`, served from the cache when possible.
    pub fn get_row(&mut self, position: u64) -> ViewRecord {
        let ctx = RowContext {
            index: &self.index,
            blocks: self.analysis.blocks.as_ref(),
            memory: self.analysis.memory_map.as_ref(),
            bytes: self.bytes.as_ref(),
            labels: self.analysis.labels.as_ref(),
            references: self.analysis.references.as_ref(),
        };
        let materializer = &mut self.materializer;
        self.cache
            .get_or_insert_with(position, || materializer.materialize(&ctx, position))
    }

    pub fn position_to_address(&self, position: u64) -> u64 {
        self.index.position_to_address(position)
    }

    pub fn address_to_position(&self, address: u64) -> u64 {
        self.index.address_to_position(address)
    }

    /// Row showing the address loaded from file `offset`; 0 if unmapped.
    pub fn offset_to_position(&self, offset: u64) -> u64 {
        self.analysis
            .memory_map
            .offset_to_address(offset)
            .map_or(0, |address| self.address_to_position(address))
    }

    /// Row showing image-relative `rel_address`; 0 if unmapped.
    pub fn rel_address_to_position(&self, rel_address: u64) -> u64 {
        self.analysis
            .memory_map
            .rel_address_to_address(rel_address)
            .map_or(0, |address| self.address_to_position(address))
    }

    /// Row of the entry point, if the analysis recorded one.
    pub fn entry_point_position(&self) -> Option<u64> {
        self.analysis
            .entry_point
            .map(|address| self.address_to_position(address))
    }

    /// File offset backing the row at `position`.
    pub fn row_offset(&self, position: u64) -> Option<u64> {
        self.analysis
            .memory_map
            .address_to_offset(self.position_to_address(position))
    }

    /// Image-relative address of the row at `position`.
    pub fn row_rel_address(&self, position: u64) -> Option<u64> {
        self.analysis
            .memory_map
            .address_to_rel_address(self.position_to_address(position))
    }

    /// Size of the block starting at `address`, 1 for any other address.
    pub fn size_at(&self, address: u64) -> u64 {
        self.analysis.blocks.lookup(address).map_or(1, |b| b.size)
    }

    /// Size in bytes of the row at `position`.
    pub fn row_size(&self, position: u64) -> u64 {
        self.size_at(self.position_to_address(position))
    }

    /// Rebuild the index from the current analysis and drop every cached row.
    pub fn reset_for_new_analysis(&mut self) {
        let index = Self::build_index(&self.analysis, &self.config);
        self.install_index(index);
    }

    /// Swap in the result of a new analysis pass.
    pub fn replace_analysis(&mut self, analysis: Analysis) {
        let index = Self::build_index(&analysis, &self.config);
        self.analysis = analysis;
        self.install_index(index);
    }

    /// Run a fallible analysis pass; on error the model is left untouched.
    pub fn try_replace_analysis<F, E>(&mut self, analyze: F) -> std::result::Result<(), E>
    where
        F: FnOnce(&Analysis) -> std::result::Result<Analysis, E>,
    {
        let analysis = analyze(&self.analysis)?;
        self.replace_analysis(analysis);
        Ok(())
    }

    fn install_index(&mut self, index: PositionIndex) {
        self.index = index;
        self.cache.invalidate_all();
        self.materializer.decoder_mut().rebind(self.analysis.mode);
        info!(
            rows = self.index.row_count(),
            blocks = self.index.boundaries().len(),
            "View reset for new analysis"
        );
    }

    pub fn show_labels(&self) -> bool {
        self.materializer.show_labels()
    }

    /// Toggle label substitution; cached rows are rendered again.
    pub fn set_show_labels(&mut self, show: bool) {
        if show != self.materializer.show_labels() {
            self.config.show.show_labels = show;
            self.materializer.set_show_labels(show);
            self.cache.invalidate_all();
        }
    }

    /// Release the decoder handle; it reopens on the next opcode row.
    pub fn close_decoder(&mut self) {
        self.materializer.decoder_mut().close();
    }

    pub fn is_decoder_open(&self) -> bool {
        self.materializer.decoder().is_open()
    }

    pub fn decoder_open_attempts(&self) -> u64 {
        self.materializer.decoder().open_attempts()
    }

    /// Rows rendered since the model was created.
    pub fn materialized_rows(&self) -> u64 {
        self.materializer.materialized()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Selection spanning rows `first..=last` (order-insensitive).
    pub fn selection(&self, first: u64, last: u64) -> Selection {
        let (first, last) = if first <= last {
            (first, last)
        } else {
            (last, first)
        };
        let address = self.position_to_address(first);
        let last_address = self.position_to_address(last);
        let end = last_address.saturating_add(self.size_at(last_address));
        Selection {
            address,
            size: end.saturating_sub(address),
            count: last - first + 1,
        }
    }

    /// True if the selection maps to one contiguous run of file bytes.
    pub fn is_dumpable(&self, selection: &Selection) -> bool {
        selection.size > 0
            && self
                .analysis
                .memory_map
                .is_solid_address_range(selection.address, selection.size)
    }

    /// Copy the file bytes under `selection` into `out`, returning the byte count.
    pub fn dump_selection<W: Write>(&self, selection: &Selection, out: &mut W) -> Result<u64> {
        if selection.size == 0 {
            return Err(crate::log_error!(ViewError::EmptySelection, "dump_selection"));
        }
        let not_solid = || ViewError::NotSolid {
            address: selection.address,
            size: selection.size,
        };
        if !self.is_dumpable(selection) {
            return Err(crate::log_error!(not_solid(), "dump_selection"));
        }
        let mut offset = self
            .analysis
            .memory_map
            .address_to_offset(selection.address)
            .ok_or_else(not_solid)?;
        let mut remaining = selection.size;
        while remaining > 0 {
            let len = usize::try_from(remaining).unwrap_or(usize::MAX).min(DUMP_CHUNK);
            let chunk = self.bytes.read(offset, len)?;
            if chunk.is_empty() {
                return Err(not_solid());
            }
            out.write_all(&chunk)?;
            offset += chunk.len() as u64;
            remaining -= chunk.len() as u64;
        }
        debug!(
            address = selection.address,
            size = selection.size,
            "Selection dumped"
        );
        Ok(selection.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::{BlockDescriptor, BlockKind, BlockTable};
    use crate::core::memory_map::RegionMap;
    use crate::io::SliceSource;

    fn model() -> DisasmModel {
        let blocks = BlockTable::from_blocks([
            BlockDescriptor::new(0x1000, 4, BlockKind::Data),
            BlockDescriptor::new(0x1010, 8, BlockKind::Data),
        ])
        .unwrap();
        let analysis = Analysis::new(blocks, RegionMap::flat(0x1000, 0x20)).with_entry_point(0x1010);
        DisasmModel::new(
            SliceSource::new((0u8..0x20).collect::<Vec<_>>()),
            analysis,
            ViewConfig::default(),
        )
    }

    #[test]
    fn conversions_delegate_to_memory_map() {
        let m = model();
        assert_eq!(m.row_count(), 0x18);
        assert_eq!(m.offset_to_position(0x10), 0x10);
        assert_eq!(m.offset_to_position(0x100), 0);
        assert_eq!(m.rel_address_to_position(0x12), 0x12);
        assert_eq!(m.rel_address_to_position(0x100), 0);
        assert_eq!(m.entry_point_position(), Some(0x10));
        assert_eq!(m.row_offset(0x11), Some(0x11));
        assert_eq!(m.row_rel_address(0x11), Some(0x11));
    }

    #[test]
    fn row_sizes() {
        let m = model();
        assert_eq!(m.row_size(0), 4);
        assert_eq!(m.row_size(1), 1);
        assert_eq!(m.size_at(0x1010), 8);
    }

    #[test]
    fn selection_spans_last_row_size() {
        let m = model();
        let sel = m.selection(0x10, 0);
        assert_eq!(sel.address, 0x1000);
        assert_eq!(sel.size, 0x18);
        assert_eq!(sel.count, 0x11);
        assert!(m.is_dumpable(&sel));
        let mut out = Vec::new();
        assert_eq!(m.dump_selection(&sel, &mut out).unwrap(), 0x18);
        assert_eq!(out, (0u8..0x18).collect::<Vec<_>>());
    }

    #[test]
    fn data_rows_have_no_opcode() {
        let mut m = model();
        let row = m.get_row(0);
        assert_eq!(row.bytes_hex, "00010203");
        assert!(row.opcode_text.is_empty());
        assert!(!m.is_decoder_open());
    }
}
