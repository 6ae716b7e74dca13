//! Mutex-serialized access to a `DisasmModel` for multi-threaded hosts.
//!
//! The model itself is single-threaded. Hosts that query it from a UI
//! thread while an analysis worker prepares the next snapshot wrap it here;
//! every call takes the one lock, so a rebuild is never observed half done.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::analysis::Analysis;
use crate::core::disassembler::DecoderProvider;
use crate::disasm::BackendProvider;
use crate::view::model::DisasmModel;
use crate::view::record::ViewRecord;

pub struct SharedDisasmModel<P: DecoderProvider = BackendProvider> {
    inner: Arc<Mutex<DisasmModel<P>>>,
}

impl<P: DecoderProvider> Clone for SharedDisasmModel<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: DecoderProvider> SharedDisasmModel<P> {
    pub fn new(model: DisasmModel<P>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(model)),
        }
    }

    // A panic while holding the lock cannot leave the model half rebuilt
    // (the index is swapped in one assignment), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, DisasmModel<P>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` with exclusive access to the model.
    pub fn with<R>(&self, f: impl FnOnce(&mut DisasmModel<P>) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn row_count(&self) -> u64 {
        self.lock().row_count()
    }

    pub fn get_row(&self, position: u64) -> ViewRecord {
        self.lock().get_row(position)
    }

    pub fn position_to_address(&self, position: u64) -> u64 {
        self.lock().position_to_address(position)
    }

    pub fn address_to_position(&self, address: u64) -> u64 {
        self.lock().address_to_position(address)
    }

    pub fn offset_to_position(&self, offset: u64) -> u64 {
        self.lock().offset_to_position(offset)
    }

    pub fn rel_address_to_position(&self, rel_address: u64) -> u64 {
        self.lock().rel_address_to_position(rel_address)
    }

    pub fn reset_for_new_analysis(&self) {
        self.lock().reset_for_new_analysis();
    }

    /// Install a snapshot prepared elsewhere (typically on a worker thread).
    pub fn replace_analysis(&self, analysis: Analysis) {
        self.lock().replace_analysis(analysis);
    }
}
