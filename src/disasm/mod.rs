//! Decoder backends and registry.
//!
//! Always-on adapters:
//! - iced-x86 for x86/x64
//! - capstone for ARM/AArch64, MIPS, PPC, RISC-V (and x86 on request)

pub mod capstone;
pub mod iced;
pub mod registry;

pub use registry::{Backend, BackendKind, BackendProvider};
