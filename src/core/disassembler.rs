//! Disassembler trait and error types for instruction decoding.
//!
//! The view engine treats the decoder as an external component: it hands it
//! raw bytes and an address and gets back display text plus the number of
//! bytes consumed. `DecoderProvider` opens handles lazily; dropping a handle
//! closes it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecoderError {
    /// Invalid instruction bytes
    #[error("InvalidInstruction")]
    InvalidInstruction,
    /// Insufficient bytes for a complete instruction
    #[error("InsufficientBytes")]
    InsufficientBytes,
    /// Architecture not handled by the selected backend
    #[error("UnsupportedArchitecture: {0}")]
    UnsupportedArchitecture(Architecture),
    /// Backend failure with message
    #[error("InternalError: {0}")]
    InternalError(String),
}

/// Result type for decoding operations
pub type DecoderResult<T> = Result<T, DecoderError>;

/// Byte order of the decoded instruction stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Little => write!(f, "Little"),
            Endianness::Big => write!(f, "Big"),
        }
    }
}

/// Architecture types supported by decoders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    /// x86 (32-bit)
    X86,
    /// x86-64 (64-bit)
    X86_64,
    /// ARM (32-bit)
    ARM,
    /// ARM64/AArch64 (64-bit)
    ARM64,
    /// MIPS (32-bit)
    MIPS,
    /// MIPS64 (64-bit)
    MIPS64,
    /// PowerPC (32-bit)
    PPC,
    /// PowerPC64 (64-bit)
    PPC64,
    /// RISC-V (32-bit)
    RISCV,
    /// RISC-V (64-bit)
    RISCV64,
    /// Unknown/unsupported architecture
    #[default]
    Unknown,
}

impl Architecture {
    /// Address size in bits for this architecture
    pub fn address_bits(&self) -> u8 {
        match self {
            Architecture::X86
            | Architecture::ARM
            | Architecture::MIPS
            | Architecture::PPC
            | Architecture::RISCV => 32,
            Architecture::X86_64
            | Architecture::ARM64
            | Architecture::MIPS64
            | Architecture::PPC64
            | Architecture::RISCV64 => 64,
            Architecture::Unknown => 64, // Default to 64-bit
        }
    }

    pub fn is_64_bit(&self) -> bool {
        self.address_bits() == 64
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X86 => write!(f, "x86"),
            Architecture::X86_64 => write!(f, "x86_64"),
            Architecture::ARM => write!(f, "arm"),
            Architecture::ARM64 => write!(f, "arm64"),
            Architecture::MIPS => write!(f, "mips"),
            Architecture::MIPS64 => write!(f, "mips64"),
            Architecture::PPC => write!(f, "ppc"),
            Architecture::PPC64 => write!(f, "ppc64"),
            Architecture::RISCV => write!(f, "riscv"),
            Architecture::RISCV64 => write!(f, "riscv64"),
            Architecture::Unknown => write!(f, "unknown"),
        }
    }
}

/// Architecture and byte order a decoder handle is bound to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecoderMode {
    pub architecture: Architecture,
    pub endianness: Endianness,
}

impl DecoderMode {
    pub fn new(architecture: Architecture, endianness: Endianness) -> Self {
        Self {
            architecture,
            endianness,
        }
    }
}

impl fmt::Display for DecoderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.architecture, self.endianness)
    }
}

/// One decoded instruction as display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction {
    /// Mnemonic and operands, with numbers rendered as `0x`-prefixed lowercase hex
    pub text: String,
    /// Bytes consumed
    pub length: usize,
}

/// Core decoder trait shared by all backends
pub trait Disassembler {
    /// Decode a single instruction located at `address`.
    fn decode_one(&self, address: u64, bytes: &[u8]) -> DecoderResult<DecodedInstruction>;

    /// Maximum instruction length for this architecture in bytes
    fn max_instruction_length(&self) -> usize;

    fn architecture(&self) -> Architecture;

    fn endianness(&self) -> Endianness;

    /// Human-readable backend name
    fn name(&self) -> &str {
        "Generic Disassembler"
    }
}

impl<D: Disassembler + ?Sized> Disassembler for Box<D> {
    fn decode_one(&self, address: u64, bytes: &[u8]) -> DecoderResult<DecodedInstruction> {
        (**self).decode_one(address, bytes)
    }
    fn max_instruction_length(&self) -> usize {
        (**self).max_instruction_length()
    }
    fn architecture(&self) -> Architecture {
        (**self).architecture()
    }
    fn endianness(&self) -> Endianness {
        (**self).endianness()
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Opens decoder handles for a mode. Closing is dropping the handle.
pub trait DecoderProvider {
    type Handle: Disassembler;

    fn open(&self, mode: DecoderMode) -> DecoderResult<Self::Handle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_error_display() {
        assert_eq!(
            DecoderError::InvalidInstruction.to_string(),
            "InvalidInstruction"
        );
        assert_eq!(
            DecoderError::UnsupportedArchitecture(Architecture::MIPS).to_string(),
            "UnsupportedArchitecture: mips"
        );
        assert_eq!(
            DecoderError::InternalError("test".to_string()).to_string(),
            "InternalError: test"
        );
    }

    #[test]
    fn test_architecture_address_bits() {
        assert_eq!(Architecture::X86.address_bits(), 32);
        assert_eq!(Architecture::X86_64.address_bits(), 64);
        assert_eq!(Architecture::ARM.address_bits(), 32);
        assert!(Architecture::ARM64.is_64_bit());
        assert_eq!(Architecture::Unknown.address_bits(), 64);
    }

    #[test]
    fn test_mode_display() {
        let mode = DecoderMode::new(Architecture::X86_64, Endianness::Little);
        assert_eq!(mode.to_string(), "x86_64/Little");
        assert_eq!(DecoderMode::default().architecture, Architecture::Unknown);
    }

    #[test]
    fn test_boxed_disassembler_delegates() {
        struct Fixed;
        impl Disassembler for Fixed {
            fn decode_one(&self, _address: u64, bytes: &[u8]) -> DecoderResult<DecodedInstruction> {
                if bytes.is_empty() {
                    return Err(DecoderError::InsufficientBytes);
                }
                Ok(DecodedInstruction {
                    text: "nop".to_string(),
                    length: 1,
                })
            }
            fn max_instruction_length(&self) -> usize {
                1
            }
            fn architecture(&self) -> Architecture {
                Architecture::Unknown
            }
            fn endianness(&self) -> Endianness {
                Endianness::Little
            }
        }

        let boxed: Box<dyn Disassembler> = Box::new(Fixed);
        assert_eq!(boxed.decode_one(0, &[0x90]).unwrap().text, "nop");
        assert_eq!(
            boxed.decode_one(0, &[]),
            Err(DecoderError::InsufficientBytes)
        );
        assert_eq!(boxed.name(), "Generic Disassembler");
    }
}
