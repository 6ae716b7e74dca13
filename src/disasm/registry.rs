use crate::core::disassembler::{
    Architecture, DecodedInstruction, DecoderError, DecoderMode, DecoderProvider, DecoderResult,
    Disassembler, Endianness,
};

pub enum Backend {
    Iced(super::iced::IcedDisassembler),
    Cap(super::capstone::CapstoneDisassembler),
}

impl Disassembler for Backend {
    fn decode_one(&self, address: u64, bytes: &[u8]) -> DecoderResult<DecodedInstruction> {
        match self {
            Backend::Iced(d) => d.decode_one(address, bytes),
            Backend::Cap(d) => d.decode_one(address, bytes),
        }
    }

    fn max_instruction_length(&self) -> usize {
        match self {
            Backend::Iced(d) => d.max_instruction_length(),
            Backend::Cap(d) => d.max_instruction_length(),
        }
    }

    fn architecture(&self) -> Architecture {
        match self {
            Backend::Iced(d) => d.architecture(),
            Backend::Cap(d) => d.architecture(),
        }
    }

    fn endianness(&self) -> Endianness {
        match self {
            Backend::Iced(d) => d.endianness(),
            Backend::Cap(d) => d.endianness(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Backend::Iced(d) => d.name(),
            Backend::Cap(d) => d.name(),
        }
    }
}

/// Select a decoder backend for the given architecture.
pub fn for_arch(arch: Architecture, endianness: Endianness) -> DecoderResult<Backend> {
    match arch {
        Architecture::X86 | Architecture::X86_64 => Ok(Backend::Iced(
            super::iced::IcedDisassembler::new(arch, endianness),
        )),
        Architecture::ARM
        | Architecture::ARM64
        | Architecture::MIPS
        | Architecture::MIPS64
        | Architecture::PPC
        | Architecture::PPC64
        | Architecture::RISCV
        | Architecture::RISCV64 => {
            super::capstone::CapstoneDisassembler::new(arch, endianness).map(Backend::Cap)
        }
        Architecture::Unknown => Err(DecoderError::UnsupportedArchitecture(arch)),
    }
}

/// Preferred backend kind for explicit selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Iced,
    Capstone,
}

/// Explicit backend selector. Returns an error if the backend cannot support the arch.
pub fn for_arch_with(
    arch: Architecture,
    endianness: Endianness,
    prefer: Option<BackendKind>,
) -> DecoderResult<Backend> {
    match prefer {
        Some(BackendKind::Iced) => match arch {
            Architecture::X86 | Architecture::X86_64 => Ok(Backend::Iced(
                super::iced::IcedDisassembler::new(arch, endianness),
            )),
            _ => Err(DecoderError::UnsupportedArchitecture(arch)),
        },
        Some(BackendKind::Capstone) => {
            super::capstone::CapstoneDisassembler::new(arch, endianness).map(Backend::Cap)
        }
        None => for_arch(arch, endianness),
    }
}

/// Default decoder provider: iced-x86 for x86, capstone for everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendProvider {
    prefer: Option<BackendKind>,
}

impl BackendProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force one backend; opening fails for architectures it cannot handle.
    pub fn preferring(kind: BackendKind) -> Self {
        Self { prefer: Some(kind) }
    }
}

impl DecoderProvider for BackendProvider {
    type Handle = Backend;

    fn open(&self, mode: DecoderMode) -> DecoderResult<Backend> {
        for_arch_with(mode.architecture, mode.endianness, self.prefer)
    }
}
