use crate::core::disassembler::{
    Architecture, DecodedInstruction, DecoderError, DecoderResult, Disassembler, Endianness,
};
use capstone::{Arch, Capstone, Endian, Mode, NO_EXTRA_MODE};

/// Capstone-backed decoder.
///
/// `capstone::Capstone` wraps a raw handle and is not `Send`, so only the
/// handle parameters are stored and a handle is built per decode. This keeps
/// the decoder movable between threads along with the model that owns it.
pub struct CapstoneDisassembler {
    arch: Architecture,
    endianness: Endianness,
    cs_arch: Arch,
    cs_mode: Mode,
    cs_endian: Option<Endian>,
}

fn cs_endian(end: Endianness) -> Option<Endian> {
    Some(match end {
        Endianness::Big => Endian::Big,
        Endianness::Little => Endian::Little,
    })
}

fn cs_arch_mode(arch: Architecture, end: Endianness) -> Option<(Arch, Mode, Option<Endian>)> {
    match arch {
        Architecture::ARM => Some((Arch::ARM, Mode::Arm, cs_endian(end))),
        Architecture::ARM64 => Some((Arch::ARM64, Mode::Arm, cs_endian(end))),
        Architecture::MIPS => Some((Arch::MIPS, Mode::Mips32, cs_endian(end))),
        Architecture::MIPS64 => Some((Arch::MIPS, Mode::Mips64, cs_endian(end))),
        Architecture::PPC => Some((Arch::PPC, Mode::Mode32, cs_endian(end))),
        Architecture::PPC64 => Some((Arch::PPC, Mode::Mode64, cs_endian(end))),
        Architecture::RISCV => Some((Arch::RISCV, Mode::RiscV32, None)),
        Architecture::RISCV64 => Some((Arch::RISCV, Mode::RiscV64, None)),
        Architecture::X86 => Some((Arch::X86, Mode::Mode32, None)),
        Architecture::X86_64 => Some((Arch::X86, Mode::Mode64, None)),
        Architecture::Unknown => None,
    }
}

impl CapstoneDisassembler {
    pub fn new(arch: Architecture, endianness: Endianness) -> DecoderResult<Self> {
        let (cs_arch, cs_mode, cs_endian) =
            cs_arch_mode(arch, endianness).ok_or(DecoderError::UnsupportedArchitecture(arch))?;
        let disassembler = Self {
            arch,
            endianness,
            cs_arch,
            cs_mode,
            cs_endian,
        };
        // Surface an unusable arch/mode combination at open time.
        disassembler.handle()?;
        Ok(disassembler)
    }

    fn handle(&self) -> DecoderResult<Capstone> {
        Capstone::new_raw(self.cs_arch, self.cs_mode, NO_EXTRA_MODE, self.cs_endian)
            .map_err(|e| DecoderError::InternalError(e.to_string()))
    }
}

impl Disassembler for CapstoneDisassembler {
    fn decode_one(&self, address: u64, bytes: &[u8]) -> DecoderResult<DecodedInstruction> {
        if bytes.is_empty() {
            return Err(DecoderError::InsufficientBytes);
        }
        let cs = self.handle()?;
        let insns = cs
            .disasm_count(bytes, address, 1)
            .map_err(|_| DecoderError::InvalidInstruction)?;
        let insn = insns.iter().next().ok_or(DecoderError::InvalidInstruction)?;
        let mnemonic = insn.mnemonic().unwrap_or("");
        let text = match insn.op_str() {
            Some(ops) if !ops.is_empty() => format!("{} {}", mnemonic, ops),
            _ => mnemonic.to_string(),
        };
        Ok(DecodedInstruction {
            text,
            length: insn.bytes().len(),
        })
    }

    fn max_instruction_length(&self) -> usize {
        match self.arch {
            Architecture::X86 | Architecture::X86_64 => 15,
            _ => 8,
        }
    }
    fn architecture(&self) -> Architecture {
        self.arch
    }
    fn endianness(&self) -> Endianness {
        self.endianness
    }
    fn name(&self) -> &str {
        "capstone"
    }
}
