use crate::core::disassembler::{
    Architecture, DecodedInstruction, DecoderError, DecoderResult, Disassembler, Endianness,
};
use iced_x86::{Decoder, DecoderOptions, Formatter, IntelFormatter};

pub struct IcedDisassembler {
    bits: u32,
    arch: Architecture,
    endianness: Endianness,
}

impl IcedDisassembler {
    pub fn new(arch: Architecture, endianness: Endianness) -> Self {
        let bits = match arch {
            Architecture::X86 => 32,
            Architecture::X86_64 => 64,
            _ => 64,
        };
        Self {
            bits,
            arch,
            endianness,
        }
    }

    // Numbers must render as `0x1234` so referenced-address tokens can be
    // matched textually for label substitution.
    fn formatter() -> IntelFormatter {
        let mut fmt = IntelFormatter::new();
        let opts = fmt.options_mut();
        opts.set_hex_prefix("0x");
        opts.set_hex_suffix("");
        opts.set_uppercase_hex(false);
        opts.set_leading_zeros(false);
        opts.set_branch_leading_zeros(false);
        opts.set_space_after_operand_separator(true);
        fmt
    }
}

impl Disassembler for IcedDisassembler {
    fn decode_one(&self, address: u64, bytes: &[u8]) -> DecoderResult<DecodedInstruction> {
        if !matches!(self.arch, Architecture::X86 | Architecture::X86_64) {
            return Err(DecoderError::UnsupportedArchitecture(self.arch));
        }
        if bytes.is_empty() {
            return Err(DecoderError::InsufficientBytes);
        }
        let mut decoder = Decoder::with_ip(self.bits, bytes, address, DecoderOptions::NONE);
        let instr = decoder.decode();
        if instr.is_invalid() {
            return Err(DecoderError::InvalidInstruction);
        }
        let mut text = String::new();
        Self::formatter().format(&instr, &mut text);
        Ok(DecodedInstruction {
            text,
            length: instr.len(),
        })
    }

    fn max_instruction_length(&self) -> usize {
        15
    }

    fn architecture(&self) -> Architecture {
        self.arch
    }

    fn endianness(&self) -> Endianness {
        self.endianness
    }

    fn name(&self) -> &str {
        "iced-x86"
    }
}
