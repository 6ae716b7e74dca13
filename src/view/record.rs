//! Rendered rows and their columns.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Display columns of the disassembly view, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Address,
    Offset,
    Label,
    Bytes,
    Opcode,
}

impl Column {
    pub const ALL: [Column; 5] = [
        Column::Address,
        Column::Offset,
        Column::Label,
        Column::Bytes,
        Column::Opcode,
    ];

    /// Header title.
    pub fn title(&self) -> &'static str {
        match self {
            Column::Address => "Address",
            Column::Offset => "Offset",
            Column::Label => "Label",
            Column::Bytes => "Bytes",
            Column::Opcode => "Opcode",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// One fully rendered row. Immutable once produced, safe to cache by position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRecord {
    pub address_text: String,
    /// Empty when the address has no file backing
    pub offset_text: String,
    pub label_text: String,
    /// Hex bytes, or a `byte 0x<n> dup(?)` placeholder for unbacked rows
    pub bytes_hex: String,
    /// Decoded instruction; empty for data, gaps and undecodable bytes
    pub opcode_text: String,
}

impl ViewRecord {
    pub fn column(&self, column: Column) -> &str {
        match column {
            Column::Address => &self.address_text,
            Column::Offset => &self.offset_text,
            Column::Label => &self.label_text,
            Column::Bytes => &self.bytes_hex,
            Column::Opcode => &self.opcode_text,
        }
    }
}

/// Fixed-width lowercase hex: 8 digits for values that fit in 32 bits, 16 otherwise.
pub fn value_to_hex(value: u64) -> String {
    if value > u64::from(u32::MAX) {
        format!("{:016x}", value)
    } else {
        format!("{:08x}", value)
    }
}

/// Placeholder rendered instead of bytes for rows without file backing.
pub fn unbacked_placeholder(size: u64) -> String {
    format!("byte 0x{:x} dup(?)", size)
}

/// Token a decoder prints for `address`, as matched by label substitution.
pub fn address_token(address: u64) -> String {
    format!("0x{:x}", address)
}
