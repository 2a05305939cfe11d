//! Physical memory, the address map, and the virtual access primitive.

/// Virtual and physical access primitive used by fetch and the engine.
pub mod access;
/// Physical address map.
pub mod map;

pub use map::{
    decode_physical, PhysicalRegion, IO_PAGE_BASE, IO_PAGE_END, MAX_RAM_BYTES,
    PHYSICAL_ADDRESS_MASK, PSW_ADDR,
};

/// Operand width of a memory cycle or ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Width {
    /// 8-bit operation.
    Byte,
    /// 16-bit operation.
    #[default]
    Word,
}

impl Width {
    /// Returns the value mask (`0o377` or `0o177777`).
    #[must_use]
    pub const fn mask(self) -> u16 {
        match self {
            Self::Byte => 0o377,
            Self::Word => 0o177777,
        }
    }

    /// Returns the sign bit.
    #[must_use]
    pub const fn sign_bit(self) -> u16 {
        match self {
            Self::Byte => 0o200,
            Self::Word => 0o100000,
        }
    }

    /// Returns the width in bytes.
    #[must_use]
    pub const fn bytes(self) -> u16 {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
        }
    }
}

/// RAM backing store, little-endian.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PhysicalMemory {
    bytes: Box<[u8]>,
}

impl PhysicalMemory {
    /// Allocates `size` bytes of zeroed RAM.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size].into_boxed_slice(),
        }
    }

    /// Returns the RAM size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for a zero-sized RAM.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Reads the little-endian word at even byte `offset`.
    #[must_use]
    pub fn read_word(&self, offset: usize) -> Option<u16> {
        let lo = *self.bytes.get(offset)?;
        let hi = *self.bytes.get(offset + 1)?;
        Some(u16::from_le_bytes([lo, hi]))
    }

    /// Reads the byte at `offset`.
    #[must_use]
    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(offset).copied()
    }

    /// Writes a little-endian word at even byte `offset`. Returns `false`
    /// when the word lies outside RAM.
    pub fn write_word(&mut self, offset: usize, value: u16) -> bool {
        match self.bytes.get_mut(offset..offset + 2) {
            Some(slot) => {
                slot.copy_from_slice(&value.to_le_bytes());
                true
            }
            None => false,
        }
    }

    /// Writes one byte at `offset`. Returns `false` outside RAM.
    pub fn write_byte(&mut self, offset: usize, value: u8) -> bool {
        match self.bytes.get_mut(offset) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
