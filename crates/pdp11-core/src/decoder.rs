//! Instruction field extraction and extension-word accounting.

use crate::encoding::{Opcode, Shape};
use crate::memory::Width;
use crate::state::Reg;

/// Maximum number of extension words following an instruction word.
pub const MAX_EXTENSION_WORDS: usize = 2;

/// The eight addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum AddressingMode {
    /// `Rn`
    Register = 0,
    /// `(Rn)`
    RegisterDeferred = 1,
    /// `(Rn)+`
    Autoincrement = 2,
    /// `@(Rn)+`
    AutoincrementDeferred = 3,
    /// `-(Rn)`
    Autodecrement = 4,
    /// `@-(Rn)`
    AutodecrementDeferred = 5,
    /// `X(Rn)`
    Index = 6,
    /// `@X(Rn)`
    IndexDeferred = 7,
}

impl AddressingMode {
    /// Decodes a 3-bit mode field.
    #[must_use]
    pub const fn from_u3(bits: u16) -> Self {
        match bits & 0o7 {
            0 => Self::Register,
            1 => Self::RegisterDeferred,
            2 => Self::Autoincrement,
            3 => Self::AutoincrementDeferred,
            4 => Self::Autodecrement,
            5 => Self::AutodecrementDeferred,
            6 => Self::Index,
            _ => Self::IndexDeferred,
        }
    }

    /// Returns `true` for the odd-numbered deferred modes.
    #[must_use]
    pub const fn is_deferred(self) -> bool {
        (self as u8) & 1 != 0
    }
}

/// A six-bit operand specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Operand {
    /// Addressing mode.
    pub mode: AddressingMode,
    /// Base register.
    pub reg: Reg,
}

impl Operand {
    /// Decodes the low six bits of `bits`.
    #[must_use]
    pub const fn from_u6(bits: u16) -> Self {
        Self {
            mode: AddressingMode::from_u3(bits >> 3),
            reg: Reg::from_u3(bits),
        }
    }

    /// Returns `true` when the operand consumes an instruction-stream word.
    #[must_use]
    pub const fn needs_extension_word(self) -> bool {
        match self.mode {
            AddressingMode::Index | AddressingMode::IndexDeferred => true,
            AddressingMode::Autoincrement | AddressingMode::AutoincrementDeferred => {
                matches!(self.reg, Reg::Pc)
            }
            _ => false,
        }
    }

    /// Autoincrement/autodecrement step for this operand at `width`.
    ///
    /// Byte operations step `R0..R5` by one; `SP`, `PC` and deferred modes
    /// always step by two.
    #[must_use]
    pub const fn step(self, width: Width) -> u16 {
        if matches!(width, Width::Byte)
            && !self.mode.is_deferred()
            && !matches!(self.reg, Reg::Sp | Reg::Pc)
        {
            1
        } else {
            2
        }
    }
}

/// A classified instruction with its extension words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    /// Address of the instruction word.
    pub pc: u16,
    /// Instruction word.
    pub word: u16,
    /// Decoded operation.
    pub opcode: Opcode,
    /// Operand shape.
    pub shape: Shape,
    /// Extension words in instruction-stream order.
    pub extension: [u16; MAX_EXTENSION_WORDS],
    /// Number of valid entries in `extension`.
    pub extension_count: usize,
}

impl Instruction {
    /// Builds an instruction with no extension words.
    #[must_use]
    pub const fn new(pc: u16, word: u16, opcode: Opcode) -> Self {
        Self {
            pc,
            word,
            opcode,
            shape: opcode.shape(),
            extension: [0; MAX_EXTENSION_WORDS],
            extension_count: 0,
        }
    }

    /// Operand width.
    #[must_use]
    pub const fn width(&self) -> Width {
        self.opcode.width(self.word)
    }

    /// Source operand (bits 11:6).
    #[must_use]
    pub const fn source(&self) -> Operand {
        Operand::from_u6(self.word >> 6)
    }

    /// Destination operand (bits 5:0). Also the source of `RegSource` shapes.
    #[must_use]
    pub const fn destination(&self) -> Operand {
        Operand::from_u6(self.word)
    }

    /// Register field in bits 8:6 (`JSR`, EIS, `XOR`, `SOB`).
    #[must_use]
    pub const fn register_field(&self) -> Reg {
        Reg::from_u3(self.word >> 6)
    }

    /// Register field in bits 2:0 (`RTS`).
    #[must_use]
    pub const fn low_register(&self) -> Reg {
        Reg::from_u3(self.word)
    }

    /// Sign-extended branch offset in words.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub const fn branch_offset(&self) -> i16 {
        (self.word as u8) as i8 as i16
    }

    /// Target of a branch: `pc + 2 + 2 * offset`.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn branch_target(&self) -> u16 {
        self.pc
            .wrapping_add(2)
            .wrapping_add((self.branch_offset() * 2) as u16)
    }

    /// Six-bit count field (`MARK`, `SOB`).
    #[must_use]
    pub const fn count(&self) -> u16 {
        self.word & 0o77
    }

    /// Address of the word after the instruction and all its extension words.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn next_pc(&self) -> u16 {
        self.pc.wrapping_add(2 + 2 * self.extension_count as u16)
    }

    /// Operands that may consume extension words, in instruction-stream order.
    #[must_use]
    pub const fn memory_operands(&self) -> [Option<Operand>; 2] {
        match self.shape {
            Shape::SourceDest => [Some(self.source()), Some(self.destination())],
            Shape::SingleSource | Shape::SingleDest | Shape::RegSource | Shape::RegDest => {
                [Some(self.destination()), None]
            }
            Shape::NoOperand
            | Shape::RegisterUnary
            | Shape::ImmediateUnary
            | Shape::OffsetNn
            | Shape::Branch => [None, None],
        }
    }

    /// Number of extension words this instruction needs.
    #[must_use]
    pub const fn extension_words_needed(&self) -> usize {
        let operands = self.memory_operands();
        let mut count = 0;
        let mut index = 0;
        while index < operands.len() {
            if let Some(operand) = operands[index] {
                if operand.needs_extension_word() {
                    count += 1;
                }
            }
            index += 1;
        }
        count
    }
}
