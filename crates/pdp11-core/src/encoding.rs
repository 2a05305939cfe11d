//! Opcode classification tables.
//!
//! Each instruction word is matched against a `(mask, value)` pattern table.
//! Patterns are disjoint, so at most one entry matches; a word with no match
//! is a reserved instruction.

use crate::memory::Width;

/// Operations of the integer instruction set.
///
/// Byte-capable operations share one variant for both widths; bit 15 of the
/// instruction word selects the width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Opcode {
    Halt,
    Wait,
    Rti,
    Bpt,
    Iot,
    Reset,
    Rtt,
    Jmp,
    Rts,
    Spl,
    ClearCc,
    SetCc,
    Swab,
    Br,
    Bne,
    Beq,
    Bge,
    Blt,
    Bgt,
    Ble,
    Jsr,
    Clr,
    Com,
    Inc,
    Dec,
    Neg,
    Adc,
    Sbc,
    Tst,
    Ror,
    Rol,
    Asr,
    Asl,
    Mark,
    Mfpi,
    Mtpi,
    Sxt,
    Mov,
    Cmp,
    Bit,
    Bic,
    Bis,
    Add,
    Sub,
    Mul,
    Div,
    Ash,
    Ashc,
    Xor,
    Sob,
    Bpl,
    Bmi,
    Bhi,
    Blos,
    Bvc,
    Bvs,
    Bcc,
    Bcs,
    Emt,
    Trap,
    Mtps,
    Mfpd,
    Mtpd,
    Mfps,
}

/// Structural operand shape of an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Shape {
    /// No operand fields.
    NoOperand,
    /// Register number in bits 2:0 (`RTS`).
    RegisterUnary,
    /// Immediate value in the low bits (`SPL`, condition codes, `EMT`, `TRAP`).
    ImmediateUnary,
    /// Six-bit count in bits 5:0 (`MARK`, `SOB`).
    OffsetNn,
    /// Eight-bit signed word offset.
    Branch,
    /// One operand that is only read.
    SingleSource,
    /// One operand that is written (and usually read first).
    SingleDest,
    /// Register in bits 8:6 plus a source operand.
    RegSource,
    /// Register in bits 8:6 plus a destination operand.
    RegDest,
    /// Source operand in bits 11:6 and destination in bits 5:0.
    SourceDest,
}

/// Outcome of classifying one instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Executable instruction.
    Legal {
        /// Decoded operation.
        opcode: Opcode,
        /// Operand shape.
        shape: Shape,
    },
    /// Assigned opcode used in an illegal way (vector 4).
    Illegal {
        /// Decoded operation.
        opcode: Opcode,
    },
    /// Unassigned opcode (vector 10).
    Reserved,
}

/// Opcode pattern table as `(mask, value, opcode)` triples.
pub const OPCODE_PATTERN_TABLE: &[(u16, u16, Opcode)] = &[
    (0o177777, 0o000000, Opcode::Halt),
    (0o177777, 0o000001, Opcode::Wait),
    (0o177777, 0o000002, Opcode::Rti),
    (0o177777, 0o000003, Opcode::Bpt),
    (0o177777, 0o000004, Opcode::Iot),
    (0o177777, 0o000005, Opcode::Reset),
    (0o177777, 0o000006, Opcode::Rtt),
    (0o177700, 0o000100, Opcode::Jmp),
    (0o177770, 0o000200, Opcode::Rts),
    (0o177770, 0o000230, Opcode::Spl),
    (0o177760, 0o000240, Opcode::ClearCc),
    (0o177760, 0o000260, Opcode::SetCc),
    (0o177700, 0o000300, Opcode::Swab),
    (0o177400, 0o000400, Opcode::Br),
    (0o177400, 0o001000, Opcode::Bne),
    (0o177400, 0o001400, Opcode::Beq),
    (0o177400, 0o002000, Opcode::Bge),
    (0o177400, 0o002400, Opcode::Blt),
    (0o177400, 0o003000, Opcode::Bgt),
    (0o177400, 0o003400, Opcode::Ble),
    (0o177000, 0o004000, Opcode::Jsr),
    (0o077700, 0o005000, Opcode::Clr),
    (0o077700, 0o005100, Opcode::Com),
    (0o077700, 0o005200, Opcode::Inc),
    (0o077700, 0o005300, Opcode::Dec),
    (0o077700, 0o005400, Opcode::Neg),
    (0o077700, 0o005500, Opcode::Adc),
    (0o077700, 0o005600, Opcode::Sbc),
    (0o077700, 0o005700, Opcode::Tst),
    (0o077700, 0o006000, Opcode::Ror),
    (0o077700, 0o006100, Opcode::Rol),
    (0o077700, 0o006200, Opcode::Asr),
    (0o077700, 0o006300, Opcode::Asl),
    (0o177700, 0o006400, Opcode::Mark),
    (0o177700, 0o006500, Opcode::Mfpi),
    (0o177700, 0o006600, Opcode::Mtpi),
    (0o177700, 0o006700, Opcode::Sxt),
    (0o070000, 0o010000, Opcode::Mov),
    (0o070000, 0o020000, Opcode::Cmp),
    (0o070000, 0o030000, Opcode::Bit),
    (0o070000, 0o040000, Opcode::Bic),
    (0o070000, 0o050000, Opcode::Bis),
    (0o170000, 0o060000, Opcode::Add),
    (0o170000, 0o160000, Opcode::Sub),
    (0o177000, 0o070000, Opcode::Mul),
    (0o177000, 0o071000, Opcode::Div),
    (0o177000, 0o072000, Opcode::Ash),
    (0o177000, 0o073000, Opcode::Ashc),
    (0o177000, 0o074000, Opcode::Xor),
    (0o177000, 0o077000, Opcode::Sob),
    (0o177400, 0o100000, Opcode::Bpl),
    (0o177400, 0o100400, Opcode::Bmi),
    (0o177400, 0o101000, Opcode::Bhi),
    (0o177400, 0o101400, Opcode::Blos),
    (0o177400, 0o102000, Opcode::Bvc),
    (0o177400, 0o102400, Opcode::Bvs),
    (0o177400, 0o103000, Opcode::Bcc),
    (0o177400, 0o103400, Opcode::Bcs),
    (0o177400, 0o104000, Opcode::Emt),
    (0o177400, 0o104400, Opcode::Trap),
    (0o177700, 0o106400, Opcode::Mtps),
    (0o177700, 0o106500, Opcode::Mfpd),
    (0o177700, 0o106600, Opcode::Mtpd),
    (0o177700, 0o106700, Opcode::Mfps),
];

impl Opcode {
    /// Returns the operand shape of this operation.
    #[must_use]
    pub const fn shape(self) -> Shape {
        match self {
            Self::Halt
            | Self::Wait
            | Self::Rti
            | Self::Bpt
            | Self::Iot
            | Self::Reset
            | Self::Rtt => Shape::NoOperand,
            Self::Rts => Shape::RegisterUnary,
            Self::Spl | Self::ClearCc | Self::SetCc | Self::Emt | Self::Trap => {
                Shape::ImmediateUnary
            }
            Self::Mark | Self::Sob => Shape::OffsetNn,
            Self::Br
            | Self::Bne
            | Self::Beq
            | Self::Bge
            | Self::Blt
            | Self::Bgt
            | Self::Ble
            | Self::Bpl
            | Self::Bmi
            | Self::Bhi
            | Self::Blos
            | Self::Bvc
            | Self::Bvs
            | Self::Bcc
            | Self::Bcs => Shape::Branch,
            Self::Mfpi | Self::Mfpd | Self::Mtps => Shape::SingleSource,
            Self::Jmp
            | Self::Swab
            | Self::Clr
            | Self::Com
            | Self::Inc
            | Self::Dec
            | Self::Neg
            | Self::Adc
            | Self::Sbc
            | Self::Tst
            | Self::Ror
            | Self::Rol
            | Self::Asr
            | Self::Asl
            | Self::Mtpi
            | Self::Mtpd
            | Self::Sxt
            | Self::Mfps => Shape::SingleDest,
            Self::Mul | Self::Div | Self::Ash | Self::Ashc => Shape::RegSource,
            Self::Jsr | Self::Xor => Shape::RegDest,
            Self::Mov | Self::Cmp | Self::Bit | Self::Bic | Self::Bis | Self::Add | Self::Sub => {
                Shape::SourceDest
            }
        }
    }

    /// Returns `true` when bit 15 selects a byte form of this operation.
    #[must_use]
    pub const fn has_byte_form(self) -> bool {
        matches!(
            self,
            Self::Clr
                | Self::Com
                | Self::Inc
                | Self::Dec
                | Self::Neg
                | Self::Adc
                | Self::Sbc
                | Self::Tst
                | Self::Ror
                | Self::Rol
                | Self::Asr
                | Self::Asl
                | Self::Mov
                | Self::Cmp
                | Self::Bit
                | Self::Bic
                | Self::Bis
        )
    }

    /// Returns the operand width `word` selects for this operation.
    #[must_use]
    pub const fn width(self, word: u16) -> Width {
        if matches!(self, Self::Mtps | Self::Mfps) || (self.has_byte_form() && word & 0o100000 != 0)
        {
            Width::Byte
        } else {
            Width::Word
        }
    }

    /// Returns the MACRO-11 mnemonic of the word form.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Halt => "HALT",
            Self::Wait => "WAIT",
            Self::Rti => "RTI",
            Self::Bpt => "BPT",
            Self::Iot => "IOT",
            Self::Reset => "RESET",
            Self::Rtt => "RTT",
            Self::Jmp => "JMP",
            Self::Rts => "RTS",
            Self::Spl => "SPL",
            Self::ClearCc => "CCC",
            Self::SetCc => "SCC",
            Self::Swab => "SWAB",
            Self::Br => "BR",
            Self::Bne => "BNE",
            Self::Beq => "BEQ",
            Self::Bge => "BGE",
            Self::Blt => "BLT",
            Self::Bgt => "BGT",
            Self::Ble => "BLE",
            Self::Jsr => "JSR",
            Self::Clr => "CLR",
            Self::Com => "COM",
            Self::Inc => "INC",
            Self::Dec => "DEC",
            Self::Neg => "NEG",
            Self::Adc => "ADC",
            Self::Sbc => "SBC",
            Self::Tst => "TST",
            Self::Ror => "ROR",
            Self::Rol => "ROL",
            Self::Asr => "ASR",
            Self::Asl => "ASL",
            Self::Mark => "MARK",
            Self::Mfpi => "MFPI",
            Self::Mtpi => "MTPI",
            Self::Sxt => "SXT",
            Self::Mov => "MOV",
            Self::Cmp => "CMP",
            Self::Bit => "BIT",
            Self::Bic => "BIC",
            Self::Bis => "BIS",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Ash => "ASH",
            Self::Ashc => "ASHC",
            Self::Xor => "XOR",
            Self::Sob => "SOB",
            Self::Bpl => "BPL",
            Self::Bmi => "BMI",
            Self::Bhi => "BHI",
            Self::Blos => "BLOS",
            Self::Bvc => "BVC",
            Self::Bvs => "BVS",
            Self::Bcc => "BCC",
            Self::Bcs => "BCS",
            Self::Emt => "EMT",
            Self::Trap => "TRAP",
            Self::Mtps => "MTPS",
            Self::Mfpd => "MFPD",
            Self::Mtpd => "MTPD",
            Self::Mfps => "MFPS",
        }
    }
}

/// Looks up the operation assigned to `word`, if any.
#[must_use]
pub fn decode_opcode(word: u16) -> Option<Opcode> {
    OPCODE_PATTERN_TABLE
        .iter()
        .find(|(mask, value, _)| word & mask == *value)
        .map(|(_, _, opcode)| *opcode)
}

/// Classifies an instruction word.
///
/// `JMP` and `JSR` with a register-mode destination are illegal; unassigned
/// words are reserved. Privilege checks (`HALT` outside kernel mode) happen
/// at execution time.
#[must_use]
pub fn classify(word: u16) -> Classification {
    let Some(opcode) = decode_opcode(word) else {
        return Classification::Reserved;
    };
    if matches!(opcode, Opcode::Jmp | Opcode::Jsr) && word & 0o70 == 0 {
        return Classification::Illegal { opcode };
    }
    Classification::Legal {
        opcode,
        shape: opcode.shape(),
    }
}
