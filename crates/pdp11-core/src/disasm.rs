//! MACRO-11 style disassembly.
//!
//! Numbers are octal, as the assembler prints them. PC-relative operands are
//! shown as their resolved absolute address.

use crate::decoder::{AddressingMode, Instruction, Operand};
use crate::encoding::{classify, Classification, Opcode, Shape};
use crate::state::Reg;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single disassembled instruction row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// Address of the instruction word.
    pub addr_start: u16,
    /// Instruction word followed by the extension words it consumed.
    pub words: Vec<u16>,
    /// Mnemonic (e.g. `MOVB`, `BNE`).
    pub mnemonic: String,
    /// Formatted operands (e.g. `#4,R0`).
    pub operands: String,
    /// The word is illegal or reserved.
    pub is_illegal: bool,
}

impl DisassemblyRow {
    /// Length of the instruction in words.
    #[must_use]
    pub fn len_words(&self) -> usize {
        self.words.len()
    }

    /// Mnemonic and operands as one line.
    #[must_use]
    pub fn text(&self) -> String {
        if self.operands.is_empty() {
            self.mnemonic.clone()
        } else {
            format!("{} {}", self.mnemonic, self.operands)
        }
    }
}

/// Disassembles the instruction whose first word is `words[0]`, located at
/// `pc`. Returns `None` if `words` is empty or too short for the extension
/// words the instruction needs.
#[must_use]
pub fn disassemble(pc: u16, words: &[u16]) -> Option<DisassemblyRow> {
    let &word = words.first()?;
    let opcode = match classify(word) {
        Classification::Legal { opcode, .. } => opcode,
        Classification::Illegal { .. } | Classification::Reserved => {
            return Some(DisassemblyRow {
                addr_start: pc,
                words: vec![word],
                mnemonic: ".WORD".to_string(),
                operands: format!("{word:o}"),
                is_illegal: true,
            });
        }
    };

    let mut insn = Instruction::new(pc, word, opcode);
    let needed = insn.extension_words_needed();
    let extension = words.get(1..=needed)?;
    insn.extension[..needed].copy_from_slice(extension);
    insn.extension_count = needed;

    Some(DisassemblyRow {
        addr_start: pc,
        words: words[..=needed].to_vec(),
        mnemonic: mnemonic(&insn),
        operands: operands(&insn),
        is_illegal: false,
    })
}

/// Disassembles up to `count` consecutive instructions from `words`, the
/// first of which sits at `start`.
#[must_use]
pub fn disassemble_range(start: u16, words: &[u16], count: usize) -> Vec<DisassemblyRow> {
    let mut rows = Vec::with_capacity(count);
    let mut offset = 0;
    while rows.len() < count {
        #[allow(clippy::cast_possible_truncation)]
        let pc = start.wrapping_add((offset * 2) as u16);
        let Some(row) = words.get(offset..).and_then(|rest| disassemble(pc, rest)) else {
            break;
        };
        offset += row.len_words();
        rows.push(row);
    }
    rows
}

fn mnemonic(insn: &Instruction) -> String {
    match insn.opcode {
        Opcode::ClearCc | Opcode::SetCc => condition_code_mnemonic(insn.word),
        op if op.has_byte_form() && insn.word & 0o100000 != 0 => format!("{}B", op.mnemonic()),
        op => op.mnemonic().to_string(),
    }
}

fn condition_code_mnemonic(word: u16) -> String {
    let set = word & 0o20 != 0;
    let mask = word & 0o17;
    match (set, mask) {
        (_, 0) => "NOP".to_string(),
        (false, 0o17) => "CCC".to_string(),
        (true, 0o17) => "SCC".to_string(),
        _ => {
            let names: &[(u16, &str, &str)] = &[
                (0o1, "CLC", "SEC"),
                (0o2, "CLV", "SEV"),
                (0o4, "CLZ", "SEZ"),
                (0o10, "CLN", "SEN"),
            ];
            names
                .iter()
                .filter(|(bit, _, _)| mask & bit != 0)
                .map(|(_, clear, set_name)| if set { *set_name } else { *clear })
                .collect::<Vec<_>>()
                .join("!")
        }
    }
}

fn operands(insn: &Instruction) -> String {
    let mut cursor = Cursor {
        insn,
        next: 0,
        addr: insn.pc.wrapping_add(2),
    };
    match insn.shape {
        Shape::NoOperand => String::new(),
        Shape::RegisterUnary => register_name(insn.low_register()).to_string(),
        Shape::ImmediateUnary => match insn.opcode {
            Opcode::Spl => format!("{:o}", insn.word & 0o7),
            Opcode::Emt | Opcode::Trap => format!("{:o}", insn.word & 0o377),
            _ => String::new(),
        },
        Shape::OffsetNn => match insn.opcode {
            Opcode::Sob => format!(
                "{},{:o}",
                register_name(insn.register_field()),
                insn.next_pc().wrapping_sub(2 * insn.count())
            ),
            _ => format!("{:o}", insn.count()),
        },
        Shape::Branch => format!("{:o}", insn.branch_target()),
        Shape::SingleSource | Shape::SingleDest => cursor.operand(insn.destination()),
        Shape::RegSource => {
            let src = cursor.operand(insn.destination());
            format!("{src},{}", register_name(insn.register_field()))
        }
        Shape::RegDest => {
            let dst = cursor.operand(insn.destination());
            format!("{},{dst}", register_name(insn.register_field()))
        }
        Shape::SourceDest => {
            let src = cursor.operand(insn.source());
            let dst = cursor.operand(insn.destination());
            format!("{src},{dst}")
        }
    }
}

struct Cursor<'a> {
    insn: &'a Instruction,
    next: usize,
    addr: u16,
}

impl Cursor<'_> {
    fn extension(&mut self) -> u16 {
        let value = self.insn.extension.get(self.next).copied().unwrap_or_default();
        self.next += 1;
        self.addr = self.addr.wrapping_add(2);
        value
    }

    fn operand(&mut self, operand: Operand) -> String {
        let reg = register_name(operand.reg);
        match (operand.mode, operand.reg) {
            (AddressingMode::Autoincrement, Reg::Pc) => format!("#{:o}", self.extension()),
            (AddressingMode::AutoincrementDeferred, Reg::Pc) => {
                format!("@#{:o}", self.extension())
            }
            (AddressingMode::Index, Reg::Pc) => {
                let offset = self.extension();
                format!("{:o}", offset.wrapping_add(self.addr))
            }
            (AddressingMode::IndexDeferred, Reg::Pc) => {
                let offset = self.extension();
                format!("@{:o}", offset.wrapping_add(self.addr))
            }
            (AddressingMode::Register, _) => reg.to_string(),
            (AddressingMode::RegisterDeferred, _) => format!("({reg})"),
            (AddressingMode::Autoincrement, _) => format!("({reg})+"),
            (AddressingMode::AutoincrementDeferred, _) => format!("@({reg})+"),
            (AddressingMode::Autodecrement, _) => format!("-({reg})"),
            (AddressingMode::AutodecrementDeferred, _) => format!("@-({reg})"),
            (AddressingMode::Index, _) => format!("{:o}({reg})", self.extension()),
            (AddressingMode::IndexDeferred, _) => format!("@{:o}({reg})", self.extension()),
        }
    }
}

const fn register_name(reg: Reg) -> &'static str {
    match reg {
        Reg::R0 => "R0",
        Reg::R1 => "R1",
        Reg::R2 => "R2",
        Reg::R3 => "R3",
        Reg::R4 => "R4",
        Reg::R5 => "R5",
        Reg::Sp => "SP",
        Reg::Pc => "PC",
        _ => "??",
    }
}
