use super::psw::{Mode, Psw};

/// Number of architecturally visible general registers (`R0..R7`).
pub const GENERAL_REGISTER_COUNT: usize = 8;
/// Number of scratch registers visible only to the micro-engine.
pub const SCRATCH_REGISTER_COUNT: usize = 8;

/// Register identifiers addressable by micro-ops.
///
/// `R0..R5`, `Sp` and `Pc` are architectural; `Sp` resolves to the stack
/// pointer of the current mode. `S*`, `D*` and `T*` form the scratch bank:
/// source operand, destination operand and temporaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Reg {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    Sp = 6,
    Pc = 7,
    /// Source operand value.
    S0 = 8,
    /// Source operand address.
    S1 = 9,
    /// Source auxiliary.
    S2 = 10,
    /// Destination operand value.
    D0 = 11,
    /// Destination operand address.
    D1 = 12,
    /// Destination auxiliary.
    D2 = 13,
    /// Staging register for results (`R0'`).
    T0 = 14,
    /// Staging register for results (`R1'`).
    T1 = 15,
}

impl Reg {
    /// Ordered list of the architectural registers.
    pub const GENERAL: [Self; GENERAL_REGISTER_COUNT] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::Sp,
        Self::Pc,
    ];

    /// Decodes a 3-bit instruction register field.
    #[must_use]
    pub const fn from_u3(bits: u16) -> Self {
        Self::GENERAL[(bits & 0o7) as usize]
    }

    /// Returns the raw identifier (`0..=15`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns `true` for `R0..R7`.
    #[must_use]
    pub const fn is_general(self) -> bool {
        (self as u8) < 8
    }

    /// Returns the partner register of an even/odd pair (`R | 1`).
    #[must_use]
    pub const fn odd_partner(self) -> Self {
        if self.is_general() {
            Self::from_u3(self as u16 | 1)
        } else {
            self
        }
    }
}

/// Complete register file: two general sets, banked stack pointers, PC and
/// the micro-engine scratch bank.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    general: [[u16; 6]; 2],
    stack: [u16; 4],
    pc: u16,
    scratch: [u16; SCRATCH_REGISTER_COUNT],
}

impl RegisterFile {
    /// Reads `reg` as seen under `psw`'s register set and mode.
    #[must_use]
    pub const fn get(&self, reg: Reg, psw: Psw) -> u16 {
        match reg {
            Reg::Sp => self.stack[psw.mode().index()],
            Reg::Pc => self.pc,
            _ if reg.is_general() => self.general[psw.register_set()][reg.index()],
            _ => self.scratch[reg.index() - GENERAL_REGISTER_COUNT],
        }
    }

    /// Writes `reg` as seen under `psw`'s register set and mode.
    pub const fn set(&mut self, reg: Reg, psw: Psw, value: u16) {
        match reg {
            Reg::Sp => self.stack[psw.mode().index()] = value,
            Reg::Pc => self.pc = value,
            _ if reg.is_general() => self.general[psw.register_set()][reg.index()] = value,
            _ => self.scratch[reg.index() - GENERAL_REGISTER_COUNT] = value,
        }
    }

    /// Reads the stack pointer banked for `mode`.
    #[must_use]
    pub const fn stack_pointer(&self, mode: Mode) -> u16 {
        self.stack[mode.index()]
    }

    /// Writes the stack pointer banked for `mode`.
    pub const fn set_stack_pointer(&mut self, mode: Mode, value: u16) {
        self.stack[mode.index()] = value;
    }

    /// Reads the program counter.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.pc
    }

    /// Writes the program counter.
    pub const fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }
}
