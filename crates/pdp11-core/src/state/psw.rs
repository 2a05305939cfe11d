//! Processor status word and condition codes.

/// `PSW` carry bit.
pub const PSW_C: u16 = 1 << 0;
/// `PSW` overflow bit.
pub const PSW_V: u16 = 1 << 1;
/// `PSW` zero bit.
pub const PSW_Z: u16 = 1 << 2;
/// `PSW` negative bit.
pub const PSW_N: u16 = 1 << 3;
/// `PSW` trace bit.
pub const PSW_T: u16 = 1 << 4;
/// Mask of the four condition-code bits.
pub const PSW_CC_MASK: u16 = PSW_N | PSW_Z | PSW_V | PSW_C;
/// Mask of the interrupt priority level field (bits 7:5).
pub const PSW_PRIORITY_MASK: u16 = 0o340;
/// General register set select bit.
pub const PSW_REGISTER_SET: u16 = 1 << 11;
/// Mask of the previous-mode field (bits 13:12).
pub const PSW_PREVIOUS_MODE_MASK: u16 = 0o030000;
/// Mask of the current-mode field (bits 15:14).
pub const PSW_CURRENT_MODE_MASK: u16 = 0o140000;
/// Bits that exist in the `PSW`; bits 10:8 read as zero.
pub const PSW_IMPLEMENTED_MASK: u16 = 0o174377;

/// Processor operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Mode {
    /// Kernel mode (`00`).
    #[default]
    Kernel = 0,
    /// Supervisor mode (`01`).
    Supervisor = 1,
    /// Undefined mode (`10`), mapped through its own page tables.
    Undefined = 2,
    /// User mode (`11`).
    User = 3,
}

impl Mode {
    /// Decodes the low two bits of `bits` into a mode.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        match bits & 0o3 {
            0 => Self::Kernel,
            1 => Self::Supervisor,
            2 => Self::Undefined,
            _ => Self::User,
        }
    }

    /// Returns the two-bit encoding.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self as u16
    }

    /// Returns the array index (`0..=3`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Unpacked `N/Z/V/C` condition codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct ConditionCodes {
    /// Negative.
    pub n: bool,
    /// Zero.
    pub z: bool,
    /// Overflow.
    pub v: bool,
    /// Carry.
    pub c: bool,
}

impl ConditionCodes {
    /// Builds condition codes from the low four `PSW` bits.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self {
            n: bits & PSW_N != 0,
            z: bits & PSW_Z != 0,
            v: bits & PSW_V != 0,
            c: bits & PSW_C != 0,
        }
    }

    /// Packs the codes into `PSW` bit positions.
    #[must_use]
    pub const fn bits(self) -> u16 {
        (if self.n { PSW_N } else { 0 })
            | (if self.z { PSW_Z } else { 0 })
            | (if self.v { PSW_V } else { 0 })
            | (if self.c { PSW_C } else { 0 })
    }
}

/// Processor status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Psw {
    bits: u16,
}

impl Psw {
    /// Creates a `PSW` from raw bits; unimplemented bits are dropped.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self {
            bits: bits & PSW_IMPLEMENTED_MASK,
        }
    }

    /// Returns the raw word.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.bits
    }

    /// Replaces the raw word.
    pub const fn set_bits(&mut self, bits: u16) {
        self.bits = bits & PSW_IMPLEMENTED_MASK;
    }

    /// Returns the condition codes.
    #[must_use]
    pub const fn cc(self) -> ConditionCodes {
        ConditionCodes::from_bits(self.bits)
    }

    /// Replaces the condition codes.
    pub const fn set_cc(&mut self, cc: ConditionCodes) {
        self.bits = (self.bits & !PSW_CC_MASK) | cc.bits();
    }

    /// Returns the interrupt priority level (`0..=7`).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn ipl(self) -> u8 {
        ((self.bits & PSW_PRIORITY_MASK) >> 5) as u8
    }

    /// Sets the interrupt priority level.
    pub const fn set_ipl(&mut self, level: u8) {
        self.bits = (self.bits & !PSW_PRIORITY_MASK) | (((level & 0o7) as u16) << 5);
    }

    /// Returns the current mode.
    #[must_use]
    pub const fn mode(self) -> Mode {
        Mode::from_bits(self.bits >> 14)
    }

    /// Sets the current mode, leaving the previous mode untouched.
    pub const fn set_mode(&mut self, mode: Mode) {
        self.bits = (self.bits & !PSW_CURRENT_MODE_MASK) | (mode.bits() << 14);
    }

    /// Returns the previous mode.
    #[must_use]
    pub const fn previous_mode(self) -> Mode {
        Mode::from_bits(self.bits >> 12)
    }

    /// Sets the previous mode.
    pub const fn set_previous_mode(&mut self, mode: Mode) {
        self.bits = (self.bits & !PSW_PREVIOUS_MODE_MASK) | (mode.bits() << 12);
    }

    /// Returns `true` when the trace bit is set.
    #[must_use]
    pub const fn trace(self) -> bool {
        self.bits & PSW_T != 0
    }

    /// Returns the selected general register set (`0` or `1`).
    #[must_use]
    pub const fn register_set(self) -> usize {
        if self.bits & PSW_REGISTER_SET != 0 {
            1
        } else {
            0
        }
    }
}
