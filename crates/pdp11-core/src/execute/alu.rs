//! Arithmetic primitives shared by the ALU, shift and EIS micro-ops.
//!
//! Every primitive returns its result together with the side signals the
//! flag network needs; nothing here touches CPU state.

use crate::memory::Width;
use crate::microcode::{AluOp, ShiftOp};

/// Outcome of a `DIV` micro-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DivideStatus {
    /// Quotient and remainder were written.
    #[default]
    Completed,
    /// Divisor was zero; registers untouched.
    ByZero,
    /// Quotient does not fit in 16 bits; registers untouched.
    Overflow {
        /// The quotient would have been negative.
        negative: bool,
    },
}

/// Side signals latched by the last arithmetic micro-op for flag evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct AluLatch {
    /// First operand, masked to width.
    pub a: u16,
    /// Second operand, masked to width.
    pub b: u16,
    /// Carry flag at the time the operation ran.
    pub carry_in: bool,
    /// Carry or borrow out of the operation.
    pub carry_out: bool,
    /// Last bit shifted out.
    pub shift_out: bool,
    /// The sign bit changed at some point during a shift.
    pub sign_change: bool,
    /// 32-bit result of `MUL` and `ASHC`.
    pub wide: u32,
    /// Result status of the last `DIV`.
    pub divide: DivideStatus,
}

/// Runs a two-input or unary ALU operation at `width`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn alu(op: AluOp, a: u16, b: u16, width: Width, carry: bool) -> (u16, AluLatch) {
    let mask = width.mask();
    let a = a & mask;
    let b = b & mask;
    let cin = u16::from(carry);
    let mut latch = AluLatch {
        a,
        b,
        carry_in: carry,
        ..AluLatch::default()
    };
    let result = match op {
        AluOp::Add => {
            let sum = u32::from(a) + u32::from(b);
            latch.carry_out = sum > u32::from(mask);
            sum as u16
        }
        AluOp::AddCarry => {
            let sum = u32::from(a) + u32::from(cin);
            latch.carry_out = sum > u32::from(mask);
            sum as u16
        }
        AluOp::Sub => {
            latch.carry_out = b > a;
            a.wrapping_sub(b)
        }
        AluOp::SubCarry => {
            latch.carry_out = carry && a == 0;
            a.wrapping_sub(cin)
        }
        AluOp::Inc => a.wrapping_add(1),
        AluOp::Dec => a.wrapping_sub(1),
        AluOp::Neg => 0u16.wrapping_sub(a),
        AluOp::And => a & b,
        AluOp::Or => a | b,
        AluOp::Xor => a ^ b,
        AluOp::Not => !a,
    };
    (result & mask, latch)
}

/// One-place shift or rotate. Returns the result and the bit shifted out.
#[must_use]
pub const fn shift(op: ShiftOp, value: u16, width: Width, carry: bool) -> (u16, bool) {
    let mask = width.mask();
    let sign = width.sign_bit();
    let value = value & mask;
    let (result, out) = match op {
        ShiftOp::Asr => ((value >> 1) | (value & sign), value & 1 != 0),
        ShiftOp::Asl => (value << 1, value & sign != 0),
        ShiftOp::Ror => (
            (value >> 1) | (if carry { sign } else { 0 }),
            value & 1 != 0,
        ),
        ShiftOp::Rol => ((value << 1) | carry as u16, value & sign != 0),
    };
    (result & mask, out)
}

/// Signed 16 x 16 multiply.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub const fn multiply(a: u16, b: u16) -> i32 {
    (a as i16 as i32) * (b as i16 as i32)
}

/// Signed 32 / 16 divide of `hi:lo`. Returns quotient and remainder.
///
/// # Errors
///
/// Returns [`DivideStatus::ByZero`] or [`DivideStatus::Overflow`]; in both
/// cases the registers must be left as they were.
#[allow(
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn divide(hi: u16, lo: u16, divisor: u16) -> Result<(u16, u16), DivideStatus> {
    let dividend = ((u32::from(hi) << 16) | u32::from(lo)) as i32;
    let divisor = i32::from(divisor as i16);
    if divisor == 0 {
        return Err(DivideStatus::ByZero);
    }
    let negative = (dividend < 0) != (divisor < 0);
    let quotient = dividend
        .checked_div(divisor)
        .ok_or(DivideStatus::Overflow { negative })?;
    if i16::try_from(quotient).is_err() {
        return Err(DivideStatus::Overflow { negative });
    }
    let remainder = dividend - quotient * divisor;
    Ok((quotient as u16, remainder as u16))
}

/// Signed shift count in the low six bits of `count` (`-32..=31`).
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub const fn shift_count(count: u16) -> i8 {
    let bits = (count & 0o77) as i8;
    if bits & 0o40 != 0 {
        bits - 0o100
    } else {
        bits
    }
}

/// `ASH`: returns the result, the last bit shifted out and whether the sign
/// bit changed during the shift.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn shift_arith(value: u16, count: u16) -> (u16, bool, bool) {
    let n = shift_count(count);
    let sign = value & 0x8000;
    let mut result = value;
    let mut out = false;
    let mut changed = false;
    if n > 0 {
        for _ in 0..n {
            out = result & 0x8000 != 0;
            result <<= 1;
            changed |= result & 0x8000 != sign;
        }
    } else {
        for _ in 0..n.unsigned_abs() {
            out = result & 1 != 0;
            result = ((result as i16) >> 1) as u16;
        }
    }
    (result, out, changed)
}

/// `ASHC`: 32-bit version of [`shift_arith`] on `hi:lo`.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn shift_arith32(hi: u16, lo: u16, count: u16) -> (u32, bool, bool) {
    let n = shift_count(count);
    let value = (u32::from(hi) << 16) | u32::from(lo);
    let sign = value & 0x8000_0000;
    let mut result = value;
    let mut out = false;
    let mut changed = false;
    if n > 0 {
        for _ in 0..n {
            out = result & 0x8000_0000 != 0;
            result <<= 1;
            changed |= result & 0x8000_0000 != sign;
        }
    } else {
        for _ in 0..n.unsigned_abs() {
            out = result & 1 != 0;
            result = ((result as i32) >> 1) as u32;
        }
    }
    (result, out, changed)
}
