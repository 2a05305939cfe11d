//! The condition-code network.
//!
//! One function maps a formula selector, the result value and the latched ALU
//! signals to new `N`/`Z`/`V`/`C` bits. Arithmetic micro-ops never touch the
//! condition codes themselves.

use super::alu::{AluLatch, DivideStatus};
use crate::memory::Width;
use crate::microcode::{BranchCondition, FlagFormula};
use crate::state::ConditionCodes;

/// Computes new condition codes for `value` (already masked to `width`).
#[must_use]
pub const fn evaluate(
    formula: FlagFormula,
    value: u16,
    width: Width,
    latch: &AluLatch,
    old: ConditionCodes,
) -> ConditionCodes {
    let sign = width.sign_bit();
    let n = value & sign != 0;
    let z = value == 0;
    match formula {
        FlagFormula::Logical => ConditionCodes {
            n,
            z,
            v: false,
            c: old.c,
        },
        FlagFormula::Clear => ConditionCodes {
            n: false,
            z: true,
            v: false,
            c: false,
        },
        FlagFormula::Complement => ConditionCodes {
            n,
            z,
            v: false,
            c: true,
        },
        FlagFormula::Increment => ConditionCodes {
            n,
            z,
            v: value == sign,
            c: old.c,
        },
        FlagFormula::Decrement => ConditionCodes {
            n,
            z,
            v: value == sign - 1,
            c: old.c,
        },
        FlagFormula::Negate => ConditionCodes {
            n,
            z,
            v: value == sign,
            c: !z,
        },
        FlagFormula::AddCarry => ConditionCodes {
            n,
            z,
            v: latch.carry_in && value == sign,
            c: latch.carry_in && z,
        },
        FlagFormula::SubCarry => ConditionCodes {
            n,
            z,
            v: latch.a == sign,
            c: latch.carry_in && latch.a == 0,
        },
        FlagFormula::Test => ConditionCodes {
            n,
            z,
            v: false,
            c: false,
        },
        FlagFormula::Add => ConditionCodes {
            n,
            z,
            v: !(latch.a ^ latch.b) & (latch.a ^ value) & sign != 0,
            c: latch.carry_out,
        },
        FlagFormula::Subtract => ConditionCodes {
            n,
            z,
            v: (latch.a ^ latch.b) & (latch.a ^ value) & sign != 0,
            c: latch.carry_out,
        },
        FlagFormula::Shift => ConditionCodes {
            n,
            z,
            v: n != latch.shift_out,
            c: latch.shift_out,
        },
        FlagFormula::SwapBytes => ConditionCodes {
            n: value & 0o200 != 0,
            z: value & 0o377 == 0,
            v: false,
            c: false,
        },
        FlagFormula::SignExtend => ConditionCodes {
            n: old.n,
            z: !old.n,
            v: false,
            c: old.c,
        },
        FlagFormula::Multiply => {
            #[allow(clippy::cast_possible_wrap)]
            let product = latch.wide as i32;
            ConditionCodes {
                n: product < 0,
                z: product == 0,
                v: false,
                c: product < i16::MIN as i32 || product > i16::MAX as i32,
            }
        }
        FlagFormula::Divide => match latch.divide {
            DivideStatus::Completed => ConditionCodes {
                n,
                z,
                v: false,
                c: false,
            },
            DivideStatus::ByZero => ConditionCodes {
                n: false,
                z: true,
                v: true,
                c: true,
            },
            DivideStatus::Overflow { negative } => ConditionCodes {
                n: negative,
                z: false,
                v: true,
                c: false,
            },
        },
        FlagFormula::ArithmeticShift => ConditionCodes {
            n,
            z,
            v: latch.sign_change,
            c: latch.shift_out,
        },
        FlagFormula::ArithmeticShiftCombined => ConditionCodes {
            n: latch.wide & 0x8000_0000 != 0,
            z: latch.wide == 0,
            v: latch.sign_change,
            c: latch.shift_out,
        },
    }
}

/// Evaluates a branch condition against the condition codes.
///
/// [`BranchCondition::RegisterNonZero`] depends on a register and is resolved
/// by the engine; it is reported as not taken here.
#[must_use]
pub const fn branch_taken(cond: BranchCondition, cc: ConditionCodes) -> bool {
    match cond {
        BranchCondition::Always => true,
        BranchCondition::Ne => !cc.z,
        BranchCondition::Eq => cc.z,
        BranchCondition::Ge => cc.n == cc.v,
        BranchCondition::Lt => cc.n != cc.v,
        BranchCondition::Gt => !cc.z && cc.n == cc.v,
        BranchCondition::Le => cc.z || cc.n != cc.v,
        BranchCondition::Pl => !cc.n,
        BranchCondition::Mi => cc.n,
        BranchCondition::Hi => !cc.c && !cc.z,
        BranchCondition::Los => cc.c || cc.z,
        BranchCondition::Vc => !cc.v,
        BranchCondition::Vs => cc.v,
        BranchCondition::Cc => !cc.c,
        BranchCondition::Cs => cc.c,
        BranchCondition::RegisterNonZero(_) => false,
    }
}
