//! Micro-operation vocabulary of the execution engine.

use crate::fault::TrapKind;
use crate::memory::Width;
use crate::state::Reg;

/// Which mode's address space a memory micro-op uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeSelect {
    /// Current `PSW` mode.
    Current,
    /// Previous `PSW` mode (`MFPx`/`MTPx`).
    Previous,
    /// Kernel mode (trap vectors).
    Kernel,
}

/// Address space of a memory micro-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Space {
    /// Data space.
    Data,
    /// Instruction space (`MFPI`/`MTPI`).
    Instruction,
}

/// Mode and space used by a load or store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Access {
    /// Mode whose page tables translate the address.
    pub mode: ModeSelect,
    /// Space within that mode.
    pub space: Space,
}

impl Access {
    /// Ordinary data access in the current mode.
    pub const DATA: Self = Self {
        mode: ModeSelect::Current,
        space: Space::Data,
    };

    /// Kernel data access used for trap vectors.
    pub const KERNEL_DATA: Self = Self {
        mode: ModeSelect::Kernel,
        space: Space::Data,
    };
}

/// Variants of a `PSW` load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PswLoad {
    /// `RTI`/`RTT`: outside kernel mode the priority is kept and mode bits
    /// can only be raised.
    Ordinary,
    /// Trap entry: the whole word is loaded and the previous-mode field is
    /// taken from the current-mode field of the saved `PSW` in `previous`.
    Exception {
        /// Register holding the `PSW` before entry.
        previous: Reg,
    },
    /// `MTPS`: kernel mode writes priority and condition codes;
    /// other modes write condition codes only.
    Mtps,
}

/// Two-input or unary ALU operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluOp {
    /// `a + b`
    Add,
    /// `a + C`
    AddCarry,
    /// `a - b`
    Sub,
    /// `a - C`
    SubCarry,
    /// `a + 1`
    Inc,
    /// `a - 1`
    Dec,
    /// `-a`
    Neg,
    /// `a & b`
    And,
    /// `a | b`
    Or,
    /// `a ^ b`
    Xor,
    /// `!a`
    Not,
}

/// One-place shifts and rotates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftOp {
    /// Arithmetic shift right.
    Asr,
    /// Arithmetic shift left.
    Asl,
    /// Rotate right through carry.
    Ror,
    /// Rotate left through carry.
    Rol,
}

/// Condition-code rule selected by an `EvalFlags` micro-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagFormula {
    /// `N`,`Z` from the value; `V` cleared; `C` kept (`MOV`, `BIT`, `BIS`, `XOR`, `MFPx`).
    Logical,
    /// `N=0 Z=1 V=0 C=0`.
    Clear,
    /// `N`,`Z`; `V=0`; `C=1`.
    Complement,
    /// `V` when the result is the most negative value; `C` kept.
    Increment,
    /// `V` when the result is the most positive value; `C` kept.
    Decrement,
    /// `V` when the result is the most negative value; `C` unless zero.
    Negate,
    /// `ADC` rules from the carry-in.
    AddCarry,
    /// `SBC` rules from the carry-in.
    SubCarry,
    /// `N`,`Z`; `V=0`; `C=0`.
    Test,
    /// Two's-complement addition.
    Add,
    /// Two's-complement subtraction (`SUB`, `CMP`).
    Subtract,
    /// `C` from the bit shifted out, `V = N ^ C`.
    Shift,
    /// `N`,`Z` from the new low byte; `V=0`; `C=0`.
    SwapBytes,
    /// `Z = !N`; `V=0`; `N`,`C` kept.
    SignExtend,
    /// 32-bit product rules.
    Multiply,
    /// Quotient and divide-status rules.
    Divide,
    /// `ASH` rules: `V` on sign change, `C` from the last bit out.
    ArithmeticShift,
    /// `ASHC` rules on the 32-bit result.
    ArithmeticShiftCombined,
}

/// Branch conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BranchCondition {
    Always,
    Ne,
    Eq,
    Ge,
    Lt,
    Gt,
    Le,
    Pl,
    Mi,
    Hi,
    Los,
    Vc,
    Vs,
    Cc,
    Cs,
    /// Taken while the register is non-zero (`SOB`).
    RegisterNonZero(Reg),
}

/// A micro-operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MicroOp {
    /// Does nothing.
    Nop,
    /// Stops the CPU in kernel mode; illegal elsewhere.
    Halt,
    /// Enters the wait state in kernel mode.
    Wait,
    /// Bus reset in kernel mode.
    Reset,
    /// `dst = src`
    Move {
        /// Destination.
        dst: Reg,
        /// Source.
        src: Reg,
    },
    /// `dst = value`
    LoadImm {
        /// Destination.
        dst: Reg,
        /// Immediate.
        value: u16,
    },
    /// `dst = src + value`, no flags, no side effects.
    AddImm {
        /// Destination.
        dst: Reg,
        /// Source.
        src: Reg,
        /// Addend.
        value: u16,
    },
    /// Autoincrement/autodecrement step, recorded in MMR1.
    Step {
        /// Register stepped.
        reg: Reg,
        /// Signed amount.
        delta: i16,
    },
    /// `dst = mem[addr]`, bytes zero-extended.
    Load {
        /// Destination.
        dst: Reg,
        /// Register holding the virtual address.
        addr: Reg,
        /// Access width.
        width: Width,
        /// Mode and space.
        access: Access,
    },
    /// `mem[addr] = src`
    Store {
        /// Register holding the virtual address.
        addr: Reg,
        /// Value.
        src: Reg,
        /// Access width.
        width: Width,
        /// Mode and space.
        access: Access,
    },
    /// `dst = (dst & 0o177400) | (src & 0o377)`
    InsertByte {
        /// Destination.
        dst: Reg,
        /// Source.
        src: Reg,
    },
    /// `dst = sign_extend(src & 0o377)`
    SignExtendByte {
        /// Destination.
        dst: Reg,
        /// Source.
        src: Reg,
    },
    /// Reads the stack pointer of the previous mode.
    ReadPreviousSp {
        /// Destination.
        dst: Reg,
    },
    /// Writes the stack pointer of the previous mode.
    WritePreviousSp {
        /// Source.
        src: Reg,
    },
    /// `dst = PSW`
    ReadPsw {
        /// Destination.
        dst: Reg,
    },
    /// Loads the `PSW` from `src`.
    LoadPsw {
        /// Source.
        src: Reg,
        /// Load rules.
        kind: PswLoad,
    },
    /// Switches to kernel mode, banking in the kernel stack pointer.
    ForceKernel,
    /// ALU operation, latching carry inputs for flag evaluation.
    Alu {
        /// Operation.
        op: AluOp,
        /// Destination.
        dst: Reg,
        /// First operand.
        a: Reg,
        /// Second operand (ignored by unary operations).
        b: Reg,
        /// Width.
        width: Width,
    },
    /// One-place shift or rotate.
    Shift {
        /// Operation.
        op: ShiftOp,
        /// Destination.
        dst: Reg,
        /// Source.
        src: Reg,
        /// Width.
        width: Width,
    },
    /// Swaps the bytes of `src` into `dst`.
    Swab {
        /// Destination.
        dst: Reg,
        /// Source.
        src: Reg,
    },
    /// `dst = N ? 0o177777 : 0`
    SignExtend {
        /// Destination.
        dst: Reg,
    },
    /// `hi:lo = a * b`, signed. Two register writes.
    Mul {
        /// High result register.
        hi: Reg,
        /// Low result register.
        lo: Reg,
        /// Multiplicand.
        a: Reg,
        /// Multiplier.
        b: Reg,
    },
    /// `hi = hi:lo / divisor`, `lo = hi:lo % divisor`, signed. Two writes.
    Div {
        /// Dividend high word and quotient.
        hi: Reg,
        /// Dividend low word and remainder.
        lo: Reg,
        /// Divisor.
        divisor: Reg,
    },
    /// `dst = src << count` (negative count shifts right).
    ShiftArith {
        /// Destination.
        dst: Reg,
        /// Source.
        src: Reg,
        /// Register whose low six bits are the signed count.
        count: Reg,
    },
    /// 32-bit `hi:lo <<= count`. Two register writes.
    ShiftArith32 {
        /// High word.
        hi: Reg,
        /// Low word.
        lo: Reg,
        /// Register whose low six bits are the signed count.
        count: Reg,
    },
    /// Sets (`set = true`) or clears the condition codes in `mask`.
    ConditionCodes {
        /// Set or clear.
        set: bool,
        /// `N`/`Z`/`V`/`C` mask.
        mask: u16,
    },
    /// Evaluates condition codes for `value` by `formula`.
    EvalFlags {
        /// Rule.
        formula: FlagFormula,
        /// Register holding the result.
        value: Reg,
        /// Width.
        width: Width,
    },
    /// Checks the kernel stack pointer against the stack limit.
    StackGuard,
    /// Suppresses the trace trap for this instruction.
    InhibitTrace,
    /// Sets the processor priority in kernel mode.
    SetPriority {
        /// New priority level.
        level: u8,
    },
    /// Conditional branch to a static target.
    Branch {
        /// Condition.
        cond: BranchCondition,
        /// Address of the branch instruction.
        from: u16,
        /// Target when taken.
        target: u16,
    },
    /// Unconditional jump to the address held in `target`.
    Jump {
        /// Address of the jumping instruction.
        from: u16,
        /// Register holding the target.
        target: Reg,
    },
    /// Raises a trap and ends the instruction.
    RaiseTrap(TrapKind),
}

impl MicroOp {
    /// Returns `true` for micro-ops that end the instruction when they run.
    #[must_use]
    pub const fn is_control_transfer(&self) -> bool {
        matches!(
            self,
            Self::Halt | Self::Wait | Self::Branch { .. } | Self::Jump { .. } | Self::RaiseTrap(_)
        )
    }
}
