//! Architectural CPU state: register file, processor status word, run state.

/// Processor status word and condition codes.
pub mod psw;
/// Banked register file and micro-engine scratch registers.
pub mod registers;
/// Execution state machine.
pub mod run_state;

pub use psw::{
    ConditionCodes, Mode, Psw, PSW_C, PSW_CC_MASK, PSW_N, PSW_PRIORITY_MASK, PSW_REGISTER_SET,
    PSW_T, PSW_V, PSW_Z,
};
pub use registers::{Reg, RegisterFile, GENERAL_REGISTER_COUNT, SCRATCH_REGISTER_COUNT};
pub use run_state::RunState;
