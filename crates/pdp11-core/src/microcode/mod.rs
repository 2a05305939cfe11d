//! Micro-op vocabulary, the per-instruction pipeline, and the encoder.

/// Instruction-to-micro-op translation.
pub mod encoder;
/// Bounded per-instruction micro-op sequence.
pub mod pipeline;
/// Micro-op vocabulary.
pub mod uop;

pub use encoder::{encode, encode_exception_entry};
pub use pipeline::{Pipeline, PIPELINE_CAPACITY};
pub use uop::{
    Access, AluOp, BranchCondition, FlagFormula, MicroOp, ModeSelect, PswLoad, ShiftOp, Space,
};
