//! PDP-11 CPU core built as a binary recompiler.
//!
//! Each fetched instruction is translated into a short sequence of micro-ops
//! which an internal engine drains against the register file, `PSW` and
//! memory. The MMU, branch predictor and exception controller sit around
//! that loop.

/// Host-facing configuration, CPU context and device bus contract.
pub mod api;
pub use api::{
    ConfigError, CoreConfig, CoreState, CpuModel, IoBus, IoError, NoDevices, RunOutcome,
    StepOutcome, DEFAULT_BOOT_PSW, DEFAULT_MEMORY_BYTES,
};

/// Architectural register file, `PSW` and run state.
pub mod state;
pub use state::{
    ConditionCodes, Mode, Psw, Reg, RegisterFile, RunState, GENERAL_REGISTER_COUNT, PSW_C,
    PSW_CC_MASK, PSW_N, PSW_PRIORITY_MASK, PSW_REGISTER_SET, PSW_T, PSW_V, PSW_Z,
    SCRATCH_REGISTER_COUNT,
};

/// Physical memory, the I/O page map and the access primitive.
pub mod memory;
pub use memory::{PhysicalMemory, PhysicalRegion, Width, IO_PAGE_BASE, PSW_ADDR};

/// Memory management unit.
pub mod mmu;
pub use mmu::{AccessKind, Mmu, MmuFault, MmuVariant, Translation};

/// Fault and trap taxonomy.
pub mod fault;
pub use fault::{AccessFault, CoreError, TrapKind};

/// Opcode table and structural classification.
pub mod encoding;
pub use encoding::{classify, decode_opcode, Classification, Opcode, Shape, OPCODE_PATTERN_TABLE};

/// Operand field extraction.
pub mod decoder;
pub use decoder::{AddressingMode, Instruction, Operand, MAX_EXTENSION_WORDS};

/// Instruction fetch stage.
pub mod fetch;
pub use fetch::{fetch_and_classify, FetchOutcome};

/// Micro-op vocabulary, pipeline and encoder.
pub mod microcode;
pub use microcode::{encode, encode_exception_entry, MicroOp, Pipeline, PIPELINE_CAPACITY};

/// Micro-op execution engine.
pub mod execute;
pub use execute::{execute, ExecOutcome};

/// Branch outcome predictor.
pub mod bpred;
pub use bpred::{BranchPredictor, Prediction, PREDICTOR_TABLE_SIZE};

/// Device interrupt lines.
pub mod interrupts;
pub use interrupts::{InterruptLine, InterruptLines, PendingInterrupt};

/// Pending traps and exception entry.
pub mod exception;
pub use exception::{service, PendingTraps};

/// Instruction cycle driver.
pub mod cycle;
pub use cycle::{run, step_one};

/// MACRO-11 style disassembler.
pub mod disasm;
pub use disasm::{disassemble, disassemble_range, DisassemblyRow};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tracing_subscriber as _;
