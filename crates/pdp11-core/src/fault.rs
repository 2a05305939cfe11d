use thiserror::Error;

use crate::mmu::MmuFault;

/// Pending exception classes, one one-shot flag each.
///
/// Declaration order is the service priority: hardware aborts first, then
/// decode faults, then trap instructions, then post-instruction traps.
/// Interrupts are not listed here; they are serviced after every class below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum TrapKind {
    /// Word access (or instruction fetch) at an odd address.
    OddAddress = 0,
    /// Access to nonexistent memory or a device that rejected the cycle.
    BusError = 1,
    /// Memory management abort (non-resident, length or read-only).
    MmuAbort = 2,
    /// Illegal instruction (`JMP`/`JSR` to a register, `HALT` outside kernel).
    Illegal = 3,
    /// Reserved (unassigned) instruction.
    Reserved = 4,
    /// `BPT` instruction.
    Breakpoint = 5,
    /// `IOT` instruction.
    Iot = 6,
    /// `EMT` instruction.
    Emt = 7,
    /// `TRAP` instruction.
    Trap = 8,
    /// Kernel stack pushed below the stack limit.
    StackOverflow = 9,
    /// Memory management trap (access-control soft trap).
    MmuTrap = 10,
    /// Trace trap (`T` bit set at the end of an instruction).
    Trace = 11,
}

impl TrapKind {
    /// Every trap class in service-priority order.
    pub const PRIORITY: [Self; 12] = [
        Self::OddAddress,
        Self::BusError,
        Self::MmuAbort,
        Self::Illegal,
        Self::Reserved,
        Self::Breakpoint,
        Self::Iot,
        Self::Emt,
        Self::Trap,
        Self::StackOverflow,
        Self::MmuTrap,
        Self::Trace,
    ];

    /// Returns the trap vector address for this class.
    #[must_use]
    pub const fn vector(self) -> u16 {
        match self {
            Self::OddAddress | Self::BusError | Self::Illegal | Self::StackOverflow => 0o4,
            Self::Reserved => 0o10,
            Self::Breakpoint | Self::Trace => 0o14,
            Self::Iot => 0o20,
            Self::Emt => 0o30,
            Self::Trap => 0o34,
            Self::MmuAbort | Self::MmuTrap => 0o250,
        }
    }

    /// Returns the pending-flag bit for this class.
    #[must_use]
    pub const fn bit(self) -> u16 {
        1 << (self as u8)
    }

    /// Aborts cancel the rest of the instruction and leave it incomplete.
    #[must_use]
    pub const fn is_abort(self) -> bool {
        matches!(self, Self::OddAddress | Self::BusError | Self::MmuAbort)
    }
}

/// Failure of a single memory cycle issued through the access primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum AccessFault {
    /// Word access at an odd virtual address.
    #[error("odd address")]
    OddAddress,
    /// Physical address has no memory or device behind it.
    #[error("nonexistent memory")]
    NonExistent,
    /// Address translation aborted the access.
    #[error("memory management abort: {0}")]
    MmuAbort(#[from] MmuFault),
}

impl AccessFault {
    /// Returns the pending trap class this fault raises.
    #[must_use]
    pub const fn trap_kind(self) -> TrapKind {
        match self {
            Self::OddAddress => TrapKind::OddAddress,
            Self::NonExistent => TrapKind::BusError,
            Self::MmuAbort(_) => TrapKind::MmuAbort,
        }
    }
}

/// Fatal internal conditions. Any of these stops the core for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CoreError {
    /// The encoder emitted more micro-ops than the pipeline holds.
    #[error("micro-op pipeline overflow: {attempted} entries exceed capacity {capacity}")]
    PipelineOverflow {
        /// Number of entries the encoder tried to hold.
        attempted: usize,
        /// Fixed pipeline capacity.
        capacity: usize,
    },
    /// A single micro-op posted a third register write.
    #[error("micro-op {index} posted more than two register writes")]
    WritePortConflict {
        /// Position of the offending micro-op in its pipeline.
        index: usize,
    },
    /// An exception entry sequence faulted and could not be recovered.
    #[error("double fault while entering trap vector {vector:#o}")]
    DoubleFault {
        /// Vector whose entry sequence failed.
        vector: u16,
    },
}
