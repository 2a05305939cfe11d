//! Host-facing configuration, CPU context, and device bus contract.

use thiserror::Error;

use crate::bpred::BranchPredictor;
use crate::exception::PendingTraps;
use crate::interrupts::InterruptLines;
use crate::memory::{PhysicalMemory, MAX_RAM_BYTES};
use crate::mmu::{Mmu, MmuVariant};
use crate::state::{Psw, Reg, RegisterFile, RunState};
use crate::CoreError;

/// Default RAM size (256 KiB).
pub const DEFAULT_MEMORY_BYTES: usize = 256 * 1024;
/// Default power-up `PSW`: kernel mode, priority 7.
pub const DEFAULT_BOOT_PSW: u16 = 0o340;

/// CPU model selecting memory-management behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CpuModel {
    /// PDP-11/34: 18-bit mapping, no memory-management traps.
    Pdp1134,
    /// PDP-11/70: 22-bit mapping, I/D space, soft memory-management traps.
    #[default]
    Pdp1170,
}

impl CpuModel {
    /// Returns the MMU access-control variant for this model.
    #[must_use]
    pub const fn mmu_variant(self) -> MmuVariant {
        match self {
            Self::Pdp1134 => MmuVariant::Pdp1134,
            Self::Pdp1170 => MmuVariant::Pdp1170,
        }
    }
}

/// Construction-time configuration for one CPU context.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CoreConfig {
    /// CPU model.
    pub model: CpuModel,
    /// RAM size in bytes.
    pub memory_bytes: usize,
    /// Initial program counter.
    pub boot_pc: u16,
    /// Initial processor status word.
    pub boot_psw: u16,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            model: CpuModel::Pdp1170,
            memory_bytes: DEFAULT_MEMORY_BYTES,
            boot_pc: 0,
            boot_psw: DEFAULT_BOOT_PSW,
        }
    }
}

/// Rejected [`CoreConfig`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    /// RAM size is zero.
    #[error("memory size must be non-zero")]
    EmptyMemory,
    /// RAM size is not a whole number of words.
    #[error("memory size {bytes} is not a multiple of two")]
    OddMemorySize {
        /// Requested size.
        bytes: usize,
    },
    /// RAM would shadow the I/O page.
    #[error("memory size {bytes} overlaps the I/O page")]
    MemoryOverlapsIoPage {
        /// Requested size.
        bytes: usize,
    },
    /// Boot PC is odd.
    #[error("boot pc {pc:#o} is odd")]
    OddBootPc {
        /// Requested PC.
        pc: u16,
    },
}

impl CoreConfig {
    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_bytes == 0 {
            return Err(ConfigError::EmptyMemory);
        }
        if self.memory_bytes % 2 != 0 {
            return Err(ConfigError::OddMemorySize {
                bytes: self.memory_bytes,
            });
        }
        if self.memory_bytes > MAX_RAM_BYTES {
            return Err(ConfigError::MemoryOverlapsIoPage {
                bytes: self.memory_bytes,
            });
        }
        if self.boot_pc & 1 != 0 {
            return Err(ConfigError::OddBootPc { pc: self.boot_pc });
        }
        Ok(())
    }
}

/// Device bus failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum IoError {
    /// No device register answers at the address.
    #[error("no device at address")]
    NonExistent,
}

/// Device side of the I/O page, implemented by the host.
///
/// Addresses are 22-bit physical addresses inside the I/O page. The core
/// services the `PSW` and MMU registers itself and never forwards them.
pub trait IoBus {
    /// Reads a device register word.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::NonExistent`] when no register answers; the core
    /// turns this into a bus-error trap.
    fn read16(&mut self, addr: u32) -> Result<u16, IoError>;

    /// Writes a device register. For byte writes `addr` may be odd and the
    /// byte is in the low eight bits of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::NonExistent`] when no register answers.
    fn write16(&mut self, addr: u32, value: u16, byte: bool) -> Result<(), IoError>;

    /// Called once per step so devices can assert or drop request lines.
    fn poll(&mut self, _lines: &mut InterruptLines) {}

    /// Bus `RESET` issued by the CPU.
    fn reset(&mut self) {}
}

/// Bus with no devices attached. Every device access is a bus error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NoDevices;

impl IoBus for NoDevices {
    fn read16(&mut self, _addr: u32) -> Result<u16, IoError> {
        Err(IoError::NonExistent)
    }

    fn write16(&mut self, _addr: u32, _value: u16, _byte: bool) -> Result<(), IoError> {
        Err(IoError::NonExistent)
    }
}

/// Result of one [`crate::step_one`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// An instruction completed with no exception entered.
    Retired,
    /// A trap or interrupt was entered through `vector`.
    Trapped {
        /// Vector whose handler now runs.
        vector: u16,
    },
    /// The CPU is in `WAIT` and nothing is pending.
    Waiting,
    /// The CPU is halted.
    Halted,
}

/// Aggregated result of [`crate::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunOutcome {
    /// Steps taken.
    pub steps: u64,
    /// Outcome of the last step.
    pub final_step: StepOutcome,
}

/// Complete context of one emulated CPU.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreState {
    /// Configuration the context was built from.
    pub config: CoreConfig,
    /// Register file.
    pub regs: RegisterFile,
    /// Processor status word.
    pub psw: Psw,
    /// RAM.
    pub memory: PhysicalMemory,
    /// Memory management unit.
    pub mmu: Mmu,
    /// Branch predictor.
    pub predictor: BranchPredictor,
    /// Pending trap flags.
    pub traps: PendingTraps,
    /// Asserted device interrupt lines.
    pub interrupts: InterruptLines,
    /// Execution state.
    pub run_state: RunState,
    /// The `PSW` was written through the I/O page during this instruction.
    pub(crate) psw_written: bool,
    /// Trace trap recognition is deferred past this instruction.
    pub(crate) trace_inhibit: bool,
}

impl Default for CoreState {
    fn default() -> Self {
        Self::with_config(&CoreConfig::default())
    }
}

impl CoreState {
    /// Creates a powered-up context. `config` is assumed valid.
    #[must_use]
    pub fn with_config(config: &CoreConfig) -> Self {
        let mut state = Self {
            config: config.clone(),
            regs: RegisterFile::default(),
            psw: Psw::from_bits(config.boot_psw),
            memory: PhysicalMemory::new(config.memory_bytes),
            mmu: Mmu::new(config.model.mmu_variant()),
            predictor: BranchPredictor::new(),
            traps: PendingTraps::default(),
            interrupts: InterruptLines::default(),
            run_state: RunState::Running,
            psw_written: false,
            trace_inhibit: false,
        };
        state.regs.set_pc(config.boot_pc);
        state
    }

    /// Validates `config` and creates a powered-up context.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] reported by [`CoreConfig::validate`].
    pub fn try_new(config: &CoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    /// Host power-up reset. RAM contents survive.
    pub fn reset(&mut self) {
        let memory = std::mem::replace(&mut self.memory, PhysicalMemory::new(0));
        let config = self.config.clone();
        *self = Self::with_config(&config);
        self.memory = memory;
    }

    /// Reads a register as the current mode sees it.
    #[must_use]
    pub const fn reg(&self, reg: Reg) -> u16 {
        self.regs.get(reg, self.psw)
    }

    /// Writes a register as the current mode sees it.
    pub const fn set_reg(&mut self, reg: Reg, value: u16) {
        self.regs.set(reg, self.psw, value);
    }

    /// Returns the program counter.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.regs.pc()
    }

    /// Sets the program counter.
    pub const fn set_pc(&mut self, value: u16) {
        self.regs.set_pc(value);
    }

    /// Returns the latched internal error, if any.
    #[must_use]
    pub const fn latched_error(&self) -> Option<CoreError> {
        self.run_state.latched_error()
    }

    /// Writes a word of RAM by physical address. Returns `false` outside RAM
    /// or at an odd address.
    pub fn deposit_word(&mut self, physical: u32, value: u16) -> bool {
        physical & 1 == 0 && self.memory.write_word(physical as usize, value)
    }

    /// Reads a word of RAM by physical address.
    #[must_use]
    pub fn examine_word(&self, physical: u32) -> Option<u16> {
        if physical & 1 != 0 {
            return None;
        }
        self.memory.read_word(physical as usize)
    }

    /// Deposits consecutive words starting at `physical`. Returns `false`
    /// and stops at the first word that does not fit.
    pub fn load_words(&mut self, physical: u32, words: &[u16]) -> bool {
        let mut addr = physical;
        for &word in words {
            if !self.deposit_word(addr, word) {
                return false;
            }
            addr += 2;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, CoreState, CpuModel, DEFAULT_BOOT_PSW};
    use crate::mmu::MmuVariant;
    use crate::state::{Mode, Reg, RunState};

    #[test]
    fn default_config_is_valid_and_boots_in_kernel_at_priority_seven() {
        let config = CoreConfig::default();
        assert_eq!(config.validate(), Ok(()));
        let state = CoreState::with_config(&config);
        assert_eq!(state.psw.bits(), DEFAULT_BOOT_PSW);
        assert_eq!(state.psw.mode(), Mode::Kernel);
        assert_eq!(state.psw.ipl(), 7);
        assert_eq!(state.pc(), 0);
        assert_eq!(state.run_state, RunState::Running);
        assert_eq!(state.mmu.variant(), MmuVariant::Pdp1170);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let odd = CoreConfig {
            memory_bytes: 1023,
            ..CoreConfig::default()
        };
        assert_eq!(
            CoreState::try_new(&odd).err(),
            Some(ConfigError::OddMemorySize { bytes: 1023 })
        );
        let empty = CoreConfig {
            memory_bytes: 0,
            ..CoreConfig::default()
        };
        assert_eq!(empty.validate(), Err(ConfigError::EmptyMemory));
        let huge = CoreConfig {
            memory_bytes: 4 * 1024 * 1024,
            ..CoreConfig::default()
        };
        assert!(matches!(
            huge.validate(),
            Err(ConfigError::MemoryOverlapsIoPage { .. })
        ));
        let pc = CoreConfig {
            boot_pc: 0o1001,
            ..CoreConfig::default()
        };
        assert_eq!(pc.validate(), Err(ConfigError::OddBootPc { pc: 0o1001 }));
        assert_eq!(
            ConfigError::OddBootPc { pc: 0o1001 }.to_string(),
            "boot pc 0o1001 is odd"
        );
    }

    #[test]
    fn model_selects_mmu_variant() {
        let config = CoreConfig {
            model: CpuModel::Pdp1134,
            ..CoreConfig::default()
        };
        let state = CoreState::with_config(&config);
        assert_eq!(state.mmu.variant(), MmuVariant::Pdp1134);
    }

    #[test]
    fn deposit_and_examine_round_through_ram() {
        let mut state = CoreState::with_config(&CoreConfig {
            memory_bytes: 0o1000,
            ..CoreConfig::default()
        });
        assert!(state.load_words(0o770, &[1, 2, 3, 4]));
        assert_eq!(state.examine_word(0o776), Some(4));
        assert!(!state.load_words(0o774, &[5, 6, 7]));
        assert_eq!(state.examine_word(0o776), Some(6));
        assert!(!state.deposit_word(0o101, 1));
        assert_eq!(state.examine_word(0o1000), None);
    }

    #[test]
    fn reset_preserves_memory_and_restores_boot_state() {
        let mut state = CoreState::with_config(&CoreConfig {
            boot_pc: 0o1000,
            ..CoreConfig::default()
        });
        assert!(state.deposit_word(0o2000, 0o12345));
        state.set_reg(Reg::R3, 7);
        state.set_pc(0o4000);
        state.run_state = RunState::Halted;
        state.reset();
        assert_eq!(state.examine_word(0o2000), Some(0o12345));
        assert_eq!(state.reg(Reg::R3), 0);
        assert_eq!(state.pc(), 0o1000);
        assert_eq!(state.run_state, RunState::Running);
    }
}
