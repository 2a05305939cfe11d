//! Memory access primitive.
//!
//! Every operand and instruction-stream cycle goes through here: alignment
//! check, MMU translation, then dispatch to RAM, a core-internal register
//! (PSW and MMU registers), or the host [`IoBus`].

use super::{decode_physical, PhysicalRegion, Width, PSW_ADDR};
use crate::api::{CoreState, IoBus};
use crate::fault::{AccessFault, TrapKind};
use crate::mmu::AccessKind;
use crate::state::{Mode, PSW_T};

/// Places `value`'s low byte into the lane of `old` selected by `physical`.
#[must_use]
pub const fn merge_byte(old: u16, physical: u32, value: u16) -> u16 {
    if physical & 1 == 0 {
        (old & 0o177400) | (value & 0o377)
    } else {
        (old & 0o377) | ((value & 0o377) << 8)
    }
}

impl CoreState {
    /// Reads through the MMU in `mode`.
    ///
    /// Byte reads return the selected byte zero-extended.
    ///
    /// # Errors
    ///
    /// Returns [`AccessFault::OddAddress`] for a word read at an odd address,
    /// [`AccessFault::MmuAbort`] when translation aborts, and
    /// [`AccessFault::NonExistent`] when nothing answers at the physical
    /// address.
    pub fn read_virtual(
        &mut self,
        io: &mut dyn IoBus,
        mode: Mode,
        kind: AccessKind,
        vaddr: u16,
        width: Width,
    ) -> Result<u16, AccessFault> {
        if width == Width::Word && vaddr & 1 != 0 {
            return Err(AccessFault::OddAddress);
        }
        let physical = self.translate(mode, kind, vaddr)?;
        self.read_physical(io, physical, width)
    }

    /// Writes through the MMU in `mode`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`CoreState::read_virtual`].
    pub fn write_virtual(
        &mut self,
        io: &mut dyn IoBus,
        mode: Mode,
        vaddr: u16,
        value: u16,
        width: Width,
    ) -> Result<(), AccessFault> {
        if width == Width::Word && vaddr & 1 != 0 {
            return Err(AccessFault::OddAddress);
        }
        let physical = self.translate(mode, AccessKind::Write, vaddr)?;
        self.write_physical(io, physical, value, width)
    }

    /// Reads a physical address without translation.
    ///
    /// # Errors
    ///
    /// Returns [`AccessFault::NonExistent`] outside RAM when no internal
    /// register or device answers.
    pub fn read_physical(
        &mut self,
        io: &mut dyn IoBus,
        physical: u32,
        width: Width,
    ) -> Result<u16, AccessFault> {
        match decode_physical(physical, self.memory.len()) {
            PhysicalRegion::Ram(offset) => match width {
                Width::Word => self.memory.read_word(offset & !1),
                Width::Byte => self.memory.read_byte(offset).map(u16::from),
            }
            .ok_or(AccessFault::NonExistent),
            PhysicalRegion::IoPage => {
                let word = self.read_io_word(io, physical & !1)?;
                Ok(match width {
                    Width::Word => word,
                    Width::Byte if physical & 1 != 0 => word >> 8,
                    Width::Byte => word & 0o377,
                })
            }
            PhysicalRegion::NonExistent => Err(AccessFault::NonExistent),
        }
    }

    /// Writes a physical address without translation.
    ///
    /// Byte writes to device registers are forwarded with the byte in the low
    /// eight bits and the exact (possibly odd) address.
    ///
    /// # Errors
    ///
    /// Returns [`AccessFault::NonExistent`] when nothing answers.
    pub fn write_physical(
        &mut self,
        io: &mut dyn IoBus,
        physical: u32,
        value: u16,
        width: Width,
    ) -> Result<(), AccessFault> {
        match decode_physical(physical, self.memory.len()) {
            PhysicalRegion::Ram(offset) => {
                #[allow(clippy::cast_possible_truncation)]
                let written = match width {
                    Width::Word => self.memory.write_word(offset & !1, value),
                    Width::Byte => self.memory.write_byte(offset, value as u8),
                };
                if written {
                    Ok(())
                } else {
                    Err(AccessFault::NonExistent)
                }
            }
            PhysicalRegion::IoPage => self.write_io(io, physical, value, width),
            PhysicalRegion::NonExistent => Err(AccessFault::NonExistent),
        }
    }

    fn translate(&mut self, mode: Mode, kind: AccessKind, vaddr: u16) -> Result<u32, AccessFault> {
        let translation = self.mmu.translate(mode, kind, vaddr)?;
        if translation.trap {
            self.traps.raise(TrapKind::MmuTrap);
        }
        Ok(translation.physical)
    }

    fn read_io_word(&mut self, io: &mut dyn IoBus, physical: u32) -> Result<u16, AccessFault> {
        if physical == PSW_ADDR {
            return Ok(self.psw.bits());
        }
        if let Some(value) = self.mmu.read_register(physical) {
            return Ok(value);
        }
        io.read16(physical).map_err(|_| AccessFault::NonExistent)
    }

    fn write_io(
        &mut self,
        io: &mut dyn IoBus,
        physical: u32,
        value: u16,
        width: Width,
    ) -> Result<(), AccessFault> {
        let word_addr = physical & !1;
        let internal = word_addr == PSW_ADDR || self.mmu.read_register(word_addr).is_some();
        if !internal {
            return io
                .write16(physical, value & width.mask(), width == Width::Byte)
                .map_err(|_| AccessFault::NonExistent);
        }

        let merged = match width {
            Width::Word => value,
            Width::Byte => merge_byte(self.read_io_word(io, word_addr)?, physical, value),
        };
        if word_addr == PSW_ADDR {
            let trace = self.psw.bits() & PSW_T;
            self.psw.set_bits((merged & !PSW_T) | trace);
            self.psw_written = true;
        } else {
            self.mmu.write_register(word_addr, merged);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::merge_byte;
    use crate::api::{CoreState, IoBus, IoError, NoDevices};
    use crate::fault::AccessFault;
    use crate::memory::{Width, PSW_ADDR};
    use crate::mmu::{AccessKind, MMR0_ADDR, MMR0_ENABLE};
    use crate::state::{Mode, PSW_T};

    fn read_kernel(
        state: &mut CoreState,
        io: &mut dyn IoBus,
        vaddr: u16,
        width: Width,
    ) -> Result<u16, AccessFault> {
        state.read_virtual(io, Mode::Kernel, AccessKind::Read, vaddr, width)
    }

    #[derive(Default)]
    struct Recorder {
        writes: Vec<(u32, u16, bool)>,
    }

    impl IoBus for Recorder {
        fn read16(&mut self, addr: u32) -> Result<u16, IoError> {
            if addr == 0o17777560 {
                Ok(0o200)
            } else {
                Err(IoError::NonExistent)
            }
        }

        fn write16(&mut self, addr: u32, value: u16, byte: bool) -> Result<(), IoError> {
            self.writes.push((addr, value, byte));
            Ok(())
        }
    }

    #[test]
    fn byte_lanes_merge_by_address_parity() {
        assert_eq!(merge_byte(0o177777, 0o100, 0o12), 0o177412);
        assert_eq!(merge_byte(0o177777, 0o101, 0o12), 0o5377);
    }

    #[test]
    fn word_access_at_odd_address_faults_before_translation() {
        let mut state = CoreState::default();
        let err = read_kernel(&mut state, &mut NoDevices, 0o1001, Width::Word);
        assert_eq!(err, Err(AccessFault::OddAddress));
        let byte = read_kernel(&mut state, &mut NoDevices, 0o1001, Width::Byte);
        assert_eq!(byte, Ok(0));
    }

    #[test]
    fn odd_byte_writes_land_in_high_lane() {
        let mut state = CoreState::default();
        state
            .write_virtual(&mut NoDevices, Mode::Kernel, 0o1001, 0o377, Width::Byte)
            .unwrap();
        assert_eq!(state.examine_word(0o1000), Some(0o177400));
    }

    #[test]
    fn psw_is_reachable_through_the_io_page() {
        let mut state = CoreState::default();
        let psw = 0o17 | PSW_T;
        state
            .write_virtual(&mut NoDevices, Mode::Kernel, 0o177776, psw, Width::Word)
            .unwrap();
        assert_eq!(state.psw.bits(), 0o17);
        assert!(state.psw_written);
        let read = state.read_physical(&mut NoDevices, PSW_ADDR, Width::Word);
        assert_eq!(read, Ok(0o17));
    }

    #[test]
    fn mmu_registers_are_serviced_by_the_core() {
        let mut state = CoreState::default();
        let mmr0 = MMR0_ENABLE;
        state
            .write_virtual(&mut NoDevices, Mode::Kernel, 0o177572, mmr0, Width::Byte)
            .unwrap();
        assert!(state.mmu.enabled());
        let read = state.read_physical(&mut NoDevices, MMR0_ADDR, Width::Word);
        assert_eq!(read, Ok(1));
    }

    #[test]
    fn device_registers_are_forwarded_to_the_bus() {
        let mut state = CoreState::default();
        let mut io = Recorder::default();
        let status = read_kernel(&mut state, &mut io, 0o177560, Width::Word);
        assert_eq!(status, Ok(0o200));
        state
            .write_virtual(&mut io, Mode::Kernel, 0o177567, 0o1101, Width::Byte)
            .unwrap();
        assert_eq!(io.writes, vec![(0o17777567, 0o101, true)]);
        let missing = read_kernel(&mut state, &mut io, 0o177000, Width::Word);
        assert_eq!(missing, Err(AccessFault::NonExistent));
    }

    #[test]
    fn ram_beyond_configured_size_is_nonexistent() {
        let mut state = CoreState::default();
        let past = u32::try_from(state.memory.len()).unwrap();
        assert_eq!(
            state.read_physical(&mut NoDevices, past, Width::Word),
            Err(AccessFault::NonExistent)
        );
    }
}
