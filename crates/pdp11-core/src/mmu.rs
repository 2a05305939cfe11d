//! Memory management unit: virtual-to-physical translation, page protection,
//! and the MMR0-MMR3 status registers.
//!
//! Sixty-four PDR/PAR pairs are held, one per `{mode, space, page}`. A
//! translation either succeeds (optionally requesting a memory-management
//! trap after the instruction) or aborts with an [`MmuFault`] whose cause is
//! latched into MMR0. Abort causes are sticky: while any abort bit is set,
//! MMR0-MMR2 are frozen so the handler can inspect the first failure.

use thiserror::Error;

use crate::state::Mode;

/// MMR0 abort: page not resident.
pub const MMR0_ABORT_NON_RESIDENT: u16 = 1 << 15;
/// MMR0 abort: page length error.
pub const MMR0_ABORT_PAGE_LENGTH: u16 = 1 << 14;
/// MMR0 abort: write to a read-only page.
pub const MMR0_ABORT_READ_ONLY: u16 = 1 << 13;
/// MMR0 memory-management trap flag.
pub const MMR0_TRAP_FLAG: u16 = 1 << 12;
/// MMR0 memory-management trap enable.
pub const MMR0_TRAP_ENABLE: u16 = 1 << 9;
/// MMR0 relocation enable.
pub const MMR0_ENABLE: u16 = 1;
/// All MMR0 abort cause bits.
pub const MMR0_ABORT_MASK: u16 =
    MMR0_ABORT_NON_RESIDENT | MMR0_ABORT_PAGE_LENGTH | MMR0_ABORT_READ_ONLY;
/// MMR0 bits software may write.
pub const MMR0_WRITABLE_MASK: u16 = 0o171401;
/// MMR0 bits describing the faulting page (mode, space, page number).
const MMR0_PAGE_INFO_MASK: u16 = 0o000176;

/// MMR3 22-bit mapping enable.
pub const MMR3_22BIT: u16 = 1 << 4;
/// MMR3 bits software may write.
pub const MMR3_WRITABLE_MASK: u16 = 0o77;

/// PDR accessed bit.
pub const PDR_ACCESSED: u16 = 1 << 7;
/// PDR written bit.
pub const PDR_WRITTEN: u16 = 1 << 6;
/// PDR expansion-direction bit (set = downward).
pub const PDR_EXPAND_DOWN: u16 = 1 << 3;
/// PDR bits software may write.
pub const PDR_WRITABLE_MASK: u16 = 0o77417;

/// Physical address of MMR0.
pub const MMR0_ADDR: u32 = 0o17777572;
/// Physical address of MMR1.
pub const MMR1_ADDR: u32 = 0o17777574;
/// Physical address of MMR2.
pub const MMR2_ADDR: u32 = 0o17777576;
/// Physical address of MMR3.
pub const MMR3_ADDR: u32 = 0o17772516;
/// Base of the kernel PDR/PAR bank.
pub const KERNEL_BANK_ADDR: u32 = 0o17772300;
/// Base of the supervisor PDR/PAR bank.
pub const SUPERVISOR_BANK_ADDR: u32 = 0o17772200;
/// Base of the user PDR/PAR bank.
pub const USER_BANK_ADDR: u32 = 0o17777600;

/// Size in bytes of one PDR/PAR bank (16 PDRs then 16 PARs).
const BANK_BYTES: u32 = 0o100;
/// Start of the 22-bit I/O page.
const IO_PAGE_22: u32 = 0o17760000;
/// Start of the 18-bit I/O page before folding.
const IO_PAGE_18: u32 = 0o760000;
/// First virtual address of the unmapped I/O window.
const UNMAPPED_IO_WINDOW: u16 = 0o160000;

/// Access-control semantics for read/write pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MmuVariant {
    /// 11/34: no memory-management traps; trapping codes hard-abort writes to
    /// unmarked pages. 18-bit physical addressing only.
    Pdp1134,
    /// 11/70: trapping codes raise a soft trap and set the written bit.
    /// 22-bit addressing through MMR3.
    #[default]
    Pdp1170,
}

/// Class of a memory cycle presented to the MMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// First word of an instruction. Updates MMR2.
    Fetch,
    /// Instruction-stream operand word (index or immediate).
    InstructionStream,
    /// Data read.
    Read,
    /// Data write.
    Write,
}

impl AccessKind {
    /// Returns `true` for writes.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Write)
    }

    /// Returns `true` for instruction-space cycles.
    #[must_use]
    pub const fn is_instruction(self) -> bool {
        matches!(self, Self::Fetch | Self::InstructionStream)
    }
}

/// Translation abort cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum MmuFault {
    /// Access control field marks the page non-resident.
    #[error("page not resident")]
    NonResident,
    /// Block number lies outside the page length.
    #[error("page length error")]
    PageLength,
    /// Write to a read-only page.
    #[error("write to read-only page")]
    ReadOnly,
}

impl MmuFault {
    /// Returns the MMR0 cause bit for this fault.
    #[must_use]
    pub const fn cause_bit(self) -> u16 {
        match self {
            Self::NonResident => MMR0_ABORT_NON_RESIDENT,
            Self::PageLength => MMR0_ABORT_PAGE_LENGTH,
            Self::ReadOnly => MMR0_ABORT_READ_ONLY,
        }
    }
}

/// Successful translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Translation {
    /// 22-bit physical address.
    pub physical: u32,
    /// A memory-management trap is requested after the instruction.
    pub trap: bool,
}

/// Outcome of the access-control check for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Allow,
    Trap,
    Abort(MmuFault),
}

/// Page tables and control registers of the memory management unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Mmu {
    variant: MmuVariant,
    pdr: [[u16; 16]; 4],
    par: [[u16; 16]; 4],
    mmr0: u16,
    mmr1: u16,
    mmr2: u16,
    mmr3: u16,
}

impl Mmu {
    /// Creates a disabled MMU with cleared page tables.
    #[must_use]
    pub fn new(variant: MmuVariant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    /// Returns the access-control variant.
    #[must_use]
    pub const fn variant(&self) -> MmuVariant {
        self.variant
    }

    /// Returns `true` when relocation is enabled.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.mmr0 & MMR0_ENABLE != 0
    }

    /// Returns `true` while an abort is latched and MMR0-MMR2 are frozen.
    #[must_use]
    pub const fn frozen(&self) -> bool {
        self.mmr0 & MMR0_ABORT_MASK != 0
    }

    /// Returns MMR0.
    #[must_use]
    pub const fn mmr0(&self) -> u16 {
        self.mmr0
    }

    /// Returns MMR1.
    #[must_use]
    pub const fn mmr1(&self) -> u16 {
        self.mmr1
    }

    /// Returns MMR2.
    #[must_use]
    pub const fn mmr2(&self) -> u16 {
        self.mmr2
    }

    /// Returns MMR3.
    #[must_use]
    pub const fn mmr3(&self) -> u16 {
        self.mmr3
    }

    /// Writes MMR0 through its software-writable mask.
    pub const fn write_mmr0(&mut self, value: u16) {
        self.mmr0 = (self.mmr0 & !MMR0_WRITABLE_MASK) | (value & MMR0_WRITABLE_MASK);
    }

    /// Writes MMR3 through its software-writable mask. Ignored on the 11/34.
    pub const fn write_mmr3(&mut self, value: u16) {
        if matches!(self.variant, MmuVariant::Pdp1170) {
            self.mmr3 = value & MMR3_WRITABLE_MASK;
        }
    }

    /// Returns the PDR for `{mode, space, page}`.
    #[must_use]
    pub const fn pdr(&self, mode: Mode, data_space: bool, page: usize) -> u16 {
        self.pdr[mode.index()][slot(data_space, page)]
    }

    /// Returns the PAR for `{mode, space, page}`.
    #[must_use]
    pub const fn par(&self, mode: Mode, data_space: bool, page: usize) -> u16 {
        self.par[mode.index()][slot(data_space, page)]
    }

    /// Writes a PDR; the accessed and written bits are cleared.
    pub const fn set_pdr(&mut self, mode: Mode, data_space: bool, page: usize, value: u16) {
        self.pdr[mode.index()][slot(data_space, page)] = value & PDR_WRITABLE_MASK;
    }

    /// Writes a PAR; the matching PDR's accessed and written bits are cleared.
    pub const fn set_par(&mut self, mode: Mode, data_space: bool, page: usize, value: u16) {
        let slot = slot(data_space, page);
        self.par[mode.index()][slot] = value;
        self.pdr[mode.index()][slot] &= !(PDR_ACCESSED | PDR_WRITTEN);
    }

    /// Bus `RESET`: clears MMR0 and MMR3.
    pub fn reset(&mut self) {
        self.mmr0 = 0;
        self.mmr3 = 0;
        tracing::debug!("mmu reset");
    }

    /// Clears MMR1 at the start of an instruction unless an abort is latched.
    pub const fn begin_instruction(&mut self) {
        if !self.frozen() {
            self.mmr1 = 0;
        }
    }

    /// Records an autoincrement/autodecrement of `register` by `delta` in MMR1.
    ///
    /// The first change lands in the low byte, the second in the high byte.
    pub const fn record_register_change(&mut self, register: u16, delta: i16) {
        if self.frozen() {
            return;
        }
        #[allow(clippy::cast_sign_loss)]
        let entry = (((delta as u16) & 0o37) << 3) | (register & 0o7);
        if self.mmr1 & 0o377 == 0 {
            self.mmr1 = entry;
        } else {
            self.mmr1 = (self.mmr1 & 0o377) | (entry << 8);
        }
    }

    /// Translates `vaddr` for an access of `kind` in `mode`.
    ///
    /// # Errors
    ///
    /// Returns the highest-priority [`MmuFault`] when the page is not
    /// resident, the block lies outside the page length, or a write targets
    /// a read-only page. The cause is latched into MMR0 unless an earlier
    /// abort is still pending.
    pub fn translate(
        &mut self,
        mode: Mode,
        kind: AccessKind,
        vaddr: u16,
    ) -> Result<Translation, MmuFault> {
        if matches!(kind, AccessKind::Fetch) && !self.frozen() {
            self.mmr2 = vaddr;
        }
        if !self.enabled() {
            return Ok(Translation {
                physical: unmapped(vaddr),
                trap: false,
            });
        }

        let page = usize::from(vaddr >> 13);
        let displacement = vaddr & 0o17777;
        let block = (displacement >> 6) & 0o177;
        let data_space = !kind.is_instruction() && self.data_space_enabled(mode);
        let slot = slot(data_space, page);
        let pdr = self.pdr[mode.index()][slot];

        let length = (pdr >> 8) & 0o177;
        let length_error = if pdr & PDR_EXPAND_DOWN != 0 {
            block < length
        } else {
            block > length
        };

        let access = self.access_control(pdr, kind.is_write());
        let mut causes = 0;
        if let Access::Abort(fault) = access {
            causes |= fault.cause_bit();
        }
        if length_error {
            causes |= MMR0_ABORT_PAGE_LENGTH;
        }
        if causes != 0 {
            return Err(self.latch_abort(causes, mode, data_space, page));
        }

        let mut trap = false;
        if access == Access::Trap {
            if self.mmr0 & (MMR0_ABORT_MASK | MMR0_TRAP_FLAG) == 0 {
                self.mmr0 |= MMR0_TRAP_FLAG;
            }
            trap = self.mmr0 & MMR0_TRAP_ENABLE != 0;
        }
        self.pdr[mode.index()][slot] |= if kind.is_write() {
            PDR_ACCESSED | PDR_WRITTEN
        } else {
            PDR_ACCESSED
        };

        let par = self.par[mode.index()][slot];
        let physical = (u32::from(par) << 6) + u32::from(displacement);
        Ok(Translation {
            physical: self.fold_physical(physical),
            trap,
        })
    }

    /// Reads an MMU register mapped into the I/O page.
    #[must_use]
    pub const fn read_register(&self, physical: u32) -> Option<u16> {
        match physical {
            MMR0_ADDR => Some(self.mmr0),
            MMR1_ADDR => Some(self.mmr1),
            MMR2_ADDR => Some(self.mmr2),
            MMR3_ADDR => match self.variant {
                MmuVariant::Pdp1170 => Some(self.mmr3),
                MmuVariant::Pdp1134 => None,
            },
            _ => match bank_register(physical) {
                Some((mode, false, slot)) => Some(self.pdr[mode][slot]),
                Some((mode, true, slot)) => Some(self.par[mode][slot]),
                None => None,
            },
        }
    }

    /// Writes an MMU register mapped into the I/O page. Returns `false` when
    /// `physical` names no MMU register.
    pub const fn write_register(&mut self, physical: u32, value: u16) -> bool {
        match physical {
            MMR0_ADDR => self.write_mmr0(value),
            MMR1_ADDR | MMR2_ADDR => {}
            MMR3_ADDR => {
                if matches!(self.variant, MmuVariant::Pdp1134) {
                    return false;
                }
                self.write_mmr3(value);
            }
            _ => match bank_register(physical) {
                Some((mode, false, slot)) => self.pdr[mode][slot] = value & PDR_WRITABLE_MASK,
                Some((mode, true, slot)) => {
                    self.par[mode][slot] = value;
                    self.pdr[mode][slot] &= !(PDR_ACCESSED | PDR_WRITTEN);
                }
                None => return false,
            },
        }
        true
    }

    const fn data_space_enabled(&self, mode: Mode) -> bool {
        let bit = match mode {
            Mode::Kernel => 1 << 2,
            Mode::Supervisor => 1 << 1,
            Mode::User => 1,
            Mode::Undefined => 0,
        };
        self.mmr3 & bit != 0
    }

    const fn access_control(&self, pdr: u16, write: bool) -> Access {
        let acf = pdr & 0o7;
        let written = pdr & PDR_WRITTEN != 0;
        match (self.variant, acf) {
            (_, 0 | 3 | 7) => Access::Abort(MmuFault::NonResident),
            (_, 1 | 2) if write => Access::Abort(MmuFault::ReadOnly),
            (MmuVariant::Pdp1170, 1 | 4) => Access::Trap,
            (MmuVariant::Pdp1170, 5) if write && !written => Access::Trap,
            (MmuVariant::Pdp1134, 4 | 5) if write && !written => {
                Access::Abort(MmuFault::ReadOnly)
            }
            _ => Access::Allow,
        }
    }

    fn latch_abort(&mut self, causes: u16, mode: Mode, data_space: bool, page: usize) -> MmuFault {
        let fault = if causes & MMR0_ABORT_NON_RESIDENT != 0 {
            MmuFault::NonResident
        } else if causes & MMR0_ABORT_PAGE_LENGTH != 0 {
            MmuFault::PageLength
        } else {
            MmuFault::ReadOnly
        };
        if !self.frozen() {
            #[allow(clippy::cast_possible_truncation)]
            let info = (mode.bits() << 5) | (u16::from(data_space) << 4) | ((page as u16) << 1);
            self.mmr0 = (self.mmr0 & !MMR0_PAGE_INFO_MASK) | causes | info;
            tracing::debug!(mmr0 = self.mmr0, ?fault, "mmu abort latched");
        }
        fault
    }

    const fn fold_physical(&self, physical: u32) -> u32 {
        let extended =
            matches!(self.variant, MmuVariant::Pdp1170) && self.mmr3 & MMR3_22BIT != 0;
        if extended {
            return physical & 0o17777777;
        }
        let physical = physical & 0o777777;
        if physical >= IO_PAGE_18 {
            physical - IO_PAGE_18 + IO_PAGE_22
        } else {
            physical
        }
    }
}

const fn slot(data_space: bool, page: usize) -> usize {
    (if data_space { 8 } else { 0 }) + (page & 0o7)
}

/// Physical address for `vaddr` with relocation disabled.
#[must_use]
pub const fn unmapped(vaddr: u16) -> u32 {
    if vaddr >= UNMAPPED_IO_WINDOW {
        vaddr as u32 - UNMAPPED_IO_WINDOW as u32 + IO_PAGE_22
    } else {
        vaddr as u32
    }
}

/// Decodes a PDR/PAR bank address into `(mode index, is_par, slot)`.
const fn bank_register(physical: u32) -> Option<(usize, bool, usize)> {
    let (mode, base) = if physical >= KERNEL_BANK_ADDR && physical < KERNEL_BANK_ADDR + BANK_BYTES
    {
        (Mode::Kernel, KERNEL_BANK_ADDR)
    } else if physical >= SUPERVISOR_BANK_ADDR && physical < SUPERVISOR_BANK_ADDR + BANK_BYTES {
        (Mode::Supervisor, SUPERVISOR_BANK_ADDR)
    } else if physical >= USER_BANK_ADDR && physical < USER_BANK_ADDR + BANK_BYTES {
        (Mode::User, USER_BANK_ADDR)
    } else {
        return None;
    };
    if physical & 1 != 0 {
        return None;
    }
    let word = ((physical - base) >> 1) as usize;
    Some((mode.index(), word >= 16, word & 0o17))
}

#[cfg(test)]
mod tests {
    use super::{
        unmapped, AccessKind, Mmu, MmuFault, MmuVariant, KERNEL_BANK_ADDR, MMR0_ABORT_MASK,
        MMR0_ABORT_NON_RESIDENT, MMR0_ABORT_PAGE_LENGTH, MMR0_ABORT_READ_ONLY, MMR0_ADDR,
        MMR0_ENABLE, MMR0_TRAP_ENABLE, MMR0_TRAP_FLAG, MMR3_22BIT, MMR3_ADDR, PDR_ACCESSED,
        PDR_EXPAND_DOWN, PDR_WRITTEN, USER_BANK_ADDR,
    };
    use crate::state::Mode;

    /// Full-length, read/write page with identity relocation for `page`.
    fn identity_page(mmu: &mut Mmu, mode: Mode, page: usize) {
        mmu.set_pdr(mode, false, page, (0o177 << 8) | 6);
        #[allow(clippy::cast_possible_truncation)]
        mmu.set_par(mode, false, page, (page as u16) * 0o200);
    }

    #[test]
    fn disabled_mmu_maps_identity_and_folds_io_window() {
        let mut mmu = Mmu::new(MmuVariant::Pdp1170);
        let low = mmu.translate(Mode::User, AccessKind::Read, 0o1234).map(|t| t.physical);
        let io = mmu.translate(Mode::Kernel, AccessKind::Write, 0o177776).map(|t| t.physical);
        assert_eq!(low, Ok(0o1234));
        assert_eq!(io, Ok(0o17777776));
        assert_eq!(unmapped(0o157776), 0o157776);
    }

    #[test]
    fn fetch_updates_mmr2_even_when_disabled() {
        let mut mmu = Mmu::new(MmuVariant::Pdp1170);
        let _ = mmu.translate(Mode::Kernel, AccessKind::Fetch, 0o2000);
        assert_eq!(mmu.mmr2(), 0o2000);
        let _ = mmu.translate(Mode::Kernel, AccessKind::Read, 0o3000);
        assert_eq!(mmu.mmr2(), 0o2000);
    }

    #[test]
    fn enabled_mmu_relocates_through_par() {
        let mut mmu = Mmu::new(MmuVariant::Pdp1170);
        identity_page(&mut mmu, Mode::Kernel, 0);
        mmu.set_par(Mode::Kernel, false, 1, 0o1000);
        mmu.set_pdr(Mode::Kernel, false, 1, (0o177 << 8) | 6);
        mmu.write_mmr0(MMR0_ENABLE);

        let page0 = mmu.translate(Mode::Kernel, AccessKind::Read, 0o100);
        let page1 = mmu.translate(Mode::Kernel, AccessKind::Read, 0o20004);
        assert_eq!(page0.map(|t| t.physical), Ok(0o100));
        assert_eq!(page1.map(|t| t.physical), Ok(0o100004));
    }

    #[test]
    fn non_resident_page_latches_cause_and_page_info() {
        let mut mmu = Mmu::new(MmuVariant::Pdp1170);
        mmu.write_mmr0(MMR0_ENABLE);
        let err = mmu.translate(Mode::User, AccessKind::Read, 0o60000);
        assert_eq!(err, Err(MmuFault::NonResident));
        assert_ne!(mmu.mmr0() & MMR0_ABORT_NON_RESIDENT, 0);
        assert_eq!((mmu.mmr0() >> 5) & 0o3, Mode::User.bits());
        assert_eq!((mmu.mmr0() >> 1) & 0o7, 3);
    }

    #[test]
    fn abort_causes_are_sticky() {
        let mut mmu = Mmu::new(MmuVariant::Pdp1170);
        mmu.set_pdr(Mode::Kernel, false, 0, 6);
        mmu.write_mmr0(MMR0_ENABLE);

        assert_eq!(
            mmu.translate(Mode::Kernel, AccessKind::Read, 0o200),
            Err(MmuFault::PageLength)
        );
        let latched = mmu.mmr0();
        assert_eq!(latched & MMR0_ABORT_MASK, MMR0_ABORT_PAGE_LENGTH);

        assert_eq!(
            mmu.translate(Mode::Kernel, AccessKind::Read, 0o40000),
            Err(MmuFault::NonResident)
        );
        assert_eq!(mmu.mmr0(), latched);
        assert!(mmu.frozen());
    }

    #[test]
    fn expand_down_pages_fault_below_length() {
        let mut mmu = Mmu::new(MmuVariant::Pdp1170);
        mmu.set_pdr(Mode::Kernel, false, 7, (0o170 << 8) | PDR_EXPAND_DOWN | 6);
        mmu.write_mmr0(MMR0_ENABLE);
        let top = mmu.translate(Mode::Kernel, AccessKind::Read, 0o177700);
        assert!(top.is_ok());
        assert_eq!(
            mmu.translate(Mode::Kernel, AccessKind::Read, 0o160000),
            Err(MmuFault::PageLength)
        );
    }

    #[test]
    fn read_only_page_rejects_writes_only() {
        let mut mmu = Mmu::new(MmuVariant::Pdp1170);
        mmu.set_pdr(Mode::Kernel, false, 0, (0o177 << 8) | 2);
        mmu.write_mmr0(MMR0_ENABLE);
        assert!(mmu.translate(Mode::Kernel, AccessKind::Read, 0o10).is_ok());
        assert_eq!(
            mmu.translate(Mode::Kernel, AccessKind::Write, 0o10),
            Err(MmuFault::ReadOnly)
        );
        assert_ne!(mmu.mmr0() & MMR0_ABORT_READ_ONLY, 0);
    }

    #[test]
    fn pdp1170_traps_first_write_and_marks_page_written() {
        let mut mmu = Mmu::new(MmuVariant::Pdp1170);
        mmu.set_pdr(Mode::Kernel, false, 0, (0o177 << 8) | 5);
        mmu.write_mmr0(MMR0_ENABLE | MMR0_TRAP_ENABLE);

        let first = mmu.translate(Mode::Kernel, AccessKind::Write, 0o10);
        assert_eq!(first.map(|t| t.trap), Ok(true));
        assert_ne!(mmu.mmr0() & MMR0_TRAP_FLAG, 0);
        let pdr = mmu.pdr(Mode::Kernel, false, 0);
        assert_ne!(pdr & PDR_WRITTEN, 0);
        assert_ne!(pdr & PDR_ACCESSED, 0);

        let second = mmu.translate(Mode::Kernel, AccessKind::Write, 0o12);
        assert_eq!(second.map(|t| t.trap), Ok(false));
    }

    #[test]
    fn read_write_page_records_access_and_write() {
        let mut mmu = Mmu::new(MmuVariant::Pdp1170);
        identity_page(&mut mmu, Mode::Kernel, 0);
        mmu.write_mmr0(MMR0_ENABLE);

        assert!(mmu.translate(Mode::Kernel, AccessKind::Read, 0o10).is_ok());
        let pdr = mmu.pdr(Mode::Kernel, false, 0);
        assert_ne!(pdr & PDR_ACCESSED, 0);
        assert_eq!(pdr & PDR_WRITTEN, 0);

        assert!(mmu.translate(Mode::Kernel, AccessKind::Write, 0o10).is_ok());
        let pdr = mmu.pdr(Mode::Kernel, false, 0);
        assert_ne!(pdr & PDR_ACCESSED, 0);
        assert_ne!(pdr & PDR_WRITTEN, 0);
    }

    #[test]
    fn pdp1134_aborts_first_write_to_trapping_page() {
        let mut mmu = Mmu::new(MmuVariant::Pdp1134);
        mmu.set_pdr(Mode::Kernel, false, 0, (0o177 << 8) | 5);
        mmu.write_mmr0(MMR0_ENABLE | MMR0_TRAP_ENABLE);
        assert_eq!(
            mmu.translate(Mode::Kernel, AccessKind::Write, 0o10),
            Err(MmuFault::ReadOnly)
        );
        assert_eq!(mmu.mmr0() & MMR0_TRAP_FLAG, 0);
    }

    #[test]
    fn data_space_is_selected_by_mmr3_for_data_cycles_only() {
        let mut mmu = Mmu::new(MmuVariant::Pdp1170);
        identity_page(&mut mmu, Mode::Kernel, 0);
        mmu.set_pdr(Mode::Kernel, true, 0, (0o177 << 8) | 6);
        mmu.set_par(Mode::Kernel, true, 0, 0o2000);
        mmu.write_mmr3(1 << 2);
        mmu.write_mmr0(MMR0_ENABLE);

        let instruction = mmu.translate(Mode::Kernel, AccessKind::Fetch, 0o100);
        let data = mmu.translate(Mode::Kernel, AccessKind::Read, 0o100);
        assert_eq!(instruction.map(|t| t.physical), Ok(0o100));
        assert_eq!(data.map(|t| t.physical), Ok(0o200100));
    }

    #[test]
    fn eighteen_bit_mapping_folds_top_page_to_io_page() {
        let mut mmu = Mmu::new(MmuVariant::Pdp1170);
        mmu.set_pdr(Mode::Kernel, false, 7, (0o177 << 8) | 6);
        mmu.set_par(Mode::Kernel, false, 7, 0o7600);
        mmu.write_mmr0(MMR0_ENABLE);
        let folded = mmu.translate(Mode::Kernel, AccessKind::Read, 0o177572);
        assert_eq!(folded.map(|t| t.physical), Ok(MMR0_ADDR));

        mmu.write_mmr3(MMR3_22BIT);
        let wide = mmu.translate(Mode::Kernel, AccessKind::Read, 0o177572);
        assert_eq!(wide.map(|t| t.physical), Ok(0o777572));
    }

    #[test]
    fn mmr1_records_two_register_changes_then_freezes() {
        let mut mmu = Mmu::new(MmuVariant::Pdp1170);
        mmu.begin_instruction();
        mmu.record_register_change(2, 2);
        mmu.record_register_change(6, -2);
        assert_eq!(mmu.mmr1(), (((0o36 << 3) | 6) << 8) | (2 << 3) | 2);

        mmu.write_mmr0(MMR0_ENABLE);
        let _ = mmu.translate(Mode::Kernel, AccessKind::Read, 0);
        let frozen = mmu.mmr1();
        mmu.begin_instruction();
        mmu.record_register_change(1, 1);
        assert_eq!(mmu.mmr1(), frozen);
    }

    #[test]
    fn register_window_writes_clear_usage_bits() {
        let mut mmu = Mmu::new(MmuVariant::Pdp1170);
        assert!(mmu.write_register(USER_BANK_ADDR + 2, 0o77406));
        assert_eq!(mmu.pdr(Mode::User, false, 1), 0o77406);
        assert_eq!(mmu.read_register(USER_BANK_ADDR + 2), Some(0o77406));

        mmu.set_pdr(Mode::Kernel, true, 3, (0o177 << 8) | 5);
        mmu.write_mmr0(MMR0_ENABLE);
        mmu.write_mmr3(1 << 2);
        let _ = mmu.translate(Mode::Kernel, AccessKind::Write, 0o60000);
        assert_ne!(mmu.pdr(Mode::Kernel, true, 3) & PDR_WRITTEN, 0);

        let par_addr = KERNEL_BANK_ADDR + 0o60 + 6;
        assert!(mmu.write_register(par_addr, 0o1234));
        assert_eq!(mmu.par(Mode::Kernel, true, 3), 0o1234);
        let pdr = mmu.pdr(Mode::Kernel, true, 3);
        assert_eq!(pdr & (PDR_WRITTEN | PDR_ACCESSED), 0);
        assert!(!mmu.write_register(KERNEL_BANK_ADDR + 0o100, 0));
    }

    #[test]
    fn reset_clears_mmr0_and_mmr3_only() {
        let mut mmu = Mmu::new(MmuVariant::Pdp1170);
        mmu.write_register(MMR0_ADDR, 0o777);
        mmu.write_register(MMR3_ADDR, 0o77);
        mmu.set_par(Mode::User, false, 2, 0o4000);
        mmu.reset();
        assert_eq!(mmu.read_register(MMR0_ADDR), Some(0));
        assert_eq!(mmu.read_register(MMR3_ADDR), Some(0));
        assert_eq!(mmu.par(Mode::User, false, 2), 0o4000);
        assert_eq!(Mmu::new(MmuVariant::Pdp1134).read_register(MMR3_ADDR), None);
    }
}
