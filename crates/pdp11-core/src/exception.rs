//! Pending traps and the exception controller.
//!
//! Every component records exceptions as one-shot flags in [`PendingTraps`].
//! At the end of each cycle [`service`] takes exactly one: the highest
//! pending trap class if any, otherwise the highest device interrupt above
//! the processor priority. Entry runs the trap-entry micro-op sequence
//! through the ordinary execution engine.

use crate::api::{CoreState, IoBus};
use crate::execute::{execute, ExecOutcome};
use crate::fault::TrapKind;
use crate::microcode::encode_exception_entry;
use crate::state::{Mode, Psw, RunState};
use crate::CoreError;

/// Vector used to retry a failed entry on the emergency stack.
pub const EMERGENCY_VECTOR: u16 = 0o4;
/// Kernel stack pointer loaded for red-zone and emergency entries.
pub const EMERGENCY_STACK: u16 = 0o4;

/// One-shot pending trap flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PendingTraps {
    bits: u16,
    red_stack: bool,
}

impl PendingTraps {
    /// Marks `kind` pending.
    pub const fn raise(&mut self, kind: TrapKind) {
        self.bits |= kind.bit();
    }

    /// Marks a red-zone stack overflow pending. Entry switches to the
    /// emergency kernel stack.
    pub const fn raise_red_stack(&mut self) {
        self.red_stack = true;
        self.raise(TrapKind::StackOverflow);
    }

    /// Returns `true` while a red-zone entry is pending.
    #[must_use]
    pub const fn red_stack(&self) -> bool {
        self.red_stack
    }

    /// Returns `true` when `kind` is pending.
    #[must_use]
    pub const fn is_pending(&self, kind: TrapKind) -> bool {
        self.bits & kind.bit() != 0
    }

    /// Drops `kind`.
    pub const fn clear(&mut self, kind: TrapKind) {
        self.bits &= !kind.bit();
    }

    /// Drops everything.
    pub const fn clear_all(&mut self) {
        self.bits = 0;
        self.red_stack = false;
    }

    /// Returns `true` when any trap is pending.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.bits != 0
    }

    /// Highest-priority pending trap.
    #[must_use]
    pub fn highest(&self) -> Option<TrapKind> {
        TrapKind::PRIORITY
            .into_iter()
            .find(|kind| self.is_pending(*kind))
    }

    /// Removes and returns the highest-priority pending trap.
    pub fn take_highest(&mut self) -> Option<TrapKind> {
        let kind = self.highest()?;
        self.clear(kind);
        Some(kind)
    }
}

/// Services one pending exception, if any, and returns the vector entered.
///
/// A trap taken here also discards a pending trace trap, since the new
/// `PSW` decides whether tracing continues. An acknowledged interrupt has its
/// request line cleared and wakes a waiting CPU.
///
/// # Errors
///
/// Returns [`CoreError::DoubleFault`] when the entry sequence faults and
/// cannot be retried; the run state is latched to
/// [`RunState::Fatal`] first.
pub fn service(state: &mut CoreState, io: &mut dyn IoBus) -> Result<Option<u16>, CoreError> {
    let (vector, abort) = if let Some(kind) = state.traps.take_highest() {
        if kind != TrapKind::Trace {
            state.traps.clear(TrapKind::Trace);
        }
        let red = kind == TrapKind::StackOverflow && state.traps.red_stack;
        if red {
            state.traps.red_stack = false;
            state
                .regs
                .set_stack_pointer(Mode::Kernel, EMERGENCY_STACK);
        }
        tracing::debug!(?kind, vector = kind.vector(), "trap");
        (kind.vector(), kind.is_abort() || red)
    } else if let Some(pending) = state.interrupts.highest_above(state.psw.ipl()) {
        state.interrupts.clear(pending.line);
        if state.run_state == RunState::Waiting {
            state.run_state = RunState::Running;
        }
        tracing::debug!(
            line = ?pending.line,
            vector = pending.vector,
            ipl = pending.ipl,
            "interrupt acknowledge"
        );
        (pending.vector, false)
    } else {
        return Ok(None);
    };
    enter(state, io, vector, abort).map(Some)
}

/// Runs the entry sequence for `vector`.
///
/// If the sequence faults, the CPU state from before the attempt is restored
/// and entry is retried once through vector 4 on the emergency kernel
/// stack. Entries already made for an abort class do not get a retry.
fn enter(
    state: &mut CoreState,
    io: &mut dyn IoBus,
    vector: u16,
    abort: bool,
) -> Result<u16, CoreError> {
    let saved_psw: Psw = state.psw;
    let saved_pc = state.pc();
    let mut target = vector;
    let mut retried = abort;
    loop {
        tracing::debug!(
            vector = target,
            pc = saved_pc,
            psw = saved_psw.bits(),
            "exception entry"
        );
        let mut pipeline = encode_exception_entry(target)?;
        match execute(state, io, &mut pipeline)? {
            ExecOutcome::Trapped { trap, .. } => {
                state.traps.clear(trap);
                if retried {
                    let err = CoreError::DoubleFault { vector };
                    tracing::warn!(vector, ?trap, "double fault");
                    state.run_state = RunState::Fatal(err);
                    return Err(err);
                }
                tracing::debug!(
                    vector = target,
                    ?trap,
                    "entry faulted, retrying on emergency stack"
                );
                state.psw = saved_psw;
                state.set_pc(saved_pc);
                state
                    .regs
                    .set_stack_pointer(Mode::Kernel, EMERGENCY_STACK);
                target = EMERGENCY_VECTOR;
                retried = true;
            }
            ExecOutcome::Completed | ExecOutcome::Transferred { .. } => return Ok(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{service, PendingTraps, EMERGENCY_STACK};
    use crate::api::{CoreConfig, CoreState, NoDevices};
    use crate::fault::TrapKind;
    use crate::interrupts::InterruptLine;
    use crate::state::{Mode, Reg, RunState};
    use crate::CoreError;

    #[test]
    fn traps_come_out_in_priority_order() {
        let mut traps = PendingTraps::default();
        traps.raise(TrapKind::Trace);
        traps.raise(TrapKind::Emt);
        traps.raise(TrapKind::BusError);
        assert_eq!(traps.take_highest(), Some(TrapKind::BusError));
        assert_eq!(traps.take_highest(), Some(TrapKind::Emt));
        assert_eq!(traps.take_highest(), Some(TrapKind::Trace));
        assert_eq!(traps.take_highest(), None);
        assert!(!traps.any());
    }

    fn state_with_vector(vector: u16, pc: u16, psw: u16) -> CoreState {
        let mut state = CoreState::default();
        state.load_words(u32::from(vector), &[pc, psw]);
        state.set_reg(Reg::Sp, 0o1000);
        state.set_pc(0o2000);
        state
    }

    #[test]
    fn trap_entry_pushes_psw_then_pc() {
        let mut state = state_with_vector(0o30, 0o3000, 0o340);
        state.psw.set_bits(0o000017);
        state.traps.raise(TrapKind::Emt);
        assert_eq!(service(&mut state, &mut NoDevices), Ok(Some(0o30)));
        assert_eq!(state.pc(), 0o3000);
        assert_eq!(state.psw.bits(), 0o340);
        assert_eq!(state.reg(Reg::Sp), 0o774);
        assert_eq!(state.examine_word(0o776), Some(0o17));
        assert_eq!(state.examine_word(0o774), Some(0o2000));
    }

    #[test]
    fn entry_from_user_mode_uses_kernel_stack_and_records_previous_mode() {
        let mut state = state_with_vector(0o34, 0o3000, 0o000340);
        state.regs.set_stack_pointer(Mode::User, 0o7000);
        state.psw.set_mode(Mode::User);
        state.traps.raise(TrapKind::Trap);
        assert_eq!(service(&mut state, &mut NoDevices), Ok(Some(0o34)));
        assert_eq!(state.psw.mode(), Mode::Kernel);
        assert_eq!(state.psw.previous_mode(), Mode::User);
        assert_eq!(state.regs.stack_pointer(Mode::User), 0o7000);
        assert_eq!(state.regs.stack_pointer(Mode::Kernel), 0o774);
    }

    #[test]
    fn interrupts_wait_for_priority() {
        let mut state = state_with_vector(0o220, 0o4000, 0o240);
        state.psw.set_ipl(6);
        state.interrupts.request(InterruptLine::Rk11);
        assert_eq!(service(&mut state, &mut NoDevices), Ok(None));
        state.psw.set_ipl(3);
        assert_eq!(service(&mut state, &mut NoDevices), Ok(Some(0o220)));
        assert!(!state.interrupts.is_requested(InterruptLine::Rk11));
        assert_eq!(state.pc(), 0o4000);
    }

    #[test]
    fn odd_kernel_stack_during_trap_retries_on_emergency_stack() {
        let mut state = state_with_vector(0o30, 0o3000, 0o340);
        state.load_words(0o4, &[0o5000, 0o340]);
        state.set_reg(Reg::Sp, 0o1001);
        state.traps.raise(TrapKind::Emt);
        assert_eq!(service(&mut state, &mut NoDevices), Ok(Some(0o4)));
        assert_eq!(state.pc(), 0o5000);
        assert_eq!(state.reg(Reg::Sp), EMERGENCY_STACK - 4);
        assert_eq!(state.run_state, RunState::Running);
    }

    #[test]
    fn faulting_entry_for_an_abort_is_a_double_fault() {
        let mut state = CoreState::with_config(&CoreConfig::default());
        state.set_reg(Reg::Sp, 0o1001);
        state.traps.raise(TrapKind::BusError);
        let err = CoreError::DoubleFault { vector: 0o4 };
        assert_eq!(service(&mut state, &mut NoDevices), Err(err));
        assert_eq!(state.run_state, RunState::Fatal(err));
    }

    #[test]
    fn red_zone_entry_switches_to_emergency_stack() {
        let mut state = state_with_vector(0o4, 0o6000, 0o340);
        state.set_reg(Reg::Sp, 0o200);
        state.traps.raise_red_stack();
        assert_eq!(service(&mut state, &mut NoDevices), Ok(Some(0o4)));
        assert_eq!(state.reg(Reg::Sp), 0);
        assert!(!state.traps.red_stack());
    }
}
