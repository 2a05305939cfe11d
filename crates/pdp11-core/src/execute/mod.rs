//! Micro-op execution engine.
//!
//! The engine drains one [`Pipeline`] in order against the register file,
//! `PSW` and memory. A micro-op that transfers control, raises a trap or hits
//! an access fault ends the instruction: the pipeline is truncated after it
//! and nothing further runs. Effects already applied stay applied; the
//! encoder orders every read before the first store, so a flushed
//! instruction never leaves a half-written destination.

/// Arithmetic primitives.
pub mod alu;
/// Condition-code formulas and branch conditions.
pub mod flags;

use crate::api::{CoreState, IoBus};
use crate::fault::TrapKind;
use crate::memory::Width;
use crate::microcode::{Access, BranchCondition, MicroOp, ModeSelect, Pipeline, PswLoad, Space};
use crate::mmu::AccessKind;
use crate::state::{Mode, Reg, RunState, PSW_CC_MASK, PSW_PRIORITY_MASK, PSW_REGISTER_SET, PSW_T};
use crate::CoreError;

use self::alu::{AluLatch, DivideStatus};

/// Register writes one micro-op may post.
pub const WRITE_PORTS: u8 = 2;

/// Kernel stack addresses below this raise a yellow-zone stack trap.
pub const STACK_LIMIT: u16 = 0o400;
/// Kernel stack addresses below this abort the instruction (red zone).
pub const STACK_RED_ZONE: u16 = 0o340;

const MODE_BITS: u16 = 0o170000 | PSW_REGISTER_SET;
const MTPS_KERNEL_MASK: u16 = 0o357;

/// How a pipeline drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecOutcome {
    /// Every micro-op ran.
    Completed,
    /// The micro-op at `at` transferred control; the rest was flushed.
    Transferred {
        /// Index of the flushing micro-op.
        at: usize,
    },
    /// The micro-op at `at` raised `trap`; the rest was flushed.
    Trapped {
        /// Index of the flushing micro-op.
        at: usize,
        /// Trap left pending for the exception controller.
        trap: TrapKind,
    },
}

enum Flow {
    Continue,
    Flush,
    Raise(TrapKind),
}

struct Engine<'a> {
    state: &'a mut CoreState,
    io: &'a mut dyn IoBus,
    latch: AluLatch,
    index: usize,
    writes: u8,
}

/// Runs `pipeline` to completion or to its flush point.
///
/// On flush the pipeline is truncated after the flushing micro-op, so on
/// return it holds exactly the micro-ops that ran.
///
/// # Errors
///
/// Returns [`CoreError::WritePortConflict`] when a micro-op posts more than
/// [`WRITE_PORTS`] register writes.
pub fn execute(
    state: &mut CoreState,
    io: &mut dyn IoBus,
    pipeline: &mut Pipeline,
) -> Result<ExecOutcome, CoreError> {
    let mut engine = Engine {
        state,
        io,
        latch: AluLatch::default(),
        index: 0,
        writes: 0,
    };
    for index in 0..pipeline.len() {
        let op = pipeline.as_slice()[index];
        engine.index = index;
        engine.writes = 0;
        let outcome = match engine.run(op)? {
            Flow::Continue => continue,
            Flow::Flush => ExecOutcome::Transferred { at: index },
            Flow::Raise(trap) => {
                engine.state.traps.raise(trap);
                ExecOutcome::Trapped { at: index, trap }
            }
        };
        let dropped = pipeline.len() - index - 1;
        tracing::trace!(at = index, dropped, "micro-op flush");
        pipeline.truncate(index + 1);
        return Ok(outcome);
    }
    Ok(ExecOutcome::Completed)
}

impl Engine<'_> {
    const fn reg(&self, reg: Reg) -> u16 {
        self.state.reg(reg)
    }

    fn write(&mut self, reg: Reg, value: u16) -> Result<(), CoreError> {
        self.writes += 1;
        if self.writes > WRITE_PORTS {
            return Err(CoreError::WritePortConflict { index: self.index });
        }
        self.state.set_reg(reg, value);
        Ok(())
    }

    fn kernel(&self) -> bool {
        self.state.psw.mode() == Mode::Kernel
    }

    const fn mode_of(&self, select: ModeSelect) -> Mode {
        match select {
            ModeSelect::Current => self.state.psw.mode(),
            ModeSelect::Previous => self.state.psw.previous_mode(),
            ModeSelect::Kernel => Mode::Kernel,
        }
    }

    fn load(&mut self, addr: u16, width: Width, access: Access) -> Result<u16, TrapKind> {
        let mode = self.mode_of(access.mode);
        let kind = match access.space {
            Space::Data => AccessKind::Read,
            Space::Instruction => AccessKind::InstructionStream,
        };
        self.state
            .read_virtual(self.io, mode, kind, addr, width)
            .map_err(|fault| fault.trap_kind())
    }

    fn store(
        &mut self,
        addr: u16,
        value: u16,
        width: Width,
        access: Access,
    ) -> Result<(), TrapKind> {
        let mode = self.mode_of(access.mode);
        self.state
            .write_virtual(self.io, mode, addr, value, width)
            .map_err(|fault| fault.trap_kind())
    }

    fn load_psw(&mut self, value: u16, kind: PswLoad) {
        let old = self.state.psw.bits();
        let new = match kind {
            PswLoad::Ordinary if self.kernel() => value,
            PswLoad::Ordinary => {
                (value & (PSW_CC_MASK | PSW_T))
                    | (old & PSW_PRIORITY_MASK)
                    | ((old | value) & MODE_BITS)
            }
            PswLoad::Mtps if self.kernel() => {
                (old & !MTPS_KERNEL_MASK) | (value & MTPS_KERNEL_MASK)
            }
            PswLoad::Mtps => (old & !PSW_CC_MASK) | (value & PSW_CC_MASK),
            PswLoad::Exception { previous } => {
                let saved = Mode::from_bits(self.reg(previous) >> 14);
                self.state.psw.set_bits(value);
                self.state.psw.set_previous_mode(saved);
                return;
            }
        };
        self.state.psw.set_bits(new);
    }

    fn branch(&mut self, cond: BranchCondition, from: u16, target: u16) -> Result<Flow, CoreError> {
        let taken = match cond {
            BranchCondition::RegisterNonZero(reg) => self.reg(reg) != 0,
            _ => flags::branch_taken(cond, self.state.psw.cc()),
        };
        self.state.predictor.inform(taken, from, target);
        if taken {
            self.write(Reg::Pc, target)?;
        }
        Ok(Flow::Flush)
    }

    fn stack_guard(&mut self) -> Flow {
        if !self.kernel() {
            return Flow::Continue;
        }
        let sp = self.reg(Reg::Sp);
        if sp < STACK_RED_ZONE {
            tracing::debug!(sp, "kernel stack red zone");
            self.state.traps.raise_red_stack();
            return Flow::Raise(TrapKind::StackOverflow);
        }
        if sp < STACK_LIMIT {
            self.state.traps.raise(TrapKind::StackOverflow);
        }
        Flow::Continue
    }

    #[allow(clippy::too_many_lines)]
    fn run(&mut self, op: MicroOp) -> Result<Flow, CoreError> {
        match op {
            MicroOp::Nop => {}
            MicroOp::Halt => {
                if !self.kernel() {
                    return Ok(Flow::Raise(TrapKind::Illegal));
                }
                tracing::warn!(pc = self.state.pc(), "halt");
                self.state.run_state = RunState::Halted;
                return Ok(Flow::Flush);
            }
            MicroOp::Wait => {
                if self.kernel() {
                    self.state.run_state = RunState::Waiting;
                }
                return Ok(Flow::Flush);
            }
            MicroOp::Reset => {
                if self.kernel() {
                    self.state.mmu.reset();
                    self.state.interrupts.clear_all();
                    self.io.reset();
                }
            }
            MicroOp::Move { dst, src } => self.write(dst, self.reg(src))?,
            MicroOp::LoadImm { dst, value } => self.write(dst, value)?,
            MicroOp::AddImm { dst, src, value } => {
                self.write(dst, self.reg(src).wrapping_add(value))?;
            }
            MicroOp::Step { reg, delta } => {
                #[allow(clippy::cast_sign_loss)]
                let value = self.reg(reg).wrapping_add(delta as u16);
                self.write(reg, value)?;
                if reg.is_general() {
                    #[allow(clippy::cast_possible_truncation)]
                    let register = reg.index() as u16;
                    self.state.mmu.record_register_change(register, delta);
                }
            }
            MicroOp::Load {
                dst,
                addr,
                width,
                access,
            } => match self.load(self.reg(addr), width, access) {
                Ok(value) => self.write(dst, value)?,
                Err(trap) => return Ok(Flow::Raise(trap)),
            },
            MicroOp::Store {
                addr,
                src,
                width,
                access,
            } => {
                if let Err(trap) = self.store(self.reg(addr), self.reg(src), width, access) {
                    return Ok(Flow::Raise(trap));
                }
            }
            MicroOp::InsertByte { dst, src } => {
                let value = (self.reg(dst) & 0o177400) | (self.reg(src) & 0o377);
                self.write(dst, value)?;
            }
            MicroOp::SignExtendByte { dst, src } => {
                let low = self.reg(src) & 0o377;
                let value = if low & 0o200 == 0 {
                    low
                } else {
                    low | 0o177400
                };
                self.write(dst, value)?;
            }
            MicroOp::ReadPreviousSp { dst } => {
                let mode = self.state.psw.previous_mode();
                self.write(dst, self.state.regs.stack_pointer(mode))?;
            }
            MicroOp::WritePreviousSp { src } => {
                let mode = self.state.psw.previous_mode();
                let value = self.reg(src);
                self.writes += 1;
                if self.writes > WRITE_PORTS {
                    return Err(CoreError::WritePortConflict { index: self.index });
                }
                self.state.regs.set_stack_pointer(mode, value);
            }
            MicroOp::ReadPsw { dst } => self.write(dst, self.state.psw.bits())?,
            MicroOp::LoadPsw { src, kind } => self.load_psw(self.reg(src), kind),
            MicroOp::ForceKernel => self.state.psw.set_mode(Mode::Kernel),
            MicroOp::Alu {
                op,
                dst,
                a,
                b,
                width,
            } => {
                let carry = self.state.psw.cc().c;
                let (value, latch) = alu::alu(op, self.reg(a), self.reg(b), width, carry);
                self.latch = latch;
                self.write(dst, value)?;
            }
            MicroOp::Shift {
                op,
                dst,
                src,
                width,
            } => {
                let carry = self.state.psw.cc().c;
                let (value, out) = alu::shift(op, self.reg(src), width, carry);
                self.latch = AluLatch {
                    shift_out: out,
                    ..AluLatch::default()
                };
                self.write(dst, value)?;
            }
            MicroOp::Swab { dst, src } => self.write(dst, self.reg(src).swap_bytes())?,
            MicroOp::SignExtend { dst } => {
                let value = if self.state.psw.cc().n { 0o177777 } else { 0 };
                self.write(dst, value)?;
            }
            MicroOp::Mul { hi, lo, a, b } => {
                let product = alu::multiply(self.reg(a), self.reg(b));
                #[allow(clippy::cast_sign_loss)]
                let wide = product as u32;
                self.latch = AluLatch {
                    wide,
                    ..AluLatch::default()
                };
                #[allow(clippy::cast_possible_truncation)]
                {
                    self.write(hi, (wide >> 16) as u16)?;
                    self.write(lo, wide as u16)?;
                }
            }
            MicroOp::Div { hi, lo, divisor } => {
                let result = alu::divide(self.reg(hi), self.reg(lo), self.reg(divisor));
                self.latch = AluLatch {
                    divide: result.err().unwrap_or(DivideStatus::Completed),
                    ..AluLatch::default()
                };
                if let Ok((quotient, remainder)) = result {
                    self.write(hi, quotient)?;
                    self.write(lo, remainder)?;
                }
            }
            MicroOp::ShiftArith { dst, src, count } => {
                let (value, out, changed) = alu::shift_arith(self.reg(src), self.reg(count));
                self.latch = AluLatch {
                    shift_out: out,
                    sign_change: changed,
                    ..AluLatch::default()
                };
                self.write(dst, value)?;
            }
            MicroOp::ShiftArith32 { hi, lo, count } => {
                let (wide, out, changed) =
                    alu::shift_arith32(self.reg(hi), self.reg(lo), self.reg(count));
                self.latch = AluLatch {
                    shift_out: out,
                    sign_change: changed,
                    wide,
                    ..AluLatch::default()
                };
                #[allow(clippy::cast_possible_truncation)]
                {
                    self.write(hi, (wide >> 16) as u16)?;
                    self.write(lo, wide as u16)?;
                }
            }
            MicroOp::ConditionCodes { set, mask } => {
                let bits = self.state.psw.bits();
                let mask = mask & PSW_CC_MASK;
                self.state
                    .psw
                    .set_bits(if set { bits | mask } else { bits & !mask });
            }
            MicroOp::EvalFlags {
                formula,
                value,
                width,
            } => {
                if !self.state.psw_written {
                    let value = self.reg(value) & width.mask();
                    let old = self.state.psw.cc();
                    let cc = flags::evaluate(formula, value, width, &self.latch, old);
                    self.state.psw.set_cc(cc);
                }
            }
            MicroOp::StackGuard => return Ok(self.stack_guard()),
            MicroOp::InhibitTrace => self.state.trace_inhibit = true,
            MicroOp::SetPriority { level } => {
                if self.kernel() {
                    self.state.psw.set_ipl(level);
                }
            }
            MicroOp::Branch { cond, from, target } => return self.branch(cond, from, target),
            MicroOp::Jump { from, target } => {
                let target = self.reg(target);
                self.state.predictor.inform(true, from, target);
                self.write(Reg::Pc, target)?;
                return Ok(Flow::Flush);
            }
            MicroOp::RaiseTrap(trap) => return Ok(Flow::Raise(trap)),
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::{execute, AluLatch, Engine, ExecOutcome};
    use crate::api::{CoreState, NoDevices};
    use crate::fault::TrapKind;
    use crate::memory::Width;
    use crate::microcode::{
        encode, Access, AluOp, BranchCondition, FlagFormula, MicroOp, Pipeline, PswLoad,
    };
    use crate::state::{Mode, Reg, RunState, PSW_N, PSW_Z};
    use crate::CoreError;

    fn pipeline(ops: &[MicroOp]) -> Pipeline {
        let mut pipeline = Pipeline::new();
        for op in ops {
            pipeline.push(*op).unwrap();
        }
        pipeline
    }

    #[test]
    fn third_register_write_is_a_port_conflict() {
        let mut state = CoreState::default();
        let mut io = NoDevices;
        let mut engine = Engine {
            state: &mut state,
            io: &mut io,
            latch: AluLatch::default(),
            index: 4,
            writes: 0,
        };
        assert_eq!(engine.write(Reg::R0, 1), Ok(()));
        assert_eq!(engine.write(Reg::R1, 2), Ok(()));
        assert_eq!(
            engine.write(Reg::R2, 3),
            Err(CoreError::WritePortConflict { index: 4 })
        );
        assert_eq!(state.reg(Reg::R2), 0);
    }

    #[test]
    fn fault_flushes_the_remaining_micro_ops() {
        let mut state = CoreState::default();
        state.set_reg(Reg::R1, 0o1001);
        let mut ops = pipeline(&[
            MicroOp::Load {
                dst: Reg::R0,
                addr: Reg::R1,
                width: Width::Word,
                access: Access::DATA,
            },
            MicroOp::LoadImm {
                dst: Reg::R2,
                value: 7,
            },
        ]);
        let outcome = execute(&mut state, &mut NoDevices, &mut ops).unwrap();
        assert_eq!(
            outcome,
            ExecOutcome::Trapped {
                at: 0,
                trap: TrapKind::OddAddress
            }
        );
        assert_eq!(ops.len(), 1);
        assert_eq!(state.reg(Reg::R2), 0);
        assert!(state.traps.is_pending(TrapKind::OddAddress));
    }

    #[test]
    fn branch_informs_predictor_and_flushes() {
        let mut state = CoreState::default();
        state.psw.set_bits(PSW_Z);
        let mut ops = pipeline(&[
            MicroOp::Branch {
                cond: BranchCondition::Eq,
                from: 0o1000,
                target: 0o2000,
            },
            MicroOp::Halt,
        ]);
        let outcome = execute(&mut state, &mut NoDevices, &mut ops).unwrap();
        assert_eq!(outcome, ExecOutcome::Transferred { at: 0 });
        assert_eq!(state.pc(), 0o2000);
        assert!(state.predictor.check(0o1000).taken);
        assert_eq!(state.run_state, RunState::Running);
    }

    #[test]
    fn halt_outside_kernel_raises_illegal() {
        let mut state = CoreState::default();
        state.psw.set_mode(Mode::User);
        let mut ops = pipeline(&[MicroOp::Halt]);
        let outcome = execute(&mut state, &mut NoDevices, &mut ops).unwrap();
        assert_eq!(
            outcome,
            ExecOutcome::Trapped {
                at: 0,
                trap: TrapKind::Illegal
            }
        );
        assert_eq!(state.run_state, RunState::Running);
    }

    #[test]
    fn alu_and_flags_cooperate() {
        let mut state = CoreState::default();
        state.set_reg(Reg::R0, 0o77777);
        state.set_reg(Reg::R1, 1);
        let mut ops = pipeline(&[
            MicroOp::Alu {
                op: AluOp::Add,
                dst: Reg::T0,
                a: Reg::R0,
                b: Reg::R1,
                width: Width::Word,
            },
            MicroOp::EvalFlags {
                formula: FlagFormula::Add,
                value: Reg::T0,
                width: Width::Word,
            },
        ]);
        execute(&mut state, &mut NoDevices, &mut ops).unwrap();
        assert_eq!(state.reg(Reg::T0), 0o100000);
        let cc = state.psw.cc();
        assert!(cc.n && cc.v && !cc.z && !cc.c);
    }

    #[test]
    fn mtps_outside_kernel_changes_only_condition_codes() {
        let mut state = CoreState::default();
        state.psw.set_bits(0o140000);
        state.set_reg(Reg::S0, 0o357);
        let mut ops = pipeline(&[MicroOp::LoadPsw {
            src: Reg::S0,
            kind: PswLoad::Mtps,
        }]);
        execute(&mut state, &mut NoDevices, &mut ops).unwrap();
        assert_eq!(state.psw.bits(), 0o140017);
    }

    #[test]
    fn rti_outside_kernel_cannot_lower_mode_or_priority() {
        let mut state = CoreState::default();
        state.psw.set_bits(0o140000 | 0o040);
        state.set_reg(Reg::T1, PSW_N | 0o340);
        let mut ops = pipeline(&[MicroOp::LoadPsw {
            src: Reg::T1,
            kind: PswLoad::Ordinary,
        }]);
        execute(&mut state, &mut NoDevices, &mut ops).unwrap();
        assert_eq!(state.psw.mode(), Mode::User);
        assert_eq!(state.psw.ipl(), 1);
        assert!(state.psw.cc().n);
    }

    #[test]
    fn clr_runs_from_encoded_pipeline() {
        let mut state = CoreState::default();
        state.set_reg(Reg::R1, 0o1234);
        let insn = crate::decoder::Instruction::new(0o1000, 0o005001, crate::encoding::Opcode::Clr);
        let mut ops = encode(&insn).unwrap();
        assert_eq!(
            execute(&mut state, &mut NoDevices, &mut ops),
            Ok(ExecOutcome::Completed)
        );
        assert_eq!(state.reg(Reg::R1), 0);
        assert_eq!(state.psw.bits() & 0o17, PSW_Z);
    }

    #[test]
    fn red_zone_push_aborts_in_kernel_mode() {
        let mut state = CoreState::default();
        state.set_reg(Reg::Sp, 0o340);
        let mut ops = pipeline(&[
            MicroOp::Step {
                reg: Reg::Sp,
                delta: -2,
            },
            MicroOp::StackGuard,
            MicroOp::Store {
                addr: Reg::Sp,
                src: Reg::R0,
                width: Width::Word,
                access: Access::DATA,
            },
        ]);
        let outcome = execute(&mut state, &mut NoDevices, &mut ops).unwrap();
        assert_eq!(
            outcome,
            ExecOutcome::Trapped {
                at: 1,
                trap: TrapKind::StackOverflow
            }
        );
        assert!(state.traps.red_stack());
    }

    #[test]
    fn yellow_zone_push_completes_with_trap_pending() {
        let mut state = CoreState::default();
        state.set_reg(Reg::Sp, 0o400);
        let mut ops = pipeline(&[
            MicroOp::Step {
                reg: Reg::Sp,
                delta: -2,
            },
            MicroOp::StackGuard,
        ]);
        let outcome = execute(&mut state, &mut NoDevices, &mut ops).unwrap();
        assert_eq!(outcome, ExecOutcome::Completed);
        assert!(state.traps.is_pending(TrapKind::StackOverflow));
        assert!(!state.traps.red_stack());
    }
}
