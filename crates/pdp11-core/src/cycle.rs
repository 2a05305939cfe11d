//! The instruction cycle: fetch, encode, execute, then exception service.

use crate::api::{CoreState, IoBus, RunOutcome, StepOutcome};
use crate::disasm::disassemble;
use crate::encoding::Opcode;
use crate::exception::service;
use crate::execute::execute;
use crate::fault::TrapKind;
use crate::fetch::{fetch_and_classify, FetchOutcome};
use crate::microcode::encode;
use crate::state::RunState;
use crate::CoreError;

fn latch(state: &mut CoreState, err: CoreError) -> CoreError {
    tracing::warn!(%err, pc = state.pc(), "core stopped");
    state.run_state = RunState::Fatal(err);
    err
}

fn finish(state: &mut CoreState, io: &mut dyn IoBus) -> Result<StepOutcome, CoreError> {
    let vector = service(state, io).map_err(|err| latch(state, err))?;
    Ok(match (vector, state.run_state) {
        (Some(vector), _) => StepOutcome::Trapped { vector },
        (None, RunState::Halted) => StepOutcome::Halted,
        (None, RunState::Waiting) => StepOutcome::Waiting,
        (None, _) => StepOutcome::Retired,
    })
}

/// Runs one instruction cycle.
///
/// A halted CPU stays halted. A waiting CPU polls the bus and only resumes
/// once an interrupt above the processor priority is requested.
///
/// # Errors
///
/// Returns the latched [`CoreError`] once the core has stopped on an
/// internal error; every later call returns the same error.
pub fn step_one(state: &mut CoreState, io: &mut dyn IoBus) -> Result<StepOutcome, CoreError> {
    match state.run_state {
        RunState::Fatal(err) => return Err(err),
        RunState::Halted => return Ok(StepOutcome::Halted),
        RunState::Waiting => {
            io.poll(&mut state.interrupts);
            if state.interrupts.highest_above(state.psw.ipl()).is_none() {
                return Ok(StepOutcome::Waiting);
            }
            return finish(state, io);
        }
        RunState::Running => {}
    }

    io.poll(&mut state.interrupts);
    state.psw_written = false;
    state.trace_inhibit = false;
    state.mmu.begin_instruction();
    let mut traced = state.psw.trace();

    if let FetchOutcome::Ready(insn) = fetch_and_classify(state, io) {
        if tracing::enabled!(tracing::Level::TRACE) {
            let words = [insn.word, insn.extension[0], insn.extension[1]];
            let text = disassemble(insn.pc, &words[..=insn.extension_count])
                .map(|row| row.text())
                .unwrap_or_default();
            tracing::trace!(pc = insn.pc, word = insn.word, "{text}");
        }
        let mut pipeline = encode(&insn).map_err(|err| latch(state, err))?;
        execute(state, io, &mut pipeline).map_err(|err| latch(state, err))?;
        // RTI that restores T traps at once; RTT defers through InhibitTrace.
        traced |= insn.opcode == Opcode::Rti && state.psw.trace();
    }

    if traced && !state.trace_inhibit && state.run_state != RunState::Halted {
        state.traps.raise(TrapKind::Trace);
    }
    finish(state, io)
}

/// Steps until `max_steps` cycles ran, the CPU halts, or it waits with
/// nothing pending.
///
/// # Errors
///
/// Propagates the first [`CoreError`] from [`step_one`].
pub fn run(
    state: &mut CoreState,
    io: &mut dyn IoBus,
    max_steps: u64,
) -> Result<RunOutcome, CoreError> {
    let mut steps = 0;
    let mut final_step = StepOutcome::Retired;
    while steps < max_steps {
        final_step = step_one(state, io)?;
        steps += 1;
        if matches!(final_step, StepOutcome::Halted | StepOutcome::Waiting) {
            break;
        }
    }
    let (hits, misses) = (state.predictor.hits(), state.predictor.misses());
    tracing::debug!(steps, hits, misses, "run finished");
    Ok(RunOutcome { steps, final_step })
}
