//! Instruction fetch and classification.

use crate::api::{CoreState, IoBus};
use crate::decoder::Instruction;
use crate::encoding::{classify, Classification};
use crate::fault::{AccessFault, TrapKind};
use crate::memory::Width;
use crate::mmu::AccessKind;

/// Result of the fetch stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchOutcome {
    /// Instruction and extension words read; PC points past them.
    Ready(Instruction),
    /// The word is illegal or reserved. The trap is pending and PC points
    /// past the instruction word.
    Deferred(TrapKind),
    /// A fetch cycle failed. The matching trap is pending.
    Aborted(AccessFault),
}

/// Fetches, classifies, and reads the extension words of the instruction at
/// PC in the current mode.
///
/// Faults are recorded as pending traps; nothing else in the CPU changes
/// except PC and the MMU's fetch-address register.
pub fn fetch_and_classify(state: &mut CoreState, io: &mut dyn IoBus) -> FetchOutcome {
    let pc = state.pc();
    let mode = state.psw.mode();
    if pc & 1 != 0 {
        state.traps.raise(TrapKind::OddAddress);
        return FetchOutcome::Aborted(AccessFault::OddAddress);
    }

    let word = match state.read_virtual(io, mode, AccessKind::Fetch, pc, Width::Word) {
        Ok(word) => word,
        Err(fault) => return abort(state, fault),
    };
    state.set_pc(pc.wrapping_add(2));

    let opcode = match classify(word) {
        Classification::Legal { opcode, .. } => opcode,
        Classification::Illegal { .. } => return defer(state, TrapKind::Illegal),
        Classification::Reserved => return defer(state, TrapKind::Reserved),
    };

    let mut instruction = Instruction::new(pc, word, opcode);
    for slot in 0..instruction.extension_words_needed() {
        let addr = state.pc();
        match state.read_virtual(io, mode, AccessKind::InstructionStream, addr, Width::Word) {
            Ok(value) => {
                instruction.extension[slot] = value;
                instruction.extension_count += 1;
                state.set_pc(addr.wrapping_add(2));
            }
            Err(fault) => return abort(state, fault),
        }
    }
    FetchOutcome::Ready(instruction)
}

fn abort(state: &mut CoreState, fault: AccessFault) -> FetchOutcome {
    state.traps.raise(fault.trap_kind());
    FetchOutcome::Aborted(fault)
}

fn defer(state: &mut CoreState, kind: TrapKind) -> FetchOutcome {
    state.traps.raise(kind);
    FetchOutcome::Deferred(kind)
}

#[cfg(test)]
mod tests {
    use super::{fetch_and_classify, FetchOutcome};
    use crate::api::{CoreState, NoDevices};
    use crate::encoding::Opcode;
    use crate::fault::{AccessFault, TrapKind};

    #[test]
    fn odd_pc_raises_odd_address_without_classifying() {
        let mut state = CoreState::default();
        state.set_pc(1);
        let outcome = fetch_and_classify(&mut state, &mut NoDevices);
        assert_eq!(outcome, FetchOutcome::Aborted(AccessFault::OddAddress));
        assert!(state.traps.is_pending(TrapKind::OddAddress));
        assert_eq!(state.pc(), 1);
    }

    #[test]
    fn extension_words_are_read_and_pc_advances_past_them() {
        let mut state = CoreState::default();
        state.load_words(0o1000, &[0o016767, 0o100, 0o200]);
        state.set_pc(0o1000);
        let FetchOutcome::Ready(instruction) = fetch_and_classify(&mut state, &mut NoDevices)
        else {
            panic!("expected a ready instruction");
        };
        assert_eq!(instruction.opcode, Opcode::Mov);
        assert_eq!(instruction.extension_count, 2);
        assert_eq!(instruction.extension, [0o100, 0o200]);
        assert_eq!(state.pc(), 0o1006);
        assert_eq!(instruction.next_pc(), 0o1006);
    }

    #[test]
    fn reserved_word_defers_trap_past_instruction_word() {
        let mut state = CoreState::default();
        state.load_words(0o1000, &[0o007000]);
        state.set_pc(0o1000);
        let outcome = fetch_and_classify(&mut state, &mut NoDevices);
        assert_eq!(outcome, FetchOutcome::Deferred(TrapKind::Reserved));
        assert!(state.traps.is_pending(TrapKind::Reserved));
        assert_eq!(state.pc(), 0o1002);
    }

    #[test]
    fn fetch_from_nonexistent_memory_is_a_bus_error() {
        let mut state = CoreState::default();
        state.set_pc(0o157776);
        state.memory = crate::memory::PhysicalMemory::new(0o1000);
        let outcome = fetch_and_classify(&mut state, &mut NoDevices);
        assert_eq!(outcome, FetchOutcome::Aborted(AccessFault::NonExistent));
        assert!(state.traps.is_pending(TrapKind::BusError));
    }
}
