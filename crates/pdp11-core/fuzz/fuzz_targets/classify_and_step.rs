#![no_main]

use libfuzzer_sys::fuzz_target;
use pdp11_core::{
    classify, disassemble, step_one, CoreError, CoreState, NoDevices, Reg, RunState,
};

const ORIGIN: u16 = 0o1000;
const STEPS: usize = 16;

fuzz_target!(|data: &[u8]| {
    let words: Vec<u16> = data
        .chunks_exact(2)
        .take(64)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    if words.is_empty() {
        return;
    }

    for &word in &words {
        let _ = classify(word);
    }
    let _ = disassemble(ORIGIN, &words);

    let mut state = CoreState::default();
    let _ = state.load_words(u32::from(ORIGIN), &words);
    state.set_pc(ORIGIN);
    state.set_reg(Reg::Sp, 0o20000);
    for _ in 0..STEPS {
        match step_one(&mut state, &mut NoDevices) {
            Ok(_) => assert!(!matches!(state.run_state, RunState::Fatal(_))),
            Err(err) => {
                assert!(matches!(err, CoreError::DoubleFault { .. }), "{err}");
                break;
            }
        }
    }
});
