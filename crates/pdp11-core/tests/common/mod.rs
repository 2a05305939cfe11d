//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use pdp11_core::{CoreState, Reg};
use tracing_subscriber::EnvFilter;

/// Load address used by every fixture program.
pub const ORIGIN: u16 = 0o1000;
/// Kernel stack pointer fixtures start with, well above the stack limit.
pub const STACK: u16 = 0o4000;

/// Installs a test-writer subscriber once. `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Boots a default core with `program` loaded at [`ORIGIN`].
pub fn boot(program: &[u16]) -> CoreState {
    init_tracing();
    let mut state = CoreState::default();
    assert!(state.load_words(u32::from(ORIGIN), program));
    state.set_pc(ORIGIN);
    state.set_reg(Reg::Sp, STACK);
    state
}

/// Installs a handler at `handler` for `vector`, entered with `psw`.
pub fn install_vector(state: &mut CoreState, vector: u16, handler: u16, psw: u16) {
    assert!(state.load_words(u32::from(vector), &[handler, psw]));
}
