//! Instruction-level behaviour driven through `step_one` and `run`.

mod common;

use common::{boot, ORIGIN, STACK};
use pdp11_core::{
    run, step_one, CoreState, NoDevices, Reg, StepOutcome, PSW_C, PSW_N, PSW_V, PSW_Z,
};
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

fn flags(state: &CoreState) -> (bool, bool, bool, bool) {
    let cc = state.psw.cc();
    (cc.n, cc.z, cc.v, cc.c)
}

fn step(state: &mut CoreState) -> StepOutcome {
    step_one(state, &mut NoDevices).unwrap()
}

#[test]
fn clr_zeroes_register_and_sets_only_z() {
    let mut state = boot(&[0o005001]);
    state.set_reg(Reg::R1, 0o1234);
    state.psw.set_bits(PSW_N);
    assert_eq!(step(&mut state), StepOutcome::Retired);
    assert_eq!(state.reg(Reg::R1), 0);
    assert_eq!(flags(&state), (false, true, false, false));
    assert_eq!(state.pc(), ORIGIN + 2);
}

#[test]
fn immediate_move_then_add() {
    let mut state = boot(&[0o012700, 4, 0o060001]);
    state.set_reg(Reg::R1, 0o177776);
    assert_eq!(step(&mut state), StepOutcome::Retired);
    assert_eq!(state.reg(Reg::R0), 4);
    assert_eq!(state.pc(), ORIGIN + 4);
    assert_eq!(step(&mut state), StepOutcome::Retired);
    assert_eq!(state.reg(Reg::R1), 2);
    assert_eq!(flags(&state), (false, false, false, true));
}

#[rstest]
#[case::plain(2, 3, 5, (false, false, false, false))]
#[case::signed_overflow(1, 0o077777, 0o100000, (true, false, true, false))]
#[case::carry_to_zero(0o177777, 1, 0, (false, true, false, true))]
#[case::both(0o100000, 0o100000, 0, (false, true, true, true))]
fn add_flag_boundaries(
    #[case] src: u16,
    #[case] dst: u16,
    #[case] result: u16,
    #[case] expected: (bool, bool, bool, bool),
) {
    let mut state = boot(&[0o060001]);
    state.set_reg(Reg::R0, src);
    state.set_reg(Reg::R1, dst);
    step(&mut state);
    assert_eq!(state.reg(Reg::R1), result);
    assert_eq!(flags(&state), expected);
}

const BIC: u16 = 0o040001;
const BIS: u16 = 0o050001;
const BIT: u16 = 0o030001;
const XOR: u16 = 0o074001;

#[rstest]
#[case::bic_everything(BIC, 0o177777, 0o177777, 0o000000, (false, true))]
#[case::bic_keeps_sign(BIC, 0o077777, 0o177777, 0o100000, (true, false))]
#[case::bis_nothing(BIS, 0o000000, 0o000000, 0o000000, (false, true))]
#[case::bis_halves(BIS, 0o100000, 0o077777, 0o177777, (true, false))]
#[case::bit_disjoint(BIT, 0o100000, 0o077777, 0o077777, (false, true))]
#[case::bit_sign(BIT, 0o177777, 0o100000, 0o100000, (true, false))]
#[case::xor_self(XOR, 0o077777, 0o077777, 0o000000, (false, true))]
#[case::xor_to_sign(XOR, 0o177777, 0o077777, 0o100000, (true, false))]
fn logical_ops_clear_v_and_keep_c(
    #[case] word: u16,
    #[case] src: u16,
    #[case] dst: u16,
    #[case] result: u16,
    #[case] nz: (bool, bool),
) {
    let mut state = boot(&[word]);
    state.set_reg(Reg::R0, src);
    state.set_reg(Reg::R1, dst);
    state.psw.set_bits(PSW_V | PSW_C);
    assert_eq!(step(&mut state), StepOutcome::Retired);
    assert_eq!(state.reg(Reg::R1), result);
    assert_eq!(flags(&state), (nz.0, nz.1, false, true));
}

#[rstest]
#[case::borrow(1, 0, 0o177777, (true, false, false, true))]
#[case::overflow(1, 0o100000, 0o077777, (false, false, true, false))]
#[case::equal(0o1234, 0o1234, 0, (false, true, false, false))]
fn sub_subtracts_source_from_destination(
    #[case] src: u16,
    #[case] dst: u16,
    #[case] result: u16,
    #[case] expected: (bool, bool, bool, bool),
) {
    let mut state = boot(&[0o160001]);
    state.set_reg(Reg::R0, src);
    state.set_reg(Reg::R1, dst);
    step(&mut state);
    assert_eq!(state.reg(Reg::R1), result);
    assert_eq!(flags(&state), expected);
}

#[test]
fn cmp_compares_source_against_destination_without_writing() {
    let mut state = boot(&[0o020001]);
    state.set_reg(Reg::R0, 1);
    state.set_reg(Reg::R1, 2);
    step(&mut state);
    assert_eq!(state.reg(Reg::R1), 2);
    assert_eq!(flags(&state), (true, false, false, true));
}

#[rstest]
#[case::word(0o012102, Reg::R1, 2)]
#[case::byte(0o112102, Reg::R1, 1)]
#[case::byte_through_sp(0o112602, Reg::Sp, 2)]
#[case::word_decrement(0o014102, Reg::R1, -2)]
#[case::byte_decrement(0o114102, Reg::R1, -1)]
fn autoincrement_steps_by_operand_width(#[case] word: u16, #[case] reg: Reg, #[case] delta: i16) {
    let mut state = boot(&[word]);
    state.set_reg(Reg::R1, 0o2000);
    let before = state.reg(reg);
    step(&mut state);
    #[allow(clippy::cast_sign_loss)]
    let expected = before.wrapping_add(delta as u16);
    assert_eq!(state.reg(reg), expected);
}

#[test]
fn movb_into_register_sign_extends() {
    let mut state = boot(&[0o111102]);
    state.set_reg(Reg::R1, 0o2000);
    assert!(state.deposit_word(0o2000, 0o000200));
    step(&mut state);
    assert_eq!(state.reg(Reg::R2), 0o177600);
    let (n, z, v, _) = flags(&state);
    assert_eq!((n, z, v), (true, false, false));
}

#[test]
fn movb_to_memory_touches_one_byte() {
    let mut state = boot(&[0o110112]);
    state.set_reg(Reg::R1, 0o377);
    state.set_reg(Reg::R2, 0o2001);
    assert!(state.deposit_word(0o2000, 0o000123));
    step(&mut state);
    assert_eq!(state.examine_word(0o2000), Some(0o177523));
}

#[test]
fn pc_source_reads_the_address_of_the_index_word() {
    // ADD PC,2(R1)
    let mut state = boot(&[0o060761, 2]);
    state.set_reg(Reg::R1, 0o3000);
    assert!(state.deposit_word(0o3002, 5));
    assert_eq!(step(&mut state), StepOutcome::Retired);
    assert_eq!(state.examine_word(0o3002), Some(5 + ORIGIN + 2));
    assert_eq!(state.pc(), ORIGIN + 4);
}

#[test]
fn jsr_and_rts_through_link_register() {
    let mut state = boot(&[0o004567, 0o74, 0o000000]);
    assert!(state.deposit_word(0o1100, 0o000205));
    state.set_reg(Reg::R5, 0o5555);

    assert_eq!(step(&mut state), StepOutcome::Retired);
    assert_eq!(state.pc(), 0o1100);
    assert_eq!(state.reg(Reg::R5), ORIGIN + 4);
    assert_eq!(state.reg(Reg::Sp), STACK - 2);
    assert_eq!(state.examine_word(u32::from(STACK - 2)), Some(0o5555));

    assert_eq!(step(&mut state), StepOutcome::Retired);
    assert_eq!(state.pc(), ORIGIN + 4);
    assert_eq!(state.reg(Reg::R5), 0o5555);
    assert_eq!(state.reg(Reg::Sp), STACK);

    assert_eq!(step(&mut state), StepOutcome::Halted);
}

#[test]
fn jsr_pc_pushes_return_address() {
    let mut state = boot(&[0o004767, 0o74, 0o000000]);
    assert!(state.deposit_word(0o1100, 0o000207));
    step(&mut state);
    assert_eq!(state.pc(), 0o1100);
    assert_eq!(state.examine_word(u32::from(STACK - 2)), Some(ORIGIN + 4));
    step(&mut state);
    assert_eq!(state.pc(), ORIGIN + 4);
    assert_eq!(state.reg(Reg::Sp), STACK);
}

#[test]
fn mul_of_two_negative_ones() {
    let mut state = boot(&[0o070002]);
    state.set_reg(Reg::R0, 0o177777);
    state.set_reg(Reg::R2, 0o177777);
    step(&mut state);
    assert_eq!(state.reg(Reg::R0), 0);
    assert_eq!(state.reg(Reg::R1), 1);
    assert_eq!(flags(&state), (false, false, false, false));
}

#[test]
fn mul_past_sixteen_bits_sets_carry() {
    let mut state = boot(&[0o070002]);
    state.set_reg(Reg::R0, 0o400);
    state.set_reg(Reg::R2, 0o400);
    step(&mut state);
    assert_eq!(state.reg(Reg::R0), 1);
    assert_eq!(state.reg(Reg::R1), 0);
    assert_eq!(flags(&state), (false, false, false, true));
}

#[test]
fn div_produces_quotient_and_remainder() {
    let mut state = boot(&[0o071002]);
    state.set_reg(Reg::R0, 0);
    state.set_reg(Reg::R1, 15);
    state.set_reg(Reg::R2, 4);
    step(&mut state);
    assert_eq!(state.reg(Reg::R0), 3);
    assert_eq!(state.reg(Reg::R1), 3);
    assert_eq!(flags(&state), (false, false, false, false));
}

#[test]
fn div_by_zero_leaves_registers_and_flags_the_error() {
    let mut state = boot(&[0o071002]);
    state.set_reg(Reg::R0, 0o7);
    state.set_reg(Reg::R1, 0o100);
    state.set_reg(Reg::R2, 0);
    assert_eq!(step(&mut state), StepOutcome::Retired);
    assert_eq!(state.reg(Reg::R0), 0o7);
    assert_eq!(state.reg(Reg::R1), 0o100);
    assert_eq!(flags(&state), (false, true, true, true));
}

#[test]
fn sob_loop_runs_and_trains_the_predictor() {
    // MOV #3,R2 / INC R0 / SOB R2,.-2 / HALT
    let mut state = boot(&[0o012702, 3, 0o005200, 0o077202, 0o000000]);
    let outcome = run(&mut state, &mut NoDevices, 100).unwrap();
    assert_eq!(outcome.final_step, StepOutcome::Halted);
    assert_eq!(outcome.steps, 8);
    assert_eq!(state.reg(Reg::R0), 3);
    assert_eq!(state.reg(Reg::R2), 0);
    assert_eq!(state.predictor.hits(), 1);
    assert_eq!(state.predictor.misses(), 2);
    assert!(!state.predictor.check(ORIGIN + 6).taken);
}

#[rstest]
#[case::beq_taken(0o001402, PSW_Z, true)]
#[case::beq_not_taken(0o001402, 0, false)]
#[case::bmi_taken(0o100402, PSW_N, true)]
#[case::bne_not_taken(0o001002, PSW_Z, false)]
fn conditional_branches_follow_condition_codes(
    #[case] word: u16,
    #[case] cc: u16,
    #[case] taken: bool,
) {
    let mut state = boot(&[word]);
    state.psw.set_bits(cc);
    step(&mut state);
    let expected = if taken { ORIGIN + 6 } else { ORIGIN + 2 };
    assert_eq!(state.pc(), expected);
}
