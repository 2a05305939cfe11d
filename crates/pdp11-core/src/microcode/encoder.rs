//! Instruction-to-micro-op translation.
//!
//! The encoder is a pure function of the classified instruction and its
//! extension words. Operand addresses and values are staged in the scratch
//! bank in a fixed order (source address, source value, destination address,
//! destination value, result, store, flags) so every memory read an
//! instruction needs happens before its first store. Control transfers are
//! always the last micro-op emitted.

use super::pipeline::Pipeline;
use super::uop::{
    Access, AluOp, BranchCondition, FlagFormula, MicroOp, ModeSelect, PswLoad, ShiftOp, Space,
};
use crate::decoder::{AddressingMode, Instruction, Operand};
use crate::encoding::Opcode;
use crate::fault::TrapKind;
use crate::memory::Width;
use crate::state::Reg;
use crate::CoreError;

/// Scratch registers used for one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Source,
    Destination,
}

impl Slot {
    const fn value(self) -> Reg {
        match self {
            Self::Source => Reg::S0,
            Self::Destination => Reg::D0,
        }
    }

    const fn address(self) -> Reg {
        match self {
            Self::Source => Reg::S1,
            Self::Destination => Reg::D1,
        }
    }
}

/// Where an operand lives once its effective address is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Located {
    /// A general register.
    Register(Reg),
    /// Memory at the virtual address held in the scratch register.
    Memory(Reg),
    /// Immediate word from the instruction stream at `addr`.
    Immediate { value: u16, addr: u16 },
}

struct Encoder<'a> {
    insn: &'a Instruction,
    pipeline: Pipeline,
    cursor: u16,
    next_extension: usize,
}

/// Translates a classified instruction into its micro-op sequence.
///
/// # Errors
///
/// Returns [`CoreError::PipelineOverflow`] if the sequence would exceed the
/// pipeline capacity.
pub fn encode(insn: &Instruction) -> Result<Pipeline, CoreError> {
    let mut encoder = Encoder {
        insn,
        pipeline: Pipeline::new(),
        cursor: insn.pc.wrapping_add(2),
        next_extension: 0,
    };
    encoder.instruction()?;
    Ok(encoder.pipeline)
}

/// Builds the trap entry sequence for `vector`.
///
/// The old `PSW` and PC are captured first, the new PC and `PSW` are read
/// from kernel data space, then the CPU switches to kernel mode and pushes
/// the old `PSW` followed by the old PC.
///
/// # Errors
///
/// Returns [`CoreError::PipelineOverflow`] if the sequence would exceed the
/// pipeline capacity.
pub fn encode_exception_entry(vector: u16) -> Result<Pipeline, CoreError> {
    let mut pipeline = Pipeline::new();
    let ops = [
        MicroOp::ReadPsw { dst: Reg::T0 },
        MicroOp::Move {
            dst: Reg::T1,
            src: Reg::Pc,
        },
        MicroOp::LoadImm {
            dst: Reg::S1,
            value: vector,
        },
        MicroOp::Load {
            dst: Reg::S0,
            addr: Reg::S1,
            width: Width::Word,
            access: Access::KERNEL_DATA,
        },
        MicroOp::AddImm {
            dst: Reg::S1,
            src: Reg::S1,
            value: 2,
        },
        MicroOp::Load {
            dst: Reg::S2,
            addr: Reg::S1,
            width: Width::Word,
            access: Access::KERNEL_DATA,
        },
        MicroOp::ForceKernel,
        MicroOp::Step {
            reg: Reg::Sp,
            delta: -2,
        },
        MicroOp::Store {
            addr: Reg::Sp,
            src: Reg::T0,
            width: Width::Word,
            access: Access::DATA,
        },
        MicroOp::Step {
            reg: Reg::Sp,
            delta: -2,
        },
        MicroOp::Store {
            addr: Reg::Sp,
            src: Reg::T1,
            width: Width::Word,
            access: Access::DATA,
        },
        MicroOp::LoadPsw {
            src: Reg::S2,
            kind: PswLoad::Exception { previous: Reg::T0 },
        },
        MicroOp::Jump {
            from: vector,
            target: Reg::S0,
        },
    ];
    for op in ops {
        pipeline.push(op)?;
    }
    Ok(pipeline)
}

const fn branch_condition(opcode: Opcode) -> Option<BranchCondition> {
    Some(match opcode {
        Opcode::Br => BranchCondition::Always,
        Opcode::Bne => BranchCondition::Ne,
        Opcode::Beq => BranchCondition::Eq,
        Opcode::Bge => BranchCondition::Ge,
        Opcode::Blt => BranchCondition::Lt,
        Opcode::Bgt => BranchCondition::Gt,
        Opcode::Ble => BranchCondition::Le,
        Opcode::Bpl => BranchCondition::Pl,
        Opcode::Bmi => BranchCondition::Mi,
        Opcode::Bhi => BranchCondition::Hi,
        Opcode::Blos => BranchCondition::Los,
        Opcode::Bvc => BranchCondition::Vc,
        Opcode::Bvs => BranchCondition::Vs,
        Opcode::Bcc => BranchCondition::Cc,
        Opcode::Bcs => BranchCondition::Cs,
        _ => return None,
    })
}

impl Encoder<'_> {
    fn emit(&mut self, op: MicroOp) -> Result<(), CoreError> {
        self.pipeline.push(op)
    }

    fn flags(&mut self, formula: FlagFormula, value: Reg, width: Width) -> Result<(), CoreError> {
        self.emit(MicroOp::EvalFlags {
            formula,
            value,
            width,
        })
    }

    /// Consumes the next prefetched extension word; returns it and its address.
    fn extension(&mut self) -> (u16, u16) {
        let value = self
            .insn
            .extension
            .get(self.next_extension)
            .copied()
            .unwrap_or_default();
        let addr = self.cursor;
        self.next_extension += 1;
        self.cursor = self.cursor.wrapping_add(2);
        (value, addr)
    }

    fn step(&mut self, reg: Reg, delta: i16) -> Result<(), CoreError> {
        self.emit(MicroOp::Step { reg, delta })?;
        if delta < 0 && reg == Reg::Sp {
            self.emit(MicroOp::StackGuard)?;
        }
        Ok(())
    }

    fn load_pointer(&mut self, addr: Reg) -> Result<(), CoreError> {
        self.emit(MicroOp::Load {
            dst: addr,
            addr,
            width: Width::Word,
            access: Access::DATA,
        })
    }

    /// Emits the effective-address computation for `operand`.
    fn locate(&mut self, operand: Operand, width: Width, slot: Slot) -> Result<Located, CoreError> {
        let addr = slot.address();
        let reg = operand.reg;
        #[allow(clippy::cast_possible_wrap)]
        let step = operand.step(width) as i16;
        match (operand.mode, reg) {
            (AddressingMode::Register, _) => return Ok(Located::Register(reg)),
            (AddressingMode::Autoincrement, Reg::Pc) => {
                let (value, at) = self.extension();
                return Ok(Located::Immediate { value, addr: at });
            }
            (AddressingMode::AutoincrementDeferred, Reg::Pc) => {
                let (value, _) = self.extension();
                self.emit(MicroOp::LoadImm { dst: addr, value })?;
            }
            (AddressingMode::Index | AddressingMode::IndexDeferred, Reg::Pc) => {
                let (offset, at) = self.extension();
                self.emit(MicroOp::LoadImm {
                    dst: addr,
                    value: offset.wrapping_add(at).wrapping_add(2),
                })?;
                if operand.mode == AddressingMode::IndexDeferred {
                    self.load_pointer(addr)?;
                }
            }
            (AddressingMode::RegisterDeferred, _) => {
                self.emit(MicroOp::Move {
                    dst: addr,
                    src: reg,
                })?;
            }
            (AddressingMode::Autoincrement | AddressingMode::AutoincrementDeferred, _) => {
                self.emit(MicroOp::Move {
                    dst: addr,
                    src: reg,
                })?;
                self.step(reg, step)?;
                if operand.mode.is_deferred() {
                    self.load_pointer(addr)?;
                }
            }
            (AddressingMode::Autodecrement | AddressingMode::AutodecrementDeferred, _) => {
                self.step(reg, -step)?;
                self.emit(MicroOp::Move {
                    dst: addr,
                    src: reg,
                })?;
                if operand.mode.is_deferred() {
                    self.load_pointer(addr)?;
                }
            }
            (AddressingMode::Index | AddressingMode::IndexDeferred, _) => {
                let (offset, _) = self.extension();
                self.emit(MicroOp::AddImm {
                    dst: addr,
                    src: reg,
                    value: offset,
                })?;
                if operand.mode == AddressingMode::IndexDeferred {
                    self.load_pointer(addr)?;
                }
            }
        }
        Ok(Located::Memory(addr))
    }

    /// Copies a general register into `dst`. PC reads as the address of the
    /// next unconsumed instruction-stream word.
    fn copy_register(&mut self, dst: Reg, src: Reg) -> Result<(), CoreError> {
        if src == Reg::Pc {
            return self.emit(MicroOp::LoadImm {
                dst,
                value: self.cursor,
            });
        }
        self.emit(MicroOp::Move { dst, src })
    }

    /// Emits the operand read into the slot's value register.
    fn load(&mut self, located: Located, width: Width, slot: Slot) -> Result<Reg, CoreError> {
        let dst = slot.value();
        let op = match located {
            Located::Register(src) => {
                self.copy_register(dst, src)?;
                return Ok(dst);
            }
            Located::Memory(addr) => MicroOp::Load {
                dst,
                addr,
                width,
                access: Access::DATA,
            },
            Located::Immediate { value, .. } => MicroOp::LoadImm { dst, value },
        };
        self.emit(op)?;
        Ok(dst)
    }

    /// Emits the write of `src` to the operand.
    ///
    /// Byte writes to a register replace the low byte, or sign-extend into the
    /// whole register when `sign_extend` is set (`MOVB`, `MFPS`).
    fn store(
        &mut self,
        located: Located,
        src: Reg,
        width: Width,
        sign_extend: bool,
        access: Access,
    ) -> Result<(), CoreError> {
        let op = match (located, width) {
            (Located::Register(dst), Width::Word) => MicroOp::Move { dst, src },
            (Located::Register(dst), Width::Byte) if sign_extend => {
                MicroOp::SignExtendByte { dst, src }
            }
            (Located::Register(dst), Width::Byte) => MicroOp::InsertByte { dst, src },
            (Located::Memory(addr), _) => MicroOp::Store {
                addr,
                src,
                width,
                access,
            },
            (Located::Immediate { addr, .. }, _) => {
                self.emit(MicroOp::LoadImm {
                    dst: Reg::D1,
                    value: addr,
                })?;
                MicroOp::Store {
                    addr: Reg::D1,
                    src,
                    width,
                    access,
                }
            }
        };
        self.emit(op)
    }

    fn push(&mut self, src: Reg) -> Result<(), CoreError> {
        self.step(Reg::Sp, -2)?;
        self.emit(MicroOp::Store {
            addr: Reg::Sp,
            src,
            width: Width::Word,
            access: Access::DATA,
        })
    }

    fn pop(&mut self, dst: Reg) -> Result<(), CoreError> {
        self.emit(MicroOp::Load {
            dst,
            addr: Reg::Sp,
            width: Width::Word,
            access: Access::DATA,
        })?;
        self.step(Reg::Sp, 2)
    }

    /// Resolves a jump destination to a register holding the target address.
    fn jump_target(&mut self, located: Located) -> Result<Option<Reg>, CoreError> {
        match located {
            Located::Memory(addr) => Ok(Some(addr)),
            Located::Immediate { addr, .. } => {
                self.emit(MicroOp::LoadImm {
                    dst: Reg::D1,
                    value: addr,
                })?;
                Ok(Some(Reg::D1))
            }
            Located::Register(_) => Ok(None),
        }
    }

    fn instruction(&mut self) -> Result<(), CoreError> {
        let insn = *self.insn;
        let width = insn.width();
        if let Some(cond) = branch_condition(insn.opcode) {
            return self.emit(MicroOp::Branch {
                cond,
                from: insn.pc,
                target: insn.branch_target(),
            });
        }
        match insn.opcode {
            Opcode::Halt => self.emit(MicroOp::Halt),
            Opcode::Wait => self.emit(MicroOp::Wait),
            Opcode::Reset => self.emit(MicroOp::Reset),
            Opcode::Bpt => self.emit(MicroOp::RaiseTrap(TrapKind::Breakpoint)),
            Opcode::Iot => self.emit(MicroOp::RaiseTrap(TrapKind::Iot)),
            Opcode::Emt => self.emit(MicroOp::RaiseTrap(TrapKind::Emt)),
            Opcode::Trap => self.emit(MicroOp::RaiseTrap(TrapKind::Trap)),
            Opcode::Rti | Opcode::Rtt => self.return_from_interrupt(insn.opcode == Opcode::Rtt),
            Opcode::Spl => {
                #[allow(clippy::cast_possible_truncation)]
                let level = (insn.word & 0o7) as u8;
                self.emit(MicroOp::SetPriority { level })
            }
            Opcode::ClearCc | Opcode::SetCc => self.emit(MicroOp::ConditionCodes {
                set: insn.opcode == Opcode::SetCc,
                mask: insn.word & 0o17,
            }),
            Opcode::Jmp => {
                let located = self.locate(insn.destination(), Width::Word, Slot::Destination)?;
                match self.jump_target(located)? {
                    Some(target) => self.emit(MicroOp::Jump {
                        from: insn.pc,
                        target,
                    }),
                    None => self.emit(MicroOp::RaiseTrap(TrapKind::Illegal)),
                }
            }
            Opcode::Jsr => self.jump_to_subroutine(),
            Opcode::Rts => self.return_from_subroutine(),
            Opcode::Mark => self.mark(),
            Opcode::Sob => {
                let reg = insn.register_field();
                self.emit(MicroOp::AddImm {
                    dst: reg,
                    src: reg,
                    value: 0o177777,
                })?;
                self.emit(MicroOp::Branch {
                    cond: BranchCondition::RegisterNonZero(reg),
                    from: insn.pc,
                    target: insn.next_pc().wrapping_sub(2 * insn.count()),
                })
            }
            Opcode::Mov => {
                let src = self.locate(insn.source(), width, Slot::Source)?;
                let value = self.load(src, width, Slot::Source)?;
                let dst = self.locate(insn.destination(), width, Slot::Destination)?;
                self.store(dst, value, width, true, Access::DATA)?;
                self.flags(FlagFormula::Logical, value, width)
            }
            Opcode::Cmp | Opcode::Bit => {
                let src = self.locate(insn.source(), width, Slot::Source)?;
                let a = self.load(src, width, Slot::Source)?;
                let dst = self.locate(insn.destination(), width, Slot::Destination)?;
                let b = self.load(dst, width, Slot::Destination)?;
                let (op, formula) = if insn.opcode == Opcode::Cmp {
                    (AluOp::Sub, FlagFormula::Subtract)
                } else {
                    (AluOp::And, FlagFormula::Logical)
                };
                self.emit(MicroOp::Alu {
                    op,
                    dst: Reg::T0,
                    a,
                    b,
                    width,
                })?;
                self.flags(formula, Reg::T0, width)
            }
            Opcode::Bic | Opcode::Bis | Opcode::Add | Opcode::Sub => self.double_operand(),
            Opcode::Clr => {
                let dst = self.locate(insn.destination(), width, Slot::Destination)?;
                self.emit(MicroOp::LoadImm {
                    dst: Reg::T0,
                    value: 0,
                })?;
                self.store(dst, Reg::T0, width, false, Access::DATA)?;
                self.flags(FlagFormula::Clear, Reg::T0, width)
            }
            Opcode::Tst => {
                let dst = self.locate(insn.destination(), width, Slot::Destination)?;
                let value = self.load(dst, width, Slot::Destination)?;
                self.flags(FlagFormula::Test, value, width)
            }
            Opcode::Com => self.unary(AluOp::Not, FlagFormula::Complement),
            Opcode::Inc => self.unary(AluOp::Inc, FlagFormula::Increment),
            Opcode::Dec => self.unary(AluOp::Dec, FlagFormula::Decrement),
            Opcode::Neg => self.unary(AluOp::Neg, FlagFormula::Negate),
            Opcode::Adc => self.unary(AluOp::AddCarry, FlagFormula::AddCarry),
            Opcode::Sbc => self.unary(AluOp::SubCarry, FlagFormula::SubCarry),
            Opcode::Ror => self.shift(ShiftOp::Ror),
            Opcode::Rol => self.shift(ShiftOp::Rol),
            Opcode::Asr => self.shift(ShiftOp::Asr),
            Opcode::Asl => self.shift(ShiftOp::Asl),
            Opcode::Swab => self.modify(
                MicroOp::Swab {
                    dst: Reg::T0,
                    src: Reg::D0,
                },
                FlagFormula::SwapBytes,
            ),
            Opcode::Sxt => {
                let dst = self.locate(insn.destination(), Width::Word, Slot::Destination)?;
                self.emit(MicroOp::SignExtend { dst: Reg::T0 })?;
                self.store(dst, Reg::T0, Width::Word, false, Access::DATA)?;
                self.flags(FlagFormula::SignExtend, Reg::T0, Width::Word)
            }
            Opcode::Mfps => {
                let dst = self.locate(insn.destination(), Width::Byte, Slot::Destination)?;
                self.emit(MicroOp::ReadPsw { dst: Reg::T0 })?;
                self.store(dst, Reg::T0, Width::Byte, true, Access::DATA)?;
                self.flags(FlagFormula::Logical, Reg::T0, Width::Byte)
            }
            Opcode::Mtps => {
                let src = self.locate(insn.destination(), Width::Byte, Slot::Source)?;
                let value = self.load(src, Width::Byte, Slot::Source)?;
                self.emit(MicroOp::LoadPsw {
                    src: value,
                    kind: PswLoad::Mtps,
                })
            }
            Opcode::Mfpi | Opcode::Mfpd => self.move_from_previous(insn.opcode == Opcode::Mfpi),
            Opcode::Mtpi | Opcode::Mtpd => self.move_to_previous(insn.opcode == Opcode::Mtpi),
            Opcode::Mul | Opcode::Div | Opcode::Ash | Opcode::Ashc => self.extended_arithmetic(),
            Opcode::Xor => {
                self.copy_register(Reg::S0, insn.register_field())?;
                let dst = self.locate(insn.destination(), Width::Word, Slot::Destination)?;
                let b = self.load(dst, Width::Word, Slot::Destination)?;
                self.emit(MicroOp::Alu {
                    op: AluOp::Xor,
                    dst: Reg::T0,
                    a: Reg::S0,
                    b,
                    width: Width::Word,
                })?;
                self.store(dst, Reg::T0, Width::Word, false, Access::DATA)?;
                self.flags(FlagFormula::Logical, Reg::T0, Width::Word)
            }
            Opcode::Br
            | Opcode::Bne
            | Opcode::Beq
            | Opcode::Bge
            | Opcode::Blt
            | Opcode::Bgt
            | Opcode::Ble
            | Opcode::Bpl
            | Opcode::Bmi
            | Opcode::Bhi
            | Opcode::Blos
            | Opcode::Bvc
            | Opcode::Bvs
            | Opcode::Bcc
            | Opcode::Bcs => Ok(()),
        }
    }

    fn double_operand(&mut self) -> Result<(), CoreError> {
        let insn = *self.insn;
        let width = insn.width();
        let src = self.locate(insn.source(), width, Slot::Source)?;
        let s = self.load(src, width, Slot::Source)?;
        let dst = self.locate(insn.destination(), width, Slot::Destination)?;
        let d = self.load(dst, width, Slot::Destination)?;
        let (op, a, b, formula) = match insn.opcode {
            Opcode::Add => (AluOp::Add, s, d, FlagFormula::Add),
            Opcode::Sub => (AluOp::Sub, d, s, FlagFormula::Subtract),
            Opcode::Bis => (AluOp::Or, d, s, FlagFormula::Logical),
            _ => {
                self.emit(MicroOp::Alu {
                    op: AluOp::Not,
                    dst: Reg::T1,
                    a: s,
                    b: s,
                    width,
                })?;
                (AluOp::And, d, Reg::T1, FlagFormula::Logical)
            }
        };
        self.emit(MicroOp::Alu {
            op,
            dst: Reg::T0,
            a,
            b,
            width,
        })?;
        self.store(dst, Reg::T0, width, false, Access::DATA)?;
        self.flags(formula, Reg::T0, width)
    }

    /// Read-modify-write of the destination: `compute` reads `D0` into `T0`.
    fn modify(&mut self, compute: MicroOp, formula: FlagFormula) -> Result<(), CoreError> {
        let insn = *self.insn;
        let width = insn.width();
        let dst = self.locate(insn.destination(), width, Slot::Destination)?;
        self.load(dst, width, Slot::Destination)?;
        self.emit(compute)?;
        self.store(dst, Reg::T0, width, false, Access::DATA)?;
        self.flags(formula, Reg::T0, width)
    }

    fn unary(&mut self, op: AluOp, formula: FlagFormula) -> Result<(), CoreError> {
        let width = self.insn.width();
        self.modify(
            MicroOp::Alu {
                op,
                dst: Reg::T0,
                a: Reg::D0,
                b: Reg::D0,
                width,
            },
            formula,
        )
    }

    fn shift(&mut self, op: ShiftOp) -> Result<(), CoreError> {
        let width = self.insn.width();
        self.modify(
            MicroOp::Shift {
                op,
                dst: Reg::T0,
                src: Reg::D0,
                width,
            },
            FlagFormula::Shift,
        )
    }

    fn extended_arithmetic(&mut self) -> Result<(), CoreError> {
        let insn = *self.insn;
        let reg = insn.register_field();
        let pair = reg.odd_partner();
        let src = self.locate(insn.destination(), Width::Word, Slot::Source)?;
        let s = self.load(src, Width::Word, Slot::Source)?;
        let (op, formula) = match insn.opcode {
            Opcode::Mul => (
                MicroOp::Mul {
                    hi: reg,
                    lo: pair,
                    a: reg,
                    b: s,
                },
                FlagFormula::Multiply,
            ),
            Opcode::Div => (
                MicroOp::Div {
                    hi: reg,
                    lo: pair,
                    divisor: s,
                },
                FlagFormula::Divide,
            ),
            Opcode::Ash => (
                MicroOp::ShiftArith {
                    dst: reg,
                    src: reg,
                    count: s,
                },
                FlagFormula::ArithmeticShift,
            ),
            _ => (
                MicroOp::ShiftArith32 {
                    hi: reg,
                    lo: pair,
                    count: s,
                },
                FlagFormula::ArithmeticShiftCombined,
            ),
        };
        self.emit(op)?;
        self.flags(formula, reg, Width::Word)
    }

    fn jump_to_subroutine(&mut self) -> Result<(), CoreError> {
        let insn = *self.insn;
        let link = insn.register_field();
        let located = self.locate(insn.destination(), Width::Word, Slot::Destination)?;
        let Some(target) = self.jump_target(located)? else {
            return self.emit(MicroOp::RaiseTrap(TrapKind::Illegal));
        };
        self.emit(MicroOp::Move {
            dst: Reg::T0,
            src: link,
        })?;
        self.push(Reg::T0)?;
        self.emit(MicroOp::Move {
            dst: link,
            src: Reg::Pc,
        })?;
        self.emit(MicroOp::Jump {
            from: insn.pc,
            target,
        })
    }

    fn return_from_subroutine(&mut self) -> Result<(), CoreError> {
        let insn = *self.insn;
        let link = insn.low_register();
        if link == Reg::Pc {
            self.pop(Reg::T0)?;
            return self.emit(MicroOp::Jump {
                from: insn.pc,
                target: Reg::T0,
            });
        }
        self.emit(MicroOp::Move {
            dst: Reg::T1,
            src: link,
        })?;
        self.pop(Reg::T0)?;
        self.emit(MicroOp::Move {
            dst: link,
            src: Reg::T0,
        })?;
        self.emit(MicroOp::Jump {
            from: insn.pc,
            target: Reg::T1,
        })
    }

    fn mark(&mut self) -> Result<(), CoreError> {
        let insn = *self.insn;
        self.emit(MicroOp::AddImm {
            dst: Reg::Sp,
            src: Reg::Pc,
            value: 2 * insn.count(),
        })?;
        self.emit(MicroOp::Move {
            dst: Reg::T1,
            src: Reg::R5,
        })?;
        self.pop(Reg::T0)?;
        self.emit(MicroOp::Move {
            dst: Reg::R5,
            src: Reg::T0,
        })?;
        self.emit(MicroOp::Jump {
            from: insn.pc,
            target: Reg::T1,
        })
    }

    fn return_from_interrupt(&mut self, inhibit_trace: bool) -> Result<(), CoreError> {
        self.pop(Reg::T0)?;
        self.pop(Reg::T1)?;
        self.emit(MicroOp::LoadPsw {
            src: Reg::T1,
            kind: PswLoad::Ordinary,
        })?;
        if inhibit_trace {
            self.emit(MicroOp::InhibitTrace)?;
        }
        self.emit(MicroOp::Jump {
            from: self.insn.pc,
            target: Reg::T0,
        })
    }

    fn move_from_previous(&mut self, instruction_space: bool) -> Result<(), CoreError> {
        let operand = self.insn.destination();
        let space = if instruction_space {
            Space::Instruction
        } else {
            Space::Data
        };
        match self.locate(operand, Width::Word, Slot::Source)? {
            Located::Register(Reg::Sp) => self.emit(MicroOp::ReadPreviousSp { dst: Reg::S0 })?,
            Located::Register(src) => self.emit(MicroOp::Move { dst: Reg::S0, src })?,
            Located::Memory(addr) => self.emit(MicroOp::Load {
                dst: Reg::S0,
                addr,
                width: Width::Word,
                access: Access {
                    mode: ModeSelect::Previous,
                    space,
                },
            })?,
            Located::Immediate { value, .. } => {
                self.emit(MicroOp::LoadImm {
                    dst: Reg::S0,
                    value,
                })?;
            }
        }
        self.push(Reg::S0)?;
        self.flags(FlagFormula::Logical, Reg::S0, Width::Word)
    }

    fn move_to_previous(&mut self, instruction_space: bool) -> Result<(), CoreError> {
        let operand = self.insn.destination();
        let access = Access {
            mode: ModeSelect::Previous,
            space: if instruction_space {
                Space::Instruction
            } else {
                Space::Data
            },
        };
        self.pop(Reg::T0)?;
        match self.locate(operand, Width::Word, Slot::Destination)? {
            Located::Register(Reg::Sp) => self.emit(MicroOp::WritePreviousSp { src: Reg::T0 })?,
            located => self.store(located, Reg::T0, Width::Word, false, access)?,
        }
        self.flags(FlagFormula::Logical, Reg::T0, Width::Word)
    }
}
