//! Execution semantics shared by all generations.

#![allow(clippy::pedantic, clippy::nursery, missing_docs)]

use bitflags as _;
use log as _;
use proptest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use picoblaze_core::{
    BinaryOp, CapabilityError, Condition, Destination, Engine, Features, Frame, Instruction,
    MultiplexedPorts, PortBus, ProcessorProfile, Program, RamPorts, SimulationError, Source,
    StepOutcome, PICOBLAZE_3, PICOBLAZE_6, PICOBLAZE_CPLD,
};
use rstest::rstest;

fn load(dest: u8, constant: u8) -> Instruction {
    Instruction::Binary {
        op: BinaryOp::Load,
        dest,
        source: Source::Immediate(constant),
    }
}

fn op(op: BinaryOp, dest: u8, source: Source) -> Instruction {
    Instruction::Binary { op, dest, source }
}

fn jump(condition: Condition, target: u16) -> Instruction {
    Instruction::JumpOrCall {
        call: false,
        condition,
        destination: Destination::Absolute(target),
    }
}

fn engine_at(
    profile: &'static ProcessorProfile,
    slots: impl IntoIterator<Item = (u16, Instruction)>,
) -> Engine<RamPorts> {
    let mut image = vec![None; usize::from(profile.rom_size())];
    for (address, instruction) in slots {
        image[usize::from(address)] = Some(instruction);
    }
    Engine::new(
        Program::new(profile, image).expect("valid program"),
        RamPorts::default(),
    )
}

fn sequential(profile: &'static ProcessorProfile, program: &[Instruction]) -> Engine<RamPorts> {
    engine_at(profile, (0..).zip(program.iter().copied()))
}

#[test]
fn interrupt_saves_flags_and_returni_resumes_at_interrupted_address() {
    let mut engine = engine_at(
        &PICOBLAZE_3,
        [
            (0, Instruction::SetInterruptEnable { enable: true }),
            (1, op(BinaryOp::Compare, 0, Source::Immediate(0))),
            (2, load(1, 1)),
            (0x3FF, op(BinaryOp::Add, 1, Source::Immediate(0xFF))),
        ],
    );
    engine.step().expect("enable");
    engine.step().expect("compare sets zero");
    assert!(engine.state().zero);

    engine.raise_interrupt();
    assert_eq!(
        engine.step(),
        Ok(StepOutcome::InterruptServiced { return_address: 2 })
    );
    assert_eq!(engine.pc(), 0x3FF);
    assert!(!engine.state().interrupt_enable);
    assert!(!engine.state().interrupt_pending);
    assert!(engine.state().preserved_zero);
    assert_eq!(
        engine.state().stack.peek(),
        Ok(Frame {
            address: 2,
            interrupt: true
        })
    );

    engine.step().expect("handler body");
    assert_eq!(engine.state().registers.get(1), Ok(0xFF));
    assert!(!engine.state().zero);
}

#[test]
fn returni_enable_restores_preserved_flags_without_increment() {
    let mut engine = engine_at(
        &PICOBLAZE_6,
        [
            (0, Instruction::SetInterruptEnable { enable: true }),
            (1, load(0, 0)),
            (0xFFF, Instruction::ReturnFromInterrupt { enable: true }),
        ],
    );
    engine.step().expect("enable");
    engine.state_mut().carry = true;
    engine.raise_interrupt();
    engine.step().expect("interrupt");
    engine.state_mut().carry = false;
    engine.state_mut().zero = true;

    engine.step().expect("returni");
    assert_eq!(engine.pc(), 1);
    assert!(engine.state().carry);
    assert!(!engine.state().zero);
    assert!(engine.state().interrupt_enable);
    assert_eq!(engine.stack_depth(), 0);
}

#[test]
fn pending_interrupt_waits_until_enabled() {
    let mut engine = sequential(&PICOBLAZE_6, &[load(0, 1), load(0, 2)]);
    engine.raise_interrupt();
    assert_eq!(engine.step(), Ok(StepOutcome::Executed { address: 0 }));
    assert!(engine.state().interrupt_pending);
}

#[test]
fn stack_overflows_after_capacity_calls() {
    let recursion = Instruction::JumpOrCall {
        call: true,
        condition: Condition::Always,
        destination: Destination::Absolute(0),
    };
    let mut engine = sequential(&PICOBLAZE_CPLD, &[recursion]);
    for _ in 0..PICOBLAZE_CPLD.stack_depth() {
        engine.step().expect("call within stack depth");
    }
    assert_eq!(
        engine.step(),
        Err(SimulationError::StackOverflow { depth: 4 })
    );
}

#[test]
fn return_on_empty_stack_underflows() {
    let mut engine = sequential(
        &PICOBLAZE_CPLD,
        &[Instruction::Return {
            condition: Condition::Always,
        }],
    );
    assert_eq!(engine.step(), Err(SimulationError::StackUnderflow));
}

#[test]
fn conditional_return_not_taken_does_not_touch_stack() {
    let mut engine = sequential(
        &PICOBLAZE_CPLD,
        &[Instruction::Return {
            condition: Condition::Carry,
        }],
    );
    assert_eq!(engine.step(), Ok(StepOutcome::Executed { address: 0 }));
    assert_eq!(engine.pc(), 1);
}

#[rstest]
#[case(Condition::Zero, true, false, true)]
#[case(Condition::Zero, false, false, false)]
#[case(Condition::NotZero, false, false, true)]
#[case(Condition::Carry, false, true, true)]
#[case(Condition::NotCarry, false, true, false)]
fn conditional_jumps_follow_flags(
    #[case] condition: Condition,
    #[case] zero: bool,
    #[case] carry: bool,
    #[case] taken: bool,
) {
    let mut engine = sequential(&PICOBLAZE_3, &[jump(condition, 0x200)]);
    engine.state_mut().zero = zero;
    engine.state_mut().carry = carry;
    engine.step().expect("jump");
    assert_eq!(engine.pc(), if taken { 0x200 } else { 1 });
}

#[test]
fn sixteen_bit_subtraction_chains_borrow() {
    // 0x0100 - 0x0001 = 0x00FF
    let mut engine = sequential(
        &PICOBLAZE_3,
        &[
            load(0, 0x00),
            load(1, 0x01),
            op(BinaryOp::Sub, 0, Source::Immediate(0x01)),
            op(BinaryOp::SubCarry, 1, Source::Immediate(0x00)),
        ],
    );
    for _ in 0..4 {
        engine.step().expect("step");
    }
    assert_eq!(engine.state().registers.get(0), Ok(0xFF));
    assert_eq!(engine.state().registers.get(1), Ok(0x00));
    assert!(!engine.state().carry);
    assert!(engine.state().zero);
}

#[test]
fn test_carry_reflects_parity() {
    let mut engine = sequential(
        &PICOBLAZE_3,
        &[
            load(0, 0b0111_0000),
            op(BinaryOp::Test, 0, Source::Immediate(0xFF)),
        ],
    );
    engine.step().expect("load");
    engine.step().expect("test");
    assert!(engine.state().carry);
    assert!(!engine.state().zero);
    assert_eq!(engine.state().registers.get(0), Ok(0b0111_0000));
}

#[rstest]
#[case(Instruction::OutputImmediate { value: 1, port: 2 }, Features::OUTPUT_CONSTANT)]
#[case(Instruction::ReadBuildId { register: 0 }, Features::BUILD_ID)]
#[case(
    Instruction::JumpOrCall {
        call: true,
        condition: Condition::Always,
        destination: Destination::RegisterPair { high: 0, low: 1 },
    },
    Features::INDIRECT_JUMPS
)]
#[case(op(BinaryOp::Star, 0, Source::Register(1)), Features::ALTERNATE_BANK)]
#[case(op(BinaryOp::TestCarry, 0, Source::Register(1)), Features::TEST_COMPARE_CARRY)]
fn gated_instructions_fail_without_side_effects(
    #[case] instruction: Instruction,
    #[case] feature: Features,
) {
    let program = Program::unvalidated(&PICOBLAZE_3, [Some(instruction)]).expect("fits rom");
    let mut engine = Engine::new(program, RamPorts::default());
    engine.state_mut().registers.set(1, 0x44).expect("register exists");
    let before = engine.state().clone();

    assert_eq!(
        engine.step(),
        Err(SimulationError::Capability(CapabilityError::MissingFeature {
            generation: PICOBLAZE_3.generation(),
            feature,
        }))
    );
    assert_eq!(engine.state(), &before);
    assert_eq!(engine.ports(), &RamPorts::default());
}

#[test]
fn register_outside_the_file_is_fatal() {
    let program =
        Program::unvalidated(&PICOBLAZE_3, [Some(load(20, 1))]).expect("fits rom");
    let mut engine = Engine::new(program, RamPorts::default());
    assert_eq!(
        engine.step(),
        Err(SimulationError::RegisterOutOfRange { index: 20 })
    );
}

#[test]
fn reset_returns_to_address_zero_with_bank_a() {
    let mut engine = sequential(
        &PICOBLAZE_6,
        &[
            load(0, 0x11),
            Instruction::SetRegisterBank { alternate: true },
            Instruction::SetInterruptEnable { enable: true },
        ],
    );
    for _ in 0..3 {
        engine.step().expect("step");
    }
    engine.reset();
    assert_eq!(engine.pc(), 0);
    assert!(!engine.state().registers.alternate_bank());
    assert!(!engine.state().interrupt_enable);
    assert_eq!(engine.state().registers.get(0), Ok(0x11));
}

#[test]
fn io_goes_through_the_port_bus() {
    let mut ram = RamPorts::new(16).expect("small ram");
    ram.output(3, 0x5A);
    let mut mux = MultiplexedPorts::new();
    mux.attach(Box::new(ram), 0x10, 0, 16).expect("fits");

    let program = Program::from_instructions(
        &PICOBLAZE_6,
        [
            op(BinaryOp::Input, 0, Source::Immediate(0x13)),
            op(BinaryOp::Output, 0, Source::Immediate(0x14)),
            Instruction::OutputImmediate {
                value: 0x77,
                port: 0x5,
            },
            load(1, 0x14),
            op(BinaryOp::Input, 2, Source::Register(1)),
        ],
    )
    .expect("valid program");
    let mut engine = Engine::new(program, mux);
    for _ in 0..5 {
        engine.step().expect("step");
    }
    assert_eq!(engine.state().registers.get(0), Ok(0x5A));
    assert_eq!(engine.state().registers.get(2), Ok(0x5A));
    assert_eq!(engine.ports_mut().input(0x05), 0);
}

#[test]
fn program_counter_wraps_at_rom_end() {
    let mut engine = engine_at(&PICOBLAZE_3, [(0x3FF, load(0, 1))]);
    engine.state_mut().pc = 0x3FF;
    engine.step().expect("load");
    assert_eq!(engine.pc(), 0);
}
