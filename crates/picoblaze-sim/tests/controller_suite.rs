//! Controller behaviour against a live worker thread.

#![allow(clippy::pedantic, clippy::nursery, missing_docs)]

use crossbeam_utils as _;
use log as _;
use thiserror as _;

use std::time::Duration;

use crossbeam_channel::Receiver;
use picoblaze_core::{
    BinaryOp, Condition, Destination, Engine, Instruction, PortBus, Program, RamPorts,
    SimulationError, Source, PICOBLAZE_3,
};
use picoblaze_sim::{
    serial_pair, BreakReason, Command, Controller, ControllerConfig, ControllerError,
    Notification, DATA_PORT, STATUS_PORT,
};
use rstest::rstest;

const TIMEOUT: Duration = Duration::from_secs(5);

fn binary(op: BinaryOp, dest: u8, source: Source) -> Instruction {
    Instruction::Binary { op, dest, source }
}

fn transfer(call: bool, condition: Condition, target: u16) -> Instruction {
    Instruction::JumpOrCall {
        call,
        condition,
        destination: Destination::Absolute(target),
    }
}

fn engine_with<P: PortBus>(program: &[Instruction], ports: P) -> Engine<P> {
    let program = Program::from_instructions(&PICOBLAZE_3, program.iter().copied())
        .expect("valid program");
    Engine::new(program, ports)
}

fn controller(program: &[Instruction]) -> Controller<RamPorts> {
    Controller::spawn(engine_with(program, RamPorts::default())).expect("worker starts")
}

fn next(notifications: &Receiver<Notification>) -> Notification {
    notifications
        .recv_timeout(TIMEOUT)
        .expect("notification before timeout")
}

/// `CALL 3` at 0 into a subroutine that loads s0 and returns.
fn call_program() -> Vec<Instruction> {
    vec![
        transfer(true, Condition::Always, 3),
        binary(BinaryOp::Load, 1, Source::Immediate(7)),
        transfer(false, Condition::Always, 2),
        binary(BinaryOp::Load, 0, Source::Immediate(5)),
        Instruction::Return {
            condition: Condition::Always,
        },
    ]
}

#[test]
fn step_into_executes_exactly_one_instruction() {
    let controller = controller(&[
        binary(BinaryOp::Load, 0, Source::Immediate(1)),
        binary(BinaryOp::Load, 0, Source::Immediate(2)),
    ]);
    let notifications = controller.subscribe();
    controller.step_into().expect("worker alive");

    assert_eq!(
        next(&notifications),
        Notification {
            reason: BreakReason::StepComplete,
            pc: 1
        }
    );
    assert!(notifications.recv_timeout(Duration::from_millis(50)).is_err());
    assert_eq!(
        controller.with_engine(|engine| engine.state().registers.get(0)),
        Ok(1)
    );
}

#[rstest]
#[case(Command::StepInto, BreakReason::StepComplete, 3)]
#[case(Command::StepOver, BreakReason::StepComplete, 1)]
#[case(Command::StepReturn, BreakReason::BreakpointHit, 1)]
fn step_commands_stop_where_expected(
    #[case] command: Command,
    #[case] reason: BreakReason,
    #[case] pc: u16,
) {
    let controller = controller(&call_program());
    controller.breakpoints().set(1, true);
    let notifications = controller.subscribe();
    controller.issue(command).expect("worker alive");
    assert_eq!(next(&notifications), Notification { reason, pc });
}

#[test]
fn step_return_leaves_the_current_subroutine() {
    let controller = controller(&call_program());
    let notifications = controller.subscribe();
    controller.step_into().expect("worker alive");
    assert_eq!(next(&notifications).pc, 3);

    controller.step_return().expect("worker alive");
    assert_eq!(
        next(&notifications),
        Notification {
            reason: BreakReason::StepComplete,
            pc: 1
        }
    );
    controller.with_engine(|engine| {
        assert_eq!(engine.stack_depth(), 0);
        assert_eq!(engine.state().registers.get(0), Ok(5));
    });
}

#[test]
fn continue_runs_to_an_enabled_breakpoint() {
    let controller = controller(&[
        binary(BinaryOp::Load, 0, Source::Immediate(0)),
        binary(BinaryOp::Add, 0, Source::Immediate(1)),
        transfer(false, Condition::Always, 1),
    ]);
    controller.breakpoints().set(2, false);
    controller.breakpoints().set(1, true);
    let notifications = controller.subscribe();

    controller.resume().expect("worker alive");
    assert_eq!(
        next(&notifications),
        Notification {
            reason: BreakReason::BreakpointHit,
            pc: 1
        }
    );

    controller.resume().expect("worker alive");
    assert_eq!(next(&notifications).reason, BreakReason::BreakpointHit);
    assert_eq!(
        controller.with_engine(|engine| engine.state().registers.get(0)),
        Ok(1)
    );
}

#[test]
fn execution_errors_are_reported_and_stop_the_run() {
    let controller = controller(&[Instruction::Return {
        condition: Condition::Always,
    }]);
    let notifications = controller.subscribe();
    controller.resume().expect("worker alive");
    assert_eq!(
        next(&notifications).reason,
        BreakReason::ExecutionError(SimulationError::StackUnderflow)
    );
}

#[test]
fn break_interrupts_a_running_loop() {
    let controller = controller(&[
        binary(BinaryOp::Add, 0, Source::Immediate(1)),
        transfer(false, Condition::Always, 0),
    ]);
    let notifications = controller.subscribe();
    controller.resume().expect("worker alive");

    // Break only reports a stop once the run has actually begun.
    while controller.with_engine(|engine| engine.state().registers.get(0)) == Ok(0) {
        std::thread::yield_now();
    }
    controller.pause().expect("worker alive");

    let stop = next(&notifications);
    assert_eq!(stop.reason, BreakReason::ManualBreak);
    assert!(stop.pc <= 1);
    assert!(notifications.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn every_subscriber_is_notified() {
    let controller = controller(&[binary(BinaryOp::Load, 0, Source::Immediate(1))]);
    let first = controller.subscribe();
    let second = controller.subscribe();
    drop(controller.subscribe());
    controller.step_into().expect("worker alive");
    assert_eq!(next(&first), next(&second));
}

#[test]
fn dispose_returns_the_engine_and_stops_the_worker() {
    let controller = Controller::with_config(
        engine_with(
            &[binary(BinaryOp::Load, 3, Source::Immediate(9))],
            RamPorts::default(),
        ),
        &ControllerConfig {
            thread_name: "dispose-test".to_owned(),
        },
    )
    .expect("worker starts");
    let notifications = controller.subscribe();
    controller.step_into().expect("worker alive");
    next(&notifications);
    controller.issue(Command::Dispose).expect("worker alive");

    let engine = controller.dispose().expect("clean shutdown");
    assert_eq!(engine.pc(), 1);
    assert_eq!(engine.state().registers.get(3), Ok(9));
    assert!(notifications.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn commands_after_the_worker_exits_are_rejected() {
    let controller = controller(&[binary(BinaryOp::Load, 0, Source::Immediate(1))]);
    controller.issue(Command::Dispose).expect("worker alive");
    let mut result = Ok(());
    for _ in 0..1000 {
        result = controller.step_into();
        if result.is_err() {
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(matches!(result, Err(ControllerError::Disconnected)));
}

#[test]
fn serial_echo_program_talks_to_the_host() {
    let (device, host) = serial_pair();
    let program = [
        binary(BinaryOp::Input, 0, Source::Immediate(STATUS_PORT)),
        binary(BinaryOp::Test, 0, Source::Immediate(0x01)),
        transfer(false, Condition::Zero, 0),
        binary(BinaryOp::Input, 1, Source::Immediate(DATA_PORT)),
        binary(BinaryOp::Output, 1, Source::Immediate(DATA_PORT)),
        transfer(false, Condition::Always, 0),
    ];
    let controller = Controller::spawn(engine_with(&program, device)).expect("worker starts");
    assert!(host.send_all(b"ok"));
    controller.resume().expect("worker alive");

    assert_eq!(host.recv_timeout(TIMEOUT), Some(b'o'));
    assert_eq!(host.recv_timeout(TIMEOUT), Some(b'k'));
    controller.pause().expect("worker alive");
    drop(controller);
    assert_eq!(host.try_recv(), None);
}
