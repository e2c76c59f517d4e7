//! Instruction execution pipeline.
//!
//! One [`Engine::step`] either services a pending interrupt or executes the
//! instruction at the program counter:
//! 1. Check the instruction against the profile (no side effects on failure)
//! 2. Advance the program counter with wraparound
//! 3. Read operands, compute, write the destination and flags
//! 4. Redirect the program counter for taken jumps, calls and returns

mod flags;

pub use flags::{FlagsUpdate, PriorFlags};

use log::{debug, trace, warn};

use crate::api::{CpuState, EngineConfig, PortBus, StepOutcome};
use crate::fault::SimulationError;
use crate::instruction::{BinaryOp, Condition, Destination, Instruction, Source};
use crate::profile::ProcessorProfile;
use crate::program::Program;
use crate::state::Frame;

/// Stepwise executor of one program on one processor.
///
/// The engine is not synchronized; wrap it in a lock to share it.
#[derive(Debug)]
pub struct Engine<P> {
    program: Program,
    state: CpuState,
    ports: P,
    config: EngineConfig,
}

impl<P: PortBus> Engine<P> {
    /// Creates an engine in the power-on state with default configuration.
    #[must_use]
    pub fn new(program: Program, ports: P) -> Self {
        Self::with_config(program, ports, EngineConfig::default())
    }

    /// Creates an engine in the power-on state.
    #[must_use]
    pub fn with_config(program: Program, ports: P, config: EngineConfig) -> Self {
        let state = CpuState::new(program.profile(), &config);
        Self {
            program,
            state,
            ports,
            config,
        }
    }

    /// Profile of the loaded program.
    #[must_use]
    pub const fn profile(&self) -> &'static ProcessorProfile {
        self.program.profile()
    }

    /// Loaded program.
    #[must_use]
    pub const fn program(&self) -> &Program {
        &self.program
    }

    /// Architectural state.
    #[must_use]
    pub const fn state(&self) -> &CpuState {
        &self.state
    }

    /// Mutable architectural state, for hosts poking registers or memory.
    pub fn state_mut(&mut self) -> &mut CpuState {
        &mut self.state
    }

    /// Port collaborator.
    #[must_use]
    pub const fn ports(&self) -> &P {
        &self.ports
    }

    /// Mutable port collaborator.
    pub fn ports_mut(&mut self) -> &mut P {
        &mut self.ports
    }

    /// Program counter.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.state.pc
    }

    /// Frames on the call stack.
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.state.stack.depth()
    }

    /// Splits the engine into program, state and ports.
    pub fn into_parts(self) -> (Program, CpuState, P) {
        (self.program, self.state, self.ports)
    }

    /// Applies hardware reset; registers and scratchpad keep their contents.
    pub fn reset(&mut self) {
        debug!("reset {} core", self.profile());
        self.state.reset();
    }

    /// Latches an interrupt request, serviced on the next step once enabled.
    pub fn raise_interrupt(&mut self) {
        self.state.interrupt_pending = true;
    }

    /// Executes one step.
    ///
    /// # Errors
    ///
    /// Capability violations leave the state untouched. Register range
    /// errors and stack overflow or underflow abort the instruction where it
    /// failed; the state must then be reset or discarded.
    pub fn step(&mut self) -> Result<StepOutcome, SimulationError> {
        if self.state.interrupt_pending && self.state.interrupt_enable {
            return self.service_interrupt();
        }

        let address = self.state.pc;
        let Some(instruction) = self.program.get(address).copied() else {
            self.state.pc = self.next_address(address);
            return Ok(StepOutcome::Skipped { address });
        };

        self.profile().supports(&instruction)?;
        if self.config.trace_instructions {
            trace!("{address:03X}: {instruction}");
        }

        self.state.pc = self.next_address(address);
        self.execute(instruction, address)?;
        Ok(StepOutcome::Executed { address })
    }

    fn service_interrupt(&mut self) -> Result<StepOutcome, SimulationError> {
        let return_address = self.state.pc;
        self.state.stack.push(Frame {
            address: return_address,
            interrupt: true,
        })?;
        self.state.pc = self.profile().interrupt_vector();
        self.state.preserved_zero = self.state.zero;
        self.state.preserved_carry = self.state.carry;
        self.state.interrupt_enable = false;
        self.state.interrupt_pending = false;
        debug!("interrupt taken at {return_address:03X}");
        Ok(StepOutcome::InterruptServiced { return_address })
    }

    const fn next_address(&self, address: u16) -> u16 {
        address.wrapping_add(1) & self.profile().address_mask()
    }

    fn execute(&mut self, instruction: Instruction, address: u16) -> Result<(), SimulationError> {
        match instruction {
            Instruction::Binary { op, dest, source } => self.execute_binary(op, dest, source),
            Instruction::Shift { op, register } => {
                let value = self.state.registers.get(register)?;
                let (result, update) = flags::shift(op, value, self.state.carry);
                self.state.registers.set(register, result)?;
                self.apply(update);
                Ok(())
            }
            Instruction::JumpOrCall {
                call,
                condition,
                destination,
            } => self.execute_jump(call, condition, destination, address),
            Instruction::Return { condition } => {
                if condition.evaluate(self.state.zero, self.state.carry) {
                    self.return_from_call()?;
                }
                Ok(())
            }
            Instruction::ReturnFromInterrupt { enable } => {
                let frame = self.state.stack.pop()?;
                if !frame.interrupt {
                    warn!("RETURNI at {address:03X} popped a call frame");
                }
                self.state.pc = frame.address & self.profile().address_mask();
                self.state.zero = self.state.preserved_zero;
                self.state.carry = self.state.preserved_carry;
                self.state.interrupt_enable = enable;
                Ok(())
            }
            Instruction::SetInterruptEnable { enable } => {
                self.state.interrupt_enable = enable;
                Ok(())
            }
            Instruction::SetRegisterBank { alternate } => {
                self.state.registers.select_bank(alternate);
                Ok(())
            }
            Instruction::ReadBuildId { register } => {
                self.state.registers.set(register, self.state.build_id)
            }
            Instruction::OutputImmediate { value, port } => {
                self.ports.output(port, value);
                Ok(())
            }
        }
    }

    fn execute_binary(&mut self, op: BinaryOp, dest: u8, source: Source) -> Result<(), SimulationError> {
        let right = match source {
            Source::Immediate(constant) => constant,
            Source::Register(register) => self.state.registers.get(register)?,
        };
        let left = self.state.registers.get(dest)?;
        let prior = PriorFlags {
            zero: self.state.zero,
            carry: self.state.carry,
        };

        match op {
            BinaryOp::Load => self.state.registers.set(dest, right)?,
            BinaryOp::LoadReturn => {
                self.state.registers.set(dest, right)?;
                self.return_from_call()?;
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
                let result = match op {
                    BinaryOp::And => left & right,
                    BinaryOp::Or => left | right,
                    _ => left ^ right,
                };
                self.state.registers.set(dest, result)?;
                self.apply(flags::logic(result));
            }
            BinaryOp::Add | BinaryOp::AddCarry => {
                let carry_in = op == BinaryOp::AddCarry && prior.carry;
                let (result, update) = flags::add(left, right, carry_in);
                self.state.registers.set(dest, result)?;
                self.apply(update);
            }
            BinaryOp::Sub | BinaryOp::SubCarry => {
                let borrow_in = op == BinaryOp::SubCarry && prior.carry;
                let (result, update) = flags::sub(left, right, borrow_in);
                self.state.registers.set(dest, result)?;
                self.apply(update);
            }
            BinaryOp::Test => self.apply(flags::test(left, right, None)),
            BinaryOp::TestCarry => self.apply(flags::test(left, right, Some(prior))),
            BinaryOp::Compare => self.apply(flags::compare(left, right, None)),
            BinaryOp::CompareCarry => self.apply(flags::compare(left, right, Some(prior))),
            BinaryOp::Input => {
                let value = self.ports.input(right);
                self.state.registers.set(dest, value)?;
            }
            BinaryOp::Output => self.ports.output(right, left),
            BinaryOp::Fetch => {
                if let Some(index) = self.state.scratchpad_index(right) {
                    let value = self.state.scratchpad[index];
                    self.state.registers.set(dest, value)?;
                }
            }
            BinaryOp::Store => {
                if let Some(index) = self.state.scratchpad_index(right) {
                    self.state.scratchpad[index] = left;
                }
            }
            BinaryOp::Star => self.state.registers.set_inactive(dest, right)?,
        }
        Ok(())
    }

    fn execute_jump(
        &mut self,
        call: bool,
        condition: Condition,
        destination: Destination,
        address: u16,
    ) -> Result<(), SimulationError> {
        if !condition.evaluate(self.state.zero, self.state.carry) {
            return Ok(());
        }
        let target = match destination {
            Destination::Absolute(target) => target,
            Destination::RegisterPair { high, low } => {
                let high = self.state.registers.get(high)?;
                let low = self.state.registers.get(low)?;
                u16::from_be_bytes([high, low])
            }
        };
        if call {
            self.state.stack.push(Frame {
                address,
                interrupt: false,
            })?;
        }
        self.state.pc = target & self.profile().address_mask();
        Ok(())
    }

    fn return_from_call(&mut self) -> Result<(), SimulationError> {
        let frame = self.state.stack.pop()?;
        self.state.pc = self.next_address(frame.address);
        Ok(())
    }

    fn apply(&mut self, update: FlagsUpdate) {
        self.state.zero = update.zero;
        self.state.carry = update.carry;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::ShiftOp;
    use crate::ports::RamPorts;
    use crate::profile::{PICOBLAZE, PICOBLAZE_3, PICOBLAZE_6};

    fn engine(profile: &'static ProcessorProfile, program: &[Instruction]) -> Engine<RamPorts> {
        let program =
            Program::from_instructions(profile, program.iter().copied()).expect("valid program");
        Engine::new(program, RamPorts::default())
    }

    fn load(dest: u8, constant: u8) -> Instruction {
        Instruction::Binary {
            op: BinaryOp::Load,
            dest,
            source: Source::Immediate(constant),
        }
    }

    fn binary(op: BinaryOp, dest: u8, source: Source) -> Instruction {
        Instruction::Binary { op, dest, source }
    }

    fn call(target: u16) -> Instruction {
        Instruction::JumpOrCall {
            call: true,
            condition: Condition::Always,
            destination: Destination::Absolute(target),
        }
    }

    const RETURN: Instruction = Instruction::Return {
        condition: Condition::Always,
    };

    fn run(engine: &mut Engine<RamPorts>, steps: usize) {
        for _ in 0..steps {
            engine.step().expect("step succeeds");
        }
    }

    #[test]
    fn add_overflow_sets_carry_and_zero() {
        let mut engine = engine(
            &PICOBLAZE_3,
            &[
                load(0, 0xFF),
                binary(BinaryOp::Add, 0, Source::Immediate(0x01)),
            ],
        );
        run(&mut engine, 2);
        assert_eq!(engine.state().registers.get(0), Ok(0x00));
        assert!(engine.state().carry);
        assert!(engine.state().zero);
    }

    #[test]
    fn call_pushes_own_address_and_return_resumes_after_it() {
        let mut engine = engine(&PICOBLAZE, &[call(3), load(1, 1), load(2, 2), RETURN]);
        engine.step().expect("call");
        assert_eq!(engine.pc(), 3);
        assert_eq!(engine.state().stack.peek().map(|f| f.address), Ok(0));
        engine.step().expect("return");
        assert_eq!(engine.pc(), 1);
        assert_eq!(engine.stack_depth(), 0);
    }

    #[test]
    fn empty_slots_only_advance_and_wrap() {
        let program = Program::new(&PICOBLAZE, [None]).expect("empty program");
        let mut engine = Engine::new(program, RamPorts::default());
        engine.state_mut().pc = 0xFF;
        assert_eq!(engine.step(), Ok(StepOutcome::Skipped { address: 0xFF }));
        assert_eq!(engine.pc(), 0);
    }

    #[test]
    fn load_return_writes_then_returns() {
        let mut engine = engine(
            &PICOBLAZE_6,
            &[
                call(2),
                load(0, 0),
                binary(BinaryOp::LoadReturn, 4, Source::Immediate(0x5A)),
            ],
        );
        run(&mut engine, 2);
        assert_eq!(engine.state().registers.get(4), Ok(0x5A));
        assert_eq!(engine.pc(), 1);
    }

    #[test]
    fn star_writes_the_other_bank() {
        let mut engine = engine(
            &PICOBLAZE_6,
            &[
                load(1, 0x42),
                binary(BinaryOp::Star, 3, Source::Register(1)),
                Instruction::SetRegisterBank { alternate: true },
            ],
        );
        run(&mut engine, 2);
        assert_eq!(engine.state().registers.get(3), Ok(0));
        engine.step().expect("regbank");
        assert_eq!(engine.state().registers.get(3), Ok(0x42));
    }

    #[test]
    fn store_and_fetch_wrap_the_scratchpad_address() {
        let mut engine = engine(
            &PICOBLAZE_3,
            &[
                load(0, 0x99),
                binary(BinaryOp::Store, 0, Source::Immediate(0x45)),
                binary(BinaryOp::Fetch, 1, Source::Immediate(0x05)),
            ],
        );
        run(&mut engine, 3);
        assert_eq!(engine.state().scratchpad[0x05], 0x99);
        assert_eq!(engine.state().registers.get(1), Ok(0x99));
    }

    #[test]
    fn indirect_jump_uses_register_pair() {
        let mut engine = engine(
            &PICOBLAZE_6,
            &[
                load(2, 0x01),
                load(3, 0x23),
                Instruction::JumpOrCall {
                    call: false,
                    condition: Condition::Always,
                    destination: Destination::RegisterPair { high: 2, low: 3 },
                },
            ],
        );
        run(&mut engine, 3);
        assert_eq!(engine.pc(), 0x123);
    }

    #[test]
    fn build_id_comes_from_configuration() {
        let program = Program::from_instructions(
            &PICOBLAZE_6,
            [Instruction::ReadBuildId { register: 7 }],
        )
        .expect("valid program");
        let config = EngineConfig {
            build_id: 0xB1,
            trace_instructions: true,
        };
        let mut engine = Engine::with_config(program, RamPorts::default(), config);
        engine.step().expect("hwbuild");
        assert_eq!(engine.state().registers.get(7), Ok(0xB1));
    }

    #[test]
    fn unsupported_instruction_leaves_state_untouched() {
        let program = Program::unvalidated(
            &PICOBLAZE_3,
            [Some(Instruction::OutputImmediate {
                value: 1,
                port: 2,
            })],
        )
        .expect("fits rom");
        let mut engine = Engine::new(program, RamPorts::default());
        let before = engine.state().clone();
        assert!(matches!(
            engine.step(),
            Err(SimulationError::Capability(_))
        ));
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn shift_updates_register_and_flags() {
        let mut engine = engine(
            &PICOBLAZE,
            &[
                load(5, 0b1000_0001),
                Instruction::Shift {
                    op: ShiftOp::Sl0,
                    register: 5,
                },
            ],
        );
        run(&mut engine, 2);
        assert_eq!(engine.state().registers.get(5), Ok(0b0000_0010));
        assert!(engine.state().carry);
        assert!(!engine.state().zero);
    }
}
