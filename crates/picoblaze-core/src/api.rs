//! Host-facing contracts: configuration, CPU state and the port bus.

use crate::profile::ProcessorProfile;
use crate::state::{CallStack, RegisterFile};

/// Engine configuration supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EngineConfig {
    /// Value returned by `HWBUILD`.
    pub build_id: u8,
    /// Log every executed instruction at trace level.
    pub trace_instructions: bool,
}

/// Complete architectural state of one processor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuState {
    /// Address of the next instruction; always below the ROM size.
    pub pc: u16,
    /// General purpose registers, both banks.
    pub registers: RegisterFile,
    /// Scratchpad RAM; empty without `STORE`/`FETCH`.
    pub scratchpad: Box<[u8]>,
    /// Zero flag.
    pub zero: bool,
    /// Carry flag.
    pub carry: bool,
    /// Zero flag saved on interrupt entry.
    pub preserved_zero: bool,
    /// Carry flag saved on interrupt entry.
    pub preserved_carry: bool,
    /// Interrupts are accepted.
    pub interrupt_enable: bool,
    /// An interrupt is waiting to be serviced.
    pub interrupt_pending: bool,
    /// Value returned by `HWBUILD`.
    pub build_id: u8,
    /// Return frames.
    pub stack: CallStack,
}

impl CpuState {
    /// Creates the power-on state for `profile`.
    #[must_use]
    pub fn new(profile: &ProcessorProfile, config: &EngineConfig) -> Self {
        Self {
            pc: 0,
            registers: RegisterFile::new(profile),
            scratchpad: vec![0; usize::from(profile.scratchpad_size())].into_boxed_slice(),
            zero: false,
            carry: false,
            preserved_zero: false,
            preserved_carry: false,
            interrupt_enable: false,
            interrupt_pending: false,
            build_id: config.build_id,
            stack: CallStack::new(profile.stack_depth()),
        }
    }

    /// Applies hardware reset.
    ///
    /// Control state returns to power-on values; registers and scratchpad
    /// keep their contents.
    pub fn reset(&mut self) {
        self.pc = 0;
        self.zero = false;
        self.carry = false;
        self.preserved_zero = false;
        self.preserved_carry = false;
        self.interrupt_enable = false;
        self.interrupt_pending = false;
        self.registers.select_bank(false);
        self.stack.clear();
    }

    /// Scratchpad index for an 8-bit address, wrapped to the RAM size.
    #[must_use]
    pub fn scratchpad_index(&self, address: u8) -> Option<usize> {
        let len = self.scratchpad.len();
        (len > 0).then(|| usize::from(address) & (len - 1))
    }
}

/// Byte-wide IO port bus driven by `INPUT`, `OUTPUT` and `OUTPUTK`.
pub trait PortBus {
    /// Reads a byte from `port`.
    fn input(&mut self, port: u8) -> u8;

    /// Writes a byte to `port`.
    fn output(&mut self, port: u8, value: u8);
}

impl<T: PortBus + ?Sized> PortBus for Box<T> {
    fn input(&mut self, port: u8) -> u8 {
        (**self).input(port)
    }

    fn output(&mut self, port: u8, value: u8) {
        (**self).output(port, value);
    }
}

impl<T: PortBus + ?Sized> PortBus for &mut T {
    fn input(&mut self, port: u8) -> u8 {
        (**self).input(port)
    }

    fn output(&mut self, port: u8, value: u8) {
        (**self).output(port, value);
    }
}

/// Result of one engine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// An instruction executed.
    Executed {
        /// Address it was fetched from.
        address: u16,
    },
    /// The slot was empty; only the program counter moved.
    Skipped {
        /// Address of the empty slot.
        address: u16,
    },
    /// A pending interrupt was taken instead of executing an instruction.
    InterruptServiced {
        /// Address saved on the stack.
        return_address: u16,
    },
}
