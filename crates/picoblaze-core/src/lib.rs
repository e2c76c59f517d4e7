//! Instruction model, codecs and execution engine for the PicoBlaze family.

/// Processor generations and capability profiles.
pub mod profile;
pub use profile::{
    Features, Generation, ProcessorProfile, PICOBLAZE, PICOBLAZE_2, PICOBLAZE_3, PICOBLAZE_6,
    PICOBLAZE_CPLD,
};

/// Closed instruction model.
pub mod instruction;
pub use instruction::{BinaryOp, Condition, Destination, Instruction, ShiftOp, Source};

/// Per-generation opcode maps, bit layouts and the encoder.
pub mod encoding;
pub use encoding::{
    classify_opcode, encode, encode_program, BitLayout, Field, FlowOpcode, OpcodeClass,
    OpcodeMap,
};

/// Table-driven instruction decoder.
pub mod decoder;
pub use decoder::{decode, decode_image, DecodedImage};

/// Program images and validation.
pub mod program;
pub use program::{validate, Program, MAX_CONSTANT_OUTPUT_PORT};

/// Fault taxonomy for decoding, validation and execution.
pub mod fault;
pub use fault::{
    CapabilityError, DecodeError, DecodeFailure, ProgramError, SimulationError, Violation,
};

/// Architectural CPU state model primitives.
pub mod state;
pub use state::{CallStack, Frame, RegisterFile};

/// Host-facing configuration, state and port contracts.
pub mod api;
pub use api::{CpuState, EngineConfig, PortBus, StepOutcome};

/// Instruction execution pipeline.
pub mod execute;
pub use execute::{Engine, FlagsUpdate, PriorFlags};

/// Port collaborators.
pub mod ports;
pub use ports::{BoxedDevice, DeviceId, MultiplexedPorts, PortRangeError, RamPorts, PORT_COUNT};

#[cfg(test)]
use proptest as _;
