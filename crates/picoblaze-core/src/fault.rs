use thiserror::Error;

use crate::instruction::Instruction;
use crate::profile::{Features, Generation};

/// Decoder rejection of a raw instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DecodeError {
    /// No instruction of the generation matches the word.
    #[error("illegal opcode {word:#07x}")]
    IllegalOpcode {
        /// Offending word.
        word: u32,
    },
}

/// An instruction that the profile cannot express or execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum CapabilityError {
    /// The instruction belongs to an optional family the generation lacks.
    #[error("{generation} does not implement {feature:?}")]
    MissingFeature {
        /// Generation checked against.
        generation: Generation,
        /// Missing family.
        feature: Features,
    },
    /// The generation has no encoding for this operand form.
    #[error("{generation} has no encoding for `{instruction}`")]
    UnsupportedOperand {
        /// Generation checked against.
        generation: Generation,
        /// Rejected instruction.
        instruction: Instruction,
    },
    /// Register index beyond a single bank.
    #[error("register s{register:X} does not exist ({count} registers per bank)")]
    RegisterOutOfRange {
        /// Requested register.
        register: u8,
        /// Registers per bank.
        count: u8,
    },
    /// Absolute jump or call beyond program ROM.
    #[error("destination {address:#05x} is outside {rom_size}-word rom")]
    DestinationOutOfRange {
        /// Requested address.
        address: u16,
        /// ROM size of the profile.
        rom_size: u16,
    },
    /// `OUTPUTK` port outside the 4-bit port field.
    #[error("constant output port {port:#x} exceeds 0xf")]
    PortOutOfRange {
        /// Requested port.
        port: u8,
    },
}

/// Fatal faults raised while executing a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum SimulationError {
    /// The instruction is not available on the running profile.
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    /// A push found every stack frame in use.
    #[error("call stack overflow ({depth} frames)")]
    StackOverflow {
        /// Stack capacity.
        depth: u8,
    },
    /// A pop or peek found the stack empty.
    #[error("call stack underflow")]
    StackUnderflow,
    /// Register index beyond the physical register array.
    #[error("register index {index} is outside the register file")]
    RegisterOutOfRange {
        /// Physical index including the bank offset.
        index: usize,
    },
}

/// Validation failure at one program address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("{address:03X}: {error}")]
pub struct Violation {
    /// ROM address of the rejected instruction.
    pub address: u16,
    /// Rejection reason.
    pub error: CapabilityError,
}

/// Decode failure at one image address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("{address:03X}: {error}")]
pub struct DecodeFailure {
    /// ROM address of the word.
    pub address: u16,
    /// Rejection reason.
    pub error: DecodeError,
}

/// Failures building a program image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    /// More instructions than ROM slots.
    #[error("program holds {len} words but {generation} rom has {rom_size}")]
    TooLong {
        /// Supplied length.
        len: usize,
        /// Target generation.
        generation: Generation,
        /// Available slots.
        rom_size: u16,
    },
    /// One or more instructions failed validation.
    #[error("program has {} invalid instruction(s)", .0.len())]
    Invalid(Vec<Violation>),
    /// One or more words failed to decode.
    #[error("image has {} undecodable word(s)", .0.len())]
    Decode(Vec<DecodeFailure>),
}
