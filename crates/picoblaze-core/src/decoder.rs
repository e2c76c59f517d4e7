//! Instruction decoder for every PicoBlaze generation.
//!
//! A single decode path driven by the per-generation [`BitLayout`] and
//! opcode class tables from [`crate::encoding`].

use crate::encoding::{
    classify_opcode, BitLayout, OpcodeClass, CONSTANT_FIELD, OUTPUT_PORT_FIELD,
    OUTPUT_VALUE_FIELD, SHIFT_CODE_FIELD,
};
use crate::fault::{DecodeError, DecodeFailure, ProgramError};
use crate::instruction::{BinaryOp, Condition, Destination, Instruction, ShiftOp, Source};
use crate::profile::ProcessorProfile;
use crate::program::Program;

/// KCPSM register ALU operations selected by bits 2..0 of opcode 0xC.
const KCPSM_REGISTER_ALU: [BinaryOp; 8] = [
    BinaryOp::Load,
    BinaryOp::And,
    BinaryOp::Or,
    BinaryOp::Xor,
    BinaryOp::Add,
    BinaryOp::AddCarry,
    BinaryOp::Sub,
    BinaryOp::SubCarry,
];

/// `HWBUILD` marker inside the KCPSM6 shift opcode.
const BUILD_ID_BIT: u32 = 0x80;

/// Operand fields pulled out of one word.
#[derive(Debug, Clone, Copy)]
struct Operands {
    x: u8,
    y: u8,
    constant: u8,
    address: u16,
    condition: Condition,
}

impl Operands {
    // Register fields are at most 5 bits and addresses at most 12.
    #[allow(clippy::cast_possible_truncation)]
    fn extract(word: u32, layout: &BitLayout) -> Self {
        Self {
            x: layout.register1.extract(word) as u8,
            y: layout.register2.extract(word) as u8,
            constant: CONSTANT_FIELD.extract(word) as u8,
            address: layout.address.extract(word) as u16,
            condition: Condition::from_bits(word >> layout.condition_shift),
        }
    }
}

/// Decodes one instruction word for `profile`.
///
/// # Errors
///
/// Returns [`DecodeError::IllegalOpcode`] when the word is wider than the
/// generation's instruction width or matches no opcode of the generation.
#[allow(clippy::cast_possible_truncation)]
pub fn decode(word: u32, profile: &ProcessorProfile) -> Result<Instruction, DecodeError> {
    let illegal = DecodeError::IllegalOpcode { word };
    if word >> profile.opcode_width() != 0 {
        return Err(illegal);
    }

    let generation = profile.generation();
    let layout = generation.layout();
    let opcode = layout.opcode.extract(word) as u8;
    let class = classify_opcode(generation, opcode).ok_or(illegal)?;
    let operands = Operands::extract(word, layout);

    let instruction = match class {
        OpcodeClass::BinaryConstant(op) => Instruction::Binary {
            op,
            dest: operands.x,
            source: Source::Immediate(operands.constant),
        },
        OpcodeClass::BinaryRegister(op) => Instruction::Binary {
            op,
            dest: operands.x,
            source: Source::Register(operands.y),
        },
        OpcodeClass::RegisterAlu => Instruction::Binary {
            op: KCPSM_REGISTER_ALU[(word & 0x7) as usize],
            dest: operands.x,
            source: Source::Register(operands.y),
        },
        OpcodeClass::Shift => decode_shift(word, operands.x).ok_or(illegal)?,
        OpcodeClass::ShiftOrBuildId if word & BUILD_ID_BIT != 0 => {
            Instruction::ReadBuildId {
                register: operands.x,
            }
        }
        OpcodeClass::ShiftOrBuildId => decode_shift(word, operands.x).ok_or(illegal)?,
        OpcodeClass::Return => Instruction::Return {
            condition: operands.condition,
        },
        OpcodeClass::Jump | OpcodeClass::Call => Instruction::JumpOrCall {
            call: class == OpcodeClass::Call,
            condition: operands.condition,
            destination: Destination::Absolute(operands.address),
        },
        OpcodeClass::ReturnInterrupt => Instruction::ReturnFromInterrupt {
            enable: word & 1 != 0,
        },
        OpcodeClass::InterruptEnable => Instruction::SetInterruptEnable {
            enable: word & 1 != 0,
        },
        OpcodeClass::FlowControl => decode_flow_control(word, &operands).ok_or(illegal)?,
        OpcodeClass::RegisterBank => Instruction::SetRegisterBank {
            alternate: word & 1 != 0,
        },
        OpcodeClass::JumpIndirect | OpcodeClass::CallIndirect => Instruction::JumpOrCall {
            call: class == OpcodeClass::CallIndirect,
            condition: Condition::Always,
            destination: Destination::RegisterPair {
                high: operands.x,
                low: operands.y,
            },
        },
        OpcodeClass::OutputConstant => Instruction::OutputImmediate {
            value: OUTPUT_VALUE_FIELD.extract(word) as u8,
            port: OUTPUT_PORT_FIELD.extract(word) as u8,
        },
    };
    Ok(instruction)
}

#[allow(clippy::cast_possible_truncation)]
fn decode_shift(word: u32, register: u8) -> Option<Instruction> {
    ShiftOp::from_code(SHIFT_CODE_FIELD.extract(word) as u8)
        .map(|op| Instruction::Shift { op, register })
}

/// KCPSM opcodes 0x8 and 0x9: bits 9..8 pick the group, bits 7..4 the
/// zero-operand instruction inside group 0.
fn decode_flow_control(word: u32, operands: &Operands) -> Option<Instruction> {
    match (word >> 8) & 0x3 {
        0 => match (word >> 4) & 0xF {
            0x1 => Some(Instruction::SetInterruptEnable { enable: false }),
            0x3 => Some(Instruction::SetInterruptEnable { enable: true }),
            0x8 => Some(Instruction::Return {
                condition: operands.condition,
            }),
            0xD => Some(Instruction::ReturnFromInterrupt { enable: false }),
            0xF => Some(Instruction::ReturnFromInterrupt { enable: true }),
            _ => None,
        },
        1 | 3 => Some(Instruction::JumpOrCall {
            call: (word >> 8) & 0x3 == 3,
            condition: operands.condition,
            destination: Destination::Absolute(operands.address),
        }),
        _ => None,
    }
}

/// Result of decoding a whole ROM image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    profile: &'static ProcessorProfile,
    /// One slot per word; `None` where decoding failed.
    pub slots: Vec<Option<Instruction>>,
    /// Every word that failed to decode.
    pub failures: Vec<DecodeFailure>,
}

impl DecodedImage {
    /// Profile the image was decoded for.
    #[must_use]
    pub const fn profile(&self) -> &'static ProcessorProfile {
        self.profile
    }

    /// Whether every word decoded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Builds a validated program from a clean image.
    ///
    /// # Errors
    ///
    /// [`ProgramError::Decode`] with every failure when any word was illegal,
    /// otherwise the errors of [`Program::new`].
    pub fn into_program(self) -> Result<Program, ProgramError> {
        if self.failures.is_empty() {
            Program::new(self.profile, self.slots)
        } else {
            Err(ProgramError::Decode(self.failures))
        }
    }
}

/// Decodes every word of an image, collecting failures instead of stopping
/// at the first one.
#[must_use]
pub fn decode_image(words: &[u32], profile: &'static ProcessorProfile) -> DecodedImage {
    let mut slots = Vec::with_capacity(words.len());
    let mut failures = Vec::new();
    for (address, &word) in (0..=u16::MAX).zip(words) {
        match decode(word, profile) {
            Ok(instruction) => slots.push(Some(instruction)),
            Err(error) => {
                failures.push(DecodeFailure { address, error });
                slots.push(None);
            }
        }
    }
    DecodedImage {
        profile,
        slots,
        failures,
    }
}
