//! Program images bound to a profile, and instruction validation.

use crate::fault::{CapabilityError, ProgramError, Violation};
use crate::instruction::{Condition, Destination, Instruction, Source};
use crate::profile::ProcessorProfile;

/// Highest port addressable by `OUTPUTK`.
pub const MAX_CONSTANT_OUTPUT_PORT: u8 = 0xF;

impl ProcessorProfile {
    /// Checks that the generation implements the instruction's family and
    /// operand form.
    ///
    /// Register indexes and destinations are not examined; see [`validate`].
    ///
    /// # Errors
    ///
    /// [`CapabilityError::MissingFeature`] for an unavailable family,
    /// [`CapabilityError::UnsupportedOperand`] for an operand form with no
    /// encoding on this generation.
    pub fn supports(&self, instruction: &Instruction) -> Result<(), CapabilityError> {
        let generation = self.generation();
        if let Some(feature) = instruction.required_feature() {
            if !self.has(feature) {
                return Err(CapabilityError::MissingFeature {
                    generation,
                    feature,
                });
            }
        }

        let encodable = match *instruction {
            Instruction::Binary { op, source, .. } => generation
                .opcodes()
                .binary(op, matches!(source, Source::Register(_)))
                .is_some(),
            Instruction::JumpOrCall {
                condition,
                destination: Destination::RegisterPair { .. },
                ..
            } => condition == Condition::Always,
            _ => true,
        };
        if encodable {
            Ok(())
        } else {
            Err(CapabilityError::UnsupportedOperand {
                generation,
                instruction: *instruction,
            })
        }
    }

    fn check_register(&self, register: u8) -> Result<(), CapabilityError> {
        if register < self.register_count() {
            Ok(())
        } else {
            Err(CapabilityError::RegisterOutOfRange {
                register,
                count: self.register_count(),
            })
        }
    }
}

/// Full legality check of one instruction against a profile.
///
/// # Errors
///
/// Everything [`ProcessorProfile::supports`] rejects, plus register indexes
/// outside a bank, absolute destinations outside ROM and `OUTPUTK` ports
/// above 15.
pub fn validate(profile: &ProcessorProfile, instruction: &Instruction) -> Result<(), CapabilityError> {
    profile.supports(instruction)?;
    match *instruction {
        Instruction::Binary { dest, source, .. } => {
            profile.check_register(dest)?;
            if let Source::Register(register) = source {
                profile.check_register(register)?;
            }
        }
        Instruction::Shift { register, .. } | Instruction::ReadBuildId { register } => {
            profile.check_register(register)?;
        }
        Instruction::JumpOrCall { destination, .. } => match destination {
            Destination::Absolute(address) if address >= profile.rom_size() => {
                return Err(CapabilityError::DestinationOutOfRange {
                    address,
                    rom_size: profile.rom_size(),
                });
            }
            Destination::Absolute(_) => {}
            Destination::RegisterPair { high, low } => {
                profile.check_register(high)?;
                profile.check_register(low)?;
            }
        },
        Instruction::OutputImmediate { port, .. } if port > MAX_CONSTANT_OUTPUT_PORT => {
            return Err(CapabilityError::PortOutOfRange { port });
        }
        _ => {}
    }
    Ok(())
}

/// A ROM image: one optional instruction per address, bound to a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    profile: &'static ProcessorProfile,
    slots: Box<[Option<Instruction>]>,
}

impl Program {
    /// Builds a program, validating every instruction.
    ///
    /// Short inputs are padded with empty slots up to the ROM size.
    ///
    /// # Errors
    ///
    /// [`ProgramError::TooLong`] when there are more slots than ROM words,
    /// [`ProgramError::Invalid`] listing every rejected instruction.
    pub fn new(
        profile: &'static ProcessorProfile,
        slots: impl IntoIterator<Item = Option<Instruction>>,
    ) -> Result<Self, ProgramError> {
        let program = Self::unvalidated(profile, slots)?;
        let violations: Vec<Violation> = program
            .iter()
            .filter_map(|(address, instruction)| {
                validate(profile, instruction)
                    .err()
                    .map(|error| Violation { address, error })
            })
            .collect();
        if violations.is_empty() {
            Ok(program)
        } else {
            Err(ProgramError::Invalid(violations))
        }
    }

    /// Builds a program from consecutive instructions starting at address 0.
    ///
    /// # Errors
    ///
    /// Same as [`Program::new`].
    pub fn from_instructions(
        profile: &'static ProcessorProfile,
        instructions: impl IntoIterator<Item = Instruction>,
    ) -> Result<Self, ProgramError> {
        Self::new(profile, instructions.into_iter().map(Some))
    }

    /// Builds a program without checking instructions against the profile.
    ///
    /// The engine still rejects unsupported instruction families when it
    /// reaches them.
    ///
    /// # Errors
    ///
    /// [`ProgramError::TooLong`] when there are more slots than ROM words.
    pub fn unvalidated(
        profile: &'static ProcessorProfile,
        slots: impl IntoIterator<Item = Option<Instruction>>,
    ) -> Result<Self, ProgramError> {
        let rom_size = usize::from(profile.rom_size());
        let mut slots: Vec<Option<Instruction>> = slots.into_iter().collect();
        if slots.len() > rom_size {
            return Err(ProgramError::TooLong {
                len: slots.len(),
                generation: profile.generation(),
                rom_size: profile.rom_size(),
            });
        }
        slots.resize(rom_size, None);
        Ok(Self {
            profile,
            slots: slots.into_boxed_slice(),
        })
    }

    /// Profile the program targets.
    #[must_use]
    pub const fn profile(&self) -> &'static ProcessorProfile {
        self.profile
    }

    /// Every ROM slot, address order.
    #[must_use]
    pub fn slots(&self) -> &[Option<Instruction>] {
        &self.slots
    }

    /// Instruction at `address`, if the slot is filled.
    #[must_use]
    pub fn get(&self, address: u16) -> Option<&Instruction> {
        self.slots.get(usize::from(address)).and_then(Option::as_ref)
    }

    /// Filled slots with their addresses.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Instruction)> + '_ {
        (0..=u16::MAX)
            .zip(self.slots.iter())
            .filter_map(|(address, slot)| slot.as_ref().map(|instruction| (address, instruction)))
    }
}
