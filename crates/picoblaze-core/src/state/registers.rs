use crate::fault::SimulationError;
use crate::profile::ProcessorProfile;

/// Physical register array with an optional second bank.
///
/// Register indexes seen by instructions are relative to the active bank;
/// bank B starts `register_count` entries into the array.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    values: Box<[u8]>,
    bank_size: usize,
    bank_offset: usize,
}

impl RegisterFile {
    /// Creates a zeroed register file sized for `profile`.
    #[must_use]
    pub fn new(profile: &ProcessorProfile) -> Self {
        Self {
            values: vec![0; profile.register_file_len()].into_boxed_slice(),
            bank_size: usize::from(profile.register_count()),
            bank_offset: 0,
        }
    }

    fn physical(&self, offset: usize, register: u8) -> Result<usize, SimulationError> {
        let index = offset + usize::from(register);
        if index < self.values.len() {
            Ok(index)
        } else {
            Err(SimulationError::RegisterOutOfRange { index })
        }
    }

    /// Reads a register of the active bank.
    ///
    /// # Errors
    ///
    /// [`SimulationError::RegisterOutOfRange`] past the end of the array.
    pub fn get(&self, register: u8) -> Result<u8, SimulationError> {
        let index = self.physical(self.bank_offset, register)?;
        Ok(self.values[index])
    }

    /// Writes a register of the active bank.
    ///
    /// # Errors
    ///
    /// [`SimulationError::RegisterOutOfRange`] past the end of the array.
    pub fn set(&mut self, register: u8, value: u8) -> Result<(), SimulationError> {
        let index = self.physical(self.bank_offset, register)?;
        self.values[index] = value;
        Ok(())
    }

    /// Writes a register of the inactive bank (`STAR`).
    ///
    /// # Errors
    ///
    /// [`SimulationError::RegisterOutOfRange`] when there is no second bank
    /// or the index is past its end.
    pub fn set_inactive(&mut self, register: u8, value: u8) -> Result<(), SimulationError> {
        let offset = if self.bank_offset == 0 { self.bank_size } else { 0 };
        let index = self.physical(offset, register)?;
        self.values[index] = value;
        Ok(())
    }

    /// Whether bank B is active.
    #[must_use]
    pub const fn alternate_bank(&self) -> bool {
        self.bank_offset != 0
    }

    /// Selects bank A or B.
    pub fn select_bank(&mut self, alternate: bool) {
        self.bank_offset = if alternate { self.bank_size } else { 0 };
    }

    /// Every physical register, bank A first.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.values
    }

    /// Mutable view of every physical register.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.values
    }

    /// Registers of the active bank.
    #[must_use]
    pub fn active_bank(&self) -> &[u8] {
        let end = (self.bank_offset + self.bank_size).min(self.values.len());
        &self.values[self.bank_offset..end]
    }
}
