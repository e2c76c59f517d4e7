//! Processor generations and their immutable capability descriptors.

use core::fmt;

use bitflags::bitflags;

bitflags! {
    /// Optional instruction families a generation may implement.
    pub struct Features: u8 {
        /// `FETCH` and `STORE` against scratchpad RAM.
        const STORE_FETCH = 1 << 0;
        /// `TEST` and `COMPARE`.
        const TEST_COMPARE = 1 << 1;
        /// `TESTCY` and `COMPARECY`.
        const TEST_COMPARE_CARRY = 1 << 2;
        /// Second register bank with `REGBANK` and `STAR`.
        const ALTERNATE_BANK = 1 << 3;
        /// `JUMP@` and `CALL@` through a register pair.
        const INDIRECT_JUMPS = 1 << 4;
        /// `HWBUILD`.
        const BUILD_ID = 1 << 5;
        /// `LOAD&RETURN`.
        const LOAD_RETURN = 1 << 6;
        /// `OUTPUTK`.
        const OUTPUT_CONSTANT = 1 << 7;
    }
}

/// Hardware generations of the PicoBlaze family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Generation {
    /// CoolRunner-II CPLD variant.
    Cpld,
    /// KCPSM, the original Spartan-II core.
    PicoBlaze,
    /// KCPSM2 for Virtex-II.
    PicoBlaze2,
    /// KCPSM3 for Spartan-3.
    PicoBlaze3,
    /// KCPSM6 for Spartan-6, Virtex-6 and 7-series.
    PicoBlaze6,
}

impl Generation {
    /// Every generation, oldest first.
    pub const ALL: [Self; 5] = [
        Self::Cpld,
        Self::PicoBlaze,
        Self::PicoBlaze2,
        Self::PicoBlaze3,
        Self::PicoBlaze6,
    ];

    /// Returns the shared capability descriptor of this generation.
    #[must_use]
    pub const fn profile(self) -> &'static ProcessorProfile {
        match self {
            Self::Cpld => &PICOBLAZE_CPLD,
            Self::PicoBlaze => &PICOBLAZE,
            Self::PicoBlaze2 => &PICOBLAZE_2,
            Self::PicoBlaze3 => &PICOBLAZE_3,
            Self::PicoBlaze6 => &PICOBLAZE_6,
        }
    }

    /// Marketing name of the generation.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cpld => "PicoBlaze CPLD",
            Self::PicoBlaze => "PicoBlaze",
            Self::PicoBlaze2 => "PicoBlaze II",
            Self::PicoBlaze3 => "PicoBlaze 3",
            Self::PicoBlaze6 => "PicoBlaze 6",
        }
    }

    /// Whether instructions are stored as 18-bit words.
    #[must_use]
    pub const fn is_wide(self) -> bool {
        matches!(self, Self::PicoBlaze2 | Self::PicoBlaze3 | Self::PicoBlaze6)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Capability descriptor of one hardware generation.
///
/// Profiles are never built at runtime; every instance is one of the
/// statics below and is shared by reference.
#[derive(Debug, PartialEq, Eq)]
pub struct ProcessorProfile {
    generation: Generation,
    rom_size: u16,
    register_count: u8,
    stack_depth: u8,
    scratchpad_size: u16,
    interrupt_vector: u16,
    features: Features,
}

/// CoolRunner-II CPLD profile.
pub static PICOBLAZE_CPLD: ProcessorProfile = ProcessorProfile {
    generation: Generation::Cpld,
    rom_size: 256,
    register_count: 8,
    stack_depth: 4,
    scratchpad_size: 0,
    interrupt_vector: 0xFF,
    features: Features::empty(),
};

/// KCPSM profile.
pub static PICOBLAZE: ProcessorProfile = ProcessorProfile {
    generation: Generation::PicoBlaze,
    rom_size: 256,
    register_count: 16,
    stack_depth: 15,
    scratchpad_size: 0,
    interrupt_vector: 0xFF,
    features: Features::empty(),
};

/// KCPSM2 profile.
pub static PICOBLAZE_2: ProcessorProfile = ProcessorProfile {
    generation: Generation::PicoBlaze2,
    rom_size: 256,
    register_count: 32,
    stack_depth: 31,
    scratchpad_size: 0,
    interrupt_vector: 0xFF,
    features: Features::empty(),
};

/// KCPSM3 profile.
pub static PICOBLAZE_3: ProcessorProfile = ProcessorProfile {
    generation: Generation::PicoBlaze3,
    rom_size: 1024,
    register_count: 16,
    stack_depth: 31,
    scratchpad_size: 64,
    interrupt_vector: 0x3FF,
    features: Features::from_bits_truncate(
        Features::STORE_FETCH.bits() | Features::TEST_COMPARE.bits(),
    ),
};

/// KCPSM6 profile.
pub static PICOBLAZE_6: ProcessorProfile = ProcessorProfile {
    generation: Generation::PicoBlaze6,
    rom_size: 4096,
    register_count: 16,
    stack_depth: 31,
    scratchpad_size: 256,
    interrupt_vector: 0xFFF,
    features: Features::all(),
};

impl ProcessorProfile {
    /// Generation this profile describes.
    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Number of instruction slots in program ROM.
    #[must_use]
    pub const fn rom_size(&self) -> u16 {
        self.rom_size
    }

    /// Registers in a single bank.
    #[must_use]
    pub const fn register_count(&self) -> u8 {
        self.register_count
    }

    /// Maximum number of call/interrupt frames.
    #[must_use]
    pub const fn stack_depth(&self) -> u8 {
        self.stack_depth
    }

    /// Bytes of scratchpad RAM; zero when `STORE`/`FETCH` are unavailable.
    #[must_use]
    pub const fn scratchpad_size(&self) -> u16 {
        self.scratchpad_size
    }

    /// Address the processor jumps to when servicing an interrupt.
    #[must_use]
    pub const fn interrupt_vector(&self) -> u16 {
        self.interrupt_vector
    }

    /// Optional instruction families available on this generation.
    #[must_use]
    pub const fn features(&self) -> Features {
        self.features
    }

    /// Whether every family in `feature` is available.
    #[must_use]
    pub const fn has(&self, feature: Features) -> bool {
        self.features.contains(feature)
    }

    /// Width in bits of one instruction word.
    #[must_use]
    pub const fn opcode_width(&self) -> u8 {
        if self.generation.is_wide() {
            18
        } else {
            16
        }
    }

    /// Length of the physical register array, both banks included.
    #[must_use]
    pub const fn register_file_len(&self) -> usize {
        if self.has(Features::ALTERNATE_BANK) {
            self.register_count as usize * 2
        } else {
            self.register_count as usize
        }
    }

    /// Mask that folds any address into the ROM range.
    #[must_use]
    pub const fn address_mask(&self) -> u16 {
        self.rom_size - 1
    }
}

impl fmt::Display for ProcessorProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.generation, f)
    }
}
