//! Per-generation opcode maps, bit layouts and the instruction encoder.
//!
//! Everything that differs between generations lives in the tables of this
//! module; `encode` and [`crate::decoder::decode`] are generic over them.

use crate::instruction::{BinaryOp, Condition, Destination, Instruction, Source};
use crate::profile::{Generation, ProcessorProfile};

/// Bit field inside an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Field {
    /// Position of the least significant bit.
    pub shift: u8,
    /// Width in bits.
    pub width: u8,
}

impl Field {
    /// Creates a field.
    #[must_use]
    pub const fn new(shift: u8, width: u8) -> Self {
        Self { shift, width }
    }

    /// Mask of the field value before shifting.
    #[must_use]
    pub const fn mask(self) -> u32 {
        (1 << self.width) - 1
    }

    /// Reads the field from a word.
    #[must_use]
    pub const fn extract(self, word: u32) -> u32 {
        (word >> self.shift) & self.mask()
    }

    /// Positions a value in the field, dropping bits that do not fit.
    #[must_use]
    pub const fn place(self, value: u32) -> u32 {
        (value & self.mask()) << self.shift
    }
}

/// Operand field positions of one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitLayout {
    /// Primary opcode field.
    pub opcode: Field,
    /// First register operand (`sX`).
    pub register1: Field,
    /// Second register operand (`sY`).
    pub register2: Field,
    /// Shift of the 3-bit condition selector.
    pub condition_shift: u8,
    /// Absolute jump/call address.
    pub address: Field,
}

/// 8-bit constant field, identical on every generation.
pub const CONSTANT_FIELD: Field = Field::new(0, 8);
/// Shift sub-code field.
pub const SHIFT_CODE_FIELD: Field = Field::new(0, 4);
/// `OUTPUTK` port field.
pub const OUTPUT_PORT_FIELD: Field = Field::new(0, 4);
/// `OUTPUTK` constant field.
pub const OUTPUT_VALUE_FIELD: Field = Field::new(4, 8);

/// Base opcodes of a flow-control instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowOpcode {
    /// Word of the unconditional form.
    pub always: u32,
    /// Word to which condition offsets are added.
    pub conditional: u32,
}

impl FlowOpcode {
    const fn same(base: u32) -> Self {
        Self {
            always: base,
            conditional: base,
        }
    }
}

/// Encoder-side opcode table of one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpcodeMap {
    /// Binary operations with a constant operand, indexed by [`BinaryOp::index`].
    pub binary_constant: [Option<u32>; BinaryOp::COUNT],
    /// Binary operations with a register operand, indexed by [`BinaryOp::index`].
    pub binary_register: [Option<u32>; BinaryOp::COUNT],
    /// Shift base, combined with the sub-code.
    pub shift: u32,
    /// `RETURN`.
    pub return_: FlowOpcode,
    /// `CALL`.
    pub call: FlowOpcode,
    /// `JUMP`.
    pub jump: FlowOpcode,
    /// Offsets added for Z, NZ, C and NC.
    pub condition_offsets: [u32; 4],
    /// `RETURNI DISABLE` and `RETURNI ENABLE`.
    pub return_interrupt: [u32; 2],
    /// `DISABLE INTERRUPT` and `ENABLE INTERRUPT`.
    pub interrupt_enable: [u32; 2],
}

impl OpcodeMap {
    /// Base word of a binary operation in the given operand form.
    #[must_use]
    pub const fn binary(&self, op: BinaryOp, register_form: bool) -> Option<u32> {
        if register_form {
            self.binary_register[op.index()]
        } else {
            self.binary_constant[op.index()]
        }
    }

    /// Base word of a flow-control instruction under a condition.
    #[must_use]
    pub const fn flow(&self, opcode: FlowOpcode, condition: Condition) -> u32 {
        match condition {
            Condition::Always => opcode.always,
            Condition::Zero => opcode.conditional + self.condition_offsets[0],
            Condition::NotZero => opcode.conditional + self.condition_offsets[1],
            Condition::Carry => opcode.conditional + self.condition_offsets[2],
            Condition::NotCarry => opcode.conditional + self.condition_offsets[3],
        }
    }
}

/// `REGBANK A`; bit 0 selects bank B.
pub const REGISTER_BANK_OPCODE: u32 = 0x37000;
/// `JUMP@ (sX, sY)`.
pub const JUMP_INDIRECT_OPCODE: u32 = 0x26000;
/// `CALL@ (sX, sY)`.
pub const CALL_INDIRECT_OPCODE: u32 = 0x24000;
/// `HWBUILD sX`; shares the shift opcode with bit 7 set.
pub const BUILD_ID_OPCODE: u32 = 0x14080;
/// `OUTPUTK kk, p`.
pub const OUTPUT_CONSTANT_OPCODE: u32 = 0x2B000;

const KCPSM_CONDITION_OFFSETS: [u32; 4] = [0x1000, 0x1400, 0x1800, 0x1C00];

/// CoolRunner-II CPLD variant.
pub static CPLD_OPCODES: OpcodeMap = OpcodeMap {
    binary_constant: [
        Some(0x0000), // LOAD
        None,
        Some(0x0800), // AND
        Some(0x1000), // OR
        Some(0x1800), // XOR
        Some(0x2000), // ADD
        Some(0x2800), // ADDCY
        Some(0x3000), // SUB
        Some(0x3800), // SUBCY
        None,
        None,
        None,
        None,
        Some(0x8000), // INPUT
        Some(0x8800), // OUTPUT
        None,
        None,
        None,
    ],
    binary_register: [
        Some(0x4000),
        None,
        Some(0x4800),
        Some(0x5000),
        Some(0x5800),
        Some(0x6000),
        Some(0x6800),
        Some(0x7000),
        Some(0x7800),
        None,
        None,
        None,
        None,
        Some(0xC000),
        Some(0xC800),
        None,
        None,
        None,
    ],
    shift: 0xA000,
    return_: FlowOpcode::same(0x9000),
    call: FlowOpcode::same(0xD800),
    jump: FlowOpcode::same(0xD000),
    condition_offsets: [0x400, 0x500, 0x600, 0x700],
    return_interrupt: [0xE000, 0xE001],
    interrupt_enable: [0xF000, 0xF001],
};

/// KCPSM.
pub static KCPSM_OPCODES: OpcodeMap = OpcodeMap {
    binary_constant: [
        Some(0x0000),
        None,
        Some(0x1000),
        Some(0x2000),
        Some(0x3000),
        Some(0x4000),
        Some(0x5000),
        Some(0x6000),
        Some(0x7000),
        None,
        None,
        None,
        None,
        Some(0xA000),
        Some(0xE000),
        None,
        None,
        None,
    ],
    // Register ALU forms share 0xC and select the operation in bits 2..0.
    binary_register: [
        Some(0xC000),
        None,
        Some(0xC001),
        Some(0xC002),
        Some(0xC003),
        Some(0xC004),
        Some(0xC005),
        Some(0xC006),
        Some(0xC007),
        None,
        None,
        None,
        None,
        Some(0xB000),
        Some(0xF000),
        None,
        None,
        None,
    ],
    shift: 0xD000,
    return_: FlowOpcode::same(0x8080),
    call: FlowOpcode::same(0x8300),
    jump: FlowOpcode::same(0x8100),
    condition_offsets: KCPSM_CONDITION_OFFSETS,
    return_interrupt: [0x80D0, 0x80F0],
    interrupt_enable: [0x8010, 0x8030],
};

/// KCPSM2.
pub static KCPSM2_OPCODES: OpcodeMap = OpcodeMap {
    binary_constant: [
        Some(0x00000),
        None,
        Some(0x02000),
        Some(0x04000),
        Some(0x06000),
        Some(0x08000),
        Some(0x0A000),
        Some(0x0C000),
        Some(0x0E000),
        None,
        None,
        None,
        None,
        Some(0x20000),
        Some(0x22000),
        None,
        None,
        None,
    ],
    binary_register: [
        Some(0x10000),
        None,
        Some(0x12000),
        Some(0x14000),
        Some(0x16000),
        Some(0x18000),
        Some(0x1A000),
        Some(0x1C000),
        Some(0x1E000),
        None,
        None,
        None,
        None,
        Some(0x30000),
        Some(0x38000),
        None,
        None,
        None,
    ],
    shift: 0x28000,
    return_: FlowOpcode::same(0x24000),
    call: FlowOpcode::same(0x36000),
    jump: FlowOpcode::same(0x34000),
    condition_offsets: KCPSM_CONDITION_OFFSETS,
    return_interrupt: [0x2C000, 0x2C001],
    interrupt_enable: [0x3C000, 0x3C001],
};

/// KCPSM3.
pub static KCPSM3_OPCODES: OpcodeMap = OpcodeMap {
    binary_constant: [
        Some(0x00000),
        None,
        Some(0x0A000),
        Some(0x0C000),
        Some(0x0E000),
        Some(0x18000),
        Some(0x1A000),
        Some(0x1C000),
        Some(0x1E000),
        Some(0x12000),
        Some(0x14000),
        None,
        None,
        Some(0x04000),
        Some(0x2C000),
        Some(0x06000),
        Some(0x2E000),
        None,
    ],
    binary_register: [
        Some(0x01000),
        None,
        Some(0x0B000),
        Some(0x0D000),
        Some(0x0F000),
        Some(0x19000),
        Some(0x1B000),
        Some(0x1D000),
        Some(0x1F000),
        Some(0x13000),
        Some(0x15000),
        None,
        None,
        Some(0x05000),
        Some(0x2D000),
        Some(0x07000),
        Some(0x2F000),
        None,
    ],
    shift: 0x20000,
    return_: FlowOpcode::same(0x2A000),
    call: FlowOpcode::same(0x30000),
    jump: FlowOpcode::same(0x34000),
    condition_offsets: KCPSM_CONDITION_OFFSETS,
    return_interrupt: [0x38000, 0x38001],
    interrupt_enable: [0x3C000, 0x3C001],
};

/// KCPSM6.
pub static KCPSM6_OPCODES: OpcodeMap = OpcodeMap {
    binary_constant: [
        Some(0x01000),
        Some(0x21000),
        Some(0x03000),
        Some(0x05000),
        Some(0x07000),
        Some(0x11000),
        Some(0x13000),
        Some(0x19000),
        Some(0x1B000),
        Some(0x0D000),
        Some(0x1D000),
        Some(0x0F000),
        Some(0x1F000),
        Some(0x09000),
        Some(0x2D000),
        Some(0x0B000),
        Some(0x2F000),
        None,
    ],
    binary_register: [
        Some(0x00000),
        None,
        Some(0x02000),
        Some(0x04000),
        Some(0x06000),
        Some(0x10000),
        Some(0x12000),
        Some(0x18000),
        Some(0x1A000),
        Some(0x0C000),
        Some(0x1C000),
        Some(0x0E000),
        Some(0x1E000),
        Some(0x08000),
        Some(0x2C000),
        Some(0x0A000),
        Some(0x2E000),
        Some(0x16000),
    ],
    shift: 0x14000,
    // Conditional returns sit at 0x31/0x35/0x39/0x3D, so their base is 0x21.
    return_: FlowOpcode {
        always: 0x25000,
        conditional: 0x21000,
    },
    call: FlowOpcode::same(0x20000),
    jump: FlowOpcode::same(0x22000),
    condition_offsets: [0x10000, 0x14000, 0x18000, 0x1C000],
    return_interrupt: [0x29000, 0x29001],
    interrupt_enable: [0x28000, 0x28001],
};

/// CPLD layout: 5-bit opcode, 3-bit registers.
pub const CPLD_LAYOUT: BitLayout = BitLayout {
    opcode: Field::new(11, 5),
    register1: Field::new(8, 3),
    register2: Field::new(5, 3),
    condition_shift: 8,
    address: Field::new(0, 8),
};

/// KCPSM layout: 4-bit opcode, 4-bit registers.
pub const KCPSM_LAYOUT: BitLayout = BitLayout {
    opcode: Field::new(12, 4),
    register1: Field::new(8, 4),
    register2: Field::new(4, 4),
    condition_shift: 10,
    address: Field::new(0, 8),
};

/// KCPSM2 layout: 5-bit opcode, 5-bit registers.
pub const KCPSM2_LAYOUT: BitLayout = BitLayout {
    opcode: Field::new(13, 5),
    register1: Field::new(8, 5),
    register2: Field::new(3, 5),
    condition_shift: 10,
    address: Field::new(0, 8),
};

/// KCPSM3 layout: 6-bit opcode, 10-bit addresses.
pub const KCPSM3_LAYOUT: BitLayout = BitLayout {
    opcode: Field::new(12, 6),
    register1: Field::new(8, 4),
    register2: Field::new(4, 4),
    condition_shift: 10,
    address: Field::new(0, 10),
};

/// KCPSM6 layout: 6-bit opcode, 12-bit addresses.
pub const KCPSM6_LAYOUT: BitLayout = BitLayout {
    opcode: Field::new(12, 6),
    register1: Field::new(8, 4),
    register2: Field::new(4, 4),
    condition_shift: 14,
    address: Field::new(0, 12),
};

/// Decoder classification of a primary opcode value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeClass {
    /// Binary operation with a constant operand.
    BinaryConstant(BinaryOp),
    /// Binary operation with a register operand.
    BinaryRegister(BinaryOp),
    /// KCPSM register ALU group; operation in bits 2..0.
    RegisterAlu,
    /// Shift or rotate.
    Shift,
    /// KCPSM6 shared shift/`HWBUILD` code; bit 7 selects `HWBUILD`.
    ShiftOrBuildId,
    /// `RETURN` with a condition selector.
    Return,
    /// `JUMP` with a condition selector.
    Jump,
    /// `CALL` with a condition selector.
    Call,
    /// `RETURNI`; bit 0 is the enable flag.
    ReturnInterrupt,
    /// `ENABLE`/`DISABLE INTERRUPT`; bit 0 is the enable flag.
    InterruptEnable,
    /// KCPSM flow-control group selected by secondary fields.
    FlowControl,
    /// `REGBANK`; bit 0 selects bank B.
    RegisterBank,
    /// `JUMP@`.
    JumpIndirect,
    /// `CALL@`.
    CallIndirect,
    /// `OUTPUTK`.
    OutputConstant,
}

use OpcodeClass::{BinaryConstant as K, BinaryRegister as R};

/// CPLD primary opcodes (bits 15..11).
pub const CPLD_OPCODE_TABLE: &[(u8, OpcodeClass)] = &[
    (0x00, K(BinaryOp::Load)),
    (0x01, K(BinaryOp::And)),
    (0x02, K(BinaryOp::Or)),
    (0x03, K(BinaryOp::Xor)),
    (0x04, K(BinaryOp::Add)),
    (0x05, K(BinaryOp::AddCarry)),
    (0x06, K(BinaryOp::Sub)),
    (0x07, K(BinaryOp::SubCarry)),
    (0x08, R(BinaryOp::Load)),
    (0x09, R(BinaryOp::And)),
    (0x0A, R(BinaryOp::Or)),
    (0x0B, R(BinaryOp::Xor)),
    (0x0C, R(BinaryOp::Add)),
    (0x0D, R(BinaryOp::AddCarry)),
    (0x0E, R(BinaryOp::Sub)),
    (0x0F, R(BinaryOp::SubCarry)),
    (0x10, K(BinaryOp::Input)),
    (0x11, K(BinaryOp::Output)),
    (0x12, OpcodeClass::Return),
    (0x14, OpcodeClass::Shift),
    (0x18, R(BinaryOp::Input)),
    (0x19, R(BinaryOp::Output)),
    (0x1A, OpcodeClass::Jump),
    (0x1B, OpcodeClass::Call),
    (0x1C, OpcodeClass::ReturnInterrupt),
    (0x1E, OpcodeClass::InterruptEnable),
];

/// KCPSM primary opcodes (bits 15..12).
pub const KCPSM_OPCODE_TABLE: &[(u8, OpcodeClass)] = &[
    (0x0, K(BinaryOp::Load)),
    (0x1, K(BinaryOp::And)),
    (0x2, K(BinaryOp::Or)),
    (0x3, K(BinaryOp::Xor)),
    (0x4, K(BinaryOp::Add)),
    (0x5, K(BinaryOp::AddCarry)),
    (0x6, K(BinaryOp::Sub)),
    (0x7, K(BinaryOp::SubCarry)),
    (0x8, OpcodeClass::FlowControl),
    (0x9, OpcodeClass::FlowControl),
    (0xA, K(BinaryOp::Input)),
    (0xB, R(BinaryOp::Input)),
    (0xC, OpcodeClass::RegisterAlu),
    (0xD, OpcodeClass::Shift),
    (0xE, K(BinaryOp::Output)),
    (0xF, R(BinaryOp::Output)),
];

/// KCPSM2 primary opcodes (bits 17..13).
pub const KCPSM2_OPCODE_TABLE: &[(u8, OpcodeClass)] = &[
    (0x00, K(BinaryOp::Load)),
    (0x01, K(BinaryOp::And)),
    (0x02, K(BinaryOp::Or)),
    (0x03, K(BinaryOp::Xor)),
    (0x04, K(BinaryOp::Add)),
    (0x05, K(BinaryOp::AddCarry)),
    (0x06, K(BinaryOp::Sub)),
    (0x07, K(BinaryOp::SubCarry)),
    (0x08, R(BinaryOp::Load)),
    (0x09, R(BinaryOp::And)),
    (0x0A, R(BinaryOp::Or)),
    (0x0B, R(BinaryOp::Xor)),
    (0x0C, R(BinaryOp::Add)),
    (0x0D, R(BinaryOp::AddCarry)),
    (0x0E, R(BinaryOp::Sub)),
    (0x0F, R(BinaryOp::SubCarry)),
    (0x10, K(BinaryOp::Input)),
    (0x11, K(BinaryOp::Output)),
    (0x12, OpcodeClass::Return),
    (0x14, OpcodeClass::Shift),
    (0x16, OpcodeClass::ReturnInterrupt),
    (0x18, R(BinaryOp::Input)),
    (0x1A, OpcodeClass::Jump),
    (0x1B, OpcodeClass::Call),
    (0x1C, R(BinaryOp::Output)),
    (0x1E, OpcodeClass::InterruptEnable),
];

/// KCPSM3 primary opcodes (bits 17..12).
pub const KCPSM3_OPCODE_TABLE: &[(u8, OpcodeClass)] = &[
    (0x00, K(BinaryOp::Load)),
    (0x01, R(BinaryOp::Load)),
    (0x04, K(BinaryOp::Input)),
    (0x05, R(BinaryOp::Input)),
    (0x06, K(BinaryOp::Fetch)),
    (0x07, R(BinaryOp::Fetch)),
    (0x0A, K(BinaryOp::And)),
    (0x0B, R(BinaryOp::And)),
    (0x0C, K(BinaryOp::Or)),
    (0x0D, R(BinaryOp::Or)),
    (0x0E, K(BinaryOp::Xor)),
    (0x0F, R(BinaryOp::Xor)),
    (0x12, K(BinaryOp::Test)),
    (0x13, R(BinaryOp::Test)),
    (0x14, K(BinaryOp::Compare)),
    (0x15, R(BinaryOp::Compare)),
    (0x18, K(BinaryOp::Add)),
    (0x19, R(BinaryOp::Add)),
    (0x1A, K(BinaryOp::AddCarry)),
    (0x1B, R(BinaryOp::AddCarry)),
    (0x1C, K(BinaryOp::Sub)),
    (0x1D, R(BinaryOp::Sub)),
    (0x1E, K(BinaryOp::SubCarry)),
    (0x1F, R(BinaryOp::SubCarry)),
    (0x20, OpcodeClass::Shift),
    (0x2A, OpcodeClass::Return),
    (0x2B, OpcodeClass::Return),
    (0x2C, K(BinaryOp::Output)),
    (0x2D, R(BinaryOp::Output)),
    (0x2E, K(BinaryOp::Store)),
    (0x2F, R(BinaryOp::Store)),
    (0x30, OpcodeClass::Call),
    (0x31, OpcodeClass::Call),
    (0x34, OpcodeClass::Jump),
    (0x35, OpcodeClass::Jump),
    (0x38, OpcodeClass::ReturnInterrupt),
    (0x3C, OpcodeClass::InterruptEnable),
];

/// KCPSM6 primary opcodes (bits 17..12).
pub const KCPSM6_OPCODE_TABLE: &[(u8, OpcodeClass)] = &[
    (0x00, R(BinaryOp::Load)),
    (0x01, K(BinaryOp::Load)),
    (0x02, R(BinaryOp::And)),
    (0x03, K(BinaryOp::And)),
    (0x04, R(BinaryOp::Or)),
    (0x05, K(BinaryOp::Or)),
    (0x06, R(BinaryOp::Xor)),
    (0x07, K(BinaryOp::Xor)),
    (0x08, R(BinaryOp::Input)),
    (0x09, K(BinaryOp::Input)),
    (0x0A, R(BinaryOp::Fetch)),
    (0x0B, K(BinaryOp::Fetch)),
    (0x0C, R(BinaryOp::Test)),
    (0x0D, K(BinaryOp::Test)),
    (0x0E, R(BinaryOp::TestCarry)),
    (0x0F, K(BinaryOp::TestCarry)),
    (0x10, R(BinaryOp::Add)),
    (0x11, K(BinaryOp::Add)),
    (0x12, R(BinaryOp::AddCarry)),
    (0x13, K(BinaryOp::AddCarry)),
    (0x14, OpcodeClass::ShiftOrBuildId),
    (0x16, R(BinaryOp::Star)),
    (0x18, R(BinaryOp::Sub)),
    (0x19, K(BinaryOp::Sub)),
    (0x1A, R(BinaryOp::SubCarry)),
    (0x1B, K(BinaryOp::SubCarry)),
    (0x1C, R(BinaryOp::Compare)),
    (0x1D, K(BinaryOp::Compare)),
    (0x1E, R(BinaryOp::CompareCarry)),
    (0x1F, K(BinaryOp::CompareCarry)),
    (0x20, OpcodeClass::Call),
    (0x21, K(BinaryOp::LoadReturn)),
    (0x22, OpcodeClass::Jump),
    (0x24, OpcodeClass::CallIndirect),
    (0x25, OpcodeClass::Return),
    (0x26, OpcodeClass::JumpIndirect),
    (0x28, OpcodeClass::InterruptEnable),
    (0x29, OpcodeClass::ReturnInterrupt),
    (0x2B, OpcodeClass::OutputConstant),
    (0x2C, R(BinaryOp::Output)),
    (0x2D, K(BinaryOp::Output)),
    (0x2E, R(BinaryOp::Store)),
    (0x2F, K(BinaryOp::Store)),
    (0x30, OpcodeClass::Call),
    (0x31, OpcodeClass::Return),
    (0x32, OpcodeClass::Jump),
    (0x34, OpcodeClass::Call),
    (0x35, OpcodeClass::Return),
    (0x36, OpcodeClass::Jump),
    (0x37, OpcodeClass::RegisterBank),
    (0x38, OpcodeClass::Call),
    (0x39, OpcodeClass::Return),
    (0x3A, OpcodeClass::Jump),
    (0x3C, OpcodeClass::Call),
    (0x3D, OpcodeClass::Return),
    (0x3E, OpcodeClass::Jump),
];

impl Generation {
    /// Operand field positions.
    #[must_use]
    pub const fn layout(self) -> &'static BitLayout {
        match self {
            Self::Cpld => &CPLD_LAYOUT,
            Self::PicoBlaze => &KCPSM_LAYOUT,
            Self::PicoBlaze2 => &KCPSM2_LAYOUT,
            Self::PicoBlaze3 => &KCPSM3_LAYOUT,
            Self::PicoBlaze6 => &KCPSM6_LAYOUT,
        }
    }

    /// Encoder-side opcode table.
    #[must_use]
    pub const fn opcodes(self) -> &'static OpcodeMap {
        match self {
            Self::Cpld => &CPLD_OPCODES,
            Self::PicoBlaze => &KCPSM_OPCODES,
            Self::PicoBlaze2 => &KCPSM2_OPCODES,
            Self::PicoBlaze3 => &KCPSM3_OPCODES,
            Self::PicoBlaze6 => &KCPSM6_OPCODES,
        }
    }

    /// Decoder-side classification table keyed by primary opcode.
    #[must_use]
    pub const fn opcode_table(self) -> &'static [(u8, OpcodeClass)] {
        match self {
            Self::Cpld => CPLD_OPCODE_TABLE,
            Self::PicoBlaze => KCPSM_OPCODE_TABLE,
            Self::PicoBlaze2 => KCPSM2_OPCODE_TABLE,
            Self::PicoBlaze3 => KCPSM3_OPCODE_TABLE,
            Self::PicoBlaze6 => KCPSM6_OPCODE_TABLE,
        }
    }
}

/// Classifies a primary opcode value for a generation.
#[must_use]
pub fn classify_opcode(generation: Generation, opcode: u8) -> Option<OpcodeClass> {
    generation
        .opcode_table()
        .iter()
        .find_map(|&(value, class)| (value == opcode).then_some(class))
}

/// Encodes an instruction into its binary word.
///
/// The instruction must be legal for `profile` (see [`crate::program::validate`]);
/// operand forms the generation lacks encode as word 0.
#[must_use]
pub fn encode(instruction: &Instruction, profile: &ProcessorProfile) -> u32 {
    let generation = profile.generation();
    let layout = generation.layout();
    let map = generation.opcodes();

    match *instruction {
        Instruction::Binary { op, dest, source } => {
            let (register_form, operand) = match source {
                Source::Immediate(constant) => (false, CONSTANT_FIELD.place(u32::from(constant))),
                Source::Register(register) => {
                    (true, layout.register2.place(u32::from(register)))
                }
            };
            map.binary(op, register_form).map_or(0, |base| {
                base | layout.register1.place(u32::from(dest)) | operand
            })
        }
        Instruction::Shift { op, register } => {
            map.shift
                | layout.register1.place(u32::from(register))
                | SHIFT_CODE_FIELD.place(u32::from(op.code()))
        }
        Instruction::JumpOrCall {
            call,
            condition,
            destination,
        } => match destination {
            Destination::Absolute(address) => {
                let opcode = if call { map.call } else { map.jump };
                map.flow(opcode, condition) | layout.address.place(u32::from(address))
            }
            Destination::RegisterPair { high, low } => {
                let base = if call {
                    CALL_INDIRECT_OPCODE
                } else {
                    JUMP_INDIRECT_OPCODE
                };
                base | layout.register1.place(u32::from(high))
                    | layout.register2.place(u32::from(low))
            }
        },
        Instruction::Return { condition } => map.flow(map.return_, condition),
        Instruction::ReturnFromInterrupt { enable } => map.return_interrupt[usize::from(enable)],
        Instruction::SetInterruptEnable { enable } => map.interrupt_enable[usize::from(enable)],
        Instruction::SetRegisterBank { alternate } => {
            REGISTER_BANK_OPCODE | u32::from(alternate)
        }
        Instruction::ReadBuildId { register } => {
            BUILD_ID_OPCODE | layout.register1.place(u32::from(register))
        }
        Instruction::OutputImmediate { value, port } => {
            OUTPUT_CONSTANT_OPCODE
                | OUTPUT_VALUE_FIELD.place(u32::from(value))
                | OUTPUT_PORT_FIELD.place(u32::from(port))
        }
    }
}

/// Encodes a whole ROM image; empty slots become word 0.
#[must_use]
pub fn encode_program(program: &crate::program::Program) -> Vec<u32> {
    let profile = program.profile();
    program
        .slots()
        .iter()
        .map(|slot| slot.as_ref().map_or(0, |instruction| encode(instruction, profile)))
        .collect()
}
