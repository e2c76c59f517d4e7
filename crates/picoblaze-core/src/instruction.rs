//! Closed instruction model shared by every generation.

use core::fmt;

use crate::profile::Features;

/// Two-operand operations: a destination register and a constant or register source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum BinaryOp {
    Load,
    LoadReturn,
    And,
    Or,
    Xor,
    Add,
    AddCarry,
    Sub,
    SubCarry,
    Test,
    Compare,
    TestCarry,
    CompareCarry,
    Input,
    Output,
    Fetch,
    Store,
    Star,
}

impl BinaryOp {
    /// Number of binary operations.
    pub const COUNT: usize = 18;

    /// Every binary operation in table order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Load,
        Self::LoadReturn,
        Self::And,
        Self::Or,
        Self::Xor,
        Self::Add,
        Self::AddCarry,
        Self::Sub,
        Self::SubCarry,
        Self::Test,
        Self::Compare,
        Self::TestCarry,
        Self::CompareCarry,
        Self::Input,
        Self::Output,
        Self::Fetch,
        Self::Store,
        Self::Star,
    ];

    /// Position of this operation in opcode tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Optional family this operation belongs to, if any.
    #[must_use]
    pub const fn required_feature(self) -> Option<Features> {
        match self {
            Self::LoadReturn => Some(Features::LOAD_RETURN),
            Self::Test | Self::Compare => Some(Features::TEST_COMPARE),
            Self::TestCarry | Self::CompareCarry => Some(Features::TEST_COMPARE_CARRY),
            Self::Fetch | Self::Store => Some(Features::STORE_FETCH),
            Self::Star => Some(Features::ALTERNATE_BANK),
            _ => None,
        }
    }

    /// Assembler mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Load => "LOAD",
            Self::LoadReturn => "LOAD&RETURN",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Add => "ADD",
            Self::AddCarry => "ADDCY",
            Self::Sub => "SUB",
            Self::SubCarry => "SUBCY",
            Self::Test => "TEST",
            Self::Compare => "COMPARE",
            Self::TestCarry => "TESTCY",
            Self::CompareCarry => "COMPARECY",
            Self::Input => "INPUT",
            Self::Output => "OUTPUT",
            Self::Fetch => "FETCH",
            Self::Store => "STORE",
            Self::Star => "STAR",
        }
    }
}

/// Shift and rotate variants with their hardware sub-codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum ShiftOp {
    /// Shift left, carry into bit 0.
    Sla = 0x0,
    /// Rotate left.
    Rl = 0x2,
    /// Shift left, bit 0 replicated.
    Slx = 0x4,
    /// Shift left, zero into bit 0.
    Sl0 = 0x6,
    /// Shift left, one into bit 0.
    Sl1 = 0x7,
    /// Shift right, carry into bit 7.
    Sra = 0x8,
    /// Shift right, bit 7 replicated.
    Srx = 0xA,
    /// Rotate right.
    Rr = 0xC,
    /// Shift right, zero into bit 7.
    Sr0 = 0xE,
    /// Shift right, one into bit 7.
    Sr1 = 0xF,
}

impl ShiftOp {
    /// Every shift variant ordered by sub-code.
    pub const ALL: [Self; 10] = [
        Self::Sla,
        Self::Rl,
        Self::Slx,
        Self::Sl0,
        Self::Sl1,
        Self::Sra,
        Self::Srx,
        Self::Rr,
        Self::Sr0,
        Self::Sr1,
    ];

    /// Hardware sub-code stored in the low nibble of a shift word.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Converts a 4-bit sub-code into a shift variant.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0x0 => Some(Self::Sla),
            0x2 => Some(Self::Rl),
            0x4 => Some(Self::Slx),
            0x6 => Some(Self::Sl0),
            0x7 => Some(Self::Sl1),
            0x8 => Some(Self::Sra),
            0xA => Some(Self::Srx),
            0xC => Some(Self::Rr),
            0xE => Some(Self::Sr0),
            0xF => Some(Self::Sr1),
            _ => None,
        }
    }

    /// Whether bits move towards bit 0.
    #[must_use]
    pub const fn is_right(self) -> bool {
        self.code() & 0x8 != 0
    }

    /// Assembler mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Sla => "SLA",
            Self::Rl => "RL",
            Self::Slx => "SLX",
            Self::Sl0 => "SL0",
            Self::Sl1 => "SL1",
            Self::Sra => "SRA",
            Self::Srx => "SRX",
            Self::Rr => "RR",
            Self::Sr0 => "SR0",
            Self::Sr1 => "SR1",
        }
    }
}

/// Flag condition guarding a jump, call or return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Condition {
    /// Always taken.
    #[default]
    Always,
    /// Taken when the zero flag is set.
    Zero,
    /// Taken when the zero flag is clear.
    NotZero,
    /// Taken when the carry flag is set.
    Carry,
    /// Taken when the carry flag is clear.
    NotCarry,
}

impl Condition {
    /// Every condition, unconditional first.
    pub const ALL: [Self; 5] = [
        Self::Always,
        Self::Zero,
        Self::NotZero,
        Self::Carry,
        Self::NotCarry,
    ];

    /// Interprets the low three bits of a condition field.
    ///
    /// Values 4 to 7 select Z, NZ, C and NC; everything else is unconditional.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0x7 {
            4 => Self::Zero,
            5 => Self::NotZero,
            6 => Self::Carry,
            7 => Self::NotCarry,
            _ => Self::Always,
        }
    }

    /// Whether the guarded transfer happens for the given flags.
    #[must_use]
    pub const fn evaluate(self, zero: bool, carry: bool) -> bool {
        match self {
            Self::Always => true,
            Self::Zero => zero,
            Self::NotZero => !zero,
            Self::Carry => carry,
            Self::NotCarry => !carry,
        }
    }

    const fn suffix(self) -> &'static str {
        match self {
            Self::Always => "",
            Self::Zero => "Z",
            Self::NotZero => "NZ",
            Self::Carry => "C",
            Self::NotCarry => "NC",
        }
    }
}

/// Right-hand operand of a binary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Source {
    /// 8-bit constant.
    Immediate(u8),
    /// Register index in the active bank.
    Register(u8),
}

/// Target of a jump or call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Destination {
    /// Fixed ROM address.
    Absolute(u16),
    /// Address formed as `high:low` from two registers.
    RegisterPair {
        /// Register holding the upper address bits.
        high: u8,
        /// Register holding the lower address bits.
        low: u8,
    },
}

/// One decoded PicoBlaze instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Instruction {
    /// Two-operand data, IO or scratchpad operation.
    Binary {
        /// Operation.
        op: BinaryOp,
        /// Destination (and left operand) register.
        dest: u8,
        /// Right operand.
        source: Source,
    },
    /// Shift or rotate of one register.
    Shift {
        /// Variant.
        op: ShiftOp,
        /// Register shifted in place.
        register: u8,
    },
    /// `JUMP` or `CALL`.
    JumpOrCall {
        /// Push a return frame before transferring.
        call: bool,
        /// Guard.
        condition: Condition,
        /// Target.
        destination: Destination,
    },
    /// `RETURN`.
    Return {
        /// Guard.
        condition: Condition,
    },
    /// `RETURNI`.
    ReturnFromInterrupt {
        /// Interrupt enable state after returning.
        enable: bool,
    },
    /// `ENABLE INTERRUPT` / `DISABLE INTERRUPT`.
    SetInterruptEnable {
        /// New interrupt enable state.
        enable: bool,
    },
    /// `REGBANK A` / `REGBANK B`.
    SetRegisterBank {
        /// Select bank B.
        alternate: bool,
    },
    /// `HWBUILD`.
    ReadBuildId {
        /// Register receiving the build identifier.
        register: u8,
    },
    /// `OUTPUTK`.
    OutputImmediate {
        /// Byte written.
        value: u8,
        /// Port, 0 to 15.
        port: u8,
    },
}

impl Instruction {
    /// Optional family required by this instruction, if any.
    #[must_use]
    pub const fn required_feature(&self) -> Option<Features> {
        match *self {
            Self::Binary { op, .. } => op.required_feature(),
            Self::JumpOrCall {
                destination: Destination::RegisterPair { .. },
                ..
            } => Some(Features::INDIRECT_JUMPS),
            Self::SetRegisterBank { .. } => Some(Features::ALTERNATE_BANK),
            Self::ReadBuildId { .. } => Some(Features::BUILD_ID),
            Self::OutputImmediate { .. } => Some(Features::OUTPUT_CONSTANT),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Binary { op, dest, source } => {
                write!(f, "{} s{dest:X}, ", op.mnemonic())?;
                match (op, source) {
                    (
                        BinaryOp::Fetch | BinaryOp::Store | BinaryOp::Input | BinaryOp::Output,
                        Source::Register(r),
                    ) => write!(f, "(s{r:X})"),
                    (_, Source::Register(r)) => write!(f, "s{r:X}"),
                    (_, Source::Immediate(k)) => write!(f, "{k:02X}"),
                }
            }
            Self::Shift { op, register } => write!(f, "{} s{register:X}", op.mnemonic()),
            Self::JumpOrCall {
                call,
                condition,
                destination,
            } => {
                let mnemonic = if call { "CALL" } else { "JUMP" };
                match destination {
                    Destination::Absolute(address) if condition == Condition::Always => {
                        write!(f, "{mnemonic} {address:03X}")
                    }
                    Destination::Absolute(address) => {
                        write!(f, "{mnemonic} {}, {address:03X}", condition.suffix())
                    }
                    Destination::RegisterPair { high, low } => {
                        write!(f, "{mnemonic}@ (s{high:X}, s{low:X})")
                    }
                }
            }
            Self::Return { condition } if condition == Condition::Always => f.write_str("RETURN"),
            Self::Return { condition } => write!(f, "RETURN {}", condition.suffix()),
            Self::ReturnFromInterrupt { enable } => {
                f.write_str(if enable { "RETURNI ENABLE" } else { "RETURNI DISABLE" })
            }
            Self::SetInterruptEnable { enable } => f.write_str(if enable {
                "ENABLE INTERRUPT"
            } else {
                "DISABLE INTERRUPT"
            }),
            Self::SetRegisterBank { alternate } => {
                f.write_str(if alternate { "REGBANK B" } else { "REGBANK A" })
            }
            Self::ReadBuildId { register } => write!(f, "HWBUILD s{register:X}"),
            Self::OutputImmediate { value, port } => write!(f, "OUTPUTK {value:02X}, {port:X}"),
        }
    }
}
