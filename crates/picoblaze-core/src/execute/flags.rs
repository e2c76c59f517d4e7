//! ALU result and flag computation.

use crate::instruction::ShiftOp;

/// New zero and carry flags produced by an ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlagsUpdate {
    /// Zero flag.
    pub zero: bool,
    /// Carry flag.
    pub carry: bool,
}

/// Flags before an operation, consumed by the carry-propagating forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriorFlags {
    /// Zero flag.
    pub zero: bool,
    /// Carry flag.
    pub carry: bool,
}

/// `AND`, `OR`, `XOR`: carry cleared.
#[must_use]
pub const fn logic(result: u8) -> FlagsUpdate {
    FlagsUpdate {
        zero: result == 0,
        carry: false,
    }
}

/// `ADD`/`ADDCY`: carry is the ninth bit of the sum.
#[must_use]
pub fn add(left: u8, right: u8, carry_in: bool) -> (u8, FlagsUpdate) {
    let sum = u16::from(left) + u16::from(right) + u16::from(carry_in);
    let [result, high] = sum.to_le_bytes();
    (
        result,
        FlagsUpdate {
            zero: result == 0,
            carry: high != 0,
        },
    )
}

/// `SUB`/`SUBCY`: carry is the borrow out of `left - (right + borrow_in)`.
#[must_use]
pub fn sub(left: u8, right: u8, borrow_in: bool) -> (u8, FlagsUpdate) {
    let subtrahend = u16::from(right) + u16::from(borrow_in);
    let [result, _] = u16::from(left).wrapping_sub(subtrahend).to_le_bytes();
    (
        result,
        FlagsUpdate {
            zero: result == 0,
            carry: u16::from(left) < subtrahend,
        },
    )
}

/// `TEST`/`TESTCY`: carry is the odd parity of `left & right`.
#[must_use]
pub const fn test(left: u8, right: u8, prior: Option<PriorFlags>) -> FlagsUpdate {
    let masked = left & right;
    let odd = masked.count_ones() % 2 == 1;
    match prior {
        Some(prior) => FlagsUpdate {
            zero: prior.zero && masked == 0,
            carry: prior.carry ^ odd,
        },
        None => FlagsUpdate {
            zero: masked == 0,
            carry: odd,
        },
    }
}

/// `COMPARE`/`COMPARECY`: compares against `right + carry` without wrapping.
#[must_use]
pub fn compare(left: u8, right: u8, prior: Option<PriorFlags>) -> FlagsUpdate {
    let (carry_in, zero_in) = prior.map_or((false, true), |p| (p.carry, p.zero));
    let right = u16::from(right) + u16::from(carry_in);
    let left = u16::from(left);
    FlagsUpdate {
        zero: zero_in && left == right,
        carry: left < right,
    }
}

/// Shift or rotate; carry receives the bit shifted out.
#[must_use]
pub const fn shift(op: ShiftOp, value: u8, carry_in: bool) -> (u8, FlagsUpdate) {
    let out = if op.is_right() {
        value & 0x01 != 0
    } else {
        value & 0x80 != 0
    };
    let result = match op {
        ShiftOp::Sla => (value << 1) | carry_in as u8,
        ShiftOp::Rl => value.rotate_left(1),
        ShiftOp::Slx => (value << 1) | (value & 0x01),
        ShiftOp::Sl0 => value << 1,
        ShiftOp::Sl1 => (value << 1) | 0x01,
        ShiftOp::Sra => (value >> 1) | ((carry_in as u8) << 7),
        ShiftOp::Srx => (value >> 1) | (value & 0x80),
        ShiftOp::Rr => value.rotate_right(1),
        ShiftOp::Sr0 => value >> 1,
        ShiftOp::Sr1 => (value >> 1) | 0x80,
    };
    (
        result,
        FlagsUpdate {
            zero: result == 0,
            carry: out,
        },
    )
}
