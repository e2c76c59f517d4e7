//! Architectural CPU state model primitives.

/// Banked register file.
pub mod registers;
/// Bounded call stack.
pub mod stack;

pub use registers::RegisterFile;
pub use stack::{CallStack, Frame};
