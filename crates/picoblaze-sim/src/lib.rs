//! Background simulation controller and host-side port devices for
//! `picoblaze-core` engines.

/// Shared breakpoint set.
pub mod breakpoints;
pub use breakpoints::Breakpoints;

/// Worker thread driving an engine from host commands.
pub mod controller;
pub use controller::{
    BreakReason, Command, Controller, ControllerConfig, ControllerError, Notification,
};

/// UART-style serial port device.
pub mod serial;
pub use serial::{serial_pair, SerialLink, SerialPorts, DATA_PORT, STATUS_PORT};

#[cfg(test)]
use rstest as _;
