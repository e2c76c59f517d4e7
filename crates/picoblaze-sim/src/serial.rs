use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::debug;
use picoblaze_core::PortBus;

/// Device port carrying data bytes in both directions.
pub const DATA_PORT: u8 = 0;
/// Device port reporting receive and transmit status.
pub const STATUS_PORT: u8 = 1;

const RX_READY: u8 = 0b001;
const TX_READY: u8 = 0b110;

/// Processor side of a lossless UART.
///
/// Reading [`DATA_PORT`] dequeues the next byte sent by the host, or 0 when
/// nothing is waiting. Writing it forwards the byte to the host. Reading
/// [`STATUS_PORT`] sets bit 0 while input is waiting; bits 1 and 2 always
/// report the transmitter ready.
#[derive(Debug)]
pub struct SerialPorts {
    rx: Receiver<u8>,
    tx: Sender<u8>,
}

/// Host side of a [`SerialPorts`] device.
#[derive(Debug, Clone)]
pub struct SerialLink {
    tx: Sender<u8>,
    rx: Receiver<u8>,
}

/// Creates a connected device and host link.
#[must_use]
pub fn serial_pair() -> (SerialPorts, SerialLink) {
    let (host_tx, device_rx) = unbounded();
    let (device_tx, host_rx) = unbounded();
    (
        SerialPorts {
            rx: device_rx,
            tx: device_tx,
        },
        SerialLink {
            tx: host_tx,
            rx: host_rx,
        },
    )
}

impl PortBus for SerialPorts {
    fn input(&mut self, port: u8) -> u8 {
        match port {
            DATA_PORT => self.rx.try_recv().unwrap_or(0),
            STATUS_PORT if self.rx.is_empty() => TX_READY,
            STATUS_PORT => TX_READY | RX_READY,
            _ => 0,
        }
    }

    fn output(&mut self, port: u8, value: u8) {
        if port == DATA_PORT && self.tx.send(value).is_err() {
            debug!("serial host gone, dropping byte {value:#04x}");
        }
    }
}

impl SerialLink {
    /// Queues a byte for the processor. Returns false once the device is gone.
    pub fn send(&self, byte: u8) -> bool {
        self.tx.send(byte).is_ok()
    }

    /// Queues every byte of `bytes`, stopping early if the device is gone.
    pub fn send_all(&self, bytes: &[u8]) -> bool {
        bytes.iter().all(|&byte| self.send(byte))
    }

    /// Next byte written by the processor, if any.
    #[must_use]
    pub fn try_recv(&self) -> Option<u8> {
        self.rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next byte written by the processor.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<u8> {
        match self.rx.recv_timeout(timeout) {
            Ok(byte) => Some(byte),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Every byte written so far and not yet received.
    #[must_use]
    pub fn drain(&self) -> Vec<u8> {
        self.rx.try_iter().collect()
    }
}
