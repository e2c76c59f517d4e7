//! Port collaborators: plain port RAM and a port multiplexer.

use thiserror::Error;

use crate::api::PortBus;

/// Number of addressable ports.
pub const PORT_COUNT: usize = 256;

/// Port range that does not fit the 256-port space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("port range {start:#04x}+{len} exceeds the 256-port space")]
pub struct PortRangeError {
    /// First port of the range.
    pub start: usize,
    /// Length of the range.
    pub len: usize,
}

const fn check_range(start: usize, len: usize) -> Result<(), PortRangeError> {
    if start + len > PORT_COUNT {
        Err(PortRangeError { start, len })
    } else {
        Ok(())
    }
}

/// Byte array exposed as IO ports.
///
/// Reads past the end return 0; writes past the end are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamPorts {
    data: Box<[u8]>,
}

impl RamPorts {
    /// Creates `size` zeroed ports.
    ///
    /// # Errors
    ///
    /// [`PortRangeError`] when `size` exceeds 256.
    pub fn new(size: usize) -> Result<Self, PortRangeError> {
        check_range(0, size)?;
        Ok(Self {
            data: vec![0; size].into_boxed_slice(),
        })
    }

    /// Port contents.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable port contents.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Default for RamPorts {
    fn default() -> Self {
        Self {
            data: vec![0; PORT_COUNT].into_boxed_slice(),
        }
    }
}

impl PortBus for RamPorts {
    fn input(&mut self, port: u8) -> u8 {
        self.data.get(usize::from(port)).copied().unwrap_or(0)
    }

    fn output(&mut self, port: u8, value: u8) {
        if let Some(slot) = self.data.get_mut(usize::from(port)) {
            *slot = value;
        }
    }
}

/// Handle of a device attached to a [`MultiplexedPorts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Route {
    device: DeviceId,
    port: u8,
}

/// Device boxed for the multiplexer.
pub type BoxedDevice = Box<dyn PortBus + Send>;

/// Routes ranges of processor ports to ports of attached devices.
///
/// Unmapped reads return 0 and unmapped writes are dropped.
pub struct MultiplexedPorts {
    devices: Vec<Option<BoxedDevice>>,
    routes: [Option<Route>; PORT_COUNT],
}

impl Default for MultiplexedPorts {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            routes: [None; PORT_COUNT],
        }
    }
}

impl core::fmt::Debug for MultiplexedPorts {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MultiplexedPorts")
            .field("devices", &self.devices.iter().flatten().count())
            .field("mapped_ports", &self.routes.iter().flatten().count())
            .finish()
    }
}

impl MultiplexedPorts {
    /// Creates a multiplexer with nothing attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a device and maps ports `port..port + len` onto its ports
    /// `device_port..device_port + len`, replacing earlier mappings.
    ///
    /// # Errors
    ///
    /// [`PortRangeError`] when either range crosses port 255.
    pub fn attach(
        &mut self,
        device: BoxedDevice,
        port: u8,
        device_port: u8,
        len: usize,
    ) -> Result<DeviceId, PortRangeError> {
        check_range(usize::from(port), len)?;
        check_range(usize::from(device_port), len)?;
        let id = DeviceId(self.devices.len());
        self.devices.push(Some(device));
        let routes = &mut self.routes[usize::from(port)..usize::from(port) + len];
        for (route, target) in routes.iter_mut().zip(device_port..=u8::MAX) {
            *route = Some(Route {
                device: id,
                port: target,
            });
        }
        Ok(id)
    }

    /// Unmaps `port..port + len`.
    ///
    /// # Errors
    ///
    /// [`PortRangeError`] when the range crosses port 255.
    pub fn detach_range(&mut self, port: u8, len: usize) -> Result<(), PortRangeError> {
        check_range(usize::from(port), len)?;
        self.routes[usize::from(port)..usize::from(port) + len].fill(None);
        Ok(())
    }

    /// Removes a device and every port mapped to it.
    pub fn detach(&mut self, id: DeviceId) -> Option<BoxedDevice> {
        for route in &mut self.routes {
            if route.is_some_and(|r| r.device == id) {
                *route = None;
            }
        }
        self.devices.get_mut(id.0).and_then(Option::take)
    }

    /// Attached device, if still present.
    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut BoxedDevice> {
        self.devices.get_mut(id.0).and_then(Option::as_mut)
    }

    fn route(&mut self, port: u8) -> Option<(&mut BoxedDevice, u8)> {
        let route = self.routes[usize::from(port)]?;
        self.device_mut(route.device).map(|device| (device, route.port))
    }
}

impl PortBus for MultiplexedPorts {
    fn input(&mut self, port: u8) -> u8 {
        self.route(port)
            .map_or(0, |(device, device_port)| device.input(device_port))
    }

    fn output(&mut self, port: u8, value: u8) {
        if let Some((device, device_port)) = self.route(port) {
            device.output(device_port, value);
        }
    }
}
