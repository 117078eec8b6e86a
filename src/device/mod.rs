//! The [`Device`] module provides the bus-level interface to the CH376: a
//! synchronous serial bus with explicit begin/end framing, the chip's
//! interrupt line, and a delay.  Prefer [`crate::Ch376`] for most use cases.
//!
//! It is unlikely you need to use this interface directly unless you are
//! re-implementing [`crate::Ch376`] or wiring the chip to a new adapter.

pub mod ch341;
pub mod remote;
#[cfg(test)]
pub(crate) mod sim;

pub use ch341::{Ch341Device, Ch341DeviceConfig, UsbInfo};
pub use remote::{DeviceServer, RemoteDevice, RemoteDeviceConfig};

use crate::Error;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use std::time::Duration;

/// The core Device trait, which allows Device to be mocked out for testing.
///
/// A Device carries exactly one transaction at a time.  It is the caller's
/// job (in practice [`crate::Ch376`]) to never begin a second transaction
/// before ending the first.
pub trait Device: std::fmt::Debug + Send {
    type Config;

    /// Creates a new Device using the provided config, which can be
    /// omitted in order to create a Device using default configuration.
    ///
    /// # Arguments
    /// * `config` - Configuration for the device, or None for default
    ///
    /// # Returns
    /// * `Ok(Device)` - Successfully created device instance
    /// * `Err(Error)` - If device creation fails
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use ch376::{Ch341Device, Device};
    ///
    /// // Use the first CH341 found, polling the chip rather than watching
    /// // its interrupt line
    /// let device = Ch341Device::new(None).unwrap();
    /// ```
    fn new(config: Option<Self::Config>) -> Result<Self, Error>
    where
        Self: Sized;

    /// Asserts chip select, opening a transaction
    fn begin_transaction(&mut self) -> Result<(), Error>;

    /// Deasserts chip select, closing the current transaction
    fn end_transaction(&mut self) -> Result<(), Error>;

    /// Clocks one byte out to the chip and returns the byte clocked in
    /// at the same time
    fn transfer(&mut self, byte: u8) -> Result<u8, Error>;

    /// Returns whether the chip's interrupt line is asserted.
    ///
    /// Only called between transactions.  Devices without a wire to INT#
    /// may sample SDO instead, which carries the interrupt while chip select
    /// is deasserted after [`crate::Ch376::init`] has sent SET_SDO_INT.
    fn interrupt_pending(&mut self) -> Result<bool, Error>;

    /// Blocks for at least `dur`
    fn delay(&mut self, dur: Duration);
}

/// Configuration for the concrete [`DeviceType`]s
#[derive(Debug)]
pub enum DeviceConfig {
    Ch341(Ch341DeviceConfig),
    Remote(RemoteDeviceConfig),
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig::Ch341(Ch341DeviceConfig::default())
    }
}

/// Any of the devices this crate can drive the CH376 through, allowing
/// [`crate::Ch376Builder`] to pick one at runtime
#[derive(Debug)]
pub enum DeviceType {
    Ch341(Ch341Device),
    Remote(RemoteDevice),
}

impl Device for DeviceType {
    type Config = DeviceConfig;

    fn new(config: Option<Self::Config>) -> Result<Self, Error> {
        trace!("DeviceType::new");
        match config.unwrap_or_default() {
            DeviceConfig::Ch341(config) => Ok(DeviceType::Ch341(Ch341Device::new(Some(config))?)),
            DeviceConfig::Remote(config) => {
                Ok(DeviceType::Remote(RemoteDevice::new(Some(config))?))
            }
        }
    }

    fn begin_transaction(&mut self) -> Result<(), Error> {
        match self {
            DeviceType::Ch341(device) => device.begin_transaction(),
            DeviceType::Remote(device) => device.begin_transaction(),
        }
    }

    fn end_transaction(&mut self) -> Result<(), Error> {
        match self {
            DeviceType::Ch341(device) => device.end_transaction(),
            DeviceType::Remote(device) => device.end_transaction(),
        }
    }

    fn transfer(&mut self, byte: u8) -> Result<u8, Error> {
        match self {
            DeviceType::Ch341(device) => device.transfer(byte),
            DeviceType::Remote(device) => device.transfer(byte),
        }
    }

    fn interrupt_pending(&mut self) -> Result<bool, Error> {
        match self {
            DeviceType::Ch341(device) => device.interrupt_pending(),
            DeviceType::Remote(device) => device.interrupt_pending(),
        }
    }

    fn delay(&mut self, dur: Duration) {
        match self {
            DeviceType::Ch341(device) => device.delay(dur),
            DeviceType::Remote(device) => device.delay(dur),
        }
    }
}
