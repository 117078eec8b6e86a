//! [`Ch341Device`] drives the CH376 through a CH341A USB-to-SPI adapter.
//!
//! Wiring assumed:
//! * D0 - CH376 SCS (chip select)
//! * D3 - SCK, D5 - MOSI (CH376 SDI), D7 - MISO (CH376 SDO)
//! * optionally the CH376 INT# line on one of the CH341's input pins, given
//!   as `int_pin` in [`Ch341DeviceConfig`]
//!
//! Without a dedicated INT# pin the interrupt is read from MISO while the
//! chip is deselected, which relies on the driver having sent SET_SDO_INT.
#[allow(unused_imports)]
use crate::constants::*;
use crate::error::Communication;
use crate::error::DeviceAccess::*;
use crate::Device;
use crate::Error::{self, *};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use rusb::Device as RusbDevice;
use rusb::DeviceHandle as RusbDeviceHandle;
use rusb::{Context, UsbContext};
use serde::{Deserialize, Serialize};
use std::thread::sleep;
use std::time::Duration;

/// Device represents a CH341A adapter in SPI mode with a CH376 attached.
///
/// Instead of using [`Ch341Device::new`] it is recommended to use
/// [`crate::Ch376Builder::build`], which will create both the driver and,
/// at the same time, the Device.
#[derive(Debug)]
pub struct Ch341Device {
    handle: RusbDeviceHandle<Context>,
    config: Ch341DeviceConfig,
    usb_info: UsbInfo,
    in_transaction: bool,
}

#[derive(Debug, Default)]
pub struct Ch341DeviceConfig {
    /// The [`rusb::Context`] to use for this device.  May be None to use
    /// default context.
    pub context: Option<Context>,

    /// Which of several attached CH341s to use, in bus enumeration order.
    /// If omitted, the first is used.
    pub index: Option<u8>,

    /// The CH341 input pin (0-7) wired to the CH376's active low INT#
    /// line.  If omitted, MISO (D7) is sampled between transactions, where
    /// the CH376 mirrors INT# on SDO once SET_SDO_INT has been sent.
    pub int_pin: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsbInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus_number: u8,
    pub device_address: u8,
}

impl UsbInfo {
    /// Prints UsbInfo to stdout in a human-readable format
    pub fn print(&self) {
        println!("  - device: {:04x}:{:04x}", self.vendor_id, self.product_id);
        println!(
            "  - bus/address: {:03}-{:03}",
            self.bus_number, self.device_address
        );
    }
}

/// Public Device functions
impl Device for Ch341Device {
    type Config = Ch341DeviceConfig;

    fn new(config: Option<Self::Config>) -> Result<Self, Error> {
        trace!("Ch341Device::new");

        let mut config = config.unwrap_or_default();
        trace!("Ch341DeviceConfig::index {:?}", config.index);
        trace!("Ch341DeviceConfig::int_pin {:?}", config.int_pin);

        match config.int_pin {
            Some(pin) if pin > 7 => {
                let message = format!("CH341 has no input pin {pin}, valid pins are 0-7");
                warn!("{message}");
                return Err(Args { message });
            }
            Some(pin) => debug!("Reading CH376 interrupt from D{pin}"),
            None => debug!("Reading CH376 interrupt from MISO (D{CH341_MISO_PIN})"),
        }

        // Create the rusb:Context if we weren't provided one
        let context = match config.context.take() {
            Some(ctx) => ctx,
            None => Context::new()?,
        };
        config.context = Some(context.clone());

        let (device, handle) = Self::find_device(&context, config.index)?;
        let usb_info = UsbInfo {
            vendor_id: CH341_VID,
            product_id: CH341_PID,
            bus_number: device.bus_number(),
            device_address: device.address(),
        };

        let mut ch341 = Self {
            handle,
            config,
            usb_info,
            in_transaction: false,
        };
        ch341.setup_device()?;
        Ok(ch341)
    }

    fn begin_transaction(&mut self) -> Result<(), Error> {
        trace!("Ch341Device::begin_transaction");
        if self.in_transaction {
            warn!("Attempt to begin a transaction while one is in progress");
            return Err(Communication::TransactionInProgress.into());
        }
        self.set_chip_select(true)?;
        self.in_transaction = true;
        Ok(())
    }

    fn end_transaction(&mut self) -> Result<(), Error> {
        trace!("Ch341Device::end_transaction");
        if !self.in_transaction {
            warn!("Attempt to end a transaction when none is in progress");
            return Err(Communication::NoTransaction.into());
        }
        self.in_transaction = false;
        self.set_chip_select(false)
    }

    fn transfer(&mut self, byte: u8) -> Result<u8, Error> {
        if !self.in_transaction {
            return Err(Communication::NoTransaction.into());
        }

        // The CH341 shifts LSB first, the CH376 expects MSB first
        let cmd_buf = [CH341_CMD_SPI_STREAM, byte.reverse_bits()];
        self.write_all(&cmd_buf)?;

        let mut rsp_buf = [0u8; 1];
        self.read_exact(&mut rsp_buf)?;
        let rsp = rsp_buf[0].reverse_bits();
        trace!("SPI 0x{byte:02x} -> 0x{rsp:02x}");
        Ok(rsp)
    }

    fn interrupt_pending(&mut self) -> Result<bool, Error> {
        let pin = match self.config.int_pin {
            Some(pin) => pin,
            None => {
                // SDO only carries the interrupt while chip select is high
                if self.in_transaction {
                    warn!("Attempt to sample MISO for the interrupt inside a transaction");
                    return Err(Communication::TransactionInProgress.into());
                }
                CH341_MISO_PIN
            }
        };

        self.write_all(&[CH341_CMD_GET_INPUT])?;
        let mut rsp_buf = [0u8; CH341_INPUT_RESPONSE_LEN];
        self.read_exact(&mut rsp_buf)?;

        // INT# is active low, and SDO follows it
        Ok(rsp_buf[0] & (1 << pin) == 0)
    }

    fn delay(&mut self, dur: Duration) {
        sleep(dur);
    }
}

impl Ch341Device {
    /// Returns information about the USB device backing this Device
    #[must_use]
    pub fn usb_info(&self) -> &UsbInfo {
        &self.usb_info
    }

    /// Retrieve this Device's current configuration state
    #[must_use]
    pub fn current_config(&self) -> &Ch341DeviceConfig {
        &self.config
    }
}

/// Private Device functions
impl Ch341Device {
    /// Enumerate the bus, find the appropriate device and open it
    fn find_device(
        context: &Context,
        index: Option<u8>,
    ) -> Result<(RusbDevice<Context>, RusbDeviceHandle<Context>), Error> {
        trace!("Ch341Device::find_device context {context:?} index {index:?}");

        let index = index.unwrap_or(0);
        let mut found = 0;
        for device in context.devices()?.iter() {
            let device_desc = device.device_descriptor()?;
            trace!(
                "Found USB device {:04x}:{:04x}",
                device_desc.vendor_id(),
                device_desc.product_id()
            );

            if device_desc.vendor_id() == CH341_VID && device_desc.product_id() == CH341_PID {
                if found == index {
                    debug!("Found CH341 device at index {index}");
                    let handle = device.open()?;
                    return Ok((device, handle));
                }
                debug!("Skipping CH341 device at index {found}");
                found += 1;
            }
        }

        info!("No suitable CH341 device found at index {index}, found {found}");
        Err(DeviceAccess {
            kind: NotFound {
                vid: CH341_VID,
                pid: CH341_PID,
            },
        })
    }

    /// Claim the interface, set the SPI speed, and leave chip select
    /// deasserted
    fn setup_device(&mut self) -> Result<(), Error> {
        trace!("Ch341Device::setup_device");

        if let Err(e) = self.handle.set_auto_detach_kernel_driver(true) {
            debug!("Kernel driver auto-detach unavailable: {e}");
        }
        debug!("Claim interface");
        self.handle.claim_interface(0)?;

        debug!("Set SPI speed");
        self.write_all(&[
            CH341_CMD_I2C_STREAM,
            CH341_CMD_I2C_STM_SET | 0x01,
            CH341_CMD_I2C_STM_END,
        ])?;

        self.set_chip_select(false)
    }

    fn set_chip_select(&mut self, asserted: bool) -> Result<(), Error> {
        let pins = if asserted { CH341_CS_LOW } else { CH341_CS_HIGH };
        self.write_all(&[
            CH341_CMD_UIO_STREAM,
            CH341_CMD_UIO_STM_OUT | pins,
            CH341_CMD_UIO_STM_DIR | CH341_PIN_DIRECTIONS,
            CH341_CMD_UIO_STM_END,
        ])
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Error> {
        debug_assert!(buf.len() <= CH341_PACKET_LEN);
        let written = self
            .handle
            .write_bulk(CH341_BULK_OUT_ENDPOINT, buf, DEFAULT_USB_TIMEOUT)?;
        if written != buf.len() {
            warn!("CH341 accepted {written} of {} bytes", buf.len());
            return Err(Communication::ShortTransfer {
                expected: buf.len(),
                actual: written,
            }
            .into());
        }
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let expected = buf.len();
        let read = match self
            .handle
            .read_bulk(CH341_BULK_IN_ENDPOINT, buf, DEFAULT_USB_TIMEOUT)
        {
            Ok(read) => read,
            Err(rusb::Error::Timeout) => {
                warn!("Timed out waiting for CH341");
                return Err(Timeout {
                    dur: DEFAULT_USB_TIMEOUT,
                });
            }
            Err(e) => return Err(e.into()),
        };
        if read != expected {
            warn!("CH341 returned {read} of {expected} bytes");
            return Err(Communication::ShortTransfer {
                expected,
                actual: read,
            }
            .into());
        }
        Ok(())
    }
}

impl Drop for Ch341Device {
    fn drop(&mut self) {
        trace!("Ch341Device::drop");
        // Leave the chip deselected - ignoring errors since we're in drop
        let _ = self.set_chip_select(false);

        // Release interface - again ignoring errors
        let _ = self.handle.release_interface(0);
        trace!("Exited drop");
    }
}
