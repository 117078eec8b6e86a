//! [`Ch376`] is the main interface for accessing a USB disk via the CH376.
//! Its use is preferred over direct use of [`Device`].
use crate::config::{DriverConfig, StatusMode};
use crate::constants::*;
use crate::error::Communication;
use crate::{Device, Error, Status};
use cmd::{Command, UsbMode};
use transaction::Transaction;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

pub mod builder;
pub mod cmd;
mod path;
mod stream;
mod transaction;

pub use builder::Ch376Builder;

/// Outcome of a successful open.  The chip reports opening a directory
/// with a different status to opening a file - both are success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opened {
    pub is_directory: bool,
}

/// The [`Ch376`] struct is the main interface for accessing a USB disk
/// through the chip.  It provides:
/// * bring_up (reset the chip, wait for a USB disk, and mount it)
/// * select_path (walk a path, leaving the final name selected)
/// * open, create_file, create_dir, delete, close
/// * read_file and write_file (chunked transfers from/to the open file)
/// * set_cursor and file_size
///
/// Every operation is synchronous and runs to completion before returning.
/// The chip only supports one outstanding command, which `&mut self`
/// enforces.
///
/// Use [`Ch376Builder`] to create a new [`Ch376`] (and [`Device`]) instance.
#[derive(Debug)]
pub struct Ch376<D: Device> {
    device: D,
    config: DriverConfig,
}

/// Public [`Ch376`] functions
impl<D: Device> Ch376<D> {
    /// Creates a new driver instance.  Use if you have manually created a
    /// [`Device`] instance.
    ///
    /// # Args:
    /// * device: - the device the chip is attached to
    /// * config: - timing and status wait configuration
    ///
    /// # Returns:
    /// * [`Ch376`] - the new driver instance
    ///
    /// # Example
    /// ```no_run
    /// use ch376::{Ch341Device, Ch376, Device, DriverConfig};
    /// let device = Ch341Device::new(None).unwrap();
    /// let mut ch376 = Ch376::new(device, DriverConfig::default());
    /// ch376.bring_up().unwrap();
    /// ```
    #[must_use]
    pub fn new(device: D, config: DriverConfig) -> Self {
        trace!("Ch376::new");
        Ch376 { device, config }
    }

    /// Returns the driver configuration
    #[must_use]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Consumes the driver, returning the underlying [`Device`]
    pub fn into_device(self) -> D {
        self.device
    }

    /// Waits for the chip to raise its interrupt, then retrieves the status.
    ///
    /// This waits indefinitely.  Reading the status clears the interrupt.
    ///
    /// # Returns
    /// * `Ok(Status)` - the status, which may be any value
    /// * `Err(Error)` - if the device failed
    ///
    /// # Errors
    /// If the device fails
    pub fn wait_status(&mut self) -> Result<Status, Error> {
        trace!("Ch376::wait_status");
        while !self.device.interrupt_pending()? {
            std::hint::spin_loop();
        }
        self.poll_status()
    }

    /// Retrieves the status immediately, without waiting for the interrupt
    ///
    /// # Errors
    /// If the device fails
    pub fn poll_status(&mut self) -> Result<Status, Error> {
        trace!("Ch376::poll_status");
        let mut txn = Transaction::begin(&mut self.device)?;
        txn.write(Command::GetStatus.opcode())?;
        let status = Status::from(txn.read()?);
        txn.end()?;
        trace!("Got status {status}");
        Ok(status)
    }

    /// Resets and initializes the chip, waits (indefinitely) for a USB disk
    /// to be connected, then connects to and mounts it.
    ///
    /// Re-run this to recover the chip after any failure.
    ///
    /// # Returns
    /// * `Ok(())` - the disk is mounted and ready for file operations
    /// * `Err(Error)` - if any step returned an unexpected status; later
    ///   steps are not attempted
    ///
    /// # Errors
    /// If any step fails
    pub fn bring_up(&mut self) -> Result<(), Error> {
        info!("Bringing up CH376");
        self.init()?;
        self.connect_drive()?;
        info!("USB disk mounted");
        Ok(())
    }

    /// Resets the chip, routes its interrupt onto SDO, and puts it into the
    /// first USB host mode
    ///
    /// # Errors
    /// If the chip does not accept the host mode
    pub fn init(&mut self) -> Result<(), Error> {
        trace!("Ch376::init");
        self.reset()?;
        self.enable_sdo_interrupt()?;
        self.set_usb_mode(UsbMode::Host0)
    }

    /// Has the chip drive SDO with its interrupt state whenever chip select
    /// is deasserted.  Devices which can't see the INT# pin can then sample
    /// MISO between transactions instead.
    ///
    /// Reset turns this off again, so [`Ch376::init`] sends it after every
    /// reset.
    ///
    /// # Errors
    /// If the device fails
    pub fn enable_sdo_interrupt(&mut self) -> Result<(), Error> {
        trace!("Ch376::enable_sdo_interrupt");
        self.send_command(Command::SetSdoInt, &[SDO_INT_SELECTOR, SDO_INT_ENABLE])
    }

    /// Waits (indefinitely) for a USB device, runs through the remaining
    /// host modes, then connects and mounts the disk.
    ///
    /// # Errors
    /// If any mode switch, the disk connect or the disk mount fails
    pub fn connect_drive(&mut self) -> Result<(), Error> {
        trace!("Ch376::connect_drive");
        self.wait_for_connect()?;

        self.set_usb_mode(UsbMode::Host1)?;
        self.set_usb_mode(UsbMode::Host2)?;

        // The chip reports the connection again once it has reset the bus
        self.wait_for_connect()?;

        self.simple_command(Command::DiskConnect, &[])?;
        debug!("USB disk connected");
        self.simple_command(Command::DiskMount, &[])?;
        Ok(())
    }

    /// Resets the chip.  Any open file is lost and the disk must be brought
    /// up again.
    ///
    /// # Errors
    /// If the device fails
    pub fn reset(&mut self) -> Result<(), Error> {
        trace!("Ch376::reset");
        // Chip select is already deasserted outside a transaction
        self.device.delay(self.config.initial_settle);
        self.send_command(Command::ResetAll, &[])?;
        self.device.delay(self.config.reset_settle);
        debug!("CH376 reset");
        Ok(())
    }

    /// Switches the chip's USB mode
    ///
    /// # Errors
    /// If the chip doesn't return [`Status::RetSuccess`]
    pub fn set_usb_mode(&mut self, mode: UsbMode) -> Result<(), Error> {
        trace!("Ch376::set_usb_mode {mode}");
        let settle = self.config.mode_settle;
        let mut txn = Transaction::begin(&mut self.device)?;
        txn.write(Command::SetUsbMode.opcode())?;
        txn.write(mode.as_byte())?;
        txn.device().delay(settle);
        let status = Status::from(txn.read()?);
        txn.end()?;

        Self::expect_status(Command::SetUsbMode, status, Status::RetSuccess)?;
        debug!("USB mode set to {mode}");
        Ok(())
    }

    /// Reads the chip's IC version, logging it
    ///
    /// # Errors
    /// If the device fails
    pub fn ic_version(&mut self) -> Result<u8, Error> {
        let settle = self.config.command_settle;
        let mut txn = Transaction::begin(&mut self.device)?;
        txn.write(Command::GetIcVer.opcode())?;
        txn.device().delay(settle);
        let version = txn.read()?;
        txn.end()?;
        info!("CH376 IC version 0x{version:02x}");
        Ok(version)
    }

    /// Checks the chip is present and communicating, by sending it a byte
    /// which it must return inverted
    ///
    /// # Errors
    /// If the chip does not return the inverted byte
    pub fn check_exist(&mut self) -> Result<(), Error> {
        let mut txn = Transaction::begin(&mut self.device)?;
        txn.write(Command::CheckExist.opcode())?;
        txn.write(CHECK_EXIST_PATTERN)?;
        let actual = txn.read()?;
        txn.end()?;

        let expected = !CHECK_EXIST_PATTERN;
        if actual != expected {
            warn!("CH376 self-test returned 0x{actual:02x}, expected 0x{expected:02x}");
            return Err(Communication::SelfTest {
                sent: CHECK_EXIST_PATTERN,
                expected,
                actual,
            }
            .into());
        }
        debug!("CH376 self-test passed");
        Ok(())
    }

    /// Opens the selected file or directory
    ///
    /// # Returns
    /// * `Ok(Opened)` - whether a file or a directory was opened
    /// * `Err(Error)` - on any other status
    ///
    /// # Errors
    /// If the name was not found, or the chip failed
    pub fn open(&mut self) -> Result<Opened, Error> {
        trace!("Ch376::open");
        let status = self.command_status(Command::FileOpen, &[])?;
        match status {
            Status::IntSuccess => Ok(Opened {
                is_directory: false,
            }),
            Status::ErrOpenDir => Ok(Opened { is_directory: true }),
            status => {
                debug!("Open failed with status {status}");
                Err(Error::UnexpectedStatus {
                    command: Command::FileOpen,
                    status,
                })
            }
        }
    }

    /// Creates a file with the selected name, replacing any existing file,
    /// and leaves it open.
    ///
    /// Note the chip gives new files a non-zero minimum size, and there is
    /// no way to truncate a file to zero bytes.
    ///
    /// # Errors
    /// If the create or the subsequent open fails
    pub fn create_file(&mut self) -> Result<(), Error> {
        trace!("Ch376::create_file");
        self.simple_command(Command::FileCreate, &[])?;
        let opened = self.open()?;
        if opened.is_directory {
            warn!("Created a file, but opened a directory");
        }
        Ok(())
    }

    /// Creates a directory with the selected name, and opens it
    ///
    /// # Errors
    /// If the chip fails to create the directory
    pub fn create_dir(&mut self) -> Result<(), Error> {
        trace!("Ch376::create_dir");
        self.simple_command(Command::DirCreate, &[])
    }

    /// Deletes the selected file, or empty directory
    ///
    /// # Errors
    /// If the chip fails to delete the name
    pub fn delete(&mut self) -> Result<(), Error> {
        trace!("Ch376::delete");
        self.simple_command(Command::FileErase, &[])
    }

    /// Closes the open file, always updating its size on the disk
    ///
    /// # Errors
    /// If the chip fails to close the file
    pub fn close(&mut self) -> Result<(), Error> {
        trace!("Ch376::close");
        self.simple_command(Command::FileClose, &[CLOSE_UPDATE_SIZE])
    }

    /// Moves the open file's cursor to `offset` bytes from the start
    ///
    /// # Errors
    /// If the chip fails to move the cursor
    pub fn set_cursor(&mut self, offset: u32) -> Result<(), Error> {
        trace!("Ch376::set_cursor {offset}");
        self.simple_command(Command::ByteLocate, &offset.to_le_bytes())
    }

    /// Returns the size of the open file
    ///
    /// # Errors
    /// If the device fails
    pub fn file_size(&mut self) -> Result<u32, Error> {
        let mut txn = Transaction::begin(&mut self.device)?;
        txn.write(Command::GetFileSize.opcode())?;
        txn.write(FILE_SIZE_SELECTOR)?;
        let mut size = [0u8; 4];
        txn.read_into(&mut size)?;
        txn.end()?;

        let size = u32::from_le_bytes(size);
        trace!("File size {size}");
        Ok(size)
    }
}

/// Private functions for Ch376
impl<D: Device> Ch376<D> {
    /// Sends a command and its arguments in a single transaction
    fn send_command(&mut self, command: Command, args: &[u8]) -> Result<(), Error> {
        trace!("Ch376::send_command {command} args {args:02x?}");
        let mut txn = Transaction::begin(&mut self.device)?;
        txn.write(command.opcode())?;
        txn.write_all(args)?;
        txn.end()
    }

    /// Retrieves the status of the last interrupting command, using the
    /// configured [`StatusMode`]
    fn status(&mut self) -> Result<Status, Error> {
        match self.config.status_mode {
            StatusMode::Interrupt => self.wait_status(),
            StatusMode::Poll => self.poll_status(),
        }
    }

    /// Sends an interrupting command and returns the resulting status
    fn command_status(&mut self, command: Command, args: &[u8]) -> Result<Status, Error> {
        debug_assert!(command.is_interrupting(), "{command} has no status");
        self.send_command(command, args)?;
        let status = self.status()?;
        trace!("{command} returned {status}");
        Ok(status)
    }

    /// Sends an interrupting command which must return
    /// [`Status::IntSuccess`]
    fn simple_command(&mut self, command: Command, args: &[u8]) -> Result<(), Error> {
        let status = self.command_status(command, args)?;
        Self::expect_status(command, status, Status::IntSuccess)
    }

    fn expect_status(command: Command, status: Status, expected: Status) -> Result<(), Error> {
        if status == expected {
            Ok(())
        } else {
            debug!("{command} returned {status}, expected {expected}");
            Err(Error::UnexpectedStatus { command, status })
        }
    }

    /// Waits, with no limit, for the chip to report a USB device connection.
    /// Any other status is ignored.
    fn wait_for_connect(&mut self) -> Result<(), Error> {
        debug!("Waiting for USB device connection");
        loop {
            let status = self.wait_status()?;
            if status == Status::IntConnect {
                debug!("USB device connected");
                return Ok(());
            }
            trace!("Ignoring status {status} while waiting for connection");
        }
    }
}
