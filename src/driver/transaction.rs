//! Scoped bus transactions

use crate::constants::READ_FILLER;
use crate::{Device, Error};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

/// One begin/end bracketed exchange with the chip.
///
/// Created with [`Transaction::begin`], which asserts chip select.  Chip
/// select is released by [`Transaction::end`] or, on any early return, when
/// the Transaction is dropped.  As the Transaction mutably borrows the
/// [`Device`], a second one cannot be opened while this one is alive.
pub(crate) struct Transaction<'a, D: Device> {
    device: &'a mut D,
    open: bool,
}

impl<'a, D: Device> Transaction<'a, D> {
    pub(crate) fn begin(device: &'a mut D) -> Result<Self, Error> {
        device.begin_transaction()?;
        Ok(Self { device, open: true })
    }

    /// Sends one byte, discarding whatever the chip clocks back
    pub(crate) fn write(&mut self, byte: u8) -> Result<(), Error> {
        self.device.transfer(byte).map(|_| ())
    }

    pub(crate) fn write_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        bytes.iter().try_for_each(|&byte| self.write(byte))
    }

    /// Reads one byte from the chip
    pub(crate) fn read(&mut self) -> Result<u8, Error> {
        self.device.transfer(READ_FILLER)
    }

    /// Fills `buf` from the chip
    pub(crate) fn read_into(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        for byte in buf.iter_mut() {
            *byte = self.read()?;
        }
        Ok(())
    }

    /// Gives access to the device for delays within the transaction
    pub(crate) fn device(&mut self) -> &mut D {
        &mut *self.device
    }

    /// Closes the transaction, reporting any failure to do so
    pub(crate) fn end(mut self) -> Result<(), Error> {
        self.open = false;
        self.device.end_transaction()
    }
}

impl<D: Device> Drop for Transaction<'_, D> {
    fn drop(&mut self) {
        if self.open {
            trace!("Transaction dropped while open, ending it");
            if let Err(e) = self.device.end_transaction() {
                warn!("Failed to end transaction: {e}");
            }
        }
    }
}
