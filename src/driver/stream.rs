//! Chunked byte-mode reads and writes.
//!
//! After the initial BYTE_READ/BYTE_WRITE carrying the total length, the
//! chip decides how much data moves in each chunk (at most 255 bytes).  The
//! driver loops - transfer a chunk, send the matching GO command, check the
//! status - until the chip reports success.
use super::cmd::Command;
use super::transaction::Transaction;
use super::Ch376;
use crate::constants::MAX_IO_SIZE;
use crate::error::StreamError;
use crate::{Device, Error, Status};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

/// Streaming [`Ch376`] functions
impl<D: Device> Ch376<D> {
    /// Reads `buf.len()` bytes from the open file, at its cursor.
    ///
    /// # Args:
    /// * `buf` - buffer to read data into.  At most 65535 bytes - split
    ///   larger reads into multiple calls.
    ///
    /// # Returns
    /// * `Ok(usize)` - number of bytes read
    /// * `Err(Error)` - if the chip returned an unexpected status, or broke
    ///   the chunking protocol.  Data already read is left in `buf`.
    ///
    /// # Note
    /// A read of 0 bytes succeeds without talking to the chip.
    ///
    /// # Errors
    /// If the read fails
    pub fn read_file(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let size = buf.len();
        trace!("Entered Ch376::read_file buf.len(): {size}");
        if size == 0 {
            debug!("Read of 0 bytes, nothing to do");
            return Ok(0);
        }
        Self::validate_io_size(size)?;

        let status = self.command_status(Command::ByteRead, &(size as u16).to_le_bytes())?;
        Self::expect_status(Command::ByteRead, status, Status::IntDiskRead)?;

        let mut bytes_read = 0;
        let mut chunks = 0;
        loop {
            bytes_read += self.read_chunk(&mut buf[bytes_read..])?;
            chunks += 1;

            // Ask the chip for the next set of data
            self.send_command(Command::ByteRdGo, &[])?;
            match self.status()? {
                Status::IntSuccess => break,
                Status::IntDiskRead => continue,
                status => {
                    error!("Error while reading data: {status} after {bytes_read} bytes");
                    return Err(Error::UnexpectedStatus {
                        command: Command::ByteRdGo,
                        status,
                    });
                }
            }
        }

        if bytes_read != size {
            warn!("Chip completed read after {bytes_read} of {size} bytes");
        }
        debug!("Read {bytes_read} bytes in {chunks} chunks");
        Ok(bytes_read)
    }

    /// Writes `data` to the open file, at its cursor.
    ///
    /// # Args:
    /// * `data` - data to write.  At most 65535 bytes - split larger writes
    ///   into multiple calls.
    ///
    /// # Returns
    /// * `Ok(usize)` - number of bytes written
    /// * `Err(Error)` - if the chip returned an unexpected status, or broke
    ///   the chunking protocol.  Data already written stays written.
    ///
    /// # Note
    /// A write of 0 bytes succeeds without talking to the chip.
    ///
    /// # Errors
    /// If the write fails
    pub fn write_file(&mut self, data: &[u8]) -> Result<usize, Error> {
        let size = data.len();
        trace!("Entered Ch376::write_file data.len(): {size}");
        if size == 0 {
            debug!("Write of 0 bytes, nothing to do");
            return Ok(0);
        }
        Self::validate_io_size(size)?;

        let status = self.command_status(Command::ByteWrite, &(size as u16).to_le_bytes())?;
        Self::expect_status(Command::ByteWrite, status, Status::IntDiskWrite)?;

        let mut bytes_written = 0;
        let mut chunks = 0;
        loop {
            bytes_written += self.write_chunk(&data[bytes_written..])?;
            chunks += 1;

            // Commit the chunk and ask the chip whether it wants more
            self.send_command(Command::ByteWrGo, &[])?;
            match self.status()? {
                Status::IntSuccess => break,
                Status::IntDiskWrite => continue,
                status => {
                    error!("Error while writing data: {status} after {bytes_written} bytes");
                    return Err(Error::UnexpectedStatus {
                        command: Command::ByteWrGo,
                        status,
                    });
                }
            }
        }

        if bytes_written != size {
            warn!("Chip completed write after {bytes_written} of {size} bytes");
        }
        debug!("Wrote {bytes_written} bytes in {chunks} chunks");
        Ok(bytes_written)
    }
}

/// Private streaming functions
impl<D: Device> Ch376<D> {
    fn validate_io_size(size: usize) -> Result<(), Error> {
        if size > MAX_IO_SIZE {
            let message =
                format!("Attempted to transfer {size} bytes, more than the maximum {MAX_IO_SIZE}");
            warn!("{message}");
            return Err(Error::Args { message });
        }
        Ok(())
    }

    /// Reads whatever the chip has ready into the front of `buf`
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut txn = Transaction::begin(&mut self.device)?;
        txn.write(Command::RdUsbData0.opcode())?;
        let len = usize::from(txn.read()?);
        if len > buf.len() {
            error!(
                "Error while reading data: chip offered {len} bytes, {} remaining",
                buf.len()
            );
            return Err(StreamError::ChunkOverrun {
                offered: len,
                remaining: buf.len(),
            }
            .into());
        }
        txn.read_into(&mut buf[..len])?;
        txn.end()?;
        trace!("Read chunk of {len} bytes");
        Ok(len)
    }

    /// Writes as much of the front of `data` as the chip asks for
    fn write_chunk(&mut self, data: &[u8]) -> Result<usize, Error> {
        let mut txn = Transaction::begin(&mut self.device)?;
        txn.write(Command::WrReqData.opcode())?;
        let len = usize::from(txn.read()?);
        if len > data.len() {
            error!(
                "Error while writing data: chip requested {len} bytes, {} remaining",
                data.len()
            );
            return Err(StreamError::ChunkOverrun {
                offered: len,
                remaining: data.len(),
            }
            .into());
        }
        txn.write_all(&data[..len])?;
        txn.end()?;
        trace!("Wrote chunk of {len} bytes");
        Ok(len)
    }
}
