//! # ch376
//!
//! This crate provides a Rust driver for the WCH CH376, a USB-host bridge
//! chip which mounts a FAT formatted USB flash drive and exposes simple
//! file operations over a byte-wide serial bus.  The chip does the USB and
//! filesystem work; this crate speaks its command protocol.
//!
//! ## Overview
//!
//! The ch376 crate is structured around two main components:
//!
//! - A high-level [`Ch376`] interface for bringing up the disk and working
//!   with files by path
//! - A lower-level [`Device`] interface for the bus the chip sits on
//!
//! ### Key Features
//!
//! - Chip reset, USB host mode sequencing, and disk connect/mount
//! - Multi-level path resolution (`/LOG/2024/DATA.TXT`) on top of the
//!   chip's single-name selection
//! - Open, create, mkdir, delete and close
//! - Chunked reads and writes of up to 65535 bytes per call, at a settable
//!   file cursor
//! - Scoped bus transactions - chip select is always released, even on
//!   error
//! - Local access through a CH341A USB-to-SPI adapter, or remote access to
//!   a CH376 attached to another machine
//!
//! ## Architecture
//!
//! ### Driver Layer
//!
//! The [`Ch376`] struct is the primary interface most users should
//! interact with.  Each operation is synchronous and returns once the chip
//! has reported its result.  Unexpected chip statuses are returned as
//! [`Error::UnexpectedStatus`], carrying both the command and the
//! [`Status`] byte.
//!
//! ### Device Layer
//!
//! The [`Device`] trait provides the bus primitives: begin and end a
//! transaction (chip select), transfer a byte, check the interrupt line,
//! and delay.  Implementations are:
//!
//! - [`Ch341Device`] - a CH341A adapter in SPI mode
//! - [`RemoteDevice`] - a [`DeviceServer`] reached over TCP
//!
//! ## Getting Started
//!
//! The recommended way to create a driver is through [`Ch376Builder`]:
//!
//! ```rust,no_run
//! use ch376::{Ch376Builder, Error};
//!
//! fn main() -> Result<(), Error> {
//!     let mut ch376 = Ch376Builder::new().build()?;
//!
//!     // Reset the chip, wait for a disk, and mount it
//!     ch376.bring_up()?;
//!
//!     // Replace the file if it already exists
//!     ch376.delete_path("/LOG/DATA.TXT").ok();
//!     ch376.create_path("/LOG/DATA.TXT")?;
//!     ch376.write_file(b"Hello from Rust\n")?;
//!     ch376.close()?;
//!
//!     // And read it back
//!     ch376.open_path("/LOG/DATA.TXT")?;
//!     let mut data = vec![0u8; 16];
//!     let len = ch376.read_file(&mut data)?;
//!     ch376.close()?;
//!     println!("{}", String::from_utf8_lossy(&data[..len]));
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Limitations
//!
//! - Names are 8.3 and should be upper case.  The chip does not translate
//!   long file names.
//! - Newly created files have a non-zero minimum size, and files cannot be
//!   truncated.
//! - Waiting for a disk, and waiting for the chip's interrupt, are
//!   unbounded.
//!
//! ## Thread Safety
//!
//! A [`Ch376`] must only be used by one thread at a time - every operation
//! takes `&mut self`.  Wrap it in a mutex to share it.
//!
//! ## Logging
//!
//! The library uses the `log` crate for diagnostic output:
//!
//! - Error: Failures in the middle of a data transfer
//! - Warn: Rejected arguments and suspicious chip behaviour
//! - Info: Bring up progress
//! - Debug: Detailed operation information
//! - Trace: Function entry and protocol-level details
//!
//! To enable logging, use [`env_logger::init`](https://docs.rs/env_logger/latest/env_logger/index.html)
//! and set the `RUST_LOG` environment variable.

pub mod config;
pub mod constants;
pub mod device;
pub mod driver;
pub mod error;
pub mod status;

pub use crate::config::{DriverConfig, StatusMode};
pub use crate::driver::cmd::{Command, UsbMode};
pub use crate::driver::{Ch376, Ch376Builder, Opened};
pub use crate::status::Status;

/// A driver talking through a locally attached CH341 adapter
pub type UsbCh376 = Ch376<Ch341Device>;
/// A driver talking through a [`DeviceServer`]
pub type RemoteCh376 = Ch376<RemoteDevice>;

pub use crate::device::*;
pub use crate::error::{
    Communication as CommunicationKind, DeviceAccess as DeviceAccessKind, Error, PathError,
    StreamError,
};
