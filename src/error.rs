//! Error objects for the ch376 crate
use crate::driver::cmd::Command;
use crate::Status;
use libc::{EACCES, EBUSY, EINVAL, EIO, ENAMETOOLONG, ENODEV, ENOENT, ETIMEDOUT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for the ch376 crate
#[derive(Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// Errors accessing the USB-to-SPI adapter
    #[error("USB error while attempting to communicate with the SPI adapter: {0}")]
    Usb(SerializableUsbError),

    /// Failure in initializing the device carrying the bus
    #[error("Device initialization failed: {message}")]
    Init { message: String },

    /// Failure in moving bytes over the bus
    #[error("Device communication error: {kind}")]
    Communication { kind: Communication },

    /// A device operation timed out
    #[error("Device operation timed out after {dur:?}")]
    Timeout { dur: std::time::Duration },

    /// DeviceAccess holds a variety errors relating to accessing the device
    #[error("{kind}")]
    DeviceAccess { kind: DeviceAccess },

    /// Invalid arguments passed to the ch376 library
    #[error("ch376 library called with invalid arguments: {message}")]
    Args { message: String },

    /// The chip returned a status other than the one the protocol step
    /// requires
    #[error("CH376 returned unexpected status {status} for {command}")]
    UnexpectedStatus { command: Command, status: Status },

    /// A path could not be resolved on the chip
    #[error("Path resolution failed: {kind}")]
    Path { kind: PathError },

    /// The chip broke the chunked transfer protocol
    #[error("Streaming transfer failed: {kind}")]
    Stream { kind: StreamError },
}

/// Used to differentiate between different types of problems accessing the
/// device carrying the bus
#[derive(Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum DeviceAccess {
    #[error("The library is not connected to a device")]
    NoDevice,

    #[error("SPI adapter {vid:04x}/{pid:04x} not found - is it connected and do you have permissions to access it?")]
    NotFound { vid: u16, pid: u16 },

    #[error("Hit USB permissions error while attempting to access the SPI adapter.  Are you sure you have suitable permissions?  You may need to reconfigure udev rules in /etc/udev/rules.d/.")]
    Permission,

    #[error("Failed to resolve network address: {message}")]
    AddressResolution { message: String, errno: i32 },

    #[error("Failed to connect to remote device: {message}")]
    NetworkConnection { message: String, errno: i32 },
}

#[derive(Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum Communication {
    /// The adapter moved fewer bytes than requested
    #[error("Short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },

    /// A transaction was begun while another was still open
    #[error("Transaction already in progress")]
    TransactionInProgress,

    /// A byte was exchanged, or a transaction ended, outside a transaction
    #[error("No transaction in progress")]
    NoTransaction,

    /// The chip failed the CHECK_EXIST self-test
    #[error("Self-test failed: sent 0x{sent:02x}, expected 0x{expected:02x}, got 0x{actual:02x}")]
    SelfTest { sent: u8, expected: u8, actual: u8 },

    /// The remote end of the connection disconnected
    #[error("Remote disconnected: {message} {errno}")]
    RemoteDisconnected { message: String, errno: i32 },

    /// Hit an error talking to a remote
    #[error("Hit an error communicating with a remote device: {message}, {errno}")]
    Remote { message: String, errno: i32 },
}

/// Reasons a path could not be turned into a sequence of chip name
/// selections
#[derive(Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum PathError {
    #[error("Path is empty")]
    Empty,

    #[error("Path {path} does not start with '/'")]
    NotAbsolute { path: String },

    #[error("Path segment {segment} is longer than {max} characters")]
    SegmentTooLong { segment: String, max: usize },

    #[error("Path {path} has no file or directory name after the final '/'")]
    MissingLeaf { path: String },

    #[error("Failed to open directory {segment}: {status}")]
    DirectoryOpen { segment: String, status: Status },
}

/// Violations of the chunked read/write protocol not carried by a status
#[derive(Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum StreamError {
    #[error("Chip offered a {offered} byte chunk with only {remaining} bytes left in the transfer")]
    ChunkOverrun { offered: usize, remaining: usize },
}

#[derive(Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum SerializableUsbError {
    #[error("{message}")]
    UsbError { message: String },
}

impl Error {
    pub fn to_errno(&self) -> i32 {
        match self {
            Error::Usb { .. } => EIO,
            Error::Init { .. } => EIO,
            Error::Communication { kind } => match kind {
                Communication::TransactionInProgress => EBUSY,
                Communication::RemoteDisconnected { errno, .. } => *errno,
                Communication::Remote { errno, .. } => *errno,
                _ => EIO,
            },
            Error::Timeout { .. } => ETIMEDOUT,
            Error::DeviceAccess { kind } => match kind {
                DeviceAccess::NoDevice => ENODEV,
                DeviceAccess::NotFound { .. } => ENOENT,
                DeviceAccess::Permission => EACCES,
                DeviceAccess::AddressResolution { errno, .. } => *errno,
                DeviceAccess::NetworkConnection { errno, .. } => *errno,
            },
            Error::Args { .. } => EINVAL,
            Error::UnexpectedStatus { status, .. } => match status {
                Status::ErrMissFile => ENOENT,
                Status::ErrDiskDiscon => ENODEV,
                _ => EIO,
            },
            Error::Path { kind } => match kind {
                PathError::SegmentTooLong { .. } => ENAMETOOLONG,
                PathError::DirectoryOpen { .. } => ENOENT,
                _ => EINVAL,
            },
            Error::Stream { .. } => EIO,
        }
    }
}

// Map rusb::Error to Error
impl From<rusb::Error> for Error {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::NoDevice => Self::DeviceAccess {
                kind: DeviceAccess::NoDevice,
            },
            rusb::Error::Access => Self::DeviceAccess {
                kind: DeviceAccess::Permission,
            },
            err => Self::Usb(SerializableUsbError::UsbError {
                message: err.to_string(),
            }),
        }
    }
}

// Map Communication to Error
impl From<Communication> for Error {
    fn from(kind: Communication) -> Self {
        Self::Communication { kind }
    }
}

// Map PathError to Error
impl From<PathError> for Error {
    fn from(kind: PathError) -> Self {
        Self::Path { kind }
    }
}

// Map StreamError to Error
impl From<StreamError> for Error {
    fn from(kind: StreamError) -> Self {
        Self::Stream { kind }
    }
}
