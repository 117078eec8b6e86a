//! Status codes returned by the CH376

use crate::constants::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single status byte from the chip.
///
/// The `Int*` variants are delivered via the interrupt/[`CMD_GET_STATUS`]
/// mechanism.  `RetSuccess` and `RetAbort` are returned directly by some
/// commands, such as setting the USB mode.  Any byte outside the chip's
/// documented set is kept as [`Status::Unknown`], so it can be reported
/// but never matches an expected status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    RetSuccess,
    RetAbort,
    IntSuccess,
    IntConnect,
    IntDisconnect,
    IntBufOver,
    IntUsbReady,
    IntDiskRead,
    IntDiskWrite,
    IntDiskErr,
    /// Returned when a directory (rather than a file) was opened
    ErrOpenDir,
    ErrMissFile,
    ErrFoundName,
    ErrDiskDiscon,
    ErrLargeSector,
    ErrTypeError,
    ErrBpbError,
    ErrDiskFull,
    ErrFdtOver,
    ErrFileClose,
    Unknown(u8),
}

impl From<u8> for Status {
    fn from(byte: u8) -> Self {
        match byte {
            ANSW_RET_SUCCESS => Status::RetSuccess,
            ANSW_RET_ABORT => Status::RetAbort,
            ANSW_USB_INT_SUCCESS => Status::IntSuccess,
            ANSW_USB_INT_CONNECT => Status::IntConnect,
            ANSW_USB_INT_DISCONNECT => Status::IntDisconnect,
            ANSW_USB_INT_BUF_OVER => Status::IntBufOver,
            ANSW_USB_INT_USB_READY => Status::IntUsbReady,
            ANSW_USB_INT_DISK_READ => Status::IntDiskRead,
            ANSW_USB_INT_DISK_WRITE => Status::IntDiskWrite,
            ANSW_USB_INT_DISK_ERR => Status::IntDiskErr,
            ANSW_ERR_OPEN_DIR => Status::ErrOpenDir,
            ANSW_ERR_MISS_FILE => Status::ErrMissFile,
            ANSW_ERR_FOUND_NAME => Status::ErrFoundName,
            ANSW_ERR_DISK_DISCON => Status::ErrDiskDiscon,
            ANSW_ERR_LARGE_SECTOR => Status::ErrLargeSector,
            ANSW_ERR_TYPE_ERROR => Status::ErrTypeError,
            ANSW_ERR_BPB_ERROR => Status::ErrBpbError,
            ANSW_ERR_DISK_FULL => Status::ErrDiskFull,
            ANSW_ERR_FDT_OVER => Status::ErrFdtOver,
            ANSW_ERR_FILE_CLOSE => Status::ErrFileClose,
            other => Status::Unknown(other),
        }
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> Self {
        status.as_byte()
    }
}

impl Status {
    /// Returns the raw byte, as sent by the chip
    #[must_use]
    pub const fn as_byte(&self) -> u8 {
        match self {
            Status::RetSuccess => ANSW_RET_SUCCESS,
            Status::RetAbort => ANSW_RET_ABORT,
            Status::IntSuccess => ANSW_USB_INT_SUCCESS,
            Status::IntConnect => ANSW_USB_INT_CONNECT,
            Status::IntDisconnect => ANSW_USB_INT_DISCONNECT,
            Status::IntBufOver => ANSW_USB_INT_BUF_OVER,
            Status::IntUsbReady => ANSW_USB_INT_USB_READY,
            Status::IntDiskRead => ANSW_USB_INT_DISK_READ,
            Status::IntDiskWrite => ANSW_USB_INT_DISK_WRITE,
            Status::IntDiskErr => ANSW_USB_INT_DISK_ERR,
            Status::ErrOpenDir => ANSW_ERR_OPEN_DIR,
            Status::ErrMissFile => ANSW_ERR_MISS_FILE,
            Status::ErrFoundName => ANSW_ERR_FOUND_NAME,
            Status::ErrDiskDiscon => ANSW_ERR_DISK_DISCON,
            Status::ErrLargeSector => ANSW_ERR_LARGE_SECTOR,
            Status::ErrTypeError => ANSW_ERR_TYPE_ERROR,
            Status::ErrBpbError => ANSW_ERR_BPB_ERROR,
            Status::ErrDiskFull => ANSW_ERR_DISK_FULL,
            Status::ErrFdtOver => ANSW_ERR_FDT_OVER,
            Status::ErrFileClose => ANSW_ERR_FILE_CLOSE,
            Status::Unknown(byte) => *byte,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Status::RetSuccess => "command succeeded",
            Status::RetAbort => "command aborted",
            Status::IntSuccess => "operation succeeded",
            Status::IntConnect => "USB device connected",
            Status::IntDisconnect => "USB device disconnected",
            Status::IntBufOver => "data buffer overflow",
            Status::IntUsbReady => "USB device ready",
            Status::IntDiskRead => "disk read pending",
            Status::IntDiskWrite => "disk write pending",
            Status::IntDiskErr => "disk error",
            Status::ErrOpenDir => "opened a directory",
            Status::ErrMissFile => "file not found",
            Status::ErrFoundName => "name already exists",
            Status::ErrDiskDiscon => "disk disconnected",
            Status::ErrLargeSector => "unsupported sector size",
            Status::ErrTypeError => "unsupported partition type",
            Status::ErrBpbError => "disk not formatted",
            Status::ErrDiskFull => "disk full",
            Status::ErrFdtOver => "directory full",
            Status::ErrFileClose => "file already closed",
            Status::Unknown(_) => "unknown status",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x} ({})", self.as_byte(), self.description())
    }
}
