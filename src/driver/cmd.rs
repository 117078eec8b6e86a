//! Command opcodes and USB modes understood by the CH376

use crate::constants::*;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The subset of the CH376 command set used by [`crate::Ch376`].
///
/// Each command is sent as its opcode byte at the start of a transaction,
/// followed by any argument bytes and then, depending on the command, a
/// payload read from or written to the chip.  The direction of the payload
/// is fixed per command:
///
/// Status returned directly, in the same transaction:
/// - `SetUsbMode` (mode byte in, status out)
/// - `GetStatus` (status out)
///
/// No response:
/// - `SetSdoInt`, `SetFileName`, `ResetAll`
///
/// Value returned directly:
/// - `GetIcVer`, `CheckExist`, `GetFileSize`
///
/// Data transfer:
/// - `RdUsbData0` (length out, then that many bytes out)
/// - `WrReqData` (length out, then that many bytes in)
///
/// Status delivered via interrupt:
/// - everything else
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Command {
    GetIcVer = CMD_GET_IC_VER,
    ResetAll = CMD_RESET_ALL,
    CheckExist = CMD_CHECK_EXIST,
    SetSdoInt = CMD_SET_SDO_INT,
    GetFileSize = CMD_GET_FILE_SIZE,
    SetUsbMode = CMD_SET_USB_MODE,
    GetStatus = CMD_GET_STATUS,
    RdUsbData0 = CMD_RD_USB_DATA0,
    WrReqData = CMD_WR_REQ_DATA,
    SetFileName = CMD_SET_FILE_NAME,
    DiskConnect = CMD_DISK_CONNECT,
    DiskMount = CMD_DISK_MOUNT,
    FileOpen = CMD_FILE_OPEN,
    FileCreate = CMD_FILE_CREATE,
    FileErase = CMD_FILE_ERASE,
    FileClose = CMD_FILE_CLOSE,
    ByteLocate = CMD_BYTE_LOCATE,
    ByteRead = CMD_BYTE_READ,
    ByteRdGo = CMD_BYTE_RD_GO,
    ByteWrite = CMD_BYTE_WRITE,
    ByteWrGo = CMD_BYTE_WR_GO,
    DirCreate = CMD_DIR_CREATE,
}

impl Command {
    /// Returns the opcode byte sent to the chip
    #[must_use]
    pub const fn opcode(self) -> u8 {
        self as u8
    }

    /// Whether the chip signals completion of this command by raising its
    /// interrupt line
    #[must_use]
    pub const fn is_interrupting(self) -> bool {
        matches!(
            self,
            Command::DiskConnect
                | Command::DiskMount
                | Command::FileOpen
                | Command::FileCreate
                | Command::FileErase
                | Command::FileClose
                | Command::ByteLocate
                | Command::ByteRead
                | Command::ByteRdGo
                | Command::ByteWrite
                | Command::ByteWrGo
                | Command::DirCreate
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::GetIcVer => "GET_IC_VER",
            Command::ResetAll => "RESET_ALL",
            Command::CheckExist => "CHECK_EXIST",
            Command::SetSdoInt => "SET_SDO_INT",
            Command::GetFileSize => "GET_FILE_SIZE",
            Command::SetUsbMode => "SET_USB_MODE",
            Command::GetStatus => "GET_STATUS",
            Command::RdUsbData0 => "RD_USB_DATA0",
            Command::WrReqData => "WR_REQ_DATA",
            Command::SetFileName => "SET_FILE_NAME",
            Command::DiskConnect => "DISK_CONNECT",
            Command::DiskMount => "DISK_MOUNT",
            Command::FileOpen => "FILE_OPEN",
            Command::FileCreate => "FILE_CREATE",
            Command::FileErase => "FILE_ERASE",
            Command::FileClose => "FILE_CLOSE",
            Command::ByteLocate => "BYTE_LOCATE",
            Command::ByteRead => "BYTE_READ",
            Command::ByteRdGo => "BYTE_RD_GO",
            Command::ByteWrite => "BYTE_WRITE",
            Command::ByteWrGo => "BYTE_WR_GO",
            Command::DirCreate => "DIR_CREATE",
        };
        write!(f, "{name} (0x{:02x})", self.opcode())
    }
}

/// The USB host modes the chip is moved through during bring-up, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum UsbMode {
    /// Host mode, SOF not generated
    Host0 = MODE_HOST_0,
    /// Host mode, SOF generated automatically
    Host1 = MODE_HOST_1,
    /// Host mode, USB bus reset
    Host2 = MODE_HOST_2,
}

impl UsbMode {
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for UsbMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsbMode::Host0 => write!(f, "Host 0"),
            UsbMode::Host1 => write!(f, "Host 1"),
            UsbMode::Host2 => write!(f, "Host 2"),
        }
    }
}
