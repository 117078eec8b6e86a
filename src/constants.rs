//! Constants used in the CH376 implementation
use rusb::constants::{LIBUSB_ENDPOINT_IN, LIBUSB_ENDPOINT_OUT};
use std::time::Duration;

/// CH376 command opcodes.  These are the wire contract with the chip and
/// must stay byte-exact.

/// Retrieve the chip's IC version
pub const CMD_GET_IC_VER: u8 = 0x01;
/// Hardware reset of the chip
pub const CMD_RESET_ALL: u8 = 0x05;
/// Communication self-test - the chip echoes the complement of the data byte
pub const CMD_CHECK_EXIST: u8 = 0x06;
/// Configure the SDO pin, e.g. to signal the interrupt while deselected
pub const CMD_SET_SDO_INT: u8 = 0x0b;
/// Read a 32 bit value about the open file
pub const CMD_GET_FILE_SIZE: u8 = 0x0c;
/// Set the chip's USB mode
pub const CMD_SET_USB_MODE: u8 = 0x15;
/// Retrieve (and clear) the pending interrupt status
pub const CMD_GET_STATUS: u8 = 0x22;
/// Read the chip's data buffer - first byte returned is the length
pub const CMD_RD_USB_DATA0: u8 = 0x27;
/// Ask how many bytes the chip will accept, then write them
pub const CMD_WR_REQ_DATA: u8 = 0x2d;
/// Set the name used by the next open/create/erase
pub const CMD_SET_FILE_NAME: u8 = 0x2f;
/// Check a USB disk is connected
pub const CMD_DISK_CONNECT: u8 = 0x30;
/// Initialize the disk and test it is ready
pub const CMD_DISK_MOUNT: u8 = 0x31;
/// Open a file or directory
pub const CMD_FILE_OPEN: u8 = 0x32;
/// Create a file, replacing any existing file of the same name
pub const CMD_FILE_CREATE: u8 = 0x34;
/// Erase a file or empty directory
pub const CMD_FILE_ERASE: u8 = 0x35;
/// Close the open file or directory
pub const CMD_FILE_CLOSE: u8 = 0x36;
/// Move the open file's cursor
pub const CMD_BYTE_LOCATE: u8 = 0x39;
/// Request a byte-mode read from the open file
pub const CMD_BYTE_READ: u8 = 0x3a;
/// Continue a byte-mode read
pub const CMD_BYTE_RD_GO: u8 = 0x3b;
/// Request a byte-mode write to the open file
pub const CMD_BYTE_WRITE: u8 = 0x3c;
/// Continue a byte-mode write
pub const CMD_BYTE_WR_GO: u8 = 0x3d;
/// Create and open a directory
pub const CMD_DIR_CREATE: u8 = 0x40;

/// USB modes used with [`CMD_SET_USB_MODE`]

/// Host mode, not generating SOF
pub const MODE_HOST_0: u8 = 0x05;
/// Host mode, generating SOF
pub const MODE_HOST_1: u8 = 0x07;
/// Host mode, resetting the USB bus
pub const MODE_HOST_2: u8 = 0x06;

/// Status bytes returned by the chip

/// Operation succeeded (returned directly, not via interrupt)
pub const ANSW_RET_SUCCESS: u8 = 0x51;
/// Operation aborted (returned directly, not via interrupt)
pub const ANSW_RET_ABORT: u8 = 0x5f;
/// Interrupt: operation succeeded
pub const ANSW_USB_INT_SUCCESS: u8 = 0x14;
/// Interrupt: a USB device connected
pub const ANSW_USB_INT_CONNECT: u8 = 0x15;
/// Interrupt: the USB device disconnected
pub const ANSW_USB_INT_DISCONNECT: u8 = 0x16;
/// Interrupt: data buffer overflow
pub const ANSW_USB_INT_BUF_OVER: u8 = 0x17;
/// Interrupt: the USB device is initialized
pub const ANSW_USB_INT_USB_READY: u8 = 0x18;
/// Interrupt: disk read in progress, data available
pub const ANSW_USB_INT_DISK_READ: u8 = 0x1d;
/// Interrupt: disk write in progress, data requested
pub const ANSW_USB_INT_DISK_WRITE: u8 = 0x1e;
/// Interrupt: disk operation failed
pub const ANSW_USB_INT_DISK_ERR: u8 = 0x1f;
/// Opened a directory.  This is the success status for opening a directory
pub const ANSW_ERR_OPEN_DIR: u8 = 0x41;
/// File not found
pub const ANSW_ERR_MISS_FILE: u8 = 0x42;
/// Name already in use
pub const ANSW_ERR_FOUND_NAME: u8 = 0x43;
/// Disk disconnected
pub const ANSW_ERR_DISK_DISCON: u8 = 0x82;
/// Sector too large, only 512 byte sectors are supported
pub const ANSW_ERR_LARGE_SECTOR: u8 = 0x84;
/// Unsupported partition type
pub const ANSW_ERR_TYPE_ERROR: u8 = 0x92;
/// Disk not formatted, or BPB invalid
pub const ANSW_ERR_BPB_ERROR: u8 = 0xa1;
/// Disk full
pub const ANSW_ERR_DISK_FULL: u8 = 0xb1;
/// Directory full
pub const ANSW_ERR_FDT_OVER: u8 = 0xb2;
/// File already closed
pub const ANSW_ERR_FILE_CLOSE: u8 = 0xb4;

/// Command argument bytes

/// Terminates a name sent with [`CMD_SET_FILE_NAME`]
pub const FILE_NAME_TERMINATOR: u8 = 0x00;
/// [`CMD_FILE_CLOSE`] argument requesting the file size is updated on disk
pub const CLOSE_UPDATE_SIZE: u8 = 0x01;
/// [`CMD_GET_FILE_SIZE`] selector for the open file's size
pub const FILE_SIZE_SELECTOR: u8 = 0x68;
/// Byte clocked out when reading from the chip
pub const READ_FILLER: u8 = 0x00;
/// Byte sent with [`CMD_CHECK_EXIST`]
pub const CHECK_EXIST_PATTERN: u8 = 0x57;
/// [`CMD_SET_SDO_INT`] selector, followed by the mode
pub const SDO_INT_SELECTOR: u8 = 0x16;
/// [`CMD_SET_SDO_INT`] mode: SDO mirrors INT# while chip select is high
pub const SDO_INT_ENABLE: u8 = 0x90;

/// Protocol limits

/// Separator between path segments
pub const PATH_SEPARATOR: u8 = b'/';
/// Longest name (including the root marker on the first segment) which can
/// be sent in one [`CMD_SET_FILE_NAME`]
pub const MAX_NAME_LEN: usize = 13;
/// Largest chunk the chip hands over in one data transfer
pub const MAX_CHUNK_SIZE: usize = 255;
/// Largest byte-mode read or write per call, limited by the 16 bit length
pub const MAX_IO_SIZE: usize = u16::MAX as usize;

/// Timings

/// Time to leave chip select deasserted before the first command
pub const DEFAULT_INITIAL_SETTLE: Duration = Duration::from_millis(60);
/// Time for the chip to come back after [`CMD_RESET_ALL`]
pub const DEFAULT_RESET_SETTLE: Duration = Duration::from_millis(100);
/// Time for the chip to switch USB mode
pub const DEFAULT_MODE_SETTLE: Duration = Duration::from_millis(1);
/// Time for the chip to prepare a directly returned value
pub const DEFAULT_COMMAND_SETTLE: Duration = Duration::from_millis(1);

/// CH341 USB-to-SPI adapter

/// CH341 USB vendor ID
pub const CH341_VID: u16 = 0x1a86;
/// CH341 USB product ID (parallel/SPI mode)
pub const CH341_PID: u16 = 0x5512;
/// Bulk in endpoint, used to read SPI and pin data
pub const CH341_BULK_IN_ENDPOINT: u8 = 2 | LIBUSB_ENDPOINT_IN;
/// Bulk out endpoint, used to send command streams
pub const CH341_BULK_OUT_ENDPOINT: u8 = 2 | LIBUSB_ENDPOINT_OUT;
/// Size of a CH341 bulk packet
pub const CH341_PACKET_LEN: usize = 32;
/// Read the input pin states
pub const CH341_CMD_GET_INPUT: u8 = 0xa0;
/// SPI stream command - followed by bytes to clock out
pub const CH341_CMD_SPI_STREAM: u8 = 0xa8;
/// I2C stream command - used to set the interface speed
pub const CH341_CMD_I2C_STREAM: u8 = 0xaa;
/// UIO stream command - used to drive chip select
pub const CH341_CMD_UIO_STREAM: u8 = 0xab;
/// I2C stream sub-command: set speed/mode
pub const CH341_CMD_I2C_STM_SET: u8 = 0x60;
/// I2C stream sub-command: end of stream
pub const CH341_CMD_I2C_STM_END: u8 = 0x00;
/// UIO stream sub-command: set output pins
pub const CH341_CMD_UIO_STM_OUT: u8 = 0x80;
/// UIO stream sub-command: set pin directions
pub const CH341_CMD_UIO_STM_DIR: u8 = 0x40;
/// UIO stream sub-command: end of stream
pub const CH341_CMD_UIO_STM_END: u8 = 0x20;
/// Output pin state with chip select (D0) deasserted
pub const CH341_CS_HIGH: u8 = 0x37;
/// Output pin state with chip select (D0) asserted
pub const CH341_CS_LOW: u8 = 0x36;
/// D0-D5 outputs, D6-D7 inputs
pub const CH341_PIN_DIRECTIONS: u8 = 0x3f;
/// Input pin carrying MISO (the CH376's SDO)
pub const CH341_MISO_PIN: u8 = 7;
/// Size of the [`CH341_CMD_GET_INPUT`] response
pub const CH341_INPUT_RESPONSE_LEN: usize = 6;
/// Used to wait for the CH341 to respond
pub const DEFAULT_USB_TIMEOUT: Duration = Duration::from_secs(5);

/// Remote bus bridge

/// Default port the [`crate::DeviceServer`] listens on
pub const DEFAULT_REMOTE_PORT: u16 = 3760;
/// Default address the [`crate::RemoteDevice`] connects to
pub const DEFAULT_REMOTE_ADDR: &str = "127.0.0.1";
/// Largest bridge message accepted, in either direction
pub const MAX_REMOTE_MESSAGE_LEN: usize = 1024;
