//! Walking application paths through the chip's one-name-at-a-time
//! file selection.
//!
//! The chip only knows about a single 8.3 name at a time.  A path such as
//! `/LOG/2024/DATA.TXT` is walked by selecting and opening each directory in
//! turn, then selecting (but not opening) the final name:
//!
//! ```text
//! SET_FILE_NAME "/LOG"      FILE_OPEN -> directory
//! SET_FILE_NAME "2024"      FILE_OPEN -> directory
//! SET_FILE_NAME "DATA.TXT"
//! ```
//!
//! The leading `/` on the first name tells the chip to start from the root.
use super::cmd::Command;
use super::transaction::Transaction;
use super::{Ch376, Opened};
use crate::constants::{FILE_NAME_TERMINATOR, MAX_NAME_LEN, PATH_SEPARATOR};
use crate::error::PathError;
use crate::{Device, Error};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

/// Holds one path segment while it is collected
#[derive(Debug)]
struct NameBuffer {
    buf: [u8; MAX_NAME_LEN],
    len: usize,
}

impl NameBuffer {
    fn new() -> Self {
        Self {
            buf: [0; MAX_NAME_LEN],
            len: 0,
        }
    }

    /// The first segment carries the root marker
    fn root() -> Self {
        let mut name = Self::new();
        name.buf[0] = PATH_SEPARATOR;
        name.len = 1;
        name
    }

    fn push(&mut self, byte: u8) -> Result<(), PathError> {
        if self.len == MAX_NAME_LEN {
            let mut segment = self.as_str();
            segment.push(char::from(byte));
            return Err(PathError::SegmentTooLong {
                segment,
                max: MAX_NAME_LEN,
            });
        }
        self.buf[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    fn as_str(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Path based [`Ch376`] functions
impl<D: Device> Ch376<D> {
    /// Selects `path` on the chip, opening every directory along the way.
    ///
    /// The final name is selected but not opened - follow with
    /// [`Ch376::open`], [`Ch376::create_file`], [`Ch376::create_dir`] or
    /// [`Ch376::delete`].
    ///
    /// # Args:
    /// * path - an absolute path, starting with `/`.  Names must be 8.3
    ///   names in upper case, at most 13 characters including the leading
    ///   `/` of the first.  `/` on its own selects the root directory.
    ///
    /// # Errors
    /// * [`PathError`] - if the path is malformed, has an overlong name, or
    ///   a directory along the way couldn't be opened.  Nothing after the
    ///   failure is sent to the chip.
    pub fn select_path(&mut self, path: &str) -> Result<(), Error> {
        trace!("Ch376::select_path {path}");

        let bytes = path.as_bytes();
        match bytes.first() {
            None => return Err(PathError::Empty.into()),
            Some(&PATH_SEPARATOR) => (),
            Some(_) => {
                let path = path.to_string();
                warn!("Path {path} is not absolute");
                return Err(PathError::NotAbsolute { path }.into());
            }
        }

        let mut name = NameBuffer::root();
        for &byte in &bytes[1..] {
            if byte == PATH_SEPARATOR {
                self.enter_directory(&name)?;
                name = NameBuffer::new();
            } else {
                name.push(byte).inspect_err(|e| warn!("{e}"))?;
            }
        }

        if name.is_empty() {
            let path = path.to_string();
            warn!("Path {path} has no leaf name");
            return Err(PathError::MissingLeaf { path }.into());
        }
        self.set_file_name(name.as_bytes())
    }

    /// Selects and opens `path`
    ///
    /// # Errors
    /// See [`Ch376::select_path`] and [`Ch376::open`]
    pub fn open_path(&mut self, path: &str) -> Result<Opened, Error> {
        self.select_path(path)?;
        self.open()
    }

    /// Creates (or replaces) the file at `path`, leaving it open
    ///
    /// # Errors
    /// See [`Ch376::select_path`] and [`Ch376::create_file`]
    pub fn create_path(&mut self, path: &str) -> Result<(), Error> {
        self.select_path(path)?;
        self.create_file()
    }

    /// Creates the directory at `path`
    ///
    /// # Errors
    /// See [`Ch376::select_path`] and [`Ch376::create_dir`]
    pub fn mkdir_path(&mut self, path: &str) -> Result<(), Error> {
        self.select_path(path)?;
        self.create_dir()
    }

    /// Deletes the file, or empty directory, at `path`
    ///
    /// # Errors
    /// See [`Ch376::select_path`] and [`Ch376::delete`]
    pub fn delete_path(&mut self, path: &str) -> Result<(), Error> {
        self.select_path(path)?;
        self.delete()
    }

    /// Selects and opens one intermediate directory
    fn enter_directory(&mut self, name: &NameBuffer) -> Result<(), Error> {
        self.set_file_name(name.as_bytes())?;
        match self.open() {
            Ok(_) => {
                trace!("Entered {}", name.as_str());
                Ok(())
            }
            Err(Error::UnexpectedStatus { status, .. }) => {
                let segment = name.as_str();
                debug!("Failed to open directory {segment}: {status}");
                Err(PathError::DirectoryOpen { segment, status }.into())
            }
            Err(e) => Err(e),
        }
    }

    /// Sends one name, NUL terminated, to the chip
    fn set_file_name(&mut self, name: &[u8]) -> Result<(), Error> {
        trace!(
            "Ch376::set_file_name {}",
            String::from_utf8_lossy(name)
        );
        let mut txn = Transaction::begin(&mut self.device)?;
        txn.write(Command::SetFileName.opcode())?;
        txn.write_all(name)?;
        txn.write(FILE_NAME_TERMINATOR)?;
        txn.end()
    }
}
