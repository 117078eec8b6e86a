//! An in-memory CH376, used to exercise [`crate::Ch376`] without hardware.
//!
//! [`SimDevice`] implements [`Device`] over a shared [`SimChip`], so a test
//! can hand the device to the driver (or to a [`crate::DeviceServer`]) and
//! keep a [`SimDevice::handle`] to inspect and poke the chip from outside.
//!
//! The chip keeps a small filesystem of directories and files keyed by
//! absolute path, and records the bytes sent in every transaction.
use crate::constants::*;
use crate::{Device, Error};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Version byte returned by GET_IC_VER
pub(crate) const SIM_IC_VERSION: u8 = 0x43;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Dir,
    File(Vec<u8>),
}

#[derive(Debug)]
pub(crate) struct SimChip {
    attached: bool,
    mounted: bool,
    connect_armed: bool,
    connects_allowed: Option<usize>,
    queued_interrupts: VecDeque<u8>,
    sdo_interrupt: bool,
    in_transaction: bool,
    overlapped: bool,

    current: Vec<u8>,
    transactions: Vec<Vec<u8>>,
    responses: VecDeque<u8>,
    pending_status: Option<u8>,
    injected: HashMap<u8, VecDeque<u8>>,
    chunk_script: VecDeque<usize>,

    nodes: BTreeMap<String, Node>,
    cwd: String,
    selected: Option<String>,
    open_file: Option<String>,
    cursor: usize,
    read_remaining: usize,
    write_remaining: usize,
}

impl SimChip {
    pub(crate) fn new(attached: bool) -> Self {
        Self {
            attached,
            mounted: false,
            connect_armed: false,
            connects_allowed: None,
            queued_interrupts: VecDeque::new(),
            sdo_interrupt: false,
            in_transaction: false,
            overlapped: false,
            current: Vec::new(),
            transactions: Vec::new(),
            responses: VecDeque::new(),
            pending_status: None,
            injected: HashMap::new(),
            chunk_script: VecDeque::new(),
            nodes: BTreeMap::new(),
            cwd: "/".to_string(),
            selected: None,
            open_file: None,
            cursor: 0,
            read_remaining: 0,
            write_remaining: 0,
        }
    }

    /// Plugs in the USB disk
    pub(crate) fn attach(&mut self) {
        self.attached = true;
    }

    /// Reports at most `count` more USB connections until
    /// [`SimChip::allow_connect`] is called
    pub(crate) fn limit_connects(&mut self, count: usize) {
        self.connects_allowed = Some(count);
    }

    /// Lets one more USB connection be reported
    pub(crate) fn allow_connect(&mut self) {
        if let Some(count) = self.connects_allowed.as_mut() {
            *count += 1;
        }
    }

    /// Raises `status` ahead of the next USB connection report
    pub(crate) fn queue_interrupt(&mut self, status: u8) {
        self.queued_interrupts.push_back(status);
    }

    pub(crate) fn mounted(&self) -> bool {
        self.mounted
    }

    /// Whether SDO currently mirrors the interrupt
    pub(crate) fn sdo_interrupt(&self) -> bool {
        self.sdo_interrupt
    }

    /// Whether a transaction was ever begun inside another, or a byte sent
    /// outside one
    pub(crate) fn overlapped(&self) -> bool {
        self.overlapped
    }

    pub(crate) fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Bytes sent in each completed transaction
    pub(crate) fn transactions(&self) -> &[Vec<u8>] {
        &self.transactions
    }

    /// The first byte of each completed transaction
    pub(crate) fn opcodes(&self) -> Vec<u8> {
        self.transactions
            .iter()
            .filter_map(|txn| txn.first().copied())
            .collect()
    }

    pub(crate) fn clear_log(&mut self) {
        self.transactions.clear();
    }

    /// Makes the next status produced by `opcode` be `status` instead
    pub(crate) fn inject(&mut self, opcode: u8, status: u8) {
        self.injected.entry(opcode).or_default().push_back(status);
    }

    /// Sets the sizes of the next data chunks offered or requested,
    /// regardless of how much data remains
    pub(crate) fn script_chunks(&mut self, sizes: &[usize]) {
        self.chunk_script.extend(sizes);
    }

    pub(crate) fn add_dir(&mut self, path: &str) {
        self.nodes.insert(path.to_string(), Node::Dir);
    }

    pub(crate) fn add_file(&mut self, path: &str, data: &[u8]) {
        self.nodes
            .insert(path.to_string(), Node::File(data.to_vec()));
    }

    pub(crate) fn file(&self, path: &str) -> Option<&[u8]> {
        match self.nodes.get(path) {
            Some(Node::File(data)) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn is_dir(&self, path: &str) -> bool {
        path == "/" || self.nodes.get(path) == Some(&Node::Dir)
    }

    pub(crate) fn exists(&self, path: &str) -> bool {
        path == "/" || self.nodes.contains_key(path)
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    fn begin(&mut self) {
        if self.in_transaction {
            self.overlapped = true;
        }
        self.in_transaction = true;
        self.current.clear();
        self.responses.clear();
    }

    fn end(&mut self) {
        if !self.in_transaction {
            self.overlapped = true;
            return;
        }
        self.in_transaction = false;
        let bytes = std::mem::take(&mut self.current);
        self.complete(&bytes);
        self.transactions.push(bytes);
    }

    fn transfer(&mut self, byte: u8) -> u8 {
        if !self.in_transaction {
            self.overlapped = true;
        }
        let response = self.responses.pop_front().unwrap_or(0);
        self.current.push(byte);
        let index = self.current.len() - 1;
        self.react(index, byte);
        response
    }

    fn interrupt_pending(&mut self) -> bool {
        if self.pending_status.is_none() && self.connect_armed && self.attached {
            if let Some(status) = self.queued_interrupts.pop_front() {
                self.pending_status = Some(status);
            } else if self.connects_allowed != Some(0) {
                if let Some(count) = self.connects_allowed.as_mut() {
                    *count -= 1;
                }
                self.connect_armed = false;
                self.pending_status = Some(ANSW_USB_INT_CONNECT);
            }
        }
        self.pending_status.is_some()
    }

    fn status_for(&mut self, opcode: u8, status: u8) -> u8 {
        self.injected
            .get_mut(&opcode)
            .and_then(VecDeque::pop_front)
            .unwrap_or(status)
    }

    fn next_chunk(&mut self, remaining: usize) -> usize {
        self.chunk_script
            .pop_front()
            .unwrap_or_else(|| remaining.min(MAX_CHUNK_SIZE))
    }

    /// Responds to a byte while the transaction is in progress
    fn react(&mut self, index: usize, byte: u8) {
        let opcode = self.current[0];
        match (opcode, index) {
            (CMD_GET_STATUS, 0) => {
                let status = self.pending_status.take().unwrap_or(0);
                self.responses.push_back(status);
            }
            (CMD_GET_IC_VER, 0) => self.responses.push_back(SIM_IC_VERSION),
            (CMD_CHECK_EXIST, 1) => self.responses.push_back(!byte),
            (CMD_SET_USB_MODE, 1) => {
                let status = self.status_for(CMD_SET_USB_MODE, ANSW_RET_SUCCESS);
                if status == ANSW_RET_SUCCESS && (byte == MODE_HOST_0 || byte == MODE_HOST_2) {
                    self.connect_armed = true;
                }
                self.responses.push_back(status);
            }
            (CMD_GET_FILE_SIZE, 1) => {
                let size = self
                    .open_file
                    .as_deref()
                    .and_then(|path| self.file(path))
                    .map_or(0, <[u8]>::len) as u32;
                self.responses.extend(size.to_le_bytes());
            }
            (CMD_RD_USB_DATA0, 0) => {
                let len = self.next_chunk(self.read_remaining);
                let data = self
                    .open_file
                    .as_deref()
                    .and_then(|path| self.file(path))
                    .unwrap_or(&[]);
                let chunk: Vec<u8> = (self.cursor..self.cursor + len)
                    .map(|ii| data.get(ii).copied().unwrap_or(0))
                    .collect();
                self.responses.push_back(len as u8);
                self.responses.extend(chunk);
                self.cursor += len;
                self.read_remaining = self.read_remaining.saturating_sub(len);
            }
            (CMD_WR_REQ_DATA, 0) => {
                let len = self.next_chunk(self.write_remaining);
                self.responses.push_back(len as u8);
            }
            _ => (),
        }
    }

    fn set_status(&mut self, opcode: u8, status: u8) {
        let status = self.status_for(opcode, status);
        trace!("SimChip opcode 0x{opcode:02x} status 0x{status:02x}");
        self.pending_status = Some(status);
    }

    fn join(&self, name: &str) -> String {
        if self.cwd == "/" {
            format!("/{name}")
        } else {
            format!("{}/{name}", self.cwd)
        }
    }

    fn parent_is_dir(&self, path: &str) -> bool {
        match path.rfind('/') {
            Some(0) => true,
            Some(pos) => self.is_dir(&path[..pos]),
            None => false,
        }
    }

    fn open_data(&mut self) -> Option<&mut Vec<u8>> {
        let path = self.open_file.clone()?;
        match self.nodes.get_mut(&path) {
            Some(Node::File(data)) => Some(data),
            _ => None,
        }
    }

    fn le_arg(bytes: &[u8], len: usize) -> usize {
        bytes
            .iter()
            .skip(1)
            .take(len)
            .rev()
            .fold(0, |acc, &byte| (acc << 8) | usize::from(byte))
    }

    /// Applies a command once its transaction has ended
    fn complete(&mut self, bytes: &[u8]) {
        let Some(&opcode) = bytes.first() else {
            return;
        };
        match opcode {
            CMD_RESET_ALL => {
                self.mounted = false;
                self.connect_armed = false;
                self.sdo_interrupt = false;
                self.pending_status = None;
                self.cwd = "/".to_string();
                self.selected = None;
                self.open_file = None;
            }
            CMD_SET_SDO_INT => {
                if bytes.get(1) == Some(&SDO_INT_SELECTOR) {
                    self.sdo_interrupt = bytes.get(2) == Some(&SDO_INT_ENABLE);
                }
            }
            CMD_SET_FILE_NAME => {
                let name: Vec<u8> = bytes[1..]
                    .iter()
                    .copied()
                    .take_while(|&byte| byte != FILE_NAME_TERMINATOR)
                    .collect();
                let name = String::from_utf8_lossy(&name).into_owned();
                let path = match name.strip_prefix('/') {
                    Some("") => "/".to_string(),
                    Some(name) => format!("/{name}"),
                    None => self.join(&name),
                };
                trace!("SimChip selected {path}");
                self.selected = Some(path);
            }
            CMD_DISK_CONNECT => {
                let status = if self.attached {
                    ANSW_USB_INT_SUCCESS
                } else {
                    ANSW_ERR_DISK_DISCON
                };
                self.set_status(opcode, status);
            }
            CMD_DISK_MOUNT => {
                let status = if self.attached {
                    ANSW_USB_INT_SUCCESS
                } else {
                    ANSW_ERR_DISK_DISCON
                };
                self.set_status(opcode, status);
                self.mounted = self.pending_status == Some(ANSW_USB_INT_SUCCESS);
            }
            CMD_FILE_OPEN => {
                let path = self.selected.clone().unwrap_or_default();
                let status = if self.is_dir(&path) {
                    self.cwd = path;
                    self.open_file = None;
                    ANSW_ERR_OPEN_DIR
                } else if self.file(&path).is_some() {
                    self.open_file = Some(path);
                    self.cursor = 0;
                    ANSW_USB_INT_SUCCESS
                } else {
                    ANSW_ERR_MISS_FILE
                };
                self.set_status(opcode, status);
            }
            CMD_FILE_CREATE => {
                let path = self.selected.clone().unwrap_or_default();
                let status = if self.is_dir(&path) {
                    ANSW_ERR_FOUND_NAME
                } else if self.parent_is_dir(&path) {
                    // The chip never creates an empty file
                    self.nodes.insert(path.clone(), Node::File(vec![0]));
                    self.open_file = Some(path);
                    self.cursor = 0;
                    ANSW_USB_INT_SUCCESS
                } else {
                    ANSW_ERR_MISS_FILE
                };
                self.set_status(opcode, status);
            }
            CMD_DIR_CREATE => {
                let path = self.selected.clone().unwrap_or_default();
                let status = if self.file(&path).is_some() {
                    ANSW_ERR_FOUND_NAME
                } else if self.parent_is_dir(&path) {
                    self.nodes.insert(path.clone(), Node::Dir);
                    self.cwd = path;
                    ANSW_USB_INT_SUCCESS
                } else {
                    ANSW_ERR_MISS_FILE
                };
                self.set_status(opcode, status);
            }
            CMD_FILE_ERASE => {
                let path = self.selected.clone().unwrap_or_default();
                let prefix = format!("{path}/");
                let has_children = self.nodes.keys().any(|key| key.starts_with(&prefix));
                let status = if path != "/" && self.exists(&path) && !has_children {
                    self.nodes.remove(&path);
                    if self.open_file.as_deref() == Some(path.as_str()) {
                        self.open_file = None;
                    }
                    ANSW_USB_INT_SUCCESS
                } else {
                    ANSW_ERR_MISS_FILE
                };
                self.set_status(opcode, status);
            }
            CMD_FILE_CLOSE => {
                self.open_file = None;
                self.set_status(opcode, ANSW_USB_INT_SUCCESS);
            }
            CMD_BYTE_LOCATE => {
                let status = if self.open_file.is_some() {
                    self.cursor = Self::le_arg(bytes, 4);
                    ANSW_USB_INT_SUCCESS
                } else {
                    ANSW_ERR_MISS_FILE
                };
                self.set_status(opcode, status);
            }
            CMD_BYTE_READ => {
                let requested = Self::le_arg(bytes, 2);
                let cursor = self.cursor;
                let available = self
                    .open_data()
                    .map(|data| data.len().saturating_sub(cursor));
                let status = match available {
                    Some(available) => {
                        self.read_remaining = requested.min(available);
                        if self.read_remaining > 0 {
                            ANSW_USB_INT_DISK_READ
                        } else {
                            ANSW_USB_INT_SUCCESS
                        }
                    }
                    None => ANSW_ERR_MISS_FILE,
                };
                self.set_status(opcode, status);
            }
            CMD_BYTE_RD_GO => {
                let status = if self.read_remaining > 0 {
                    ANSW_USB_INT_DISK_READ
                } else {
                    ANSW_USB_INT_SUCCESS
                };
                self.set_status(opcode, status);
            }
            CMD_BYTE_WRITE => {
                let status = if self.open_file.is_some() {
                    self.write_remaining = Self::le_arg(bytes, 2);
                    ANSW_USB_INT_DISK_WRITE
                } else {
                    ANSW_ERR_MISS_FILE
                };
                self.set_status(opcode, status);
            }
            CMD_WR_REQ_DATA => {
                // Opcode, then the length read back, then the data
                let chunk = bytes.get(2..).unwrap_or(&[]).to_vec();
                let cursor = self.cursor;
                if let Some(data) = self.open_data() {
                    if data.len() < cursor + chunk.len() {
                        data.resize(cursor + chunk.len(), 0);
                    }
                    data[cursor..cursor + chunk.len()].copy_from_slice(&chunk);
                }
                self.cursor += chunk.len();
                self.write_remaining = self.write_remaining.saturating_sub(chunk.len());
            }
            CMD_BYTE_WR_GO => {
                let status = if self.write_remaining > 0 {
                    ANSW_USB_INT_DISK_WRITE
                } else {
                    ANSW_USB_INT_SUCCESS
                };
                self.set_status(opcode, status);
            }
            _ => (),
        }
    }
}

/// A [`Device`] wired to a [`SimChip`]
#[derive(Debug, Clone)]
pub(crate) struct SimDevice {
    chip: Arc<Mutex<SimChip>>,
}

impl SimDevice {
    /// A chip with a USB disk already plugged in
    pub(crate) fn with_disk() -> Self {
        Self {
            chip: Arc::new(Mutex::new(SimChip::new(true))),
        }
    }

    /// A chip waiting for a USB disk - see [`SimChip::attach`]
    pub(crate) fn without_disk() -> Self {
        Self {
            chip: Arc::new(Mutex::new(SimChip::new(false))),
        }
    }

    /// Shared access to the chip, which remains valid after the device has
    /// been handed off
    pub(crate) fn handle(&self) -> Arc<Mutex<SimChip>> {
        Arc::clone(&self.chip)
    }
}

impl Device for SimDevice {
    type Config = SimChip;

    fn new(config: Option<Self::Config>) -> Result<Self, Error> {
        let chip = config.unwrap_or_else(|| SimChip::new(true));
        Ok(Self {
            chip: Arc::new(Mutex::new(chip)),
        })
    }

    fn begin_transaction(&mut self) -> Result<(), Error> {
        self.chip.lock().begin();
        Ok(())
    }

    fn end_transaction(&mut self) -> Result<(), Error> {
        self.chip.lock().end();
        Ok(())
    }

    fn transfer(&mut self, byte: u8) -> Result<u8, Error> {
        Ok(self.chip.lock().transfer(byte))
    }

    fn interrupt_pending(&mut self) -> Result<bool, Error> {
        Ok(self.chip.lock().interrupt_pending())
    }

    fn delay(&mut self, _dur: Duration) {}
}
