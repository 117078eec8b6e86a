//! Driver configuration

use crate::constants::*;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How [`crate::Ch376`] waits for the status of interrupting commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusMode {
    /// Spin on the device's interrupt line before reading status
    #[default]
    Interrupt,

    /// Read status immediately after each command.  Only suitable where the
    /// chip is known to have finished, or the device cannot see the
    /// interrupt line and the caller is happy to accept the chip's status
    /// as of that moment.
    Poll,
}

/// Tunables for [`crate::Ch376`]
///
/// The defaults match the chip's documented settle times and are what
/// [`crate::Ch376Builder`] uses if nothing else is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Which status wait the driver's own operations use
    pub status_mode: StatusMode,
    /// Chip select held high before the reset command
    pub initial_settle: Duration,
    /// Wait after the reset command
    pub reset_settle: Duration,
    /// Wait between sending a USB mode and reading back its status
    pub mode_settle: Duration,
    /// Wait between a command and reading a directly returned value
    pub command_settle: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            status_mode: StatusMode::default(),
            initial_settle: DEFAULT_INITIAL_SETTLE,
            reset_settle: DEFAULT_RESET_SETTLE,
            mode_settle: DEFAULT_MODE_SETTLE,
            command_settle: DEFAULT_COMMAND_SETTLE,
        }
    }
}

impl DriverConfig {
    /// A configuration with every settle time set to zero, for use with
    /// simulated chips
    #[must_use]
    pub fn fast() -> Self {
        Self {
            status_mode: StatusMode::Interrupt,
            initial_settle: Duration::ZERO,
            reset_settle: Duration::ZERO,
            mode_settle: Duration::ZERO,
            command_settle: Duration::ZERO,
        }
    }
}
