use crate::config::{DriverConfig, StatusMode};
use crate::constants::{DEFAULT_REMOTE_ADDR, DEFAULT_REMOTE_PORT};
use crate::error::DeviceAccess;
use crate::{Ch341DeviceConfig, Ch376, Error, RemoteDeviceConfig};
use crate::{Device, DeviceConfig, DeviceType};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use rusb::{Context, UsbContext};
use std::net::{SocketAddr, ToSocketAddrs};

/// A builder pattern for creating [`Ch376`] instances, together with the
/// [`Device`] they talk through.
///
/// By default the chip is reached through a locally attached CH341
/// adapter.  Setting a remote address instead connects to a
/// [`crate::DeviceServer`].
///
/// # Examples
///
/// ## A simple example
///
/// ```no_run
/// use ch376::Ch376Builder;
///
/// // Uses the first CH341 found
/// let mut ch376 = Ch376Builder::new()
///     .build()
///     .unwrap();
/// ch376.bring_up().unwrap();
/// ```
///
/// ## Watching the interrupt line
///
/// ```no_run
/// use ch376::{Ch376Builder, StatusMode};
///
/// let ch376 = Ch376Builder::new()
///     .index(1)
///     .int_pin(2)
///     .status_mode(StatusMode::Interrupt)
///     .build()
///     .unwrap();
/// ```
///
/// ## A remote example
///
/// ```no_run
/// use ch376::Ch376Builder;
///
/// let ch376 = Ch376Builder::new()
///     .remote_str("127.0.0.1:3760").unwrap()
///     .build().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct Ch376Builder {
    usb_context: Option<Context>,
    index: Option<u8>,
    int_pin: Option<u8>,
    remote_addr: Option<SocketAddr>,
    config: DriverConfig,
}

impl Ch376Builder {
    /// Creates a new [`Ch376Builder`] instance with default values.
    ///
    /// # Example
    /// See [`Ch376Builder`] documentation
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds and returns a new [`Ch376`] instance using the configured
    /// parameters.
    ///
    /// The chip is not touched - call [`Ch376::bring_up`] next.
    ///
    /// # Returns
    /// * `Ok(Ch376)` - the constructed driver if successful
    /// * `Err(Error)` - if the device couldn't be opened
    ///
    /// # Notes:
    /// Uses default values for any parameters that weren't set
    pub fn build(&mut self) -> Result<Ch376<DeviceType>, Error> {
        let device = match self.remote_addr {
            Some(addr) => {
                trace!("Creating remote device at {addr}");
                self.create_remote_device()
            }
            None => {
                trace!("Creating local CH341 device");
                self.create_ch341_device()
            }
        }?;

        Ok(Ch376::new(device, self.config.clone()))
    }

    /// Sets how the driver waits for the chip's status.
    ///
    /// # Note:
    /// If not set, defaults to [`StatusMode::Interrupt`].  Without an
    /// interrupt pin the CH341 device reads the interrupt from MISO instead.
    pub fn status_mode(&mut self, mode: StatusMode) -> &mut Self {
        self.config.status_mode = mode;
        self
    }

    /// Replaces the whole driver configuration
    pub fn config(&mut self, config: DriverConfig) -> &mut Self {
        self.config = config;
        self
    }
}

/// Local CH341 specific build functions
impl Ch376Builder {
    /// Sets a custom USB context for device communication.
    ///
    /// This allows setting the USB debug log level via
    /// `context.set_log_level()` using [`rusb::LogLevel`].
    ///
    /// ```rust,no_run
    /// use rusb::{Context, UsbContext};
    /// use ch376::Ch376Builder;
    ///
    /// let mut context = Context::new().unwrap();
    /// context.set_log_level(rusb::LogLevel::Debug);
    ///
    /// let ch376 = Ch376Builder::new()
    ///     .context(context)
    ///     .build()
    ///     .unwrap();
    /// ```
    ///
    /// # Note:
    /// If not set, a new default [`rusb::Context`] will be created with
    /// LogLevel::Info
    pub fn context(&mut self, context: Context) -> &mut Self {
        self.usb_context = Some(context);
        self
    }

    /// Sets which CH341 to use, when more than one is attached
    ///
    /// # Note:
    /// If not set, the first CH341 found is used
    pub fn index(&mut self, index: u8) -> &mut Self {
        self.index = Some(index);
        self
    }

    /// Sets the CH341 input pin (0-7) wired to the CH376's INT# line.  If
    /// not set, MISO is sampled between transactions.
    pub fn int_pin(&mut self, pin: u8) -> &mut Self {
        self.int_pin = Some(pin);
        self
    }

    fn create_ch341_device(&mut self) -> Result<DeviceType, Error> {
        // Get or create the context
        if self.usb_context.is_none() {
            let mut context = Context::new()?;
            context.set_log_level(rusb::LogLevel::Info);
            self.usb_context = Some(context);
        };

        // Consumes the stored context
        let device_config = Ch341DeviceConfig {
            context: self.usb_context.take(),
            index: self.index,
            int_pin: self.int_pin,
        };
        DeviceType::new(Some(DeviceConfig::Ch341(device_config)))
    }
}

/// Remote build functions
impl Ch376Builder {
    /// Sets the remote address to the default server address and port
    ///
    /// # Errors
    /// If a USB context has already been set
    pub fn remote_default(&mut self) -> Result<&mut Self, Error> {
        self.remote_str(&format!("{DEFAULT_REMOTE_ADDR}:{DEFAULT_REMOTE_PORT}"))
    }

    /// Sets the remote [`crate::DeviceServer`] address using an already
    /// parsed SocketAddr.
    ///
    /// # Errors
    /// If a USB context has already been set, as the two are exclusive
    pub fn remote(&mut self, addr: SocketAddr) -> Result<&mut Self, Error> {
        if self.usb_context.is_none() {
            self.remote_addr = Some(addr);
            Ok(self)
        } else {
            Err(Error::Init {
                message: "Cannot set remote address when (local) USB context is already configured"
                    .to_string(),
            })
        }
    }

    /// Sets the remote device address using a string representation.
    ///
    /// # Args:
    /// * addr - String in format `HOST:PORT` where:
    ///   - IPv4 addresses: `192.168.1.1:3760`
    ///   - IPv6 addresses: must use square brackets `\[2001:db8::1\]:3760`
    ///   - Hostnames: `example.com:3760`
    ///
    /// # Errors
    /// If the address doesn't resolve
    pub fn remote_str(&mut self, addr: &str) -> Result<&mut Self, Error> {
        let addr = addr
            .to_socket_addrs()
            .map_err(|e| Error::DeviceAccess {
                kind: DeviceAccess::AddressResolution {
                    message: format!("Failed to resolve address: {e}"),
                    errno: e.raw_os_error().unwrap_or(libc::EINVAL),
                },
            })?
            .next()
            .ok_or_else(|| Error::DeviceAccess {
                kind: DeviceAccess::AddressResolution {
                    message: "Could not resolve address".to_string(),
                    errno: libc::EAI_NONAME,
                },
            })?;
        self.remote(addr)
    }

    fn create_remote_device(&mut self) -> Result<DeviceType, Error> {
        let device_config = RemoteDeviceConfig {
            remote_addr: self.remote_addr,
        };
        DeviceType::new(Some(DeviceConfig::Remote(device_config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeviceServer;
    use crate::device::sim::SimDevice;

    #[test]
    fn test_remote_str_resolves() {
        let mut builder = Ch376Builder::new();
        builder.remote_str("127.0.0.1:3760").unwrap();
        assert_eq!(
            builder.remote_addr,
            Some("127.0.0.1:3760".parse().unwrap())
        );
    }

    #[test]
    fn test_remote_str_rejects_garbage() {
        let mut builder = Ch376Builder::new();
        match builder.remote_str("not an address") {
            Err(Error::DeviceAccess {
                kind: DeviceAccess::AddressResolution { .. },
            }) => (),
            other => panic!("Unexpected result {other:?}"),
        }
        assert!(builder.remote_addr.is_none());
    }

    #[test]
    fn test_builds_remote_driver() {
        let sim = SimDevice::with_disk();
        let mut server =
            DeviceServer::new(sim, "127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = server.local_addr().unwrap();
        let handle = std::thread::spawn(move || server.serve_one_connection());

        let mut ch376 = Ch376Builder::new()
            .status_mode(StatusMode::Poll)
            .remote(addr)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(ch376.config().status_mode, StatusMode::Poll);
        ch376.check_exist().unwrap();
        drop(ch376);

        // The server sees the client go away
        assert!(handle.join().unwrap().is_err());
    }
}
