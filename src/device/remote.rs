//! [`RemoteDevice`] forwards the bus primitives of a [`Device`] over TCP,
//! allowing a CH376 attached to one machine to be driven from another.
//!
//! [`DeviceServer`] owns the real device and serves one client at a time.
//! The `ch376-server` binary uses it to provide a complete
//! server implementation for a locally attached [`crate::Ch341Device`].
//!
//! Each request and response is a `bincode` encoded message preceded by its
//! length as a little endian u64.  Lengths above [`MAX_REMOTE_MESSAGE_LEN`]
//! are rejected before anything is allocated.

use crate::constants::{DEFAULT_REMOTE_ADDR, DEFAULT_REMOTE_PORT, MAX_REMOTE_MESSAGE_LEN};
use crate::error::{Communication, DeviceAccess};
use crate::{Device, Error};

use bincode::{deserialize, serialize};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::io::{Read, Write};
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

fn default_socket_addr() -> SocketAddr {
    let ip: IpAddr = DEFAULT_REMOTE_ADDR
        .parse()
        .unwrap_or(IpAddr::from([127, 0, 0, 1]));
    SocketAddr::new(ip, DEFAULT_REMOTE_PORT)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteDeviceConfig {
    /// Address of the [`DeviceServer`].  If omitted, the default address
    /// and port are used.
    pub remote_addr: Option<SocketAddr>,
}

// Shared protocol definitions
#[derive(Debug, Serialize, Deserialize)]
enum RemoteDeviceRequest {
    BeginTransaction,
    EndTransaction,
    Transfer(u8),
    InterruptPending,
    Delay(Duration),
}

#[derive(Debug, Serialize, Deserialize)]
enum RemoteDeviceResponse {
    BeginTransaction(Result<(), Error>),
    EndTransaction(Result<(), Error>),
    Transfer(Result<u8, Error>),
    InterruptPending(Result<bool, Error>),
    Delay,
}

impl std::fmt::Display for RemoteDeviceResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteDeviceResponse::BeginTransaction(result) => {
                write!(f, "BeginTransaction({result:?})")
            }
            RemoteDeviceResponse::EndTransaction(result) => write!(f, "EndTransaction({result:?})"),
            RemoteDeviceResponse::Transfer(result) => write!(f, "Transfer({result:?})"),
            RemoteDeviceResponse::InterruptPending(result) => {
                write!(f, "InterruptPending({result:?})")
            }
            RemoteDeviceResponse::Delay => write!(f, "Delay"),
        }
    }
}

/// Write one length-prefixed message, mapping IO failures with `map_io`
fn send_message<T: Serialize>(
    stream: &mut TcpStream,
    message: &T,
    map_io: impl Fn(String, i32) -> Error,
) -> Result<(), Error> {
    let data = serialize(message).map_err(|e| {
        // Serialization errors don't have OS error codes
        map_io(format!("Serialization error: {e}"), libc::EIO)
    })?;
    stream
        .write_all(&(data.len() as u64).to_le_bytes())
        .map_err(|e| {
            map_io(
                format!("Failed to send message length: {e}"),
                e.raw_os_error().unwrap_or(libc::EIO),
            )
        })?;
    stream.write_all(&data).map_err(|e| {
        map_io(
            format!("Failed to send message: {e}"),
            e.raw_os_error().unwrap_or(libc::EIO),
        )
    })
}

/// Read one length-prefixed message body
fn recv_message_data(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 8];
    stream.read_exact(&mut len_buf)?;
    let len = u64::from_le_bytes(len_buf);
    let len = match usize::try_from(len) {
        Ok(len) if len <= MAX_REMOTE_MESSAGE_LEN => len,
        _ => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Message length {len} exceeds maximum {MAX_REMOTE_MESSAGE_LEN}"),
            ))
        }
    };
    let mut data = vec![0u8; len];
    stream.read_exact(&mut data)?;
    Ok(data)
}

fn decode<T: DeserializeOwned>(
    data: &[u8],
    map_io: impl Fn(String, i32) -> Error,
) -> Result<T, Error> {
    // Deserialization errors don't have OS error codes
    deserialize(data).map_err(|e| map_io(format!("Failed to deserialize: {e}"), libc::EIO))
}

fn client_error(message: String, errno: i32) -> Error {
    Error::DeviceAccess {
        kind: DeviceAccess::NetworkConnection { message, errno },
    }
}

fn server_error(message: String, errno: i32) -> Error {
    Error::Communication {
        kind: Communication::Remote { message, errno },
    }
}

// Client implementation
#[derive(Debug, Clone)]
pub struct RemoteDevice {
    stream: Arc<Mutex<TcpStream>>,
    config: RemoteDeviceConfig,
}

impl RemoteDevice {
    /// Retrieve this Device's current configuration state
    #[must_use]
    pub fn current_config(&self) -> &RemoteDeviceConfig {
        &self.config
    }

    fn send_request(&self, request: RemoteDeviceRequest) -> Result<RemoteDeviceResponse, Error> {
        trace!("RemoteDevice::send_request {request:?}");
        let response_data = {
            let mut guard = self.stream.lock();
            send_message(&mut *guard, &request, client_error)?;
            recv_message_data(&mut guard).map_err(|e| {
                client_error(
                    format!("Failed to read response: {e}"),
                    e.raw_os_error().unwrap_or(libc::EIO),
                )
            })?
        };
        decode(&response_data, client_error)
    }

    fn unexpected_response(request: &str, rsp: RemoteDeviceResponse) -> Error {
        trace!("RemoteDevice::unexpected_response");
        Error::Communication {
            kind: Communication::Remote {
                message: format!("Unexpected response for {request}: {rsp}"),
                errno: libc::EIO,
            },
        }
    }
}

impl Device for RemoteDevice {
    type Config = RemoteDeviceConfig;

    fn new(config: Option<Self::Config>) -> Result<Self, Error> {
        trace!("RemoteDevice::new");
        let config = config.unwrap_or_default();
        let remote_addr = config.remote_addr.unwrap_or_else(default_socket_addr);

        let stream = TcpStream::connect(remote_addr).map_err(|e| {
            client_error(
                format!("Failed to connect to {remote_addr}: {e}"),
                e.raw_os_error().unwrap_or(libc::EIO),
            )
        })?;
        // Every exchange is a single byte - don't let Nagle batch them
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to disable Nagle on remote connection: {e}");
        }
        info!("Connected to remote device at {remote_addr}");

        Ok(Self {
            stream: Arc::new(Mutex::new(stream)),
            config: RemoteDeviceConfig {
                remote_addr: Some(remote_addr),
            },
        })
    }

    fn begin_transaction(&mut self) -> Result<(), Error> {
        match self.send_request(RemoteDeviceRequest::BeginTransaction)? {
            RemoteDeviceResponse::BeginTransaction(result) => result,
            rsp => Err(Self::unexpected_response("BeginTransaction", rsp)),
        }
    }

    fn end_transaction(&mut self) -> Result<(), Error> {
        match self.send_request(RemoteDeviceRequest::EndTransaction)? {
            RemoteDeviceResponse::EndTransaction(result) => result,
            rsp => Err(Self::unexpected_response("EndTransaction", rsp)),
        }
    }

    fn transfer(&mut self, byte: u8) -> Result<u8, Error> {
        match self.send_request(RemoteDeviceRequest::Transfer(byte))? {
            RemoteDeviceResponse::Transfer(result) => result,
            rsp => Err(Self::unexpected_response("Transfer", rsp)),
        }
    }

    fn interrupt_pending(&mut self) -> Result<bool, Error> {
        match self.send_request(RemoteDeviceRequest::InterruptPending)? {
            RemoteDeviceResponse::InterruptPending(result) => result,
            rsp => Err(Self::unexpected_response("InterruptPending", rsp)),
        }
    }

    /// Delays are performed by the server, next to the chip, so that they
    /// are not shortened by network latency
    fn delay(&mut self, dur: Duration) {
        match self.send_request(RemoteDeviceRequest::Delay(dur)) {
            Ok(RemoteDeviceResponse::Delay) => (),
            Ok(rsp) => warn!("{}", Self::unexpected_response("Delay", rsp)),
            Err(e) => {
                warn!("Remote delay failed, delaying locally: {e}");
                std::thread::sleep(dur);
            }
        }
    }
}

// Server implementation
pub struct DeviceServer<D: Device> {
    device: D,
    listener: TcpListener,
}

impl<D: Device> DeviceServer<D> {
    pub fn new(device: D, bind_addr: SocketAddr) -> Result<Self, Error> {
        trace!("DeviceServer::new");
        let listener = TcpListener::bind(bind_addr)
            .map_err(|e| server_error(format!("Failed to bind server: {e}"), libc::EIO))?;
        Ok(DeviceServer { device, listener })
    }

    /// The address the server is listening on
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        self.listener
            .local_addr()
            .map_err(|e| server_error(format!("Failed to get local address: {e}"), libc::EIO))
    }

    /// Runs the server until a fatal error is hit, then returns
    pub fn serve(&mut self) -> Result<(), Error> {
        trace!("DeviceServer::serve");
        loop {
            match self.serve_one_connection() {
                Ok(()) => continue,
                Err(Error::Communication {
                    kind: Communication::RemoteDisconnected { .. },
                }) => continue,
                Err(e) => {
                    error!("Hit unexpected error: {e}");
                    break Err(e);
                }
            }
        }
    }

    /// Serves a single connection until the client disconnects
    pub fn serve_one_connection(&mut self) -> Result<(), Error> {
        trace!("DeviceServer::serve_one_connection");
        // Since this is 1:1, we only accept one connection
        let (mut stream, peer_addr) = self
            .listener
            .accept()
            .map_err(|e| server_error(format!("Failed to accept connection: {e}"), libc::EIO))?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to disable Nagle on client connection: {e}");
        }
        info!("Remote client {peer_addr} connected");

        // Tracked so that a client vanishing mid-transaction doesn't leave
        // chip select asserted
        let mut in_transaction = false;

        loop {
            let request_data = match recv_message_data(&mut stream) {
                Ok(data) => data,
                Err(e) => {
                    if in_transaction {
                        if let Err(e) = self.device.end_transaction() {
                            warn!("Failed to end abandoned transaction: {e}");
                        }
                    }
                    return Err(match e.kind() {
                        std::io::ErrorKind::ConnectionReset
                        | std::io::ErrorKind::ConnectionAborted
                        | std::io::ErrorKind::UnexpectedEof => {
                            info!("Remote client {peer_addr} disconnected");
                            trace!("Disconnect error information: {e}");
                            Error::Communication {
                                kind: Communication::RemoteDisconnected {
                                    message: format!(
                                        "Client disconnected: error: {e} kind: {}",
                                        e.kind()
                                    ),
                                    errno: e.raw_os_error().unwrap_or_default(),
                                },
                            }
                        }
                        std::io::ErrorKind::InvalidData => {
                            warn!("Dropping remote client {peer_addr}: {e}");
                            server_error(format!("Invalid request: {e}"), libc::EINVAL)
                        }
                        _ => server_error(
                            format!("Hit error reading data error: {e} kind: {}", e.kind()),
                            e.raw_os_error().unwrap_or_default(),
                        ),
                    });
                }
            };

            let request: RemoteDeviceRequest = decode(&request_data, server_error)?;
            trace!("DeviceServer request {request:?}");

            let response = match request {
                RemoteDeviceRequest::BeginTransaction => {
                    let result = self.device.begin_transaction();
                    in_transaction |= result.is_ok();
                    RemoteDeviceResponse::BeginTransaction(result)
                }
                RemoteDeviceRequest::EndTransaction => {
                    in_transaction = false;
                    RemoteDeviceResponse::EndTransaction(self.device.end_transaction())
                }
                RemoteDeviceRequest::Transfer(byte) => {
                    RemoteDeviceResponse::Transfer(self.device.transfer(byte))
                }
                RemoteDeviceRequest::InterruptPending => {
                    RemoteDeviceResponse::InterruptPending(self.device.interrupt_pending())
                }
                RemoteDeviceRequest::Delay(dur) => {
                    self.device.delay(dur);
                    RemoteDeviceResponse::Delay
                }
            };

            send_message(&mut stream, &response, server_error)?;
        }
    }
}
