//! A network server exposing the bus of a locally attached CH376 over IP,
//! so that a [`ch376::RemoteDevice`] on another machine can drive it.
//!
//! It creates the [`Ch341Device`] locally, and accepts and serves one
//! connection at a time.  Once a remote peer has connected, no other
//! connections are accepted until it disconnects.  If the peer disconnects
//! in the middle of a transaction, chip select is released before the next
//! peer is accepted.
//!
//! The server listens on all addresses, on the default port.
//!
//! If any unexpected errors - such as pipes breaking, network errors, etc,
//! this server will exit.
//!
//! All logging is done to stdout and can be controlled via the `RUST_LOG`
//! environment variable.
use ch376::constants::DEFAULT_REMOTE_PORT;
use ch376::{Ch341Device, Device, DeviceServer, Error};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

fn execute() -> Result<(), Error> {
    info!("Create CH341 Device");
    let device = Ch341Device::new(None)?;
    device.usb_info().print();

    let addr = "0.0.0.0";
    info!("Create Device Server to listen on {addr}:{DEFAULT_REMOTE_PORT}");
    let ip_addr = IpAddr::from_str(addr).map_err(|e| Error::Args {
        message: format!("Failed to parse address: {e}"),
    })?;
    let bind_addr = SocketAddr::new(ip_addr, DEFAULT_REMOTE_PORT);
    let mut server = DeviceServer::new(device, bind_addr)?;

    info!("Server: Listen for remote connection");
    let result = server.serve();

    info!("Exiting server");

    result
}

fn main() {
    env_logger::builder().init();

    match execute() {
        Ok(_) => std::process::exit(0),
        Err(e) => {
            error!("Error: {e}");
            std::process::exit(1);
        }
    }
}
