//! TCP connection to a network printer.
//!
//! Network ESC/POS printers accept raw job bytes on a listening port,
//! conventionally 9100 (the JetDirect convention). There is no protocol
//! handshake; connect, write, done.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::BuzonError;

/// Bound on connection establishment so a powered-off printer cannot stall
/// the intake loop for the OS default (minutes).
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound on individual writes for the same reason.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect to `host:port` with bounded timeouts.
pub fn connect(host: &str, port: u16) -> Result<TcpStream, BuzonError> {
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|e| BuzonError::Transport(format!("Cannot resolve {}: {}", host, e)))?
        .next()
        .ok_or_else(|| BuzonError::Transport(format!("No address for {}", host)))?;

    let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
        .map_err(|e| BuzonError::Transport(format!("Connect to {} failed: {}", addr, e)))?;
    stream
        .set_write_timeout(Some(WRITE_TIMEOUT))
        .map_err(|e| BuzonError::Transport(format!("Socket setup failed: {}", e)))?;
    Ok(stream)
}
