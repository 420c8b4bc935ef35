// MotionLink — Transport seams
//
// The upload transaction only talks to these traits. `SystemResolver` and
// `TcpConnector` are the std implementations; on ESP-IDF they run on lwIP.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, SocketAddrV4, TcpStream, ToSocketAddrs};

use thiserror::Error;

use crate::config::Timeouts;

/// Host name to IPv4 lookup.
pub trait Resolver {
    /// `Ok(None)` when the name resolved but carried no IPv4 record.
    fn resolve(&self, host: &str, port: u16) -> io::Result<Option<SocketAddrV4>>;
}

/// Why a connection could not be opened.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("socket could not be allocated: {0}")]
    SocketCreate(#[source] io::Error),
    #[error("handshake did not complete: {0}")]
    Handshake(#[source] io::Error),
}

/// One open stream. The upload transaction calls `close` exactly once per
/// connection, then drops it.
pub trait Connection: Read + Write {
    fn close(&mut self);
}

/// Opens a brand-new connection per call.
pub trait Connector {
    type Conn: Connection;

    fn connect(&self, addr: SocketAddrV4, timeouts: &Timeouts) -> Result<Self::Conn, ConnectError>;
}

// ---------------------------------------------------------------------------
// std implementations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
    fn resolve(&self, host: &str, port: u16) -> io::Result<Option<SocketAddrV4>> {
        let addr = (host, port).to_socket_addrs()?.find_map(|a| match a {
            SocketAddr::V4(v4) => Some(v4),
            SocketAddr::V6(_) => None,
        });
        Ok(addr)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Conn = TcpStream;

    fn connect(&self, addr: SocketAddrV4, timeouts: &Timeouts) -> Result<TcpStream, ConnectError> {
        // std rejects a zero timeout; refuse before any socket is opened.
        if let Some(step) = timeouts.zero_step() {
            log::error!("{} timeout must be non-zero; use None to block", step);
            return Err(ConnectError::Handshake(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("zero {} timeout", step),
            )));
        }

        let addr = SocketAddr::V4(addr);
        let stream = match timeouts.connect {
            Some(t) => TcpStream::connect_timeout(&addr, t),
            None => TcpStream::connect(addr),
        }
        .map_err(classify_connect_error)?;

        // The socket is already connected here, so a failure is not an
        // allocation problem.
        stream
            .set_read_timeout(timeouts.read)
            .and_then(|_| stream.set_write_timeout(timeouts.write))
            .map_err(|e| {
                log::error!("Failed to apply socket timeouts: {}", e);
                ConnectError::Handshake(e)
            })?;

        Ok(stream)
    }
}

impl Connection for TcpStream {
    fn close(&mut self) {
        // The peer may already have closed its side; nothing left to report.
        let _ = self.shutdown(Shutdown::Both);
    }
}

// errno values shared by newlib (ESP-IDF) and Linux.
const ENFILE: i32 = 23;
const EMFILE: i32 = 24;
const ENOBUFS: i32 = 105;

/// std opens and connects in one call; resource exhaustion means the socket
/// itself never existed, everything else is a failed handshake.
fn classify_connect_error(err: io::Error) -> ConnectError {
    let exhausted = err.kind() == io::ErrorKind::OutOfMemory
        || matches!(err.raw_os_error(), Some(ENFILE | EMFILE | ENOBUFS));
    if exhausted {
        ConnectError::SocketCreate(err)
    } else {
        ConnectError::Handshake(err)
    }
}
