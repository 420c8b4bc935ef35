// MotionLink — Upload Transaction
//
// One attempt per sample: resolve → connect → send → receive → close.
// Every attempt opens a fresh connection and nothing survives it. Failures
// are reported as `UploadOutcome::Failed` values, never as errors.

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::config::{Endpoint, ResponseMode, UploadConfig, LEGACY_RESPONSE_BUFFER};
use crate::encoder::encode;
use crate::events::SensorSample;
use crate::http;
use crate::transport::{ConnectError, Connection, Connector, Resolver, SystemResolver, TcpConnector};

const READ_CHUNK: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("DNS resolution failed")]
    DnsResolutionFailed,
    #[error("socket creation failed")]
    SocketCreateFailed,
    #[error("connection failed")]
    ConnectFailed,
    #[error("send incomplete")]
    SendIncomplete,
    #[error("no response received")]
    NoResponse,
    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The server answered with a 2xx status.
    Delivered { status: u16 },
    /// The server answered, but not with a 2xx (or with something unparseable).
    DeliveredNon2xx {
        status: Option<u16>,
        response: String,
    },
    Failed(FailureReason),
}

impl UploadOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered { status } => write!(f, "SUCCESS: {}", status),
            Self::DeliveredNon2xx {
                status: Some(status),
                ..
            } => write!(f, "FAILURE: non-2xx response (status {})", status),
            Self::DeliveredNon2xx { status: None, .. } => {
                write!(f, "FAILURE: unrecognised response")
            }
            Self::Failed(reason) => write!(f, "ERROR: {}", reason),
        }
    }
}

/// Anything that can take a sample upstream.
pub trait Uplink {
    fn upload(&self, sample: SensorSample) -> UploadOutcome;
}

impl<T: Uplink + ?Sized> Uplink for &T {
    fn upload(&self, sample: SensorSample) -> UploadOutcome {
        (**self).upload(sample)
    }
}

/// Upload with the std transport and default options.
pub fn upload(sample: SensorSample, endpoint: &Endpoint) -> UploadOutcome {
    Uploader::new(UploadConfig::new(endpoint.clone())).upload(sample)
}

pub struct Uploader<R = SystemResolver, C = TcpConnector> {
    config: UploadConfig,
    resolver: R,
    connector: C,
    cancel: Option<Arc<AtomicBool>>,
}

impl Uploader {
    pub fn new(config: UploadConfig) -> Self {
        Self::with_transport(config, SystemResolver, TcpConnector)
    }
}

impl<R: Resolver, C: Connector> Uploader<R, C> {
    pub fn with_transport(config: UploadConfig, resolver: R, connector: C) -> Self {
        Self {
            config,
            resolver,
            connector,
            cancel: None,
        }
    }

    /// Abort attempts at the next blocking boundary once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    fn checkpoint(&self) -> Result<(), FailureReason> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::SeqCst) => {
                log::warn!("Upload cancelled");
                Err(FailureReason::Cancelled)
            }
            _ => Ok(()),
        }
    }

    fn attempt(&self, sample: &SensorSample) -> Result<UploadOutcome, FailureReason> {
        let endpoint = &self.config.endpoint;

        let payload = encode(sample);
        log::info!("Sending: {}", payload);

        // ---- Resolve ----
        self.checkpoint()?;
        let addr = match self.resolver.resolve(&endpoint.host, endpoint.port) {
            Ok(Some(addr)) => addr,
            Ok(None) => {
                log::error!("ERROR: DNS resolution failed ({}: no IPv4 record)", endpoint.host);
                return Err(FailureReason::DnsResolutionFailed);
            }
            Err(e) => {
                log::error!("ERROR: DNS resolution failed ({}: {})", endpoint.host, e);
                return Err(FailureReason::DnsResolutionFailed);
            }
        };
        log::info!("DNS OK: {}", addr.ip());

        // ---- Connect ----
        self.checkpoint()?;
        let mut socket = match self.connector.connect(addr, &self.config.timeouts) {
            Ok(conn) => SocketGuard(conn),
            Err(ConnectError::SocketCreate(e)) => {
                log::error!("ERROR: Socket creation failed ({})", e);
                return Err(FailureReason::SocketCreateFailed);
            }
            Err(ConnectError::Handshake(e)) => {
                log::error!("ERROR: Connection to {} failed ({})", addr, e);
                return Err(FailureReason::ConnectFailed);
            }
        };
        log::info!("Connected to {}", addr);

        // ---- Send ----
        self.checkpoint()?;
        let frame = http::build_request(endpoint, &payload);
        let sent = send_all(&mut socket.0, &frame)?;
        log::info!("Sent {} bytes", sent);

        // ---- Receive ----
        self.checkpoint()?;
        let outcome = match self.config.response_mode {
            ResponseMode::StatusLine => {
                let response = receive_response(&mut socket.0, self.config.max_response_bytes)?;
                classify_status(&response)
            }
            ResponseMode::Legacy => {
                let response = receive_once(&mut socket.0)?;
                classify_legacy(&response)
            }
        };

        Ok(outcome)
    }
}

impl<R: Resolver, C: Connector> Uplink for Uploader<R, C> {
    fn upload(&self, sample: SensorSample) -> UploadOutcome {
        self.attempt(&sample).unwrap_or_else(UploadOutcome::Failed)
    }
}

/// Closes the connection on every path out of an attempt.
struct SocketGuard<C: Connection>(C);

impl<C: Connection> Drop for SocketGuard<C> {
    fn drop(&mut self) {
        self.0.close();
        log::debug!("Socket closed");
    }
}

/// Push the whole frame, accumulating partial writes.
fn send_all<W: Write>(conn: &mut W, frame: &[u8]) -> Result<usize, FailureReason> {
    let mut sent = 0;
    while sent < frame.len() {
        match conn.write(&frame[sent..]) {
            Ok(0) => {
                log::error!("ERROR: Send failed after {} of {} bytes", sent, frame.len());
                return Err(FailureReason::SendIncomplete);
            }
            Ok(n) => sent += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::error!(
                    "ERROR: Send failed after {} of {} bytes ({})",
                    sent,
                    frame.len(),
                    e
                );
                return Err(FailureReason::SendIncomplete);
            }
        }
    }

    if let Err(e) = conn.flush() {
        log::error!("ERROR: Send flush failed ({})", e);
        return Err(FailureReason::SendIncomplete);
    }

    Ok(sent)
}

/// Read the response head and, when it declares one, the body. Stops at EOF
/// or at `limit` bytes.
fn receive_response<R: Read>(conn: &mut R, limit: usize) -> Result<Vec<u8>, FailureReason> {
    let mut response = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    while response.len() < limit {
        let want = chunk.len().min(limit - response.len());
        match conn.read(&mut chunk[..want]) {
            Ok(0) => break,
            Ok(n) => {
                response.extend_from_slice(&chunk[..n]);
                if http::is_complete(&response) {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if response.is_empty() => {
                log::error!("ERROR: No response received ({})", e);
                return Err(FailureReason::NoResponse);
            }
            Err(e) => {
                log::warn!("Response cut short after {} bytes ({})", response.len(), e);
                break;
            }
        }
    }

    if response.is_empty() {
        log::error!("ERROR: No response received (connection closed)");
        return Err(FailureReason::NoResponse);
    }
    Ok(response)
}

/// A single bounded read, as the old firmware did.
fn receive_once<R: Read>(conn: &mut R) -> Result<Vec<u8>, FailureReason> {
    let mut buf = [0u8; LEGACY_RESPONSE_BUFFER - 1];
    match conn.read(&mut buf) {
        Ok(0) => {
            log::error!("ERROR: No response received (connection closed)");
            Err(FailureReason::NoResponse)
        }
        Ok(n) => Ok(buf[..n].to_vec()),
        Err(e) => {
            log::error!("ERROR: No response received ({})", e);
            Err(FailureReason::NoResponse)
        }
    }
}

fn classify_status(response: &[u8]) -> UploadOutcome {
    let text = String::from_utf8_lossy(response).into_owned();
    log::info!("Response: {}", text);

    match http::parse_status_code(response) {
        Some(status) if (200..300).contains(&status) => UploadOutcome::Delivered { status },
        status => UploadOutcome::DeliveredNon2xx {
            status,
            response: text,
        },
    }
}

fn classify_legacy(response: &[u8]) -> UploadOutcome {
    let text = String::from_utf8_lossy(response).into_owned();
    log::info!("Response: {}", text);

    if http::contains_success_marker(response) {
        UploadOutcome::Delivered { status: 200 }
    } else {
        UploadOutcome::DeliveredNon2xx {
            status: http::parse_status_code(response),
            response: text,
        }
    }
}
