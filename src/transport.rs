//! Opaque transport handles and the line-oriented read/write contract.
//!
//! A [`TransportRegistry`] owns every connection it opens and hands out
//! [`TransportHandle`]s that name them. Whether a handle is plaintext or TLS
//! is decided at open time and invisible afterwards: `read_line` and
//! `write_line` behave identically over both. Registries are plain owned
//! values; anything process-wide is up to the caller, and the `&mut self`
//! receivers make concurrent use of one registry a compile error rather than
//! a data race.

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConnectError, IoError, TlsError};
use crate::socket::{TcpLink, DEFAULT_IO_TIMEOUT};
use crate::strings::trim_ws;
use crate::tls::{client_config, TlsSession, VerifyPolicy};

/// Opaque identifier for one open transport.
///
/// Values are allocated from a per-registry counter and never reused, so a
/// handle kept past its `close` can only ever fail, never alias a newer
/// connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportHandle(u64);

impl fmt::Display for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Knobs shared by every transport a registry opens.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Send/receive timeout armed on each socket at connect time.
    pub io_timeout:   Duration,
    /// Longest line `read_line` will accumulate before reporting
    /// [`IoError::LineTooLong`].
    pub max_line_len: usize,
    /// Extra PEM trust anchors for TLS sessions, on top of the webpki
    /// bundle.
    pub extra_ca:     Option<PathBuf>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            io_timeout:   DEFAULT_IO_TIMEOUT,
            max_line_len: 8192,
            extra_ca:     None,
        }
    }
}

/// One open connection, plaintext or TLS. The variant is fixed at open time
/// and both expose the same blocking byte-stream capability.
enum TransportRecord {
    Plain(TcpLink),
    Tls(Box<TlsSession>),
}

impl TransportRecord {
    fn stream(&mut self) -> &mut dyn Stream {
        match self {
            TransportRecord::Plain(link) => link,
            TransportRecord::Tls(session) => session.as_mut(),
        }
    }
}

/// The byte-stream capability a line transport runs over.
trait Stream: Read + Write {}
impl Stream for TcpLink {}
impl Stream for TlsSession {}

/// Owns open transports and maps handles to them.
///
/// Every operation takes `&mut self`; per-handle ordering is therefore the
/// caller's, as the contract requires. Dropping a registry drops every
/// record it still holds, closing the descriptors.
pub struct TransportRegistry {
    config:  TransportConfig,
    next_id: u64,
    records: HashMap<TransportHandle, TransportRecord>,
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportRegistry {
    /// A registry with default configuration.
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    /// A registry with explicit configuration.
    pub fn with_config(config: TransportConfig) -> Self {
        Self {
            config,
            next_id: 0,
            records: HashMap::new(),
        }
    }

    /// Open a plaintext TCP connection and register it.
    pub fn open_plain(&mut self, host: &str, port: u16) -> Result<TransportHandle, ConnectError> {
        let link = TcpLink::connect(host, port, self.config.io_timeout)?;
        let handle = self.register(TransportRecord::Plain(link));
        tracing::debug!("opened plain transport {handle} to {host}:{port}");
        Ok(handle)
    }

    /// Open a TLS connection; `verify == false` waives every certificate
    /// check (see [`VerifyPolicy::from_flag`]).
    pub fn open_tls(
        &mut self,
        host: &str,
        port: u16,
        verify: bool,
    ) -> Result<TransportHandle, TlsError> {
        self.open_tls_with_policy(host, port, VerifyPolicy::from_flag(verify))
    }

    /// Open a TLS connection with an explicit verify policy.
    ///
    /// The plain connection underneath is never registered on its own; if
    /// configuration or the handshake fails it is released and no handle
    /// exists.
    pub fn open_tls_with_policy(
        &mut self,
        host: &str,
        port: u16,
        policy: VerifyPolicy,
    ) -> Result<TransportHandle, TlsError> {
        let link = TcpLink::connect(host, port, self.config.io_timeout)?;
        let config = client_config(policy, self.config.extra_ca.as_deref())?;
        let session = TlsSession::establish(link, host, config)?;
        let handle = self.register(TransportRecord::Tls(Box::new(session)));
        tracing::debug!("opened TLS transport {handle} to {host}:{port} ({policy:?})");
        Ok(handle)
    }

    /// Read one line from the transport.
    ///
    /// Accumulates byte by byte until the first CR or LF — unless that
    /// terminator is the very first byte, which is carried into the line so
    /// that `"\n"`-prefixed input does not produce a spurious empty result.
    /// The returned string is trimmed of surrounding whitespace, which makes
    /// `"\n"`- and `"\r\n"`-terminated protocols read identically. A line
    /// longer than the configured maximum is reported as
    /// [`IoError::LineTooLong`] carrying what was accumulated.
    pub fn read_line(&mut self, handle: TransportHandle) -> Result<String, IoError> {
        let max = self.config.max_line_len;
        let stream = self.record(handle)?.stream();

        let mut buf: Vec<u8> = Vec::with_capacity(128);
        let mut byte = [0u8; 1];
        loop {
            let n = stream.read(&mut byte).map_err(IoError::Read)?;
            if n == 0 {
                return Err(IoError::Closed);
            }
            if (byte[0] == b'\r' || byte[0] == b'\n') && !buf.is_empty() {
                break;
            }
            buf.push(byte[0]);
            if buf.len() >= max {
                let partial = trim_ws(&String::from_utf8_lossy(&buf));
                tracing::warn!("line on {handle} exceeded {max} bytes, reporting truncation");
                return Err(IoError::LineTooLong {
                    partial,
                    limit: max,
                });
            }
        }
        Ok(trim_ws(&String::from_utf8_lossy(&buf)))
    }

    /// Write `line` followed by CRLF. Both parts must transmit fully; a
    /// short write surfaces as [`IoError::Write`].
    pub fn write_line(&mut self, handle: TransportHandle, line: &str) -> Result<(), IoError> {
        let stream = self.record(handle)?.stream();
        stream.write_all(line.as_bytes()).map_err(IoError::Write)?;
        stream.write_all(b"\r\n").map_err(IoError::Write)?;
        stream.flush().map_err(IoError::Write)?;
        Ok(())
    }

    /// Close a transport and forget its handle.
    ///
    /// TLS sessions get a protocol-level close (close_notify, flush) before
    /// the descriptor goes; the mapping is gone before anything is torn
    /// down, so a half-closed session is never reachable.
    pub fn close(&mut self, handle: TransportHandle) -> Result<(), IoError> {
        let mut record = self
            .records
            .remove(&handle)
            .ok_or(IoError::UnknownHandle(handle))?;
        match &mut record {
            TransportRecord::Plain(link) => link.shutdown(),
            TransportRecord::Tls(session) => session.close(),
        }
        tracing::debug!("closed transport {handle}");
        Ok(())
    }

    /// Whether `handle` currently names an open transport.
    pub fn is_open(&self, handle: TransportHandle) -> bool {
        self.records.contains_key(&handle)
    }

    /// Number of open transports.
    pub fn open_count(&self) -> usize {
        self.records.len()
    }

    fn register(&mut self, record: TransportRecord) -> TransportHandle {
        self.next_id += 1;
        let handle = TransportHandle(self.next_id);
        self.records.insert(handle, record);
        handle
    }

    fn record(&mut self, handle: TransportHandle) -> Result<&mut TransportRecord, IoError> {
        self.records
            .get_mut(&handle)
            .ok_or(IoError::UnknownHandle(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_on_unknown_handles_fail() {
        let mut registry = TransportRegistry::new();
        let bogus = TransportHandle(42);
        assert!(matches!(
            registry.read_line(bogus),
            Err(IoError::UnknownHandle(_))
        ));
        assert!(matches!(
            registry.write_line(bogus, "hi"),
            Err(IoError::UnknownHandle(_))
        ));
        assert!(matches!(
            registry.close(bogus),
            Err(IoError::UnknownHandle(_))
        ));
        assert!(!registry.is_open(bogus));
        assert_eq!(registry.open_count(), 0);
    }

    #[test]
    fn handles_render_opaquely() {
        assert_eq!(TransportHandle(7).to_string(), "#7");
    }
}
