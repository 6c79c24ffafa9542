use std::io;

use thiserror::Error;

use crate::transport::TransportHandle;

/// A child process could not be created or managed.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The shell itself could not be spawned (pipe or fork failure).
    #[error("failed to spawn `/bin/sh -c {command}`: {source}")]
    Spawn {
        /// The command line that was being started
        command: String,
        /// The underlying OS error
        source:  io::Error,
    },

    /// Feeding the child's stdin failed with something other than a closed
    /// pipe. A child that exits without reading stdin is not an error.
    #[error("failed to write to child stdin: {0}")]
    Stdin(#[source] io::Error),

    /// Waiting on the child failed, so its exit status is unknown.
    #[error("failed to wait for child process: {0}")]
    Wait(#[source] io::Error),
}

/// A TCP connection could not be established.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The hostname did not resolve to any IPv4 address.
    #[error("hostname lookup failed for {host:?}")]
    Resolve {
        /// The hostname that failed to resolve
        host: String,
    },

    /// The TCP connect itself failed.
    #[error("connection to {addr} failed: {source}")]
    Connect {
        /// The resolved address that refused or timed out
        addr:   std::net::SocketAddr,
        /// The underlying OS error
        source: io::Error,
    },

    /// The socket connected but could not be configured (timeouts).
    #[error("socket configuration failed: {0}")]
    Configure(#[source] io::Error),
}

/// A TLS session could not be opened.
#[derive(Debug, Error)]
pub enum TlsError {
    /// The plain connection underneath the session failed.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Building the client configuration or verifier failed.
    #[error("TLS configuration failed: {0}")]
    Config(String),

    /// The hostname is not a valid TLS server name.
    #[error("invalid TLS server name {host:?}")]
    ServerName {
        /// The rejected hostname
        host: String,
    },

    /// The handshake did not complete; the certificate verdicts of the
    /// configured verify policy surface here.
    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] io::Error),
}

/// A line read or write on an open transport failed.
#[derive(Debug, Error)]
pub enum IoError {
    /// The handle does not name an open transport. Closed handles are
    /// removed from the registry and handle values are never reused.
    #[error("unknown transport handle {0}")]
    UnknownHandle(TransportHandle),

    /// The peer closed the connection before a line terminator arrived.
    #[error("connection closed by peer")]
    Closed,

    /// Reading from the transport failed.
    #[error("transport read failed: {0}")]
    Read(#[source] io::Error),

    /// Writing to the transport failed; the line may be partially sent.
    #[error("transport write failed: {0}")]
    Write(#[source] io::Error),

    /// The line exceeded the configured maximum length. The bytes read so
    /// far are preserved so the caller can decide what to do with them.
    #[error("line exceeded {limit} bytes before a terminator")]
    LineTooLong {
        /// Content accumulated before the limit was hit, already trimmed
        partial: String,
        /// The configured maximum line length
        limit:   usize,
    },
}
