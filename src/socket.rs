//! TCP connection setup: resolve, connect, configure timeouts.

use std::io::{self, Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use crate::error::ConnectError;
use crate::net::resolve_ipv4;

/// Default send/receive timeout for a freshly opened connection.
///
/// Generous on purpose: the point is that a stalled peer eventually surfaces
/// as an I/O error instead of hanging the caller forever.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(600);

/// An established TCP connection with send/receive timeouts applied.
///
/// This is the byte-stream capability the line transport runs over directly;
/// a TLS session wraps one of these with an encryption layer. Dropping the
/// link closes the descriptor.
#[derive(Debug)]
pub struct TcpLink {
    stream: TcpStream,
    peer:   SocketAddr,
}

impl TcpLink {
    /// Resolve `host` to an IPv4 address, connect, and arm both timeouts.
    ///
    /// Each step failure is reported as a distinct [`ConnectError`]; a
    /// partially set up connection is closed on the way out and never
    /// escapes this function.
    pub fn connect(host: &str, port: u16, io_timeout: Duration) -> Result<Self, ConnectError> {
        let ip = resolve_ipv4(host).ok_or_else(|| ConnectError::Resolve {
            host: host.to_string(),
        })?;
        let addr = SocketAddr::new(IpAddr::V4(ip), port);

        let stream = TcpStream::connect(addr)
            .map_err(|source| ConnectError::Connect { addr, source })?;
        stream
            .set_read_timeout(Some(io_timeout))
            .map_err(ConnectError::Configure)?;
        stream
            .set_write_timeout(Some(io_timeout))
            .map_err(ConnectError::Configure)?;

        tracing::debug!("connected to {addr} ({host})");
        Ok(Self { stream, peer: addr })
    }

    /// The resolved peer address this link is connected to.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Shut down both directions. Errors are ignored; the descriptor is
    /// released when the link is dropped either way.
    pub fn shutdown(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

impl Read for TcpLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TcpLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn connect_applies_timeouts() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let link = TcpLink::connect("127.0.0.1", port, DEFAULT_IO_TIMEOUT).unwrap();
        assert_eq!(link.peer_addr().port(), port);
        assert_eq!(
            link.stream.read_timeout().unwrap(),
            Some(DEFAULT_IO_TIMEOUT)
        );
        assert_eq!(
            link.stream.write_timeout().unwrap(),
            Some(DEFAULT_IO_TIMEOUT)
        );
    }

    #[test]
    fn unresolvable_host_is_a_resolve_error() {
        let err = TcpLink::connect("netline-nope.invalid", 80, DEFAULT_IO_TIMEOUT).unwrap_err();
        assert!(matches!(err, ConnectError::Resolve { .. }));
    }

    #[test]
    fn refused_port_is_a_connect_error() {
        // bind then drop to find a port that is very likely closed
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let err = TcpLink::connect("127.0.0.1", port, DEFAULT_IO_TIMEOUT).unwrap_err();
        assert!(matches!(err, ConnectError::Connect { .. }));
    }
}
