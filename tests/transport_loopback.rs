//! Loopback tests for the line transport over plain and TLS connections.
//!
//! Each TLS test runs a minimal synchronous rustls echo server on an
//! ephemeral port, using the self-signed certificates committed under
//! `tests/certs/`.

use std::io::{BufReader, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use netline::error::{IoError, TlsError};
use netline::{TransportConfig, TransportRegistry, VerifyPolicy};
use rustls::{ServerConfig, ServerConnection};
use rustls_pemfile::{certs, private_key};

fn cert_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/certs")
        .join(name)
}

/// Echo server over a raw TCP socket: copies bytes back until EOF.
fn plain_echo_server() -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 1024];
        loop {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if stream.write_all(&buf[..n]).is_err() {
                        break;
                    }
                }
            }
        }
    });
    (port, handle)
}

/// Echo server behind a rustls session using the named certificate pair.
/// Tolerates handshake failures so rejection tests can join it.
fn tls_echo_server(cert: &str, key: &str) -> (u16, JoinHandle<()>) {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cert_pem = std::fs::read(cert_path(cert)).unwrap();
    let key_pem = std::fs::read(cert_path(key)).unwrap();
    let cert_chain = certs(&mut BufReader::new(&*cert_pem))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let key = private_key(&mut BufReader::new(&*key_pem)).unwrap().unwrap();

    let config = Arc::new(
        ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(cert_chain, key)
            .unwrap(),
    );

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut conn = ServerConnection::new(config).unwrap();
        let mut tls = rustls::Stream::new(&mut conn, &mut stream);
        let mut buf = [0u8; 1024];
        loop {
            match tls.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tls.write_all(&buf[..n]).is_err() {
                        break;
                    }
                }
            }
        }
    });
    (port, handle)
}

#[test]
fn plain_round_trip_preserves_line_content() {
    let (port, server) = plain_echo_server();
    let mut registry = TransportRegistry::new();

    let handle = registry.open_plain("127.0.0.1", port).unwrap();
    registry.write_line(handle, "hello world").unwrap();
    assert_eq!(registry.read_line(handle).unwrap(), "hello world");

    // the echoed CRLF leaves a leading LF in the stream; the empty-line
    // guard must carry it into the next read instead of ending early
    registry.write_line(handle, "second line").unwrap();
    assert_eq!(registry.read_line(handle).unwrap(), "second line");

    registry.close(handle).unwrap();
    server.join().unwrap();
}

#[test]
fn closed_handles_stay_dead() {
    let (port, server) = plain_echo_server();
    let mut registry = TransportRegistry::new();

    let handle = registry.open_plain("127.0.0.1", port).unwrap();
    assert!(registry.is_open(handle));
    registry.close(handle).unwrap();
    assert!(!registry.is_open(handle));

    assert!(matches!(
        registry.write_line(handle, "late"),
        Err(IoError::UnknownHandle(_))
    ));
    assert!(matches!(
        registry.read_line(handle),
        Err(IoError::UnknownHandle(_))
    ));
    assert!(matches!(
        registry.close(handle),
        Err(IoError::UnknownHandle(_))
    ));
    server.join().unwrap();
}

#[test]
fn overlong_line_reports_truncation_with_partial() {
    let (port, server) = plain_echo_server();
    let mut registry = TransportRegistry::with_config(TransportConfig {
        max_line_len: 16,
        ..TransportConfig::default()
    });

    let handle = registry.open_plain("127.0.0.1", port).unwrap();
    registry.write_line(handle, &"a".repeat(100)).unwrap();
    match registry.read_line(handle) {
        Err(IoError::LineTooLong { partial, limit }) => {
            assert_eq!(limit, 16);
            assert_eq!(partial, "a".repeat(16));
        }
        other => panic!("expected LineTooLong, got {other:?}"),
    }
    registry.close(handle).unwrap();
    server.join().unwrap();
}

#[test]
fn tls_round_trip_with_checks_waived() {
    let (port, server) = tls_echo_server("localhost.pem", "localhost.key.pem");
    let mut registry = TransportRegistry::new();

    let handle = registry.open_tls("localhost", port, false).unwrap();
    registry.write_line(handle, "over the wire").unwrap();
    assert_eq!(registry.read_line(handle).unwrap(), "over the wire");
    registry.write_line(handle, "and again").unwrap();
    assert_eq!(registry.read_line(handle).unwrap(), "and again");

    registry.close(handle).unwrap();
    server.join().unwrap();
}

#[test]
fn self_signed_certificate_fails_full_verification() {
    let (port, server) = tls_echo_server("localhost.pem", "localhost.key.pem");
    let mut registry = TransportRegistry::new();

    let err = registry.open_tls("localhost", port, true).unwrap_err();
    assert!(matches!(err, TlsError::Handshake(_)), "got {err:?}");
    assert_eq!(registry.open_count(), 0);
    server.join().unwrap();
}

#[test]
fn extra_trust_anchor_satisfies_full_verification() {
    let (port, server) = tls_echo_server("localhost.pem", "localhost.key.pem");
    let mut registry = TransportRegistry::with_config(TransportConfig {
        extra_ca: Some(cert_path("localhost.pem")),
        ..TransportConfig::default()
    });

    let handle = registry.open_tls("localhost", port, true).unwrap();
    registry.write_line(handle, "trusted").unwrap();
    assert_eq!(registry.read_line(handle).unwrap(), "trusted");

    registry.close(handle).unwrap();
    server.join().unwrap();
}

#[test]
fn hostname_check_can_be_waived_independently() {
    // trusted chain, wrong name: default policy must reject it
    let (port, server) = tls_echo_server("mismatch.pem", "mismatch.key.pem");
    let mut registry = TransportRegistry::with_config(TransportConfig {
        extra_ca: Some(cert_path("mismatch.pem")),
        ..TransportConfig::default()
    });
    let err = registry.open_tls("localhost", port, true).unwrap_err();
    assert!(matches!(err, TlsError::Handshake(_)), "got {err:?}");
    server.join().unwrap();

    // waiving only the hostname check lets the same certificate through
    let (port, server) = tls_echo_server("mismatch.pem", "mismatch.key.pem");
    let policy = VerifyPolicy {
        hostname: false,
        ..VerifyPolicy::default()
    };
    let handle = registry
        .open_tls_with_policy("localhost", port, policy)
        .unwrap();
    registry.write_line(handle, "name waived").unwrap();
    assert_eq!(registry.read_line(handle).unwrap(), "name waived");
    registry.close(handle).unwrap();
    server.join().unwrap();
}

#[test]
fn handles_are_never_reused() {
    let (port_a, server_a) = plain_echo_server();
    let (port_b, server_b) = plain_echo_server();
    let mut registry = TransportRegistry::new();

    let first = registry.open_plain("127.0.0.1", port_a).unwrap();
    registry.close(first).unwrap();
    let second = registry.open_plain("127.0.0.1", port_b).unwrap();
    assert_ne!(first, second);
    assert!(matches!(
        registry.read_line(first),
        Err(IoError::UnknownHandle(_))
    ));

    registry.close(second).unwrap();
    server_a.join().unwrap();
    server_b.join().unwrap();
}
