//! Synchronous TLS client sessions over an established [`TcpLink`].
//!
//! A [`TlsSession`] owns the socket and the rustls [`ClientConnection`] and
//! drives both from the calling thread: the handshake completes before the
//! constructor returns, and the `Read`/`Write` impls pump TLS records through
//! the blocking socket as needed. There is no async machinery and no retry
//! polling; when rustls wants more data the socket read simply blocks (its
//! timeout still bounds a dead peer).
//!
//! Certificate checking is controlled by a [`VerifyPolicy`] fixed at session
//! open: chain, hostname, and expiry validation can each be waived
//! independently. Waiving all three is the "insecure mode" used against
//! self-signed endpoints under test; it is never the default.

use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    CertificateError, ClientConfig, ClientConnection, DigitallySignedStruct, RootCertStore,
    SignatureScheme,
};
use rustls_pemfile::certs;

use crate::error::TlsError;
use crate::socket::TcpLink;

/// Which certificate checks a session performs, fixed at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyPolicy {
    /// Validate the certificate chain against the trust anchors.
    pub chain:    bool,
    /// Validate that the certificate matches the server name.
    pub hostname: bool,
    /// Validate the certificate's validity window.
    pub expiry:   bool,
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        Self {
            chain:    true,
            hostname: true,
            expiry:   true,
        }
    }
}

impl VerifyPolicy {
    /// All checks disabled. For controlled use against self-signed or
    /// mismatched endpoints, never a default.
    pub fn insecure() -> Self {
        Self {
            chain:    false,
            hostname: false,
            expiry:   false,
        }
    }

    /// Collapse the external API's single boolean: `true` keeps every
    /// check, `false` waives them all.
    pub fn from_flag(verify: bool) -> Self {
        if verify {
            Self::default()
        } else {
            Self::insecure()
        }
    }

    /// True when `err` belongs to a check this policy has waived.
    fn waives(&self, err: &CertificateError) -> bool {
        match err {
            CertificateError::NotValidForName
            | CertificateError::NotValidForNameContext { .. } => !self.hostname,
            CertificateError::Expired
            | CertificateError::ExpiredContext { .. }
            | CertificateError::NotValidYet
            | CertificateError::NotValidYetContext { .. } => !self.expiry,
            _ => false,
        }
    }
}

/// Webpki-backed verifier that filters its verdicts through a
/// [`VerifyPolicy`].
///
/// With `chain` disabled every presented certificate is accepted outright.
/// With `chain` enabled, failures belonging to a waived check (name
/// mismatch, validity window) are downgraded to success; everything else is
/// reported unchanged.
#[derive(Debug)]
struct PolicyVerifier {
    policy: VerifyPolicy,
    webpki: Arc<WebPkiServerVerifier>,
}

impl ServerCertVerifier for PolicyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if !self.policy.chain {
            return Ok(ServerCertVerified::assertion());
        }
        match self.webpki.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ) {
            Ok(verified) => Ok(verified),
            Err(rustls::Error::InvalidCertificate(cert_err))
                if self.policy.waives(&cert_err) =>
            {
                tracing::debug!("verify policy waived certificate error: {cert_err:?}");
                Ok(ServerCertVerified::assertion())
            }
            Err(e) => Err(e),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        if !self.policy.chain {
            return Ok(HandshakeSignatureValid::assertion());
        }
        self.webpki.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        if !self.policy.chain {
            return Ok(HandshakeSignatureValid::assertion());
        }
        self.webpki.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.webpki.supported_verify_schemes()
    }
}

/// Build a client configuration for `policy`.
///
/// Trust anchors are the bundled webpki roots plus, when given, the PEM
/// certificates in `extra_ca`.
pub fn client_config(
    policy: VerifyPolicy,
    extra_ca: Option<&Path>,
) -> Result<Arc<ClientConfig>, TlsError> {
    // Install default crypto provider for rustls if not already installed
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    if let Some(path) = extra_ca {
        let ca_pem = std::fs::read(path)
            .map_err(|e| TlsError::Config(format!("failed to read CA file {path:?}: {e}")))?;
        let ca_certs = certs(&mut BufReader::new(&*ca_pem))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TlsError::Config(format!("failed to parse CA file {path:?}: {e}")))?;
        let (added, _) = root_store.add_parsable_certificates(ca_certs);
        tracing::debug!("added {added} CA certificates from {path:?}");
    }

    let webpki = WebPkiServerVerifier::builder(Arc::new(root_store))
        .build()
        .map_err(|e| TlsError::Config(e.to_string()))?;

    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(PolicyVerifier { policy, webpki }))
        .with_no_client_auth();
    Ok(Arc::new(config))
}

/// An established TLS session: the underlying socket plus the rustls
/// connection state, handshake already complete.
pub struct TlsSession {
    link: TcpLink,
    tls:  ClientConnection,
}

impl TlsSession {
    /// Wrap an already-connected link and complete the handshake.
    ///
    /// On any failure the partially built session is dropped, which closes
    /// the socket; no half-negotiated session escapes.
    pub fn establish(
        link: TcpLink,
        host: &str,
        config: Arc<ClientConfig>,
    ) -> Result<Self, TlsError> {
        let server_name =
            ServerName::try_from(host.to_string()).map_err(|_| TlsError::ServerName {
                host: host.to_string(),
            })?;
        let tls = ClientConnection::new(config, server_name)
            .map_err(|e| TlsError::Config(e.to_string()))?;

        let mut session = Self { link, tls };
        session
            .complete_handshake()
            .map_err(TlsError::Handshake)?;
        tracing::debug!("TLS handshake complete with {}", session.link.peer_addr());
        Ok(session)
    }

    /// Drive the handshake to completion over the blocking socket.
    fn complete_handshake(&mut self) -> io::Result<()> {
        while self.tls.is_handshaking() {
            if self.tls.wants_write() {
                self.tls.write_tls(&mut self.link)?;
                continue;
            }
            if self.tls.wants_read() {
                let n = self.tls.read_tls(&mut self.link)?;
                if n == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "peer closed during TLS handshake",
                    ));
                }
                if let Err(e) = self.tls.process_new_packets() {
                    // let a queued alert out before reporting the failure
                    while self.tls.wants_write() {
                        if self.tls.write_tls(&mut self.link).is_err() {
                            break;
                        }
                    }
                    return Err(io::Error::new(io::ErrorKind::InvalidData, e));
                }
            }
        }
        Ok(())
    }

    /// Protocol-level close: queue the close_notify alert, flush it, then
    /// shut the socket down. Errors are ignored; the peer may be gone.
    pub fn close(&mut self) {
        self.tls.send_close_notify();
        while self.tls.wants_write() {
            if self.tls.write_tls(&mut self.link).is_err() {
                break;
            }
        }
        self.link.shutdown();
    }
}

impl Read for TlsSession {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            // buffered plaintext first; WouldBlock means rustls needs more
            // records, not that the caller should retry
            match self.tls.reader().read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(e),
            }
            let n = self.tls.read_tls(&mut self.link)?;
            if n == 0 {
                return Ok(0);
            }
            self.tls
                .process_new_packets()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        }
    }
}

impl Write for TlsSession {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.tls.writer().write(buf)?;
        while self.tls.wants_write() {
            self.tls.write_tls(&mut self.link)?;
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.tls.writer().flush()?;
        while self.tls.wants_write() {
            self.tls.write_tls(&mut self.link)?;
        }
        self.link.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_collapses_to_all_or_nothing() {
        assert_eq!(VerifyPolicy::from_flag(true), VerifyPolicy::default());
        assert_eq!(VerifyPolicy::from_flag(false), VerifyPolicy::insecure());
    }

    #[test]
    fn waivers_are_independent() {
        let no_name = VerifyPolicy {
            hostname: false,
            ..VerifyPolicy::default()
        };
        assert!(no_name.waives(&CertificateError::NotValidForName));
        assert!(!no_name.waives(&CertificateError::Expired));

        let no_expiry = VerifyPolicy {
            expiry: false,
            ..VerifyPolicy::default()
        };
        assert!(no_expiry.waives(&CertificateError::Expired));
        assert!(no_expiry.waives(&CertificateError::NotValidYet));
        assert!(!no_expiry.waives(&CertificateError::NotValidForName));

        // an untrusted chain is never waivable on its own
        assert!(!VerifyPolicy::default().waives(&CertificateError::UnknownIssuer));
    }

    #[test]
    fn config_builds_for_every_policy() {
        for policy in [
            VerifyPolicy::default(),
            VerifyPolicy::insecure(),
            VerifyPolicy {
                expiry: false,
                ..VerifyPolicy::default()
            },
        ] {
            assert!(client_config(policy, None).is_ok());
        }
    }

    #[test]
    fn missing_ca_file_is_a_config_error() {
        let err = client_config(VerifyPolicy::default(), Some(Path::new("/no/such/ca.pem")))
            .unwrap_err();
        assert!(matches!(err, TlsError::Config(_)));
    }
}
