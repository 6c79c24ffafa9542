//! Hostname resolution and one-shot HTTP retrieval.
//!
//! Both helpers keep the lenient contracts of the original surface: the
//! resolver hands back its input unchanged when the lookup fails, and HTTP
//! retrieval yields an empty body for anything that is not a status-200
//! response. Neither reimplements its protocol; resolution goes through the
//! platform resolver and HTTP through a blocking `reqwest` client.

use std::net::{Ipv4Addr, ToSocketAddrs};
use std::time::Duration;

/// Resolve `host` to its first IPv4 address.
pub(crate) fn resolve_ipv4(host: &str) -> Option<Ipv4Addr> {
    let addrs = (host, 0u16).to_socket_addrs().ok()?;
    for addr in addrs {
        if let std::net::SocketAddr::V4(v4) = addr {
            return Some(*v4.ip());
        }
    }
    None
}

/// Resolve a hostname to a dotted-quad IPv4 address.
///
/// Returns the input unchanged when the lookup fails, so the result can be
/// fed straight into a connect call either way.
pub fn resolve_host(host: &str) -> String {
    match resolve_ipv4(host) {
        Some(ip) => ip.to_string(),
        None => {
            tracing::debug!("hostname lookup failed for {host:?}, passing through");
            host.to_string()
        }
    }
}

/// Fetch a URL and return its body, or an empty string.
///
/// Only `http://` and `https://` URLs are attempted. Redirects are followed
/// (up to 10) and certificate validation is disabled, mirroring the original
/// retrieval helper. Any transport failure or a final status other than 200
/// yields an empty string; a 200 with an empty body is indistinguishable
/// from failure by design.
pub fn url_get_contents(url: &str) -> String {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return String::new();
    }

    let client = match reqwest::blocking::Client::builder()
        .danger_accept_invalid_certs(true)
        .connect_timeout(Duration::from_secs(30))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("HTTP client construction failed: {e}");
            return String::new();
        }
    };

    match client.get(url).send() {
        Ok(resp) if resp.status() == reqwest::StatusCode::OK => {
            resp.text().unwrap_or_default()
        }
        Ok(resp) => {
            tracing::debug!("GET {url} returned status {}", resp.status());
            String::new()
        }
        Err(e) => {
            tracing::warn!("GET {url} failed: {e}");
            String::new()
        }
    }
}
