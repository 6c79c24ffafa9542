//! netline — bounded external I/O utilities
//!
//! This crate puts a deterministic, bounded runtime layer over two kinds of OS
//! resources whose natural behavior is unbounded:
//!
//! - Child processes: [`process::run_command`] spawns a shell command with
//!   piped stdin/stdout and enforces an optional timeout through an escalating
//!   termination ladder (SIGTERM, short grace period, SIGKILL). The child is
//!   always reaped before the call returns.
//! - Byte-stream connections: [`transport::TransportRegistry`] hands out opaque
//!   handles for TCP connections, plaintext or TLS-wrapped, and exposes one
//!   line-oriented read/write contract over both.
//!
//! Everything is synchronous and blocking; there are no worker threads and no
//! async runtime. A registry requires `&mut self` for every operation, so
//! concurrent use of a handle is ruled out at compile time rather than guarded
//! by locks.
//!
//! The remaining modules are thin glue kept for callers of the original
//! library surface: [`strings`] (PHP-flavored string helpers), [`encoding`]
//! (base64), [`fs`] (lenient file helpers), and [`net`] (hostname resolution
//! and one-shot HTTP retrieval).

/// Error taxonomy shared by the process and transport layers
pub mod error;

/// One-shot shell execution with bounded timeouts
pub mod process;

/// TCP connection setup with resolver and socket timeouts
pub mod socket;

/// Synchronous TLS client sessions over an established socket
pub mod tls;

/// Handle registry and the line-oriented read/write contract
pub mod transport;

/// Hostname resolution and HTTP retrieval glue
pub mod net;

/// String helpers mirroring the classic PHP surface
pub mod strings;

/// base64 encode/decode glue
pub mod encoding;

/// Lenient filesystem helpers
pub mod fs;

// Re-export commonly used types for convenience
pub use error::{ConnectError, IoError, SpawnError, TlsError};
pub use process::{run_command, ExecOutput};
pub use tls::VerifyPolicy;
pub use transport::{TransportConfig, TransportHandle, TransportRegistry};
