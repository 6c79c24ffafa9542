//! Lenient filesystem helpers.
//!
//! These follow the original surface's contracts rather than idiomatic
//! `Result` returns: reads yield an empty string on failure, writes report
//! zero bytes written on failure and the payload length on success. Callers
//! that need real error detail should use `std::fs` directly.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use nix::unistd::{access, AccessFlags};

/// Read a whole file as a string. Returns an empty string when the file
/// cannot be read; invalid UTF-8 is replaced, not rejected.
pub fn file_get_contents<P: AsRef<Path>>(path: P) -> String {
    match std::fs::read(path.as_ref()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::debug!("file_get_contents({:?}) failed: {e}", path.as_ref());
            String::new()
        }
    }
}

/// Write `data` to `path`, truncating unless `append` is set.
///
/// Returns the number of bytes written: `data.len()` on success, 0 on any
/// failure.
pub fn file_put_contents<P: AsRef<Path>>(path: P, data: &[u8], append: bool) -> usize {
    let result = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(!append)
        .append(append)
        .open(path.as_ref())
        .and_then(|mut f| f.write_all(data));
    match result {
        Ok(()) => data.len(),
        Err(e) => {
            tracing::warn!("file_put_contents({:?}) failed: {e}", path.as_ref());
            0
        }
    }
}

/// True if `path` exists.
pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
    access(path.as_ref(), AccessFlags::F_OK).is_ok()
}

/// True if the current user may read `path`.
pub fn is_readable<P: AsRef<Path>>(path: P) -> bool {
    access(path.as_ref(), AccessFlags::R_OK).is_ok()
}

/// True if the current user may write `path`.
pub fn is_writable<P: AsRef<Path>>(path: P) -> bool {
    access(path.as_ref(), AccessFlags::W_OK).is_ok()
}

/// Remove a file. Returns true when the file is absent afterwards, whether
/// or not it existed to begin with.
pub fn unlink<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    if file_exists(path) {
        let _ = std::fs::remove_file(path);
    }
    !file_exists(path)
}
