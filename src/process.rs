//! One-shot shell execution with piped I/O and a bounded wait.
//!
//! [`run_command`] is the whole surface: spawn `/bin/sh -c <command>`, feed it
//! stdin, and get back captured output plus a normalized exit status. With a
//! timeout set, an unresponsive child is walked up an escalating termination
//! ladder (SIGTERM, a short grace period, SIGKILL) and is always reaped, so no
//! call leaves a zombie or an open pipe behind regardless of how the child
//! behaved.

use std::io::{Read, Write};
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::error::SpawnError;

/// How often the bounded wait checks for child exit.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long a child gets between SIGTERM and SIGKILL.
const TERM_GRACE: Duration = Duration::from_millis(100);

/// Upper bound on the single post-exit output read.
const CAPTURE_CAP: usize = 8192;

/// Captured result of one [`run_command`] invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Bytes drained from the child's stdout after it was reaped.
    ///
    /// This is a single bounded read of whatever the pipe held at that
    /// point, not a read-to-EOF: output the child produced but had not
    /// flushed into the pipe (or output beyond the capture bound) is not
    /// retained. Callers needing complete output should redirect it to a
    /// file inside the command instead.
    pub stdout: Vec<u8>,
    /// Normalized exit status: the child's exit code for a natural exit,
    /// `128 + signal` when the child died to a signal (including the
    /// termination ladder), 127 when the shell could not find or execute
    /// the command.
    pub status: i32,
}

impl ExecOutput {
    /// The captured stdout as text, with invalid UTF-8 replaced.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Run `command` through `/bin/sh -c` with stdin and stdout piped.
///
/// All of `stdin_data` is written to the child and the pipe is closed so
/// filter-style commands see end-of-input. With `timeout == None` the call
/// blocks until the child exits on its own; with `Some(limit)` the child is
/// polled against a monotonic deadline and terminated through the signal
/// ladder once the budget is spent. Either way the child is reaped before
/// this function returns.
///
/// A non-zero exit status is a successful call; only failures to create or
/// manage the process itself are [`SpawnError`]s.
pub fn run_command(
    command: &str,
    stdin_data: &[u8],
    timeout: Option<Duration>,
) -> Result<ExecOutput, SpawnError> {
    let mut child = Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|source| SpawnError::Spawn {
            command: command.to_string(),
            source,
        })?;
    tracing::debug!("spawned `{command}` as pid {}", child.id());

    feed_stdin(&mut child, stdin_data)?;

    let status = match timeout {
        None => child.wait().map_err(SpawnError::Wait)?,
        Some(limit) => wait_with_deadline(&mut child, limit)?,
    };

    let stdout = drain_output(&mut child);
    let status = normalize_status(status);
    tracing::debug!(
        "`{command}` finished with status {status}, captured {} bytes",
        stdout.len()
    );
    Ok(ExecOutput { stdout, status })
}

/// Write the whole stdin payload and close the pipe.
///
/// A child that exits without reading stdin raises a broken pipe here; that
/// is a normal outcome, not a failure.
fn feed_stdin(child: &mut Child, data: &[u8]) -> Result<(), SpawnError> {
    if let Some(mut stdin) = child.stdin.take() {
        match stdin.write_all(data) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                tracing::debug!("child closed stdin before consuming input");
            }
            Err(e) => return Err(SpawnError::Stdin(e)),
        }
    }
    Ok(())
}

/// Poll for exit until `limit` expires, then escalate: SIGTERM, a short
/// grace period, SIGKILL. The ladder runs at most once, and the child is
/// reaped whichever way it went.
fn wait_with_deadline(child: &mut Child, limit: Duration) -> Result<ExitStatus, SpawnError> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait().map_err(SpawnError::Wait)? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    let pid = Pid::from_raw(child.id() as i32);
    tracing::warn!("pid {pid} still running after {limit:?}, sending SIGTERM");
    let _ = signal::kill(pid, Signal::SIGTERM);
    thread::sleep(TERM_GRACE);
    if child.try_wait().map_err(SpawnError::Wait)?.is_none() {
        tracing::warn!("pid {pid} survived SIGTERM, sending SIGKILL");
        let _ = signal::kill(pid, Signal::SIGKILL);
    }
    child.wait().map_err(SpawnError::Wait)
}

/// Single best-effort drain of the stdout pipe after the child is gone.
///
/// The pipe is flipped to non-blocking first so a child that produced no
/// output cannot stall the call.
fn drain_output(child: &mut Child) -> Vec<u8> {
    let Some(mut stdout) = child.stdout.take() else {
        return Vec::new();
    };
    use std::os::fd::AsRawFd;
    // SAFETY: fcntl with F_SETFL is safe on the valid descriptor owned by
    // `stdout`; it only changes the file status flags.
    unsafe {
        libc::fcntl(stdout.as_raw_fd(), libc::F_SETFL, libc::O_NONBLOCK);
    }

    let mut buf = vec![0u8; CAPTURE_CAP];
    let n = match stdout.read(&mut buf) {
        Ok(n) => n,
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => 0,
        Err(e) => {
            tracing::debug!("post-exit output drain failed: {e}");
            0
        }
    };
    buf.truncate(n);
    buf
}

/// Collapse an [`ExitStatus`] to the conventional shell form.
fn normalize_status(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code & 0xff,
        None => 128 + status.signal().unwrap_or(0),
    }
}
