use crate::shell::status;
use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::libc;
use nix::unistd::{ForkResult, Pid, fork};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Forks; the child runs `body` and exits with its status, the parent gets the pid.
///
/// Rust's stdout buffer is not flushed here. Anything printed before a fork
/// must already be flushed, or the child inherits a copy of it.
pub fn spawn<F: FnOnce() -> i32>(body: F) -> Result<Pid> {
    // SAFETY: the child only evaluates shell commands and leaves through
    // `exit_child`; a panic is caught so it never unwinds into the caller's frames.
    match unsafe { fork() }.context("fork failed")? {
        ForkResult::Parent { child } => {
            log::debug!("forked child {}", child);
            Ok(child)
        }
        ForkResult::Child => {
            let code = catch_unwind(AssertUnwindSafe(body)).unwrap_or(status::FAILURE);
            exit_child(code)
        }
    }
}

/// Blocks until `pid` terminates and returns its exit status.
///
/// A child killed by a signal yields 128 + the signal number.
pub fn wait_for(pid: Pid) -> Result<i32> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                log::debug!("child {} exited with {}", pid, code);
                return Ok(code);
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                log::debug!("child {} killed by {}", pid, signal);
                return Ok(status::SIGNAL_BASE + signal as i32);
            }
            Ok(other) => log::trace!("child {} not terminated yet: {:?}", pid, other),
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e).with_context(|| format!("waitpid({}) failed", pid)),
        }
    }
}

/// Ends a forked child without running the parent's exit handlers.
pub fn exit_child(status: i32) -> ! {
    // SAFETY: _exit only ends the process; no Rust state is observed after it.
    unsafe { libc::_exit(status) }
}
