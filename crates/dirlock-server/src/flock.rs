//! Non-blocking POSIX advisory locks on whole files.
//!
//! Thin wrapper over `fcntl(F_SETLK)` record locks. The locks are
//! process-scoped: re-locking a file this process already holds always
//! succeeds, and every lock vanishes when the process exits. Cooperating
//! processes must use the same primitive; the lock does not stop I/O by
//! processes that ignore it.

use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg};
use nix::libc;

/// Outcome of a non-blocking exclusive lock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAttempt {
    /// The lock is now held by this process.
    Acquired,
    /// Another process holds the lock.
    Contended,
}

// A zero l_len extends the locked region to EOF, covering the whole file.
fn whole_file(kind: libc::c_short) -> libc::flock {
    let mut region: libc::flock = unsafe { std::mem::zeroed() };
    region.l_type = kind;
    region.l_whence = libc::SEEK_SET as libc::c_short;
    region
}

/// Attempts a non-blocking exclusive lock on the whole file.
///
/// POSIX permits either `EAGAIN` or `EACCES` when another process holds
/// the lock; both are [`LockAttempt::Contended`]. Any other errno is a
/// system error.
pub fn try_exclusive_lock(file: &File) -> io::Result<LockAttempt> {
    let region = whole_file(libc::F_WRLCK as libc::c_short);
    match fcntl(file.as_raw_fd(), FcntlArg::F_SETLK(&region)) {
        Ok(_) => Ok(LockAttempt::Acquired),
        Err(Errno::EAGAIN) | Err(Errno::EACCES) => Ok(LockAttempt::Contended),
        Err(errno) => Err(io::Error::from(errno)),
    }
}

/// Releases this process's advisory lock on the file.
pub fn unlock(file: &File) -> io::Result<()> {
    let region = whole_file(libc::F_UNLCK as libc::c_short);
    fcntl(file.as_raw_fd(), FcntlArg::F_SETLK(&region))
        .map(|_| ())
        .map_err(io::Error::from)
}

/// Reports whether no process currently holds a lock on the file.
///
/// Asks the kernel whether an exclusive whole-file lock would be granted
/// (`F_GETLK`), which works on read-only descriptors and leaves the
/// advisory-lock state exactly as found. Only meaningful on files this
/// process holds no lock on: the caller's own locks never conflict.
pub fn probe_unlocked(file: &File) -> io::Result<bool> {
    let mut region = whole_file(libc::F_WRLCK as libc::c_short);
    fcntl(file.as_raw_fd(), FcntlArg::F_GETLK(&mut region)).map_err(io::Error::from)?;
    Ok(region.l_type == libc::F_UNLCK as libc::c_short)
}
