//! Distributed lock daemon over a shared directory.
//!
//! A dirlock daemon grants named, mutually exclusive locks backed by POSIX
//! advisory locks on files in a shared directory (an NFS mount, say). Each
//! lock is tied to the client session that acquired it and released
//! automatically when that session ends. Clients speak a four-command
//! request/response protocol — Peek, Acquire, Release, Verify — over plain
//! TCP or WebSocket.
//!
//! # Crate Organization
//!
//! This is a meta-crate that re-exports types from:
//! - `dirlock-proto`: wire protocol types and codecs
//! - `dirlock-server`: lock manager, sessions, transports, listener
//!
//! The `dirlockd` binary crate turns these into a runnable daemon. For
//! fine-grained control, depend on the individual crates instead.

// Re-export the protocol vocabulary and codecs
pub use dirlock_proto::*;

// Re-export the daemon building blocks
#[allow(ambiguous_glob_reexports)]
pub use dirlock_server::*;
