//! The lock manager: dispatches the four commands and couples registry
//! bookkeeping to filesystem advisory locks.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use dirlock_proto::{
    LockCommand, LockCommandResult, LockRequest, LockResponse, VERSION_MAJOR, VERSION_MINOR,
};
use tracing::{debug, warn};

use crate::flock::{self, LockAttempt};
use crate::name;
use crate::registry::{LockEntry, LockRegistry};
use crate::session::SessionId;

/// Reason strings carried in responses. Exact wording is part of the
/// protocol contract.
pub mod reason {
    /// Reentrant acquire by the owning session.
    pub const NO_OP: &str = "no-op";
    pub const LOCK_NOT_FOUND: &str = "lock not found";
    pub const HELD_BY_OTHER_SESSION: &str = "resource acquired through a different session";
    pub const HELD_BY_OTHER_PROCESS: &str = "resource acquired by different process";
    pub const INVALID_LOCK_NAME: &str = "invalid lock name";
    pub const UNKNOWN_COMMAND: &str = "unknown command";
}

/// Outcome of one command, before it is folded into a response.
struct Reply {
    result: LockCommandResult,
    reason: String,
    is_locked: bool,
}

impl Reply {
    fn new(result: LockCommandResult, reason: impl Into<String>) -> Self {
        Self {
            result,
            reason: reason.into(),
            is_locked: false,
        }
    }

    fn success() -> Self {
        Self::new(LockCommandResult::Success, "")
    }

    fn success_with(reason: &str) -> Self {
        Self::new(LockCommandResult::Success, reason)
    }

    fn failed(reason: &str) -> Self {
        Self::new(LockCommandResult::Failed, reason)
    }

    fn bad_request(reason: &str) -> Self {
        Self::new(LockCommandResult::BadRequest, reason)
    }

    fn internal(err: io::Error) -> Self {
        Self::new(LockCommandResult::InternalError, err.to_string())
    }

    fn peeked(is_locked: bool) -> Self {
        Self {
            is_locked,
            ..Self::success()
        }
    }
}

/// Owns the lock registry and the lock directory.
///
/// One manager serves a whole daemon; handlers on concurrent sessions call
/// [`LockManager::process`] freely. The manager is the only component with
/// business logic; everything around it is plumbing.
#[derive(Debug)]
pub struct LockManager {
    directory: PathBuf,
    registry: LockRegistry,
}

impl LockManager {
    /// Creates a manager serving locks out of `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            registry: LockRegistry::new(),
        }
    }

    /// Directory holding the lock files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Handles one request and produces its response.
    ///
    /// The response echoes the request, with the server's own protocol
    /// version stamped over whatever the client sent.
    pub fn process(&self, session: SessionId, request: LockRequest) -> LockResponse {
        let reply = if !name::is_valid_lock_name(&request.lock_name) {
            Reply::bad_request(reason::INVALID_LOCK_NAME)
        } else {
            match request.command() {
                Some(LockCommand::Acquire) => self.acquire(session, &request.lock_name),
                Some(LockCommand::Release) => self.release(session, &request.lock_name),
                Some(LockCommand::Peek) => self.peek(&request.lock_name),
                Some(LockCommand::Verify) => self.verify(session, &request.lock_name),
                None => Reply::bad_request(reason::UNKNOWN_COMMAND),
            }
        };
        debug!(
            %session,
            command = request.command,
            name = %request.lock_name,
            result = %reply.result,
            reason = %reply.reason,
            "command processed"
        );

        let mut request = request;
        request.version_major = VERSION_MAJOR;
        request.version_minor = VERSION_MINOR;
        LockResponse {
            request,
            result: reply.result,
            reason: reply.reason,
            is_locked: reply.is_locked,
        }
    }

    /// Releases every lock held by a departing session.
    ///
    /// Unlock failures are logged and swallowed; the session is gone and
    /// cannot be told. Lock files stay on disk so the names can be
    /// reacquired without an exists/create race.
    pub fn on_disconnect(&self, session: SessionId) {
        let removed = self.registry.write().remove_session(session);
        for (name, entry) in removed {
            debug!(%session, name = %name, "releasing lock on disconnect");
            if let Err(err) = flock::unlock(&entry.file) {
                warn!(%session, name = %name, error = %err, "unlock failed during disconnect cleanup");
            }
            // the handle closes when the entry drops
        }
    }

    fn acquire(&self, session: SessionId, name: &str) -> Reply {
        {
            let entries = self.registry.read();
            if let Some(entry) = entries.get(name) {
                return Self::reacquire(entry.owner, session);
            }
        }
        // The gap between the read and write scopes is the one tolerated
        // race; the re-check below covers it.
        let mut entries = self.registry.write();
        if let Some(entry) = entries.get(name) {
            return Self::reacquire(entry.owner, session);
        }

        let path = name::lock_file_path(&self.directory, name);
        let file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(0o664)
            .open(&path)
        {
            Ok(file) => file,
            Err(err) => return Reply::internal(err),
        };

        match flock::try_exclusive_lock(&file) {
            Ok(LockAttempt::Acquired) => {}
            Ok(LockAttempt::Contended) => return Reply::failed(reason::HELD_BY_OTHER_PROCESS),
            Err(err) => return Reply::internal(err),
        }

        if let Err(err) = write_marker(&file, session) {
            // drop the on-disk lock so a later retry can succeed
            if let Err(unlock_err) = flock::unlock(&file) {
                warn!(%session, name, error = %unlock_err, "unlock failed after marker write error");
            }
            return Reply::internal(err);
        }

        entries.insert(
            name.to_string(),
            LockEntry {
                file,
                owner: session,
            },
        );
        Reply::success()
    }

    // Reentrant acquire is a no-op success; it does not re-invoke the
    // filesystem lock. Verify is the explicit tool for that check.
    fn reacquire(owner: SessionId, session: SessionId) -> Reply {
        if owner == session {
            Reply::success_with(reason::NO_OP)
        } else {
            Reply::failed(reason::HELD_BY_OTHER_SESSION)
        }
    }

    fn release(&self, session: SessionId, name: &str) -> Reply {
        let mut entries = self.registry.write();
        match entries.get(name) {
            None => return Reply::failed(reason::LOCK_NOT_FOUND),
            Some(entry) if entry.owner != session => {
                return Reply::failed(reason::HELD_BY_OTHER_SESSION);
            }
            Some(entry) => {
                // entry left in place on failure so the session can retry
                if let Err(err) = flock::unlock(&entry.file) {
                    return Reply::internal(err);
                }
            }
        }

        // unlock, close, then unlink, in that order
        drop(entries.remove(name));
        let path = name::lock_file_path(&self.directory, name);
        if let Err(err) = std::fs::remove_file(&path) {
            // in-memory state is already clean
            return Reply::internal(err);
        }
        Reply::success()
    }

    fn peek(&self, name: &str) -> Reply {
        let entries = self.registry.read();
        if entries.get(name).is_some() {
            // a local entry implies this process holds the OS lock
            return Reply::peeked(true);
        }

        // No local entry: the file itself is the source of truth, and some
        // other process may hold it. Unlike acquire, the file must already
        // exist here.
        let path = name::lock_file_path(&self.directory, name);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Reply::peeked(false),
            Err(err) => return Reply::internal(err),
        };
        match flock::probe_unlocked(&file) {
            Ok(unlocked) => Reply::peeked(!unlocked),
            Err(err) => Reply::internal(err),
        }
    }

    fn verify(&self, session: SessionId, name: &str) -> Reply {
        {
            let entries = self.registry.read();
            match entries.get(name) {
                None => return Reply::failed(reason::LOCK_NOT_FOUND),
                Some(entry) if entry.owner != session => {
                    return Reply::failed(reason::HELD_BY_OTHER_SESSION);
                }
                Some(_) => {}
            }
        }
        let entries = self.registry.write();
        let entry = match entries.get(name) {
            None => return Reply::failed(reason::LOCK_NOT_FOUND),
            Some(entry) if entry.owner != session => {
                return Reply::failed(reason::HELD_BY_OTHER_SESSION);
            }
            Some(entry) => entry,
        };

        // fcntl locks are per-process, so re-locking a genuinely held file
        // must succeed; contention here means another process somehow took
        // the file's lock out from under us.
        match flock::try_exclusive_lock(&entry.file) {
            Ok(LockAttempt::Acquired) => Reply::success(),
            Ok(LockAttempt::Contended) => Reply::failed(reason::HELD_BY_OTHER_PROCESS),
            Err(err) => Reply::internal(err),
        }
    }
}

fn write_marker(mut file: &File, session: SessionId) -> io::Result<()> {
    // diagnostic only; correctness never depends on the file's contents
    writeln!(file, "locked by {session}")
}
