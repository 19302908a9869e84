//! In-memory registry of held locks.

use std::collections::HashMap;
use std::fs::File;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::session::SessionId;

/// A held lock: the open lock file and the session that owns it.
///
/// The entry exclusively owns the file handle from insert until removal;
/// while the entry exists, the underlying file is advisory-locked by this
/// process.
#[derive(Debug)]
pub struct LockEntry {
    pub file: File,
    pub owner: SessionId,
}

/// Registry of held locks, keyed by lock name.
///
/// One record per name with the owner embedded, behind a single
/// reader/writer mutex. Callers hold a guard across every check-then-act
/// sequence; the guard types below are the only way in.
#[derive(Debug, Default)]
pub struct LockRegistry {
    entries: RwLock<HashMap<String, LockEntry>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the shared lock for lookups.
    pub fn read(&self) -> RegistryReadGuard<'_> {
        RegistryReadGuard {
            entries: self.entries.read().expect("lock registry poisoned"),
        }
    }

    /// Takes the exclusive lock for mutations and the re-checks guarding
    /// them.
    pub fn write(&self) -> RegistryWriteGuard<'_> {
        RegistryWriteGuard {
            entries: self.entries.write().expect("lock registry poisoned"),
        }
    }
}

/// Shared view of the registry.
pub struct RegistryReadGuard<'a> {
    entries: RwLockReadGuard<'a, HashMap<String, LockEntry>>,
}

impl RegistryReadGuard<'_> {
    pub fn get(&self, name: &str) -> Option<&LockEntry> {
        self.entries.get(name)
    }
}

/// Exclusive view of the registry.
pub struct RegistryWriteGuard<'a> {
    entries: RwLockWriteGuard<'a, HashMap<String, LockEntry>>,
}

impl RegistryWriteGuard<'_> {
    pub fn get(&self, name: &str) -> Option<&LockEntry> {
        self.entries.get(name)
    }

    /// Records a newly acquired lock.
    ///
    /// The caller must have re-checked under this guard that the name is
    /// free; a duplicate insert is a bookkeeping bug, not a recoverable
    /// condition.
    pub fn insert(&mut self, name: String, entry: LockEntry) {
        let previous = self.entries.insert(name, entry);
        assert!(previous.is_none(), "duplicate registry entry for lock name");
    }

    pub fn remove(&mut self, name: &str) -> Option<LockEntry> {
        self.entries.remove(name)
    }

    /// Removes every entry owned by `session`, returning the removed
    /// entries so the caller can run filesystem cleanup after dropping the
    /// guard.
    pub fn remove_session(&mut self, session: SessionId) -> Vec<(String, LockEntry)> {
        let names: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.owner == session)
            .map(|(name, _)| name.clone())
            .collect();
        names
            .into_iter()
            .filter_map(|name| self.entries.remove(&name).map(|entry| (name, entry)))
            .collect()
    }
}
