use std::sync::Mutex;
use std::thread::{self, ThreadId};

use pledge_storage::StorageError;

use crate::error::{LedgerError, LedgerResult};

/// Tracks which thread is inside a ledger call.
///
/// Another thread simply waits on the store lock; the same thread coming
/// back in (a token callback) is rejected instead of deadlocking.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    owner: Mutex<Option<ThreadId>>,
}

/// Marks the current thread as inside the ledger until dropped.
#[derive(Debug)]
pub struct Entered<'a> {
    guard: &'a ReentrancyGuard,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with `Reentrancy` if the current thread is already inside.
    pub fn check(&self) -> LedgerResult<()> {
        let owner = self.owner.lock().map_err(|_| poisoned())?;
        if *owner == Some(thread::current().id()) {
            return Err(LedgerError::Reentrancy);
        }
        Ok(())
    }

    /// Claim the guard. Call only while holding the store lock.
    pub fn enter(&self) -> LedgerResult<Entered<'_>> {
        let mut owner = self.owner.lock().map_err(|_| poisoned())?;
        let current = thread::current().id();
        if *owner == Some(current) {
            return Err(LedgerError::Reentrancy);
        }
        *owner = Some(current);
        Ok(Entered { guard: self })
    }

    pub fn is_held(&self) -> bool {
        self.owner.lock().map(|owner| owner.is_some()).unwrap_or(true)
    }
}

fn poisoned() -> LedgerError {
    StorageError::Backend("reentrancy guard lock poisoned".to_string()).into()
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        if let Ok(mut owner) = self.guard.owner.lock() {
            *owner = None;
        }
    }
}
