//! The held note key.
//!
//! A [`KeySession`] is owned by the application context and shared with
//! whatever needs to encrypt. Collaborators `hold` it while they work with
//! encrypted notes; when the last holder releases it the key is dropped
//! (and zeroized). `forget` drops the key immediately.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::crypto::key::DerivedKey;
use crate::error::{NotePadError, Result};

#[derive(Debug, Default)]
struct SessionState {
    key: Option<DerivedKey>,
    holders: usize,
}

/// Reference-counted holder of the note key.
#[derive(Debug, Default)]
pub struct KeySession {
    state: Mutex<SessionState>,
    unlocked: Condvar,
}

impl KeySession {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register interest in the key; returns the new holder count.
    pub fn hold(&self) -> usize {
        let mut state = self.lock();
        state.holders += 1;
        state.holders
    }

    /// Drop one holder; the key goes away with the last one.
    pub fn release(&self) -> usize {
        let mut state = self.lock();
        state.holders = state.holders.saturating_sub(1);
        if state.holders == 0 && state.key.take().is_some() {
            debug!("last key holder released; key dropped");
        }
        state.holders
    }

    pub fn holders(&self) -> usize {
        self.lock().holders
    }

    /// Store `key` and wake anyone waiting for it.
    ///
    /// Installing does not count as a hold; without one the key lasts only
    /// until the next `release` that leaves no holders.
    pub fn install(&self, key: DerivedKey) {
        self.lock().key = Some(key);
        self.unlocked.notify_all();
    }

    /// Drop the key regardless of holders.
    pub fn forget(&self) -> bool {
        self.lock().key.take().is_some()
    }

    pub fn is_unlocked(&self) -> bool {
        self.lock().key.is_some()
    }

    /// Block until a key is installed or `timeout` passes.
    pub fn wait_until_unlocked(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while state.key.is_none() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .unlocked
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    /// Run `op` with the held key, or fail with `Locked`.
    pub(crate) fn with_key<T>(&self, op: impl FnOnce(&DerivedKey) -> Result<T>) -> Result<T> {
        let state = self.lock();
        let key = state.key.as_ref().ok_or(NotePadError::Locked)?;
        op(key)
    }
}
