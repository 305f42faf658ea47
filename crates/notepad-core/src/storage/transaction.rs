//! Reentrant transaction gate.
//!
//! One thread at a time owns the gate. The owner may re-enter it (nested
//! units of work and the repository calls they make); other threads block
//! until the owner's outermost scope exits.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
struct GateState {
    owner: Option<ThreadId>,
    depth: usize,
    // Something changed since the outermost scope was entered
    dirty: bool,
    // A nested unit of work failed; the outermost one must roll back
    rollback_only: bool,
}

#[derive(Debug, Default)]
pub(crate) struct TransactionGate {
    state: Mutex<GateState>,
    idle: Condvar,
}

impl TransactionGate {
    /// Enter the gate, waiting while another thread owns it.
    pub fn enter(&self) -> GateScope<'_> {
        let me = thread::current().id();
        let mut state = self.lock();
        while matches!(state.owner, Some(owner) if owner != me) {
            state = self.idle.wait(state).unwrap_or_else(PoisonError::into_inner);
        }

        state.owner = Some(me);
        state.depth += 1;
        let outermost = state.depth == 1;
        if outermost {
            state.dirty = false;
            state.rollback_only = false;
        }

        GateScope {
            gate: self,
            outermost,
        }
    }

    pub fn mark_dirty(&self) {
        self.lock().dirty = true;
    }

    pub fn mark_rollback_only(&self) {
        self.lock().rollback_only = true;
    }

    /// `(dirty, rollback_only)` of the current transaction.
    pub fn flags(&self) -> (bool, bool) {
        let state = self.lock();
        (state.dirty, state.rollback_only)
    }

    /// Nesting depth; zero when idle.
    pub fn depth(&self) -> usize {
        self.lock().depth
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One entry into the gate; leaving is tied to drop so panics unwind cleanly.
#[derive(Debug)]
pub(crate) struct GateScope<'a> {
    gate: &'a TransactionGate,
    outermost: bool,
}

impl GateScope<'_> {
    pub fn is_outermost(&self) -> bool {
        self.outermost
    }
}

impl Drop for GateScope<'_> {
    fn drop(&mut self) {
        let mut state = self.gate.lock();
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.owner = None;
            self.gate.idle.notify_all();
        }
    }
}
