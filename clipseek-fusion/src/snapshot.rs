//! Atomically swappable handle to the current backend.
//!
//! Readers clone the `Arc` once at the start of a call and keep using that
//! snapshot until they finish, so a reload never exposes a half-swapped
//! backend. Writers replace the whole reference; the old backend is dropped
//! when its last reader completes.

use std::sync::{Arc, PoisonError, RwLock};

/// Shared slot holding the backend searches run against.
#[derive(Debug)]
pub struct SnapshotHandle<B> {
    current: RwLock<Option<Arc<B>>>,
}

impl<B> Default for SnapshotHandle<B> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<B> SnapshotHandle<B> {
    /// A handle with nothing installed. Searches fail with `NotReady`.
    pub fn empty() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// A handle with `backend` already installed.
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            current: RwLock::new(Some(backend)),
        }
    }

    /// Take a reference to the current backend, if any.
    pub fn current(&self) -> Option<Arc<B>> {
        // The slot only ever holds a complete Option<Arc>, so a poisoned
        // lock still guards a consistent value.
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the current backend, returning the previous one.
    pub fn install(&self, backend: Arc<B>) -> Option<Arc<B>> {
        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        slot.replace(backend)
    }

    /// Whether a backend is installed.
    pub fn is_ready(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
