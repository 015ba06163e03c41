//! Session storage
//!
//! The store exclusively owns session records. The engine borrows one
//! handle per call and holds its lock for the whole transition.

pub mod memory;

pub use memory::InMemorySessionStore;

use crate::error::{NegotiationError, Result};
use crate::negotiation::NegotiationSession;
use crate::types::SessionId;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared, lockable handle to one session
pub type SessionHandle = Arc<Mutex<NegotiationSession>>;

/// Storage backend for negotiation sessions
pub trait SessionStore: Send + Sync {
    /// Insert a new session; fails if the id is taken
    fn insert(&self, session: NegotiationSession) -> Result<SessionHandle>;

    fn get(&self, id: &SessionId) -> Result<SessionHandle>;

    fn remove(&self, id: &SessionId) -> Result<SessionHandle>;

    fn ids(&self) -> Result<Vec<SessionId>>;
}

/// Lock a session handle, mapping a poisoned lock to `StateCorruption`
pub fn lock(handle: &SessionHandle) -> Result<MutexGuard<'_, NegotiationSession>> {
    handle
        .lock()
        .map_err(|_| NegotiationError::StateCorruption("session lock poisoned".to_string()))
}
