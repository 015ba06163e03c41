//! In-process session store

use crate::error::{NegotiationError, Result};
use crate::negotiation::NegotiationSession;
use crate::types::SessionId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use super::{SessionHandle, SessionStore};

/// Sessions kept in a map behind a reader-writer lock
///
/// The map lock is only held to look up or swap handles, never across a
/// session transition.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        Ok(sessions.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn poisoned() -> NegotiationError {
    NegotiationError::StateCorruption("session registry lock poisoned".to_string())
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, session: NegotiationSession) -> Result<SessionHandle> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        let id = session.id().clone();
        if sessions.contains_key(&id) {
            return Err(NegotiationError::SessionAlreadyExists(id.0));
        }

        let handle = Arc::new(Mutex::new(session));
        sessions.insert(id, Arc::clone(&handle));
        Ok(handle)
    }

    fn get(&self, id: &SessionId) -> Result<SessionHandle> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| NegotiationError::SessionNotFound(id.0.clone()))
    }

    fn remove(&self, id: &SessionId) -> Result<SessionHandle> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        sessions
            .remove(id)
            .ok_or_else(|| NegotiationError::SessionNotFound(id.0.clone()))
    }

    fn ids(&self) -> Result<Vec<SessionId>> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        let mut ids: Vec<SessionId> = sessions.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
