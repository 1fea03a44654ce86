//! Registry of live navigation sessions
//!
//! Maps session ids to the channel feeding their location samples and the
//! token that stops them. Only the driver who started a session may feed or
//! stop it. Entries are removed by `SessionGuard` when the session task ends.

use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::types::LocationSample;

struct SessionEntry {
    owner_id: Uuid,
    samples: mpsc::Sender<LocationSample>,
    cancel: CancellationToken,
}

/// RAII guard that removes the session from the registry when dropped.
/// Must be kept alive by the task running the session.
pub struct SessionGuard {
    session_id: Uuid,
    registry: SessionRegistry,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.session_id);
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Caller did not start this session
    #[error("session belongs to another driver")]
    NotOwner,
    /// No such session (finished or never started)
    #[error("navigation session not found")]
    NotFound,
    /// The session's sample queue is full or its task has exited
    #[error("navigation session is not accepting samples")]
    Unavailable,
}

impl SessionError {
    /// Error code used in NATS error responses
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::NotOwner => "FORBIDDEN",
            SessionError::NotFound => "NOT_FOUND",
            SessionError::Unavailable => "UNAVAILABLE",
        }
    }
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
}

impl SessionRegistry {
    /// Register a session. Returns the guard to hold while the session runs.
    pub fn register(
        &self,
        session_id: Uuid,
        owner_id: Uuid,
        samples: mpsc::Sender<LocationSample>,
        cancel: CancellationToken,
    ) -> SessionGuard {
        self.sessions.lock().insert(session_id, SessionEntry {
            owner_id,
            samples,
            cancel,
        });
        SessionGuard {
            session_id,
            registry: self.clone(),
        }
    }

    /// Queue a location sample for the session without waiting
    pub fn push_sample(
        &self,
        session_id: &Uuid,
        caller_id: Uuid,
        sample: LocationSample,
    ) -> Result<(), SessionError> {
        let sender = {
            let sessions = self.sessions.lock();
            let entry = sessions.get(session_id).ok_or(SessionError::NotFound)?;
            if entry.owner_id != caller_id {
                return Err(SessionError::NotOwner);
            }
            entry.samples.clone()
        };

        sender.try_send(sample).map_err(|_| SessionError::Unavailable)
    }

    /// Cancel a session on behalf of its owner.
    ///
    /// `Ok(false)` means the session already ended (arrived or stopped).
    pub fn stop(&self, session_id: &Uuid, caller_id: Uuid) -> Result<bool, SessionError> {
        let sessions = self.sessions.lock();
        match sessions.get(session_id) {
            Some(entry) => {
                if entry.owner_id != caller_id {
                    return Err(SessionError::NotOwner);
                }
                entry.cancel.cancel();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Cancel every session (worker shutdown)
    pub fn stop_all(&self) {
        for entry in self.sessions.lock().values() {
            entry.cancel.cancel();
        }
    }

    #[cfg(test)]
    pub fn is_active(&self, session_id: &Uuid) -> bool {
        self.sessions.lock().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Called automatically by `SessionGuard::drop`.
    fn remove(&self, session_id: &Uuid) {
        self.sessions.lock().remove(session_id);
    }
}
