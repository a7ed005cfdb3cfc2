//! Concurrent session store.
//!
//! Each session sits behind its own mutex so a slow model call in one
//! debate never blocks another; the map lock is only held to look a
//! session up.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::coordinator::{SessionCoordinator, TurnOutcome, TurnSubmission};
use crate::error::DebateError;
use crate::participant::{DebateMode, Difficulty, Side};
use crate::session::{DebateSession, SessionId, SessionSnapshot};

/// Live sessions keyed by id, sharing one coordinator.
pub struct SessionRegistry {
    coordinator: SessionCoordinator,
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<DebateSession>>>>,
}

impl SessionRegistry {
    pub fn new(coordinator: SessionCoordinator) -> Self {
        Self {
            coordinator,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn start(
        &self,
        resolution: impl Into<String>,
        human_role: Side,
        difficulty: Difficulty,
        mode: DebateMode,
    ) -> SessionSnapshot {
        let session = self.coordinator.start(resolution, human_role, difficulty, mode);
        let snapshot = session.snapshot();
        self.sessions
            .write()
            .await
            .insert(snapshot.session_id, Arc::new(Mutex::new(session)));
        snapshot
    }

    pub async fn submit_turn(
        &self,
        id: SessionId,
        submission: TurnSubmission,
    ) -> Result<TurnOutcome, DebateError> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        self.coordinator.submit_turn(&mut session, submission).await
    }

    pub async fn end_phase(&self, id: SessionId) -> Result<TurnOutcome, DebateError> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        self.coordinator.end_phase(&mut session).await
    }

    pub async fn resume(&self, id: SessionId) -> Result<TurnOutcome, DebateError> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        self.coordinator.resume(&mut session).await
    }

    pub async fn snapshot(&self, id: SessionId) -> Result<SessionSnapshot, DebateError> {
        let session = self.session(id).await?;
        let session = session.lock().await;
        Ok(session.snapshot())
    }

    /// Drop a session, returning its final state.
    pub async fn close(&self, id: SessionId) -> Result<SessionSnapshot, DebateError> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(DebateError::UnknownSession(id))?;
        let snapshot = session.lock().await.snapshot();
        info!(session = %id, phase = %snapshot.phase, "session closed");
        Ok(snapshot)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn session(&self, id: SessionId) -> Result<Arc<Mutex<DebateSession>>, DebateError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(DebateError::UnknownSession(id))
    }
}
