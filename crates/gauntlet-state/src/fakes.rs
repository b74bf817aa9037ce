//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemorySessionStore`, which satisfies the `SessionStore`
//! contract without any external dependencies, plus a failure switch for
//! exercising the engine's persistence-error path.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StorageError;
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemorySessionStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    sessions: HashMap<String, SessionRecord>,
    /// Results per session, kept in commit order
    results: HashMap<String, Vec<LayerResultRecord>>,
    fail_next_commit: bool,
}

/// In-memory session store. A single mutex guards sessions and results so
/// every commit is atomic with respect to readers.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    state: Mutex<MemoryState>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `commit_layer` fail with a backend error before it
    /// touches any data.
    pub fn fail_next_commit(&self) {
        self.state.lock().unwrap().fail_next_commit = true;
    }

    fn not_found(session_id: &SessionId) -> StorageError {
        StorageError::SessionNotFound {
            session_id: session_id.0.clone(),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, session: NewSession) -> StorageResult<SessionRecord> {
        let now = Utc::now();
        let record = SessionRecord {
            session_id: SessionId::new(),
            event_id: session.event_id,
            status: SessionStatus::Pending,
            current_layer: 1,
            total_projects: session.total_projects,
            eliminated_projects: 0,
            eligibility_criteria: session.eligibility_criteria,
            final_results: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        let mut state = self.state.lock().unwrap();
        state
            .sessions
            .insert(record.session_id.0.clone(), record.clone());
        Ok(record)
    }

    async fn get_session(&self, session_id: &SessionId) -> StorageResult<SessionRecord> {
        let state = self.state.lock().unwrap();
        state
            .sessions
            .get(&session_id.0)
            .cloned()
            .ok_or_else(|| Self::not_found(session_id))
    }

    async fn list_sessions(&self, event_id: Option<&str>) -> StorageResult<Vec<SessionRecord>> {
        let state = self.state.lock().unwrap();
        let mut records: Vec<SessionRecord> = state
            .sessions
            .values()
            .filter(|s| event_id.map(|e| s.event_id == e).unwrap_or(true))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn set_status(
        &self,
        session_id: &SessionId,
        status: SessionStatus,
    ) -> StorageResult<()> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .sessions
            .get_mut(&session_id.0)
            .ok_or_else(|| Self::not_found(session_id))?;
        record.status = status;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn commit_layer(&self, commit: LayerCommit) -> StorageResult<SessionRecord> {
        if !(1..=FINAL_LAYER).contains(&commit.layer) {
            return Err(StorageError::InvalidLayer {
                layer: commit.layer,
            });
        }

        let mut state = self.state.lock().unwrap();
        if state.fail_next_commit {
            state.fail_next_commit = false;
            return Err(StorageError::Backend(
                "injected commit failure".to_string(),
            ));
        }
        if !state.sessions.contains_key(&commit.session_id.0) {
            return Err(Self::not_found(&commit.session_id));
        }

        let new_eliminated = commit.eliminated_count();
        let rows = state.results.entry(commit.session_id.0.clone()).or_default();
        let prior_eliminated = rows
            .iter()
            .filter(|r| r.layer == commit.layer && r.eliminated)
            .count() as u32;
        rows.retain(|r| r.layer != commit.layer);
        rows.extend(commit.results);

        let record = state
            .sessions
            .get_mut(&commit.session_id.0)
            .ok_or_else(|| Self::not_found(&commit.session_id))?;
        record.eliminated_projects = record
            .eliminated_projects
            .saturating_sub(prior_eliminated)
            + new_eliminated;
        record.current_layer = commit.layer + 1;
        record.status = commit.status;
        record.final_results = commit.final_results;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn mark_failed(&self, session_id: &SessionId, reason: &str) -> StorageResult<()> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .sessions
            .get_mut(&session_id.0)
            .ok_or_else(|| Self::not_found(session_id))?;
        record.status = SessionStatus::Failed;
        record.failure_reason = Some(reason.to_string());
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn layer_results(
        &self,
        session_id: &SessionId,
        layer: Option<u8>,
    ) -> StorageResult<Vec<LayerResultRecord>> {
        let state = self.state.lock().unwrap();
        if !state.sessions.contains_key(&session_id.0) {
            return Err(Self::not_found(session_id));
        }
        let mut rows: Vec<LayerResultRecord> = state
            .results
            .get(&session_id.0)
            .map(|rows| {
                rows.iter()
                    .filter(|r| layer.map(|l| r.layer == l).unwrap_or(true))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        // Stable sort keeps commit order within a layer.
        rows.sort_by_key(|r| r.layer);
        Ok(rows)
    }

    async fn soft_reset(&self, session_id: &SessionId) -> StorageResult<SessionRecord> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .sessions
            .get_mut(&session_id.0)
            .ok_or_else(|| Self::not_found(session_id))?;
        record.status = SessionStatus::Pending;
        record.current_layer = 1;
        record.eliminated_projects = 0;
        record.final_results = None;
        record.failure_reason = None;
        record.updated_at = Utc::now();
        let record = record.clone();
        state.results.remove(&session_id.0);
        Ok(record)
    }

    async fn delete_session(&self, session_id: &SessionId) -> StorageResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.sessions.remove(&session_id.0).is_none() {
            return Err(Self::not_found(session_id));
        }
        state.results.remove(&session_id.0);
        Ok(())
    }
}
