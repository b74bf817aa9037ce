//! SurrealDB-backed SessionStore implementation
//!
//! Uses `schema::SessionRow` and `schema::LayerResultRow` for persistence,
//! converting to/from `storage_traits` types at the boundary. Layer commits,
//! resets and deletes each run as one SurrealQL transaction.

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::connection::{self, DbTarget};
use crate::error::StorageError;
use crate::schema::{LayerResultRow, SessionRow};
use crate::storage_traits::{
    LayerCommit, LayerResultRecord, NewSession, SessionId, SessionRecord, SessionStatus,
    SessionStore, StorageResult, FINAL_LAYER,
};

/// Rows per `INSERT` statement inside a commit transaction
pub const DEFAULT_INSERT_CHUNK_SIZE: usize = 500;

/// SurrealDB-backed implementation of [`SessionStore`].
#[derive(Clone)]
pub struct SurrealSessionStore {
    db: Surreal<Any>,
    insert_chunk_size: usize,
}

impl SurrealSessionStore {
    /// Wrap an already connected and initialized database.
    pub fn new(db: Surreal<Any>) -> Self {
        Self {
            db,
            insert_chunk_size: DEFAULT_INSERT_CHUNK_SIZE,
        }
    }

    /// Bound the size of each bulk insert statement. Zero is treated as one.
    pub fn with_insert_chunk_size(mut self, size: usize) -> Self {
        self.insert_chunk_size = size.max(1);
        self
    }

    pub async fn connect(target: &DbTarget) -> crate::Result<Self> {
        let db = connection::connect(target).await?;
        info!(target = %target, "SurrealSessionStore connected");
        Ok(Self::new(db))
    }

    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> crate::Result<Self> {
        Self::connect(&DbTarget::Memory).await
    }

    /// Create from environment variables (see [`DbTarget::from_env`]).
    pub async fn from_env() -> crate::Result<Self> {
        Self::connect(&DbTarget::from_env()).await
    }

    // -- private helpers -----------------------------------------------------

    /// Fetch a session row by ID, returning the DB row or SessionNotFound.
    async fn fetch_session(&self, sid: &str) -> StorageResult<SessionRow> {
        let sid_owned = sid.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM sessions WHERE session_id = $sid")
            .bind(("sid", sid_owned))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<SessionRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::SessionNotFound {
                session_id: sid.to_string(),
            })
    }

    /// Build the commit transaction for `chunks` bulk inserts.
    fn commit_sql(chunks: usize) -> String {
        let mut sql = String::from(
            "BEGIN TRANSACTION;\n\
             LET $prior = array::len((SELECT id FROM layer_results \
                 WHERE session_id = $sid AND layer = $layer AND eliminated = true));\n\
             DELETE layer_results WHERE session_id = $sid AND layer = $layer;\n",
        );
        for i in 0..chunks {
            sql.push_str(&format!("INSERT INTO layer_results $chunk_{i};\n"));
        }
        sql.push_str(
            "UPDATE sessions SET \
                 eliminated_projects = math::max([0, eliminated_projects - $prior + $eliminated]), \
                 current_layer = $next_layer, \
                 status = $status, \
                 final_results = $final_results, \
                 updated_at = time::now() \
             WHERE session_id = $sid;\n\
             COMMIT TRANSACTION;",
        );
        sql
    }
}

#[async_trait]
impl SessionStore for SurrealSessionStore {
    async fn create_session(&self, session: NewSession) -> StorageResult<SessionRecord> {
        let session_id = SessionId::new();
        let row = SessionRow::new(session_id.0.clone(), session);

        debug!(session_id = %session_id, event_id = %row.event_id, "creating session");

        let _created: Option<SessionRow> = self
            .db
            .create("sessions")
            .content(row.clone())
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        row.into_record()
    }

    async fn get_session(&self, session_id: &SessionId) -> StorageResult<SessionRecord> {
        self.fetch_session(&session_id.0).await?.into_record()
    }

    async fn list_sessions(&self, event_id: Option<&str>) -> StorageResult<Vec<SessionRecord>> {
        let rows: Vec<SessionRow> = if let Some(event_id) = event_id {
            let ev = event_id.to_string();
            let mut res = self
                .db
                .query("SELECT * FROM sessions WHERE event_id = $ev ORDER BY created_at DESC")
                .bind(("ev", ev))
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            res.take(0)
                .map_err(|e| StorageError::Backend(e.to_string()))?
        } else {
            let mut res = self
                .db
                .query("SELECT * FROM sessions ORDER BY created_at DESC")
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            res.take(0)
                .map_err(|e| StorageError::Backend(e.to_string()))?
        };

        rows.into_iter().map(SessionRow::into_record).collect()
    }

    async fn set_status(
        &self,
        session_id: &SessionId,
        status: SessionStatus,
    ) -> StorageResult<()> {
        self.fetch_session(&session_id.0).await?;

        self.db
            .query("UPDATE sessions SET status = $status, updated_at = time::now() WHERE session_id = $sid")
            .bind(("status", status.as_str().to_string()))
            .bind(("sid", session_id.0.clone()))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .check()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn commit_layer(&self, commit: LayerCommit) -> StorageResult<SessionRecord> {
        if !(1..=FINAL_LAYER).contains(&commit.layer) {
            return Err(StorageError::InvalidLayer {
                layer: commit.layer,
            });
        }
        self.fetch_session(&commit.session_id.0).await?;

        let eliminated = commit.eliminated_count();
        let final_results = commit
            .final_results
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        let rows: Vec<LayerResultRow> = commit
            .results
            .into_iter()
            .enumerate()
            .map(|(i, r)| LayerResultRow::from_record(r, i as u32))
            .collect();
        let chunks: Vec<Vec<LayerResultRow>> = rows
            .chunks(self.insert_chunk_size)
            .map(|c| c.to_vec())
            .collect();

        debug!(
            session_id = %commit.session_id,
            layer = commit.layer,
            rows = rows.len(),
            chunks = chunks.len(),
            eliminated,
            "committing layer"
        );

        let mut query = self
            .db
            .query(Self::commit_sql(chunks.len()))
            .bind(("sid", commit.session_id.0.clone()))
            .bind(("layer", commit.layer))
            .bind(("eliminated", eliminated))
            .bind(("next_layer", commit.layer + 1))
            .bind(("status", commit.status.as_str().to_string()))
            .bind(("final_results", final_results));
        for (i, chunk) in chunks.into_iter().enumerate() {
            query = query.bind((format!("chunk_{i}"), chunk));
        }

        query
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .check()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        self.fetch_session(&commit.session_id.0).await?.into_record()
    }

    async fn mark_failed(&self, session_id: &SessionId, reason: &str) -> StorageResult<()> {
        self.fetch_session(&session_id.0).await?;

        self.db
            .query(
                "UPDATE sessions SET status = $status, failure_reason = $reason, \
                 updated_at = time::now() WHERE session_id = $sid",
            )
            .bind(("status", SessionStatus::Failed.as_str().to_string()))
            .bind(("reason", reason.to_string()))
            .bind(("sid", session_id.0.clone()))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .check()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn layer_results(
        &self,
        session_id: &SessionId,
        layer: Option<u8>,
    ) -> StorageResult<Vec<LayerResultRecord>> {
        // Verify session exists
        self.fetch_session(&session_id.0).await?;

        let sid = session_id.0.clone();
        let rows: Vec<LayerResultRow> = if let Some(layer) = layer {
            let mut res = self
                .db
                .query(
                    "SELECT * FROM layer_results WHERE session_id = $sid AND layer = $layer \
                     ORDER BY position ASC",
                )
                .bind(("sid", sid))
                .bind(("layer", layer))
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            res.take(0)
                .map_err(|e| StorageError::Backend(e.to_string()))?
        } else {
            let mut res = self
                .db
                .query(
                    "SELECT * FROM layer_results WHERE session_id = $sid \
                     ORDER BY layer ASC, position ASC",
                )
                .bind(("sid", sid))
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            res.take(0)
                .map_err(|e| StorageError::Backend(e.to_string()))?
        };

        Ok(rows.into_iter().map(LayerResultRow::into_record).collect())
    }

    async fn soft_reset(&self, session_id: &SessionId) -> StorageResult<SessionRecord> {
        self.fetch_session(&session_id.0).await?;

        self.db
            .query(
                "BEGIN TRANSACTION;\n\
                 DELETE layer_results WHERE session_id = $sid;\n\
                 UPDATE sessions SET status = $status, current_layer = 1, \
                     eliminated_projects = 0, final_results = NONE, failure_reason = NONE, \
                     updated_at = time::now() \
                 WHERE session_id = $sid;\n\
                 COMMIT TRANSACTION;",
            )
            .bind(("sid", session_id.0.clone()))
            .bind(("status", SessionStatus::Pending.as_str().to_string()))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .check()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        self.fetch_session(&session_id.0).await?.into_record()
    }

    async fn delete_session(&self, session_id: &SessionId) -> StorageResult<()> {
        self.fetch_session(&session_id.0).await?;

        self.db
            .query(
                "BEGIN TRANSACTION;\n\
                 DELETE layer_results WHERE session_id = $sid;\n\
                 DELETE sessions WHERE session_id = $sid;\n\
                 COMMIT TRANSACTION;",
            )
            .bind(("sid", session_id.0.clone()))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .check()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }
}
