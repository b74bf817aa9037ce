//! Schema definitions for Gauntlet SurrealDB tables
//!
//! Tables:
//! - sessions: one row per tournament session
//! - layer_results: one row per (session, layer, project) outcome
//!
//! Rows are converted to `storage_traits` records at the store boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage_traits::{
    EligibilityCriteria, FinalResults, LayerResultRecord, NewSession, SessionId, SessionRecord,
    SessionStatus,
};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Session row stored in SurrealDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub session_id: String,
    pub event_id: String,
    /// Wire name of a `SessionStatus`
    pub status: String,
    pub current_layer: u8,
    pub total_projects: u32,
    pub eliminated_projects: u32,
    pub eligibility_criteria: EligibilityCriteria,
    /// Serialized `FinalResults`
    #[serde(default)]
    pub final_results: Option<serde_json::Value>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl SessionRow {
    /// Create a fresh row in `PENDING` at layer 1
    pub fn new(session_id: String, session: NewSession) -> Self {
        let now = Utc::now();
        SessionRow {
            id: None,
            session_id,
            event_id: session.event_id,
            status: SessionStatus::Pending.as_str().to_string(),
            current_layer: 1,
            total_projects: session.total_projects,
            eliminated_projects: 0,
            eligibility_criteria: session.eligibility_criteria,
            final_results: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn into_record(self) -> Result<SessionRecord, StorageError> {
        let status: SessionStatus = self.status.parse()?;
        let final_results = self
            .final_results
            .filter(|v| !v.is_null())
            .map(serde_json::from_value::<FinalResults>)
            .transpose()?;

        Ok(SessionRecord {
            session_id: SessionId(self.session_id),
            event_id: self.event_id,
            status,
            current_layer: self.current_layer,
            total_projects: self.total_projects,
            eliminated_projects: self.eliminated_projects,
            eligibility_criteria: self.eligibility_criteria,
            final_results,
            failure_reason: self.failure_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Layer result row stored in SurrealDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerResultRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub session_id: String,
    pub layer: u8,
    /// Index of the row within its layer commit
    pub position: u32,
    pub project_id: String,
    pub eliminated: bool,
    pub score: f64,
    pub reason: String,
    pub evidence: serde_json::Value,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl LayerResultRow {
    pub fn from_record(record: LayerResultRecord, position: u32) -> Self {
        LayerResultRow {
            id: None,
            session_id: record.session_id.0,
            layer: record.layer,
            position,
            project_id: record.project_id,
            eliminated: record.eliminated,
            score: record.score,
            reason: record.reason,
            evidence: record.evidence,
            created_at: record.created_at,
        }
    }

    pub fn into_record(self) -> LayerResultRecord {
        LayerResultRecord {
            session_id: SessionId(self.session_id),
            layer: self.layer,
            project_id: self.project_id,
            eliminated: self.eliminated,
            score: self.score,
            reason: self.reason,
            evidence: self.evidence,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_row_starts_pending_at_layer_one() {
        let row = SessionRow::new(
            "s-1".to_string(),
            NewSession {
                event_id: "ev".to_string(),
                total_projects: 7,
                eligibility_criteria: EligibilityCriteria::default(),
            },
        );
        let record = row.into_record().unwrap();
        assert_eq!(record.status, SessionStatus::Pending);
        assert_eq!(record.current_layer, 1);
        assert_eq!(record.eliminated_projects, 0);
        assert!(record.final_results.is_none());
    }

    #[test]
    fn unknown_status_in_row_is_a_backend_error() {
        let mut row = SessionRow::new(
            "s-1".to_string(),
            NewSession {
                event_id: "ev".to_string(),
                total_projects: 0,
                eligibility_criteria: EligibilityCriteria::default(),
            },
        );
        row.status = "ARCHIVED".to_string();
        assert!(matches!(
            row.into_record(),
            Err(StorageError::Backend(msg)) if msg.contains("ARCHIVED")
        ));
    }

    #[test]
    fn result_row_keeps_position_out_of_the_record() {
        let record = LayerResultRecord {
            session_id: SessionId::from("s-1"),
            layer: 2,
            project_id: "p".to_string(),
            eliminated: true,
            score: 0.0,
            reason: "no target technology".to_string(),
            evidence: serde_json::json!({"category": "other"}),
            created_at: Utc::now(),
        };
        let row = LayerResultRow::from_record(record.clone(), 3);
        assert_eq!(row.position, 3);
        assert_eq!(row.into_record(), record);
    }
}
