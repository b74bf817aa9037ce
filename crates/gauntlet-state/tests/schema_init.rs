//! Integration tests for the SurrealDB row types and schema setup
//!
//! Row serialization is checked through serde_json; the schema itself is
//! exercised against the embedded in-memory engine.

use gauntlet_state::storage_traits::{
    EligibilityCriteria, LayerResultRecord, NewSession, SessionId, SessionStatus,
};
use gauntlet_state::{connect, DbTarget, LayerResultRow, SessionRow};
use serde_json::json;

#[test]
fn test_session_row_serialization() {
    let row = SessionRow::new(
        "session-123".to_string(),
        NewSession {
            event_id: "hack-2026".to_string(),
            total_projects: 42,
            eligibility_criteria: EligibilityCriteria {
                submission_deadline: true,
                repository_accessible: true,
                repository_public: false,
            },
        },
    );

    let json = serde_json::to_string(&row).expect("Failed to serialize");
    assert!(json.contains("session-123"));
    assert!(json.contains("PENDING"));
    assert!(json.contains("\"total_projects\":42"));
    assert!(json.contains("\"repositoryAccessible\":true"));
    // Unsaved rows carry no record id.
    assert!(!json.contains("\"id\""));
}

#[test]
fn test_layer_result_row_serialization() {
    let record = LayerResultRecord {
        session_id: SessionId::from("session-123"),
        layer: 3,
        project_id: "proj-9".to_string(),
        eliminated: false,
        score: 64.5,
        reason: "code quality scored".to_string(),
        evidence: json!({"defaultScore": false, "richnessScore": 72}),
        created_at: chrono::Utc::now(),
    };

    let json = serde_json::to_string(&LayerResultRow::from_record(record, 4))
        .expect("Failed to serialize");
    assert!(json.contains("proj-9"));
    assert!(json.contains("\"position\":4"));
    assert!(json.contains("richnessScore"));
}

#[tokio::test]
async fn test_session_row_round_trips_through_database() {
    let db = connect(&DbTarget::Memory).await.unwrap();
    let row = SessionRow::new(
        "session-rt".to_string(),
        NewSession {
            event_id: "ev".to_string(),
            total_projects: 5,
            eligibility_criteria: EligibilityCriteria::default(),
        },
    );

    let _created: Option<SessionRow> = db.create("sessions").content(row).await.unwrap();

    let mut res = db
        .query("SELECT * FROM sessions WHERE session_id = $sid")
        .bind(("sid", "session-rt".to_string()))
        .await
        .unwrap();
    let rows: Vec<SessionRow> = res.take(0).unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].id.is_some());

    let record = rows.into_iter().next().unwrap().into_record().unwrap();
    assert_eq!(record.status, SessionStatus::Pending);
    assert_eq!(record.total_projects, 5);
}

#[tokio::test]
async fn test_duplicate_session_id_rejected_by_unique_index() {
    let db = connect(&DbTarget::Memory).await.unwrap();
    let make = || {
        SessionRow::new(
            "dup".to_string(),
            NewSession {
                event_id: "ev".to_string(),
                total_projects: 1,
                eligibility_criteria: EligibilityCriteria::default(),
            },
        )
    };

    let first: Result<Option<SessionRow>, _> = db.create("sessions").content(make()).await;
    assert!(first.is_ok());
    let second: Result<Option<SessionRow>, _> = db.create("sessions").content(make()).await;
    assert!(
        second.is_err(),
        "Second session with the same session_id should fail due to UNIQUE index"
    );
}
