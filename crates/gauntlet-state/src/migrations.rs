//! SurrealDB schema migrations and initialization
//!
//! Sets up the `sessions` and `layer_results` tables with the indexes the
//! store queries by and the uniqueness constraint on layer results.

use crate::error::StateError;
use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all Gauntlet tables in SurrealDB
///
/// Safe to call on every connection (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing Gauntlet SurrealDB schema");

    init_sessions_table(db).await?;
    init_layer_results_table(db).await?;

    info!("Gauntlet schema initialization complete");
    Ok(())
}

async fn run_ddl(db: &Surreal<Any>, sql: &str) -> Result<()> {
    db.query(sql)
        .await?
        .check()
        .map_err(|e| StateError::SchemaSetup(e.to_string()))?;
    Ok(())
}

/// Initialize `sessions` table
///
/// Schema:
/// ```text
/// TABLE sessions {
///   session_id:           STRING (unique)
///   event_id:             STRING (indexed)
///   status:               STRING (PENDING | LAYER_n_* | COMPLETED | FAILED)
///   current_layer:        INT (1..=5)
///   total_projects:       INT
///   eliminated_projects:  INT
///   eligibility_criteria: OBJECT
///   final_results:        OBJECT?
///   failure_reason:       STRING?
///   created_at:           DATETIME
///   updated_at:           DATETIME
/// }
/// ```
///
/// Status transitions are enforced by the engine, not the database.
async fn init_sessions_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing sessions table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS sessions AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete FULL;

        DEFINE INDEX IF NOT EXISTS idx_session_id ON TABLE sessions COLUMNS session_id UNIQUE;

        -- Sessions of one event
        DEFINE INDEX IF NOT EXISTS idx_event_id ON TABLE sessions COLUMNS event_id;

        DEFINE INDEX IF NOT EXISTS idx_status ON TABLE sessions COLUMNS status;
    "#;

    run_ddl(db, sql).await?;
    info!("✓ sessions table initialized");
    Ok(())
}

/// Initialize `layer_results` table
///
/// Schema:
/// ```text
/// TABLE layer_results {
///   session_id:  STRING (foreign key to sessions.session_id)
///   layer:       INT (1..=4)
///   position:    INT (commit order within the layer)
///   project_id:  STRING
///   eliminated:  BOOL
///   score:       FLOAT
///   reason:      STRING
///   evidence:    OBJECT
///   created_at:  DATETIME
/// }
/// ```
///
/// Constraints:
/// - `(session_id, layer, project_id)` is unique
/// - Rows of a layer are only ever replaced wholesale inside a commit
///   transaction
async fn init_layer_results_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing layer_results table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS layer_results AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update NONE
                FOR delete FULL;

        -- One outcome per project per layer
        DEFINE INDEX IF NOT EXISTS idx_session_layer_project ON TABLE layer_results
            COLUMNS session_id, layer, project_id UNIQUE;

        -- Ordered retrieval of a layer
        DEFINE INDEX IF NOT EXISTS idx_session_layer_position ON TABLE layer_results
            COLUMNS session_id, layer, position;

        -- Elimination lookups for candidate filtering
        DEFINE INDEX IF NOT EXISTS idx_session_eliminated ON TABLE layer_results
            COLUMNS session_id, eliminated;
    "#;

    run_ddl(db, sql).await?;
    info!("✓ layer_results table initialized");
    Ok(())
}
