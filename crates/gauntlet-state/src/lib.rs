//! Gauntlet-State: persistence layer for the Gauntlet tournament engine
//!
//! This crate owns every byte the engine writes: tournament sessions and
//! their per-layer results. It also defines the read-only shape of the
//! external project catalog the engine consumes.
//!
//! ## Persistence tier
//!
//! Focus: Data integrity and transactional layer commits.
//!
//! ## Key Components
//!
//! - `SessionStore`: backend-agnostic session + layer result persistence
//! - `SurrealSessionStore`: SurrealDB implementation (memory, file, remote)
//! - `ProjectSource`: read-only project catalog boundary
//! - `fakes`: in-memory implementations for tests

pub mod catalog;
mod connection;
mod error;
pub mod fakes;
mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use catalog::{
    AnalysisReport, CodeQualityReport, CoherenceReport, InnovationReport, Project, ProjectSource,
    ReportStatus, StaticProjectSource, TechnologyReport,
};
pub use connection::{connect, Credentials, DbTarget};
pub use error::{StateError, StorageError};
pub use schema::{LayerResultRow, SessionRow};
pub use storage_traits::{
    EligibilityCriteria, FinalResults, LayerCommit, LayerResultRecord, NewSession, SessionId,
    SessionRecord, SessionStatus, SessionStore, StorageResult, DONE_LAYER, FINAL_LAYER,
};
pub use surreal_store::SurrealSessionStore;

/// Result type for gauntlet-state connection and schema operations
pub type Result<T> = std::result::Result<T, StateError>;
