//! Storage trait definitions for Gauntlet
//!
//! `SessionStore` is the single persistence seam of the engine. It covers
//! the session row, its layer results, and the atomic layer commit that
//! replaces a layer's rows, adjusts the elimination counter and advances
//! the layer pointer in one unit.
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// The last scoring layer.
pub const FINAL_LAYER: u8 = 4;

/// `current_layer` value of a session whose four layers are all committed.
pub const DONE_LAYER: u8 = 5;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for a tournament session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random SessionId
    pub fn new() -> Self {
        SessionId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        SessionId(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle status of a session.
///
/// ```text
/// PENDING → LAYER_1_ELIGIBILITY → LAYER_2_HEDERA → LAYER_3_CODE_QUALITY
///         → LAYER_4_FINAL_ANALYSIS → COMPLETED
/// (any non-terminal) → FAILED
/// ```
///
/// `LAYER_2_HEDERA` is the technology-filter layer; the wire name is kept
/// for compatibility with existing session rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "LAYER_1_ELIGIBILITY")]
    Layer1Eligibility,
    #[serde(rename = "LAYER_2_HEDERA")]
    Layer2Technology,
    #[serde(rename = "LAYER_3_CODE_QUALITY")]
    Layer3CodeQuality,
    #[serde(rename = "LAYER_4_FINAL_ANALYSIS")]
    Layer4FinalAnalysis,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "PENDING",
            SessionStatus::Layer1Eligibility => "LAYER_1_ELIGIBILITY",
            SessionStatus::Layer2Technology => "LAYER_2_HEDERA",
            SessionStatus::Layer3CodeQuality => "LAYER_3_CODE_QUALITY",
            SessionStatus::Layer4FinalAnalysis => "LAYER_4_FINAL_ANALYSIS",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Failed => "FAILED",
        }
    }

    /// Status a session is in while layer `layer` executes.
    pub fn for_layer(layer: u8) -> Option<Self> {
        match layer {
            1 => Some(SessionStatus::Layer1Eligibility),
            2 => Some(SessionStatus::Layer2Technology),
            3 => Some(SessionStatus::Layer3CodeQuality),
            4 => Some(SessionStatus::Layer4FinalAnalysis),
            _ => None,
        }
    }

    /// Layer number of a layer status.
    pub fn layer(&self) -> Option<u8> {
        match self {
            SessionStatus::Layer1Eligibility => Some(1),
            SessionStatus::Layer2Technology => Some(2),
            SessionStatus::Layer3CodeQuality => Some(3),
            SessionStatus::Layer4FinalAnalysis => Some(4),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }

    /// Whether the forward transition `self → next` is legal.
    ///
    /// Re-entering the current layer status is legal (retry of an
    /// uncommitted layer). Resets are not transitions and are always
    /// permitted by the store.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.layer(), next) {
            (_, SessionStatus::Failed) => true,
            (None, SessionStatus::Layer1Eligibility) => *self == SessionStatus::Pending,
            (Some(4), SessionStatus::Completed) => true,
            (Some(current), next) => match next.layer() {
                Some(target) => target == current || target == current + 1,
                None => false,
            },
            _ => false,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(SessionStatus::Pending),
            "LAYER_1_ELIGIBILITY" => Ok(SessionStatus::Layer1Eligibility),
            "LAYER_2_HEDERA" => Ok(SessionStatus::Layer2Technology),
            "LAYER_3_CODE_QUALITY" => Ok(SessionStatus::Layer3CodeQuality),
            "LAYER_4_FINAL_ANALYSIS" => Ok(SessionStatus::Layer4FinalAnalysis),
            "COMPLETED" => Ok(SessionStatus::Completed),
            "FAILED" => Ok(SessionStatus::Failed),
            other => Err(StorageError::Backend(format!(
                "unknown session status: {other}"
            ))),
        }
    }
}

/// Layer 1 configuration. Every flag defaults to off (permissive).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EligibilityCriteria {
    /// Require a submission timestamp.
    pub submission_deadline: bool,
    /// Require the repository to be reachable.
    pub repository_accessible: bool,
    /// Require the repository to be public.
    pub repository_public: bool,
}

impl EligibilityCriteria {
    /// Whether any repository-related check is enabled.
    pub fn checks_repository(&self) -> bool {
        self.repository_accessible || self.repository_public
    }
}

/// Per-category ranking produced when the final layer commits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResults {
    /// Category id → project ids, best first
    pub winners: BTreeMap<String, Vec<String>>,
    pub generated_at: DateTime<Utc>,
    /// Sum of all winner list lengths
    pub total_winners: u32,
    /// Layer 4 results considered for ranking
    pub total_candidates: u32,
    /// Categories present in `winners`
    pub category_count: u32,
}

/// Data required to create a session
#[derive(Debug, Clone)]
pub struct NewSession {
    pub event_id: String,
    pub total_projects: u32,
    pub eligibility_criteria: EligibilityCriteria,
}

/// Full session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub event_id: String,
    pub status: SessionStatus,
    /// 1..=4 while layers remain, 5 once the final layer committed
    pub current_layer: u8,
    pub total_projects: u32,
    pub eliminated_projects: u32,
    pub eligibility_criteria: EligibilityCriteria,
    pub final_results: Option<FinalResults>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Projects not yet eliminated.
    pub fn remaining_projects(&self) -> u32 {
        self.total_projects.saturating_sub(self.eliminated_projects)
    }
}

/// One (session, layer, project) outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerResultRecord {
    pub session_id: SessionId,
    pub layer: u8,
    pub project_id: String,
    pub eliminated: bool,
    /// 0..=100
    pub score: f64,
    pub reason: String,
    /// Structured audit record of how the decision was derived
    pub evidence: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Everything the Results Writer commits for one layer
#[derive(Debug, Clone)]
pub struct LayerCommit {
    pub session_id: SessionId,
    pub layer: u8,
    /// Replaces all existing rows for (session, layer), in this order
    pub results: Vec<LayerResultRecord>,
    /// Status the session holds after the commit
    pub status: SessionStatus,
    /// Stored with the commit; only set for the final layer
    pub final_results: Option<FinalResults>,
}

impl LayerCommit {
    pub fn eliminated_count(&self) -> u32 {
        self.results.iter().filter(|r| r.eliminated).count() as u32
    }
}

/// Session and layer-result persistence.
///
/// Guarantees:
/// - At most one result per (session, layer, project).
/// - `commit_layer` is atomic: the delete of the layer's previous rows, the
///   insert of the new rows, the elimination counter adjustment, the layer
///   pointer advance and the status update land together or not at all.
/// - Committing the same layer twice leaves the same rows and the same
///   counter as committing it once.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session in `PENDING` at layer 1.
    async fn create_session(&self, session: NewSession) -> StorageResult<SessionRecord>;

    /// Retrieve a session. Returns `StorageError::SessionNotFound` if absent.
    async fn get_session(&self, session_id: &SessionId) -> StorageResult<SessionRecord>;

    /// List sessions, optionally filtered by event, newest first.
    async fn list_sessions(&self, event_id: Option<&str>) -> StorageResult<Vec<SessionRecord>>;

    /// Overwrite the session status without touching layer data.
    async fn set_status(&self, session_id: &SessionId, status: SessionStatus)
        -> StorageResult<()>;

    /// Atomically replace a layer's results and advance the session.
    async fn commit_layer(&self, commit: LayerCommit) -> StorageResult<SessionRecord>;

    /// Move the session to `FAILED`, recording why.
    async fn mark_failed(&self, session_id: &SessionId, reason: &str) -> StorageResult<()>;

    /// Results for a session, ordered by layer then commit order.
    async fn layer_results(
        &self,
        session_id: &SessionId,
        layer: Option<u8>,
    ) -> StorageResult<Vec<LayerResultRecord>>;

    /// Back to `PENDING` at layer 1 with criteria kept and all layer data
    /// wiped.
    async fn soft_reset(&self, session_id: &SessionId) -> StorageResult<SessionRecord>;

    /// Destroy the session and all its results.
    async fn delete_session(&self, session_id: &SessionId) -> StorageResult<()>;
}
