use gauntlet_state::{FinalResults, LayerResultRecord, SessionId};
use serde::Serialize;

/// What one `execute_layer` call did.
#[derive(Debug, Clone, Serialize)]
pub struct LayerOutcome {
    pub session_id: SessionId,
    pub layer: u8,
    /// Candidates evaluated
    pub processed: usize,
    pub eliminated: u32,
    pub advanced: u32,
    pub results: Vec<LayerResultRecord>,
    /// Set when the final layer completed the session
    pub final_results: Option<FinalResults>,
}

/// How `reset_session` treats the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Back to PENDING with criteria kept and every result wiped
    Soft,
    /// Delete the session and its results
    Hard,
}
