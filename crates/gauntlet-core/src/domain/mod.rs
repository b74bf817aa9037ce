//! Domain models for Gauntlet.
//!
//! Canonical definitions for the core entities:
//! - `Layer`: the four tournament stages, in execution order
//! - `LayerDecision`: a policy's verdict on one project
//! - `Evidence`: the structured audit trail attached to every verdict

pub mod error;
pub mod evidence;
pub mod layer;

// Re-export main types and errors
pub use error::{GauntletError, RepoCheckError, Result};
pub use evidence::{
    CompositeEvidence, EligibilityEvidence, Evidence, QualityEvidence, RepositoryEvidence,
    RuleCheck, RuleOutcome, TechnologyEvidence,
};
pub use layer::{Layer, LayerDecision};
