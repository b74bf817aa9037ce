//! Gauntlet core library
//!
//! Layer policies, the batch processor, repository checks, live progress
//! and final aggregation. Persistence lives in `gauntlet-state`; the layer
//! executor that ties these together lives in `gauntlet-engine`.

pub mod aggregator;
pub mod batch;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod obs;
pub mod policy;
pub mod progress;
pub mod repo_check;
pub mod telemetry;

pub use aggregator::{aggregate_final_results, DEFAULT_TOP_N};
pub use batch::{process_in_batches, BatchConfig};
pub use config::EngineConfig;
pub use domain::{
    CompositeEvidence, EligibilityEvidence, Evidence, GauntletError, Layer, LayerDecision,
    QualityEvidence, RepoCheckError, RepositoryEvidence, Result, RuleCheck, RuleOutcome,
    TechnologyEvidence,
};
pub use policy::{
    evaluate_composite, evaluate_eligibility, evaluate_quality, evaluate_technology,
    EligibilityRule,
};
pub use progress::{
    ProgressEvent, ProgressPhase, ProgressSnapshot, ProgressTracker, ProgressUpdate,
};
pub use repo_check::{
    parse_repository_url, GithubRepoChecker, RepoAccess, RepoRef, RepositoryChecker,
    StaticRepoChecker,
};

pub use gauntlet_state::{
    EligibilityCriteria, FinalResults, LayerResultRecord, Project, ProjectSource, SessionId,
    SessionRecord, SessionStatus, SessionStore, StaticProjectSource,
};

pub use metrics::METRICS;
pub use obs::layer_span;
pub use telemetry::init_tracing;
