//! Layer → policy dispatch.

use gauntlet_core::policy::{
    evaluate_composite, evaluate_eligibility, evaluate_quality, evaluate_technology,
};
use gauntlet_core::{Layer, LayerDecision, RepositoryChecker};
use gauntlet_state::{EligibilityCriteria, Project};

/// Decide one project for `layer`. Never fails: policy-level problems are
/// folded into the decision.
pub async fn evaluate_project(
    layer: Layer,
    project: &Project,
    criteria: &EligibilityCriteria,
    checker: &dyn RepositoryChecker,
) -> LayerDecision {
    match layer {
        Layer::Eligibility => evaluate_eligibility(project, criteria, checker).await,
        Layer::TechnologyFilter => evaluate_technology(project),
        Layer::QualityGate => evaluate_quality(project),
        Layer::CompositeFinal => evaluate_composite(project),
    }
}
