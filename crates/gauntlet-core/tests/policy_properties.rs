//! Layer policy behavior through the public API.

use chrono::Utc;
use gauntlet_core::policy::{
    evaluate_composite, evaluate_eligibility, evaluate_quality, evaluate_technology,
};
use gauntlet_core::{Evidence, Layer, StaticRepoChecker};
use gauntlet_state::{
    CodeQualityReport, EligibilityCriteria, InnovationReport, Project, ReportStatus, SessionId,
};

fn criteria_requiring_submission() -> EligibilityCriteria {
    EligibilityCriteria {
        submission_deadline: true,
        ..EligibilityCriteria::default()
    }
}

/// Test: missing submission eliminates only while the criterion is on
#[tokio::test]
async fn test_eligibility_submission_deadline() {
    let checker = StaticRepoChecker::new();
    let project = Project::new("late", "defi");

    let decision = evaluate_eligibility(&project, &criteria_requiring_submission(), &checker).await;
    assert!(decision.eliminated);
    assert_eq!(decision.score, 0.0);

    let decision = evaluate_eligibility(&project, &EligibilityCriteria::default(), &checker).await;
    assert!(!decision.eliminated);

    let mut submitted = project.clone();
    submitted.submitted_at = Some(Utc::now());
    let decision = evaluate_eligibility(&submitted, &criteria_requiring_submission(), &checker).await;
    assert!(!decision.eliminated);
    assert_eq!(decision.score, 100.0);
}

/// Test: missing technology report survives with the default and flags it
#[test]
fn test_technology_default_is_recorded_in_evidence() {
    let decision = evaluate_technology(&Project::new("p", "defi"));
    assert!(!decision.eliminated);
    assert_eq!(decision.score, 70.0);
    assert!(decision.evidence.default_applied());

    let record = decision
        .into_record(&SessionId::from("s"), Layer::TechnologyFilter, "p")
        .unwrap();
    assert_eq!(record.layer, 2);
    assert_eq!(record.evidence["policy"], "technology");
    assert_eq!(record.evidence["defaultScore"], true);
}

/// Test: low richness halves the overall score
#[test]
fn test_quality_low_richness() {
    let mut project = Project::new("p", "defi");
    project.code_quality = Some(CodeQualityReport {
        status: ReportStatus::Completed,
        overall_score: 80.0,
        richness_score: 40.0,
    });
    let decision = evaluate_quality(&project);
    assert!(!decision.eliminated);
    assert_eq!(decision.score, 40.0);
    let Evidence::Quality(evidence) = decision.evidence else {
        panic!("wrong evidence kind");
    };
    assert!(evidence.low_richness);
}

/// Test: missing coherence uses its default inside the weighted sum
#[test]
fn test_composite_with_default_coherence() {
    let mut project = Project::new("p", "defi");
    project.innovation = Some(InnovationReport {
        status: ReportStatus::Completed,
        score: 90.0,
    });
    let decision = evaluate_composite(&project);
    assert!(!decision.eliminated);
    assert_eq!(decision.score, 80.0);
    assert!(decision.evidence.default_applied());
}

/// Test: scores stay within bounds for out-of-range report values
#[test]
fn test_scores_are_clamped() {
    let mut project = Project::new("p", "defi");
    project.code_quality = Some(CodeQualityReport {
        status: ReportStatus::Completed,
        overall_score: 250.0,
        richness_score: 90.0,
    });
    assert_eq!(evaluate_quality(&project).score, 100.0);

    project.innovation = Some(InnovationReport {
        status: ReportStatus::Completed,
        score: -40.0,
    });
    let score = evaluate_composite(&project).score;
    assert!((0.0..=100.0).contains(&score));
}
