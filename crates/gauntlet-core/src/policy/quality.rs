//! Layer 3: quality gate. Never eliminates.

use gauntlet_state::{CodeQualityReport, Project};

use super::score_or_default;
use crate::domain::{Evidence, LayerDecision, QualityEvidence};

pub const QUALITY_DEFAULT_SCORE: f64 = 60.0;

/// Richness below this halves the overall score.
pub const RICHNESS_THRESHOLD: f64 = 50.0;

/// Floor for low-richness submissions.
pub const LOW_RICHNESS_FLOOR: f64 = 30.0;

pub fn evaluate_quality(project: &Project) -> LayerDecision {
    let report = project.code_quality.as_ref();
    let scored = score_or_default(report, QUALITY_DEFAULT_SCORE, |r: &CodeQualityReport| {
        r.overall_score
    });

    let Some(report) = report.filter(|_| !scored.defaulted) else {
        let evidence = QualityEvidence {
            default_score: true,
            report_status: scored.report_status.to_string(),
            overall_score: None,
            richness_score: None,
            low_richness: false,
        };
        return LayerDecision::survive(
            scored.value,
            format!(
                "code quality analysis {}; default score {} applied",
                scored.report_status, QUALITY_DEFAULT_SCORE
            ),
            Evidence::Quality(evidence),
        );
    };

    let low_richness = report.richness_score < RICHNESS_THRESHOLD;
    let (score, reason) = if low_richness {
        let score = LOW_RICHNESS_FLOOR.max(report.overall_score * 0.5);
        (
            score,
            format!(
                "low code richness {:.0}; overall {:.0} halved to {:.0}",
                report.richness_score, report.overall_score, score
            ),
        )
    } else {
        (
            report.overall_score,
            format!(
                "code quality {:.0} (richness {:.0})",
                report.overall_score, report.richness_score
            ),
        )
    };

    LayerDecision::survive(
        score,
        reason,
        Evidence::Quality(QualityEvidence {
            default_score: false,
            report_status: scored.report_status.to_string(),
            overall_score: Some(report.overall_score),
            richness_score: Some(report.richness_score),
            low_richness,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_state::ReportStatus;

    fn project(overall: f64, richness: f64) -> Project {
        let mut project = Project::new("p-1", "defi");
        project.code_quality = Some(CodeQualityReport {
            status: ReportStatus::Completed,
            overall_score: overall,
            richness_score: richness,
        });
        project
    }

    #[test]
    fn low_richness_halves_overall_score() {
        let decision = evaluate_quality(&project(80.0, 40.0));
        assert!(!decision.eliminated);
        assert_eq!(decision.score, 40.0);
    }

    #[test]
    fn low_richness_score_has_a_floor() {
        let decision = evaluate_quality(&project(20.0, 10.0));
        assert!(!decision.eliminated);
        assert_eq!(decision.score, 30.0);
    }

    #[test]
    fn rich_code_keeps_overall_score() {
        let decision = evaluate_quality(&project(72.0, 50.0));
        assert_eq!(decision.score, 72.0);
        let Evidence::Quality(evidence) = decision.evidence else {
            panic!("wrong evidence kind");
        };
        assert!(!evidence.low_richness);
    }

    #[test]
    fn missing_report_defaults_and_never_eliminates() {
        let decision = evaluate_quality(&Project::new("p-2", "defi"));
        assert!(!decision.eliminated);
        assert_eq!(decision.score, 60.0);
        assert!(decision.evidence.default_applied());
    }

    #[test]
    fn zero_scores_still_survive() {
        let decision = evaluate_quality(&project(0.0, 0.0));
        assert!(!decision.eliminated);
        assert_eq!(decision.score, 30.0);
    }
}
