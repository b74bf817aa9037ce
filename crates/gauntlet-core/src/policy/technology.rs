//! Layer 2: technology filter.
//!
//! Only a completed technology report can eliminate. The detected category
//! is normalized (lowercase, `_` and spaces become `-`) and matched against
//! [`TECHNOLOGY_RULES`] in order by substring, so `no-target-technology`
//! has to be tried before `target-technology`.

use gauntlet_state::{Project, TechnologyReport};

use super::score_or_default;
use crate::domain::{Evidence, LayerDecision, TechnologyEvidence};

/// Score for projects whose technology report is not completed.
pub const TECHNOLOGY_DEFAULT_SCORE: f64 = 70.0;

/// Score for completed reports with an unrecognized category.
pub const NEUTRAL_SCORE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TechnologyVerdict {
    Eliminate,
    /// Survive with `max(confidence, usage_quality)`
    Survive,
}

/// Category patterns in matching order.
pub const TECHNOLOGY_RULES: [(&str, TechnologyVerdict); 3] = [
    ("no-target-technology", TechnologyVerdict::Eliminate),
    ("other-technology", TechnologyVerdict::Survive),
    ("target-technology", TechnologyVerdict::Survive),
];

fn normalize(category: &str) -> String {
    category
        .trim()
        .to_lowercase()
        .replace(|c: char| c == '_' || c == ' ', "-")
}

fn match_rule(category: &str) -> Option<(&'static str, TechnologyVerdict)> {
    let normalized = normalize(category);
    TECHNOLOGY_RULES
        .iter()
        .find(|(pattern, _)| normalized.contains(pattern))
        .copied()
}

pub fn evaluate_technology(project: &Project) -> LayerDecision {
    let report = project.technology.as_ref();
    let scored = score_or_default(report, TECHNOLOGY_DEFAULT_SCORE, |r: &TechnologyReport| {
        r.confidence.max(r.usage_quality)
    });

    let mut evidence = TechnologyEvidence {
        default_score: scored.defaulted,
        report_status: scored.report_status.to_string(),
        category: None,
        matched_category: None,
        confidence: None,
        usage_quality: None,
    };

    let Some(report) = report.filter(|_| !scored.defaulted) else {
        return LayerDecision::survive(
            scored.value,
            format!(
                "technology analysis {}; default score {} applied",
                scored.report_status, TECHNOLOGY_DEFAULT_SCORE
            ),
            Evidence::Technology(evidence),
        );
    };

    evidence.category = Some(report.category.clone());
    evidence.confidence = Some(report.confidence);
    evidence.usage_quality = Some(report.usage_quality);

    match match_rule(&report.category) {
        Some((pattern, TechnologyVerdict::Eliminate)) => {
            evidence.matched_category = Some(pattern.to_string());
            LayerDecision::eliminate(
                format!("{pattern}: required technology not used"),
                Evidence::Technology(evidence),
            )
        }
        Some((pattern, TechnologyVerdict::Survive)) => {
            evidence.matched_category = Some(pattern.to_string());
            LayerDecision::survive(
                scored.value,
                format!(
                    "{pattern} (confidence {:.0}, usage quality {:.0})",
                    report.confidence, report.usage_quality
                ),
                Evidence::Technology(evidence),
            )
        }
        None => LayerDecision::survive(
            NEUTRAL_SCORE,
            format!(
                "unrecognized technology category '{}'; neutral score {}",
                report.category, NEUTRAL_SCORE
            ),
            Evidence::Technology(evidence),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_state::ReportStatus;

    fn project_with(report: Option<TechnologyReport>) -> Project {
        let mut project = Project::new("p-1", "defi");
        project.technology = report;
        project
    }

    fn completed(category: &str, confidence: f64, usage_quality: f64) -> Option<TechnologyReport> {
        Some(TechnologyReport {
            status: ReportStatus::Completed,
            category: category.to_string(),
            confidence,
            usage_quality,
        })
    }

    #[test]
    fn missing_report_survives_with_default() {
        let decision = evaluate_technology(&project_with(None));
        assert!(!decision.eliminated);
        assert_eq!(decision.score, 70.0);
        let Evidence::Technology(evidence) = decision.evidence else {
            panic!("wrong evidence kind");
        };
        assert!(evidence.default_score);
        assert_eq!(evidence.report_status, "missing");
    }

    #[test]
    fn unfinished_report_status_is_recorded() {
        for status in [
            ReportStatus::NotStarted,
            ReportStatus::InProgress,
            ReportStatus::Failed,
        ] {
            let report = TechnologyReport {
                status,
                category: "no-target-technology".to_string(),
                confidence: 0.0,
                usage_quality: 0.0,
            };
            let decision = evaluate_technology(&project_with(Some(report)));
            assert!(!decision.eliminated, "{status:?} must not eliminate");
            assert_eq!(decision.score, 70.0);
            let Evidence::Technology(evidence) = decision.evidence else {
                panic!("wrong evidence kind");
            };
            assert_eq!(evidence.report_status, status.as_str());
        }
    }

    #[test]
    fn no_target_technology_eliminates() {
        let decision = evaluate_technology(&project_with(completed("No_Target_Technology", 90.0, 90.0)));
        assert!(decision.eliminated);
        assert_eq!(decision.score, 0.0);
        assert!(decision.reason.contains("no-target-technology"));
    }

    #[test]
    fn target_and_other_take_the_better_sub_score() {
        let decision = evaluate_technology(&project_with(completed("target-technology", 62.0, 81.0)));
        assert!(!decision.eliminated);
        assert_eq!(decision.score, 81.0);
        assert!(decision.reason.contains("62"));
        assert!(decision.reason.contains("81"));

        let decision = evaluate_technology(&project_with(completed("Other Technology", 55.0, 40.0)));
        assert!(!decision.eliminated);
        assert_eq!(decision.score, 55.0);
    }

    #[test]
    fn unknown_category_gets_neutral_score() {
        let decision = evaluate_technology(&project_with(completed("quantum", 99.0, 99.0)));
        assert!(!decision.eliminated);
        assert_eq!(decision.score, 50.0);
        let Evidence::Technology(evidence) = decision.evidence else {
            panic!("wrong evidence kind");
        };
        assert!(evidence.matched_category.is_none());
        assert!(!evidence.default_score);
    }
}
