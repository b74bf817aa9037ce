//! Layer policies.
//!
//! One module per layer. Each turns a project (plus the session's criteria
//! for layer 1) into a [`LayerDecision`](crate::domain::LayerDecision).
//! Layers 2 to 4 are pure and synchronous; layer 1 awaits the repository
//! checker but is otherwise deterministic.
//!
//! Missing or unfinished analysis reports never fail a project in layers
//! 2 to 4: [`score_or_default`] substitutes the layer's default score and
//! records that it did.

pub mod composite;
pub mod eligibility;
pub mod quality;
pub mod technology;

use gauntlet_state::{AnalysisReport, ReportStatus};

pub use composite::{evaluate_composite, COHERENCE_WEIGHT, COMPOSITE_DEFAULT_SCORE, INNOVATION_WEIGHT};
pub use eligibility::{evaluate_eligibility, EligibilityRule, ELIGIBILITY_RULES};
pub use quality::{evaluate_quality, QUALITY_DEFAULT_SCORE, RICHNESS_THRESHOLD};
pub use technology::{evaluate_technology, TechnologyVerdict, TECHNOLOGY_DEFAULT_SCORE, TECHNOLOGY_RULES};

/// Report status label used in evidence when no report exists at all.
pub const MISSING_REPORT: &str = "missing";

/// A score taken from a completed report, or the layer default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub value: f64,
    pub defaulted: bool,
    /// `missing` or the report's status
    pub report_status: &'static str,
}

/// Score from `report` when it is completed, otherwise `default`.
pub fn score_or_default<R, F>(report: Option<&R>, default: f64, score: F) -> Scored
where
    R: AnalysisReport,
    F: FnOnce(&R) -> f64,
{
    match report {
        Some(r) if r.status() == ReportStatus::Completed => Scored {
            value: score(r),
            defaulted: false,
            report_status: ReportStatus::Completed.as_str(),
        },
        Some(r) => Scored {
            value: default,
            defaulted: true,
            report_status: r.status().as_str(),
        },
        None => Scored {
            value: default,
            defaulted: true,
            report_status: MISSING_REPORT,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_state::CoherenceReport;

    #[test]
    fn completed_report_supplies_its_score() {
        let report = CoherenceReport {
            status: ReportStatus::Completed,
            score: 88.0,
        };
        let scored = score_or_default(Some(&report), 65.0, |r| r.score);
        assert_eq!(scored.value, 88.0);
        assert!(!scored.defaulted);
        assert_eq!(scored.report_status, "completed");
    }

    #[test]
    fn unfinished_or_missing_report_uses_default() {
        for status in [
            ReportStatus::NotStarted,
            ReportStatus::InProgress,
            ReportStatus::Failed,
        ] {
            let report = CoherenceReport { status, score: 99.0 };
            let scored = score_or_default(Some(&report), 65.0, |r| r.score);
            assert_eq!(scored.value, 65.0);
            assert!(scored.defaulted);
            assert_eq!(scored.report_status, status.as_str());
        }

        let scored = score_or_default(None::<&CoherenceReport>, 65.0, |r| r.score);
        assert!(scored.defaulted);
        assert_eq!(scored.report_status, "missing");
    }
}
