//! Layer 4: composite final score. Never eliminates.

use gauntlet_state::{CoherenceReport, InnovationReport, Project};

use super::score_or_default;
use crate::domain::{CompositeEvidence, Evidence, LayerDecision};

pub const COMPOSITE_DEFAULT_SCORE: f64 = 65.0;
pub const COHERENCE_WEIGHT: f64 = 0.4;
pub const INNOVATION_WEIGHT: f64 = 0.6;

pub fn evaluate_composite(project: &Project) -> LayerDecision {
    let coherence = score_or_default(
        project.coherence.as_ref(),
        COMPOSITE_DEFAULT_SCORE,
        |r: &CoherenceReport| r.score,
    );
    let innovation = score_or_default(
        project.innovation.as_ref(),
        COMPOSITE_DEFAULT_SCORE,
        |r: &InnovationReport| r.score,
    );

    let score = (coherence.value * COHERENCE_WEIGHT + innovation.value * INNOVATION_WEIGHT).round();

    let mut reason = format!(
        "coherence {:.0}{}, innovation {:.0}{}",
        coherence.value,
        if coherence.defaulted { " (default)" } else { "" },
        innovation.value,
        if innovation.defaulted { " (default)" } else { "" },
    );
    if coherence.defaulted || innovation.defaulted {
        reason.push_str("; defaults substituted for missing analysis");
    }

    LayerDecision::survive(
        score,
        reason,
        Evidence::Composite(CompositeEvidence {
            coherence_score: coherence.value,
            innovation_score: innovation.value,
            coherence_defaulted: coherence.defaulted,
            innovation_defaulted: innovation.defaulted,
            coherence_status: coherence.report_status.to_string(),
            innovation_status: innovation.report_status.to_string(),
            coherence_weight: COHERENCE_WEIGHT,
            innovation_weight: INNOVATION_WEIGHT,
        }),
    )
}
