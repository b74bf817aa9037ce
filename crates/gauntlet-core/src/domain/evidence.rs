//! Structured evidence attached to every layer decision.
//!
//! Evidence is persisted as JSON next to the score so a reviewer can see
//! which inputs a verdict used and where a default stood in for missing
//! analysis data. Field names are camelCase on the wire.

use gauntlet_state::EligibilityCriteria;
use serde::{Deserialize, Serialize};

/// Evidence for one decision, tagged with the policy that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum Evidence {
    Eligibility(EligibilityEvidence),
    Technology(TechnologyEvidence),
    Quality(QualityEvidence),
    Composite(CompositeEvidence),
}

impl Evidence {
    /// Whether any default was substituted for missing upstream data.
    pub fn default_applied(&self) -> bool {
        match self {
            Evidence::Eligibility(_) => false,
            Evidence::Technology(e) => e.default_score,
            Evidence::Quality(e) => e.default_score,
            Evidence::Composite(e) => e.coherence_defaulted || e.innovation_defaulted,
        }
    }
}

/// Result of one eligibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOutcome {
    Passed,
    Failed,
    /// Criterion not enabled for the session
    Skipped,
    /// Never reached because an earlier rule failed
    NotEvaluated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCheck {
    pub rule: String,
    pub outcome: RuleOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// What was learned about the project's repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryEvidence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityEvidence {
    pub criteria: EligibilityCriteria,
    /// Every rule in evaluation order
    pub checks: Vec<RuleCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositoryEvidence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnologyEvidence {
    pub default_score: bool,
    /// `missing`, or the report's status
    pub report_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Rule the category matched, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_quality: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityEvidence {
    pub default_score: bool,
    pub report_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub richness_score: Option<f64>,
    /// Richness fell under the threshold and the score was halved
    pub low_richness: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeEvidence {
    pub coherence_score: f64,
    pub innovation_score: f64,
    pub coherence_defaulted: bool,
    pub innovation_defaulted: bool,
    pub coherence_status: String,
    pub innovation_status: String,
    pub coherence_weight: f64,
    pub innovation_weight: f64,
}
