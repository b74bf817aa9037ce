//! Tournament layers and the per-project decision a layer policy returns.

use chrono::Utc;
use gauntlet_state::{LayerResultRecord, SessionId, SessionStatus};
use serde::{Deserialize, Serialize};

use super::error::GauntletError;
use super::evidence::Evidence;

/// The four stages, numbered in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Eligibility = 1,
    TechnologyFilter = 2,
    QualityGate = 3,
    CompositeFinal = 4,
}

impl Layer {
    pub const ALL: [Layer; 4] = [
        Layer::Eligibility,
        Layer::TechnologyFilter,
        Layer::QualityGate,
        Layer::CompositeFinal,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Layer::Eligibility => "eligibility",
            Layer::TechnologyFilter => "technology_filter",
            Layer::QualityGate => "quality_gate",
            Layer::CompositeFinal => "composite_final",
        }
    }

    /// Session status while this layer runs.
    pub fn status(self) -> SessionStatus {
        match self {
            Layer::Eligibility => SessionStatus::Layer1Eligibility,
            Layer::TechnologyFilter => SessionStatus::Layer2Technology,
            Layer::QualityGate => SessionStatus::Layer3CodeQuality,
            Layer::CompositeFinal => SessionStatus::Layer4FinalAnalysis,
        }
    }

    pub fn is_final(self) -> bool {
        self == Layer::CompositeFinal
    }
}

impl TryFrom<u8> for Layer {
    type Error = GauntletError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Layer::Eligibility),
            2 => Ok(Layer::TechnologyFilter),
            3 => Ok(Layer::QualityGate),
            4 => Ok(Layer::CompositeFinal),
            other => Err(GauntletError::InvalidLayer(other)),
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "layer {} ({})", self.number(), self.name())
    }
}

/// A policy's verdict on one project.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDecision {
    pub eliminated: bool,
    /// Always within 0..=100
    pub score: f64,
    pub reason: String,
    pub evidence: Evidence,
}

impl LayerDecision {
    pub fn survive(score: f64, reason: impl Into<String>, evidence: Evidence) -> Self {
        Self {
            eliminated: false,
            score: clamp_score(score),
            reason: reason.into(),
            evidence,
        }
    }

    pub fn eliminate(reason: impl Into<String>, evidence: Evidence) -> Self {
        Self {
            eliminated: true,
            score: 0.0,
            reason: reason.into(),
            evidence,
        }
    }

    /// Turn the decision into the row the Results Writer persists.
    pub fn into_record(
        self,
        session_id: &SessionId,
        layer: Layer,
        project_id: &str,
    ) -> Result<LayerResultRecord, GauntletError> {
        Ok(LayerResultRecord {
            session_id: session_id.clone(),
            layer: layer.number(),
            project_id: project_id.to_string(),
            eliminated: self.eliminated,
            score: self.score,
            reason: self.reason,
            evidence: serde_json::to_value(&self.evidence)?,
            created_at: Utc::now(),
        })
    }
}

/// Clamp into 0..=100; NaN becomes 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}
