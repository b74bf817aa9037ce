//! Project catalog boundary
//!
//! The catalog is owned by an outer system. The engine only reads it: a
//! `ProjectSource` returns every project of an event together with the
//! analysis reports attached to it. Reports arrive asynchronously, so any
//! of them may be missing or unfinished when a layer runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage_traits::StorageResult;

/// Processing state of an external analysis report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::NotStarted => "not_started",
            ReportStatus::InProgress => "in_progress",
            ReportStatus::Completed => "completed",
            ReportStatus::Failed => "failed",
        }
    }
}

/// Common view over the four report kinds
pub trait AnalysisReport {
    fn status(&self) -> ReportStatus;

    fn is_completed(&self) -> bool {
        self.status() == ReportStatus::Completed
    }
}

/// Technology-usage analysis feeding layer 2
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnologyReport {
    pub status: ReportStatus,
    /// Detected technology category, matched case-insensitively
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub usage_quality: f64,
}

/// Static code analysis feeding layer 3
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeQualityReport {
    pub status: ReportStatus,
    #[serde(default)]
    pub overall_score: f64,
    /// How much real code backs the submission
    #[serde(default)]
    pub richness_score: f64,
}

/// Documentation/implementation coherence analysis feeding layer 4
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoherenceReport {
    pub status: ReportStatus,
    #[serde(default)]
    pub score: f64,
}

/// Innovation analysis feeding layer 4
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnovationReport {
    pub status: ReportStatus,
    #[serde(default)]
    pub score: f64,
}

impl AnalysisReport for TechnologyReport {
    fn status(&self) -> ReportStatus {
        self.status
    }
}

impl AnalysisReport for CodeQualityReport {
    fn status(&self) -> ReportStatus {
        self.status
    }
}

impl AnalysisReport for CoherenceReport {
    fn status(&self) -> ReportStatus {
        self.status
    }
}

impl AnalysisReport for InnovationReport {
    fn status(&self) -> ReportStatus {
        self.status
    }
}

/// A competition submission as seen by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Every project belongs to exactly one category
    pub category_id: String,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub repository_url: Option<String>,
    #[serde(default)]
    pub technology: Option<TechnologyReport>,
    #[serde(default)]
    pub code_quality: Option<CodeQualityReport>,
    #[serde(default)]
    pub coherence: Option<CoherenceReport>,
    #[serde(default)]
    pub innovation: Option<InnovationReport>,
}

impl Project {
    pub fn new(id: impl Into<String>, category_id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            category_id: category_id.into(),
            submitted_at: None,
            repository_url: None,
            technology: None,
            code_quality: None,
            coherence: None,
            innovation: None,
        }
    }
}

/// Read-only access to an event's projects
#[async_trait]
pub trait ProjectSource: Send + Sync {
    /// All projects of `event_id` in catalog order. Unknown events yield an
    /// empty list.
    async fn fetch_projects(&self, event_id: &str) -> StorageResult<Vec<Project>>;
}

/// Project source over a fixed in-process catalog.
///
/// Backs the CLI (projects loaded from a JSON file) and tests.
#[derive(Debug, Default)]
pub struct StaticProjectSource {
    events: Mutex<HashMap<String, Vec<Project>>>,
}

impl StaticProjectSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event(event_id: impl Into<String>, projects: Vec<Project>) -> Self {
        let source = Self::new();
        source.insert_event(event_id, projects);
        source
    }

    /// Replace the projects of an event.
    pub fn insert_event(&self, event_id: impl Into<String>, projects: Vec<Project>) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(event_id.into(), projects);
    }
}

#[async_trait]
impl ProjectSource for StaticProjectSource {
    async fn fetch_projects(&self, event_id: &str) -> StorageResult<Vec<Project>> {
        let events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(events.get(event_id).cloned().unwrap_or_default())
    }
}
