//! Process-wide counters for layer execution.
//!
//! Increments are silent; [`Metrics::flush`] emits every counter as one
//! `tracing::info!` event, typically after a layer or a full run.

use std::sync::atomic::{AtomicU64, Ordering};

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    layers_executed: AtomicU64,
    projects_evaluated: AtomicU64,
    projects_eliminated: AtomicU64,
    default_scores_applied: AtomicU64,
    commit_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            layers_executed: AtomicU64::new(0),
            projects_evaluated: AtomicU64::new(0),
            projects_eliminated: AtomicU64::new(0),
            default_scores_applied: AtomicU64::new(0),
            commit_failures: AtomicU64::new(0),
        }
    }

    pub fn inc_layers_executed(&self) {
        self.layers_executed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "layers_executed", "counter incremented");
    }

    /// Count one evaluated project and whether it was eliminated.
    pub fn record_project(&self, eliminated: bool) {
        self.projects_evaluated.fetch_add(1, Ordering::Relaxed);
        if eliminated {
            self.projects_eliminated.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_default_scores(&self) {
        self.default_scores_applied.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "default_scores_applied", "counter incremented");
    }

    pub fn inc_commit_failures(&self) {
        self.commit_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "commit_failures", "counter incremented");
    }

    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            layers_executed = self.layers_executed(),
            projects_evaluated = self.projects_evaluated(),
            projects_eliminated = self.projects_eliminated(),
            default_scores_applied = self.default_scores_applied(),
            commit_failures = self.commit_failures(),
        );
    }

    pub fn layers_executed(&self) -> u64 {
        self.layers_executed.load(Ordering::Relaxed)
    }

    pub fn projects_evaluated(&self) -> u64 {
        self.projects_evaluated.load(Ordering::Relaxed)
    }

    pub fn projects_eliminated(&self) -> u64 {
        self.projects_eliminated.load(Ordering::Relaxed)
    }

    pub fn default_scores_applied(&self) -> u64 {
        self.default_scores_applied.load(Ordering::Relaxed)
    }

    pub fn commit_failures(&self) -> u64 {
        self.commit_failures.load(Ordering::Relaxed)
    }

    /// Zero every counter.
    pub fn reset(&self) {
        self.layers_executed.store(0, Ordering::Relaxed);
        self.projects_evaluated.store(0, Ordering::Relaxed);
        self.projects_eliminated.store(0, Ordering::Relaxed);
        self.default_scores_applied.store(0, Ordering::Relaxed);
        self.commit_failures.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_counts_split_eliminated() {
        let m = Metrics::new();
        m.record_project(false);
        m.record_project(true);
        m.record_project(true);
        assert_eq!(m.projects_evaluated(), 3);
        assert_eq!(m.projects_eliminated(), 2);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_layers_executed();
        m.record_project(true);
        m.inc_default_scores();
        m.inc_commit_failures();
        m.reset();
        assert_eq!(m.layers_executed(), 0);
        assert_eq!(m.projects_evaluated(), 0);
        assert_eq!(m.projects_eliminated(), 0);
        assert_eq!(m.default_scores_applied(), 0);
        assert_eq!(m.commit_failures(), 0);
    }
}
