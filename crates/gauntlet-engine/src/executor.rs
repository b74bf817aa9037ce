//! Layer executor.
//!
//! Runs one layer of one session end to end: validate the request, select
//! the candidates that advanced out of the previous layer, evaluate them
//! through the batch processor, and hand the complete result list to the
//! store's atomic layer commit. Progress and lifecycle events are emitted
//! along the way; neither influences any decision.
//!
//! The executor does not serialize concurrent calls. Running the same layer
//! of the same session twice at once must be prevented by the caller.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use gauntlet_core::metrics::METRICS;
use gauntlet_core::obs::{
    emit_commit_failed, emit_layer_committed, emit_layer_started, emit_session_completed,
    emit_session_created, emit_session_reset, layer_span,
};
use gauntlet_core::{
    aggregate_final_results, process_in_batches, EngineConfig, Layer, ProgressEvent,
    ProgressTracker, RepositoryChecker,
};
use gauntlet_state::{
    EligibilityCriteria, FinalResults, LayerCommit, LayerResultRecord, NewSession, Project,
    ProjectSource, SessionId, SessionRecord, SessionStatus, SessionStore, FINAL_LAYER,
};
use tracing::{info, warn, Instrument};

use crate::error::{EngineError, Result};
use crate::evaluate::evaluate_project;
use crate::outcome::{LayerOutcome, ResetMode};

pub struct LayerExecutor {
    store: Arc<dyn SessionStore>,
    projects: Arc<dyn ProjectSource>,
    checker: Arc<dyn RepositoryChecker>,
    progress: Arc<ProgressTracker>,
    config: EngineConfig,
}

impl LayerExecutor {
    pub fn new(
        store: Arc<dyn SessionStore>,
        projects: Arc<dyn ProjectSource>,
        checker: Arc<dyn RepositoryChecker>,
        config: EngineConfig,
    ) -> Self {
        let progress = Arc::new(ProgressTracker::new(config.progress_retention()));
        Self {
            store,
            projects,
            checker,
            progress,
            config,
        }
    }

    /// Share a progress tracker with other executors or observers.
    pub fn with_progress(mut self, progress: Arc<ProgressTracker>) -> Self {
        self.progress = progress;
        self
    }

    pub fn progress(&self) -> &Arc<ProgressTracker> {
        &self.progress
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a PENDING session for `event_id`, counting its projects now.
    pub async fn create_session(
        &self,
        event_id: &str,
        criteria: EligibilityCriteria,
    ) -> Result<SessionRecord> {
        let projects = self.projects.fetch_projects(event_id).await?;
        let total_projects = projects.len() as u32;

        let session = self
            .store
            .create_session(NewSession {
                event_id: event_id.to_string(),
                total_projects,
                eligibility_criteria: criteria,
            })
            .await?;

        self.progress
            .record(
                &session.session_id,
                ProgressEvent::SessionInitialized { total_projects },
            )
            .await;
        emit_session_created(session.session_id.as_str(), event_id, total_projects);
        Ok(session)
    }

    /// Execute `layer` for a session.
    ///
    /// Rejected without side effects when the layer number is invalid, the
    /// session is terminal, or the session is not at this layer. A failed
    /// commit leaves the previous results in place, marks the session FAILED
    /// and returns [`EngineError::Persistence`].
    pub async fn execute_layer(&self, session_id: &SessionId, layer: u8) -> Result<LayerOutcome> {
        let layer = Layer::try_from(layer).map_err(|_| EngineError::InvalidLayer(layer))?;
        let session = self.store.get_session(session_id).await?;
        Self::check_turn(&session, layer)?;

        self.progress.evict_expired().await;
        self.run_layer(session, layer)
            .instrument(layer_span(session_id.as_str(), layer.number()))
            .await
    }

    async fn run_layer(&self, session: SessionRecord, layer: Layer) -> Result<LayerOutcome> {
        let session_id = &session.session_id;
        let started = Instant::now();

        self.store.set_status(session_id, layer.status()).await?;

        let projects = self.projects.fetch_projects(&session.event_id).await?;
        let candidates = self.candidates(session_id, layer, &projects).await?;

        self.progress
            .record(
                session_id,
                ProgressEvent::LayerStarted {
                    layer: layer.number(),
                    candidates: candidates.len(),
                },
            )
            .await;
        emit_layer_started(session_id.as_str(), layer.number(), candidates.len());

        let results = self
            .evaluate_candidates(session_id, layer, &session.eligibility_criteria, candidates)
            .await?;
        let processed = results.len();
        let eliminated = results.iter().filter(|r| r.eliminated).count() as u32;
        let advanced = processed as u32 - eliminated;

        let (status, final_results) = if layer.is_final() {
            let finals =
                aggregate_final_results(&results, &projects, self.config.top_n_per_category);
            (SessionStatus::Completed, Some(finals))
        } else {
            (layer.status(), None)
        };

        let commit = LayerCommit {
            session_id: session_id.clone(),
            layer: layer.number(),
            results: results.clone(),
            status,
            final_results: final_results.clone(),
        };
        if let Err(err) = self.store.commit_layer(commit).await {
            return Err(self.fail_commit(session_id, layer, err).await);
        }

        self.progress
            .record(
                session_id,
                ProgressEvent::LayerCompleted {
                    layer: layer.number(),
                    eliminated,
                    advanced,
                },
            )
            .await;
        emit_layer_committed(
            session_id.as_str(),
            layer.number(),
            processed,
            eliminated,
            started.elapsed().as_millis() as u64,
        );
        METRICS.inc_layers_executed();

        if let Some(finals) = &final_results {
            self.progress
                .record(
                    session_id,
                    ProgressEvent::SessionCompleted {
                        final_results: finals.clone(),
                    },
                )
                .await;
            emit_session_completed(session_id.as_str(), finals.total_winners, finals.category_count);
        }
        METRICS.flush();

        Ok(LayerOutcome {
            session_id: session_id.clone(),
            layer: layer.number(),
            processed,
            eliminated,
            advanced,
            results,
            final_results,
        })
    }

    /// Execute every layer from the session's current layer through the
    /// final one, stopping at the first error.
    pub async fn run_remaining(&self, session_id: &SessionId) -> Result<Vec<LayerOutcome>> {
        let session = self.store.get_session(session_id).await?;
        if session.status == SessionStatus::Failed {
            return Err(EngineError::SessionTerminal {
                session_id: session_id.to_string(),
                status: session.status,
            });
        }

        let mut outcomes = Vec::new();
        for layer in session.current_layer..=FINAL_LAYER {
            outcomes.push(self.execute_layer(session_id, layer).await?);
        }
        Ok(outcomes)
    }

    /// Soft reset returns the session back in PENDING; hard reset deletes
    /// it and returns `None`. Both drop the session's live progress.
    pub async fn reset_session(
        &self,
        session_id: &SessionId,
        mode: ResetMode,
    ) -> Result<Option<SessionRecord>> {
        let reset = match mode {
            ResetMode::Soft => Some(self.store.soft_reset(session_id).await?),
            ResetMode::Hard => {
                self.store.delete_session(session_id).await?;
                None
            }
        };
        self.progress.teardown(session_id).await;
        emit_session_reset(session_id.as_str(), mode == ResetMode::Hard);
        Ok(reset)
    }

    /// Final ranking of a COMPLETED session.
    pub async fn final_results(&self, session_id: &SessionId) -> Result<FinalResults> {
        let session = self.store.get_session(session_id).await?;
        match (session.status, session.final_results) {
            (SessionStatus::Completed, Some(finals)) => Ok(finals),
            (status, _) => Err(EngineError::NotCompleted {
                session_id: session_id.to_string(),
                status,
            }),
        }
    }

    pub async fn session(&self, session_id: &SessionId) -> Result<SessionRecord> {
        Ok(self.store.get_session(session_id).await?)
    }

    pub async fn layer_results(
        &self,
        session_id: &SessionId,
        layer: Option<u8>,
    ) -> Result<Vec<LayerResultRecord>> {
        if let Some(layer) = layer {
            Layer::try_from(layer).map_err(|_| EngineError::InvalidLayer(layer))?;
        }
        Ok(self.store.layer_results(session_id, layer).await?)
    }

    fn check_turn(session: &SessionRecord, layer: Layer) -> Result<()> {
        if session.is_terminal() {
            return Err(EngineError::SessionTerminal {
                session_id: session.session_id.to_string(),
                status: session.status,
            });
        }
        if session.current_layer != layer.number() || !session.status.can_transition_to(layer.status())
        {
            return Err(EngineError::OutOfTurn {
                session_id: session.session_id.to_string(),
                current: session.current_layer,
                requested: layer.number(),
            });
        }
        Ok(())
    }

    /// Projects that advanced out of the previous layer, in catalog order.
    ///
    /// Layer 1 takes the whole catalog. Later layers only take projects with
    /// a surviving row at layer L-1, so a project added to the event after
    /// layer 1 never enters the tournament.
    async fn candidates(
        &self,
        session_id: &SessionId,
        layer: Layer,
        projects: &[Project],
    ) -> Result<Vec<Project>> {
        if layer == Layer::Eligibility {
            return Ok(projects.to_vec());
        }

        let advanced: HashSet<String> = self
            .store
            .layer_results(session_id, Some(layer.number() - 1))
            .await?
            .into_iter()
            .filter(|r| !r.eliminated)
            .map(|r| r.project_id)
            .collect();

        let candidates: Vec<Project> = projects
            .iter()
            .filter(|p| advanced.contains(&p.id))
            .cloned()
            .collect();
        if candidates.len() < advanced.len() {
            warn!(
                session_id = %session_id,
                missing = advanced.len() - candidates.len(),
                "advanced projects no longer in the catalog"
            );
        }
        Ok(candidates)
    }

    async fn evaluate_candidates(
        &self,
        session_id: &SessionId,
        layer: Layer,
        criteria: &EligibilityCriteria,
        candidates: Vec<Project>,
    ) -> Result<Vec<LayerResultRecord>> {
        let checker = self.checker.as_ref();
        let progress = self.progress.as_ref();

        let decisions = process_in_batches(candidates, self.config.batch(), |project| async move {
            progress
                .record(
                    session_id,
                    ProgressEvent::ProjectStarted {
                        layer: layer.number(),
                        project_id: project.id.clone(),
                    },
                )
                .await;

            let decision = evaluate_project(layer, &project, criteria, checker).await;

            METRICS.record_project(decision.eliminated);
            if decision.evidence.default_applied() {
                METRICS.inc_default_scores();
            }
            progress
                .record(
                    session_id,
                    ProgressEvent::ProjectCompleted {
                        layer: layer.number(),
                        project_id: project.id.clone(),
                        eliminated: decision.eliminated,
                        score: decision.score,
                    },
                )
                .await;

            decision.into_record(session_id, layer, &project.id)
        })
        .await;

        decisions
            .into_iter()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(EngineError::from)
    }

    async fn fail_commit(
        &self,
        session_id: &SessionId,
        layer: Layer,
        err: gauntlet_state::StorageError,
    ) -> EngineError {
        METRICS.inc_commit_failures();
        emit_commit_failed(session_id.as_str(), layer.number(), &err);

        let reason = format!("layer {} commit failed: {err}", layer.number());
        if let Err(mark_err) = self.store.mark_failed(session_id, &reason).await {
            warn!(session_id = %session_id, error = %mark_err, "could not mark session failed");
        }
        self.progress
            .record(
                session_id,
                ProgressEvent::SessionFailed {
                    layer: Some(layer.number()),
                    reason,
                },
            )
            .await;
        info!(session_id = %session_id, layer = layer.number(), "session marked failed");

        EngineError::Persistence {
            session_id: session_id.to_string(),
            layer: layer.number(),
            source: err,
        }
    }
}
