//! Structured lifecycle events for tournament sessions.
//!
//! Every event carries an `event = "..."` field so log pipelines can filter
//! on it. [`layer_span`] tags everything inside a layer run with the session
//! id and layer number.

use tracing::{info, warn, Span};

/// Span for one layer run. Attach it to the run's future with
/// `tracing::Instrument`.
///
/// ```ignore
/// run_layer().instrument(layer_span("sess-1", 2)).await;
/// // everything logged inside carries session_id and layer
/// ```
pub fn layer_span(session_id: &str, layer: u8) -> Span {
    tracing::info_span!("gauntlet.layer", session_id = %session_id, layer = layer)
}

pub fn emit_session_created(session_id: &str, event_id: &str, total_projects: u32) {
    info!(
        event = "session.created",
        session_id = %session_id,
        event_id = %event_id,
        total_projects = total_projects,
    );
}

pub fn emit_layer_started(session_id: &str, layer: u8, candidates: usize) {
    info!(event = "layer.started", session_id = %session_id, layer = layer, candidates = candidates);
}

/// Emit event: layer results persisted.
pub fn emit_layer_committed(
    session_id: &str,
    layer: u8,
    processed: usize,
    eliminated: u32,
    duration_ms: u64,
) {
    info!(
        event = "layer.committed",
        session_id = %session_id,
        layer = layer,
        processed = processed,
        eliminated = eliminated,
        duration_ms = duration_ms,
    );
}

pub fn emit_session_completed(session_id: &str, total_winners: u32, category_count: u32) {
    info!(
        event = "session.completed",
        session_id = %session_id,
        total_winners = total_winners,
        category_count = category_count,
    );
}

/// Emit event: the layer commit failed and the session was marked FAILED.
pub fn emit_commit_failed(session_id: &str, layer: u8, error: &dyn std::fmt::Display) {
    warn!(event = "layer.commit_failed", session_id = %session_id, layer = layer, error = %error);
}

pub fn emit_session_reset(session_id: &str, hard: bool) {
    info!(event = "session.reset", session_id = %session_id, hard = hard);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_and_events_do_not_panic_without_subscriber() {
        let _entered = layer_span("sess-1", 1).entered();
        emit_layer_started("sess-1", 1, 3);
        emit_commit_failed("sess-1", 1, &"disk full");
    }
}
