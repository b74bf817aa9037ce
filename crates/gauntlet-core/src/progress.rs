//! Live progress for running sessions.
//!
//! `ProgressTracker` is an explicit, caller-owned registry keyed by session
//! id. The executor records coarse layer events and fine per-project events;
//! observers either poll a [`ProgressSnapshot`] or subscribe to the
//! broadcast stream of [`ProgressUpdate`]s. Nothing recorded here feeds
//! back into scoring.
//!
//! [`ProgressTracker::evict_expired`] drops entries that have gone a full
//! retention window without an update: finished sessions, and sessions
//! abandoned mid-layer that were never retried or reset. Resets drop an
//! entry immediately through [`ProgressTracker::teardown`].

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use gauntlet_state::{FinalResults, SessionId};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 1024;

/// One progress event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    SessionInitialized {
        total_projects: u32,
    },
    LayerStarted {
        layer: u8,
        candidates: usize,
    },
    ProjectStarted {
        layer: u8,
        project_id: String,
    },
    ProjectCompleted {
        layer: u8,
        project_id: String,
        eliminated: bool,
        score: f64,
    },
    LayerCompleted {
        layer: u8,
        eliminated: u32,
        advanced: u32,
    },
    SessionCompleted {
        final_results: FinalResults,
    },
    SessionFailed {
        layer: Option<u8>,
        reason: String,
    },
}

/// A progress event stamped with its session and time.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    pub session_id: String,
    pub at: DateTime<Utc>,
    pub event: ProgressEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    Initialized,
    LayerRunning,
    LayerCompleted,
    Completed,
    Failed,
}

impl ProgressPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProgressPhase::Completed | ProgressPhase::Failed)
    }
}

/// Point-in-time view of a session's progress.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    pub session_id: String,
    pub phase: ProgressPhase,
    pub total_projects: u32,
    pub current_layer: Option<u8>,
    /// Candidates of the current layer
    pub layer_candidates: usize,
    pub layer_processed: usize,
    pub layer_eliminated: usize,
    pub last_project: Option<String>,
    /// Layers finished so far, with (eliminated, advanced)
    pub completed_layers: Vec<(u8, u32, u32)>,
    pub final_results: Option<FinalResults>,
    pub failure_reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressSnapshot {
    fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            phase: ProgressPhase::Initialized,
            total_projects: 0,
            current_layer: None,
            layer_candidates: 0,
            layer_processed: 0,
            layer_eliminated: 0,
            last_project: None,
            completed_layers: Vec::new(),
            final_results: None,
            failure_reason: None,
            updated_at: Utc::now(),
        }
    }

    fn apply(&mut self, event: &ProgressEvent, at: DateTime<Utc>) {
        self.updated_at = at;
        match event {
            ProgressEvent::SessionInitialized { total_projects } => {
                *self = Self::new(&self.session_id);
                self.total_projects = *total_projects;
            }
            ProgressEvent::LayerStarted { layer, candidates } => {
                self.phase = ProgressPhase::LayerRunning;
                self.current_layer = Some(*layer);
                self.layer_candidates = *candidates;
                self.layer_processed = 0;
                self.layer_eliminated = 0;
                self.last_project = None;
                // A rerun replaces the layer's earlier summary.
                self.completed_layers.retain(|(l, _, _)| l < layer);
            }
            ProgressEvent::ProjectStarted { project_id, .. } => {
                self.last_project = Some(project_id.clone());
            }
            ProgressEvent::ProjectCompleted { eliminated, .. } => {
                self.layer_processed += 1;
                if *eliminated {
                    self.layer_eliminated += 1;
                }
            }
            ProgressEvent::LayerCompleted {
                layer,
                eliminated,
                advanced,
            } => {
                self.phase = ProgressPhase::LayerCompleted;
                self.completed_layers.push((*layer, *eliminated, *advanced));
            }
            ProgressEvent::SessionCompleted { final_results } => {
                self.phase = ProgressPhase::Completed;
                self.final_results = Some(final_results.clone());
            }
            ProgressEvent::SessionFailed { layer, reason } => {
                self.phase = ProgressPhase::Failed;
                if layer.is_some() {
                    self.current_layer = *layer;
                }
                self.failure_reason = Some(reason.clone());
            }
        }
    }
}

struct Entry {
    snapshot: ProgressSnapshot,
    last_update: Instant,
}

/// Session-keyed progress registry with a broadcast side channel.
pub struct ProgressTracker {
    entries: Mutex<HashMap<String, Entry>>,
    tx: broadcast::Sender<ProgressUpdate>,
    retention: Duration,
}

impl ProgressTracker {
    pub fn new(retention: Duration) -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            entries: Mutex::new(HashMap::new()),
            tx,
            retention,
        }
    }

    /// Record an event for a session and broadcast it.
    pub async fn record(&self, session_id: &SessionId, event: ProgressEvent) {
        let at = Utc::now();
        {
            let mut entries = self.entries.lock().await;
            let entry = entries.entry(session_id.0.clone()).or_insert_with(|| Entry {
                snapshot: ProgressSnapshot::new(&session_id.0),
                last_update: Instant::now(),
            });
            entry.snapshot.apply(&event, at);
            entry.last_update = Instant::now();
        }

        // No subscribers is fine.
        let _ = self.tx.send(ProgressUpdate {
            session_id: session_id.0.clone(),
            at,
            event,
        });
    }

    pub async fn snapshot(&self, session_id: &SessionId) -> Option<ProgressSnapshot> {
        let entries = self.entries.lock().await;
        entries.get(&session_id.0).map(|e| e.snapshot.clone())
    }

    /// Stream of every update recorded after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.tx.subscribe()
    }

    /// Drop a session's entry now.
    pub async fn teardown(&self, session_id: &SessionId) -> bool {
        let removed = self.entries.lock().await.remove(&session_id.0).is_some();
        if removed {
            debug!(session_id = %session_id, "progress entry torn down");
        }
        removed
    }

    /// Drop entries not updated within the retention window, terminal or
    /// not. Returns how many were removed.
    pub async fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, e| now.duration_since(e.last_update) < self.retention);
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted, "expired progress entries evicted");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn finals() -> FinalResults {
        FinalResults {
            winners: BTreeMap::new(),
            generated_at: Utc::now(),
            total_winners: 0,
            total_candidates: 0,
            category_count: 0,
        }
    }

    #[tokio::test]
    async fn snapshot_follows_layer_events() {
        let tracker = ProgressTracker::default();
        let sid = SessionId::from("s-1");

        tracker
            .record(&sid, ProgressEvent::SessionInitialized { total_projects: 3 })
            .await;
        tracker
            .record(
                &sid,
                ProgressEvent::LayerStarted {
                    layer: 1,
                    candidates: 3,
                },
            )
            .await;
        for (id, eliminated) in [("a", false), ("b", true)] {
            tracker
                .record(
                    &sid,
                    ProgressEvent::ProjectStarted {
                        layer: 1,
                        project_id: id.to_string(),
                    },
                )
                .await;
            tracker
                .record(
                    &sid,
                    ProgressEvent::ProjectCompleted {
                        layer: 1,
                        project_id: id.to_string(),
                        eliminated,
                        score: 0.0,
                    },
                )
                .await;
        }

        let snap = tracker.snapshot(&sid).await.unwrap();
        assert_eq!(snap.phase, ProgressPhase::LayerRunning);
        assert_eq!(snap.total_projects, 3);
        assert_eq!(snap.current_layer, Some(1));
        assert_eq!(snap.layer_processed, 2);
        assert_eq!(snap.layer_eliminated, 1);
        assert_eq!(snap.last_project.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn subscribers_receive_updates_in_order() {
        let tracker = ProgressTracker::default();
        let mut rx = tracker.subscribe();
        let sid = SessionId::from("s-1");

        tracker
            .record(&sid, ProgressEvent::SessionInitialized { total_projects: 1 })
            .await;
        tracker
            .record(
                &sid,
                ProgressEvent::LayerCompleted {
                    layer: 1,
                    eliminated: 0,
                    advanced: 1,
                },
            )
            .await;

        let first = rx.recv().await.unwrap();
        assert_eq!(first.session_id, "s-1");
        assert!(matches!(
            first.event,
            ProgressEvent::SessionInitialized { total_projects: 1 }
        ));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second.event, ProgressEvent::LayerCompleted { .. }));
    }

    #[tokio::test]
    async fn rerun_replaces_layer_summary() {
        let tracker = ProgressTracker::default();
        let sid = SessionId::from("s-1");
        for _ in 0..2 {
            tracker
                .record(
                    &sid,
                    ProgressEvent::LayerStarted {
                        layer: 2,
                        candidates: 4,
                    },
                )
                .await;
            tracker
                .record(
                    &sid,
                    ProgressEvent::LayerCompleted {
                        layer: 2,
                        eliminated: 1,
                        advanced: 3,
                    },
                )
                .await;
        }
        let snap = tracker.snapshot(&sid).await.unwrap();
        assert_eq!(snap.completed_layers, vec![(2, 1, 3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_entries_expire_after_retention() {
        let tracker = ProgressTracker::new(Duration::from_secs(60));
        let done = SessionId::from("done");
        let running = SessionId::from("running");

        tracker
            .record(
                &done,
                ProgressEvent::SessionCompleted {
                    final_results: finals(),
                },
            )
            .await;
        tracker
            .record(
                &running,
                ProgressEvent::LayerStarted {
                    layer: 1,
                    candidates: 1,
                },
            )
            .await;

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(tracker.evict_expired().await, 0);
        tracker
            .record(
                &running,
                ProgressEvent::ProjectStarted {
                    layer: 1,
                    project_id: "a".to_string(),
                },
            )
            .await;

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(tracker.evict_expired().await, 1);
        assert!(tracker.snapshot(&done).await.is_none());
        assert!(tracker.snapshot(&running).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_running_entries_expire_after_retention() {
        let tracker = ProgressTracker::new(Duration::from_secs(60));
        let stalled = SessionId::from("stalled");
        tracker
            .record(
                &stalled,
                ProgressEvent::LayerStarted {
                    layer: 2,
                    candidates: 10,
                },
            )
            .await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(tracker.evict_expired().await, 0);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(tracker.evict_expired().await, 1);
        assert!(tracker.is_empty().await);
    }

    #[tokio::test]
    async fn teardown_removes_entry() {
        let tracker = ProgressTracker::default();
        let sid = SessionId::from("s-1");
        tracker
            .record(
                &sid,
                ProgressEvent::SessionFailed {
                    layer: Some(2),
                    reason: "storage down".to_string(),
                },
            )
            .await;
        let snap = tracker.snapshot(&sid).await.unwrap();
        assert_eq!(snap.phase, ProgressPhase::Failed);
        assert!(snap.phase.is_terminal());
        assert_eq!(snap.failure_reason.as_deref(), Some("storage down"));

        assert!(tracker.teardown(&sid).await);
        assert!(!tracker.teardown(&sid).await);
        assert!(tracker.is_empty().await);
    }
}
