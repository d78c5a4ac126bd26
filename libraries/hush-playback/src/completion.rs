//! Completion recording and persistence side effects
//!
//! The controller never waits on storage. It queues [`PersistenceJob`]s on an
//! unbounded channel; [`run_persistence_worker`] drains them against the
//! [`PersistenceStore`] and reports failures as non-fatal warnings.

use crate::error::PlaybackError;
use crate::events::PlaybackEvent;
use crate::types::{EpisodeId, ProgressSnapshot};
use hush_core::{AggregateDelta, CompletionRecord, PersistenceStore, SessionId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// A write for the persistence collaborator
#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceJob {
    /// Store a completion record
    RecordCompletion(CompletionRecord),
    /// Bump the aggregate counters
    IncrementCounters(AggregateDelta),
    /// Remember the last playback offset of a session
    UpdateLastOffset {
        /// Session
        session_id: SessionId,
        /// Offset
        offset: Duration,
    },
}

/// Builds completion records, at most one per episode
#[derive(Debug)]
pub struct CompletionRecorder {
    jobs: mpsc::UnboundedSender<PersistenceJob>,
    threshold: f64,
    last_recorded: Option<EpisodeId>,
}

impl CompletionRecorder {
    /// Create a recorder
    ///
    /// `threshold` is the fraction played at which a manual stop still counts
    /// as a completion.
    pub fn new(jobs: mpsc::UnboundedSender<PersistenceJob>, threshold: f64) -> Self {
        Self {
            jobs,
            threshold,
            last_recorded: None,
        }
    }

    /// Whether a stop at `progress` counts as completing the session
    pub fn counts_as_complete(&self, progress: &ProgressSnapshot) -> bool {
        !progress.duration.is_zero() && progress.normalized >= self.threshold
    }

    /// Whether this episode already produced a record
    pub fn is_recorded(&self, episode: EpisodeId) -> bool {
        self.last_recorded == Some(episode)
    }

    /// Record a completed episode
    ///
    /// Returns `None` if the episode was already recorded.
    pub fn record(
        &mut self,
        episode: EpisodeId,
        session_id: &SessionId,
        played: Duration,
        rating: Option<u8>,
    ) -> Option<CompletionRecord> {
        if self.is_recorded(episode) {
            debug!("Episode {} already recorded, skipping", episode);
            return None;
        }
        self.last_recorded = Some(episode);

        let record = CompletionRecord::new(session_id.clone(), played, rating);
        info!(
            "Session {} completed (episode {}, {:.1}s played)",
            session_id,
            episode,
            played.as_secs_f64()
        );

        self.send(PersistenceJob::RecordCompletion(record.clone()));
        self.send(PersistenceJob::IncrementCounters(AggregateDelta::completion(played)));
        self.send(PersistenceJob::UpdateLastOffset {
            session_id: session_id.clone(),
            offset: Duration::ZERO,
        });

        Some(record)
    }

    /// Queue a last-offset write
    pub fn persist_offset(&self, session_id: &SessionId, offset: Duration) {
        self.send(PersistenceJob::UpdateLastOffset {
            session_id: session_id.clone(),
            offset,
        });
    }

    fn send(&self, job: PersistenceJob) {
        if self.jobs.send(job).is_err() {
            warn!("Persistence worker is gone, dropping write");
        }
    }
}

/// Drain persistence jobs until every sender is dropped
///
/// Failures are logged and, when `events` is given, broadcast as
/// `PlaybackEvent::Warning`. Nothing is retried.
pub async fn run_persistence_worker(
    mut jobs: mpsc::UnboundedReceiver<PersistenceJob>,
    store: Arc<dyn PersistenceStore>,
    events: Option<broadcast::Sender<PlaybackEvent>>,
) {
    info!("Persistence worker started");

    while let Some(job) = jobs.recv().await {
        let result = match &job {
            PersistenceJob::RecordCompletion(record) => {
                store.record_completion(record.clone()).await
            }
            PersistenceJob::IncrementCounters(delta) => {
                store.increment_aggregate_counters(*delta).await
            }
            PersistenceJob::UpdateLastOffset { session_id, offset } => {
                store.update_last_offset(session_id, *offset).await
            }
        };

        if let Err(e) = result {
            let error = PlaybackError::PersistenceWriteFailed(e.to_string());
            warn!("{} ({:?})", error, job);
            if let Some(events) = &events {
                // No subscribers is fine
                let _ = events.send(PlaybackEvent::Warning {
                    message: error.to_string(),
                });
            }
        }
    }

    info!("Persistence channel closed, exiting");
}
