/// Completion bookkeeping types
use super::{seconds, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// One finished listening episode
///
/// Created exactly once per completed episode and handed straight to the
/// persistence collaborator. `record_id` lets a store deduplicate retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// Unique record identifier
    pub record_id: Uuid,

    /// Session that was completed
    pub session_id: SessionId,

    /// When the episode completed
    pub completed_at: DateTime<Utc>,

    /// Time actually spent listening during the episode
    #[serde(with = "seconds")]
    pub duration_played: Duration,

    /// Optional user rating (1-5)
    pub rating: Option<u8>,
}

impl CompletionRecord {
    /// Create a record stamped with the current time
    pub fn new(session_id: SessionId, duration_played: Duration, rating: Option<u8>) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            session_id,
            completed_at: Utc::now(),
            duration_played,
            rating: rating.map(|r| r.clamp(1, 5)),
        }
    }
}

/// Increment applied to the aggregate listening counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregateDelta {
    /// Completed sessions to add
    pub completed_sessions: u32,

    /// Listening time to add
    #[serde(with = "seconds")]
    pub listening_time: Duration,
}

impl AggregateDelta {
    /// Delta for one completed episode
    pub fn completion(listening_time: Duration) -> Self {
        Self {
            completed_sessions: 1,
            listening_time,
        }
    }
}

/// Running totals kept by the persistence collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregateCounters {
    /// Total completed sessions
    pub completed_sessions: u64,

    /// Total listening time
    #[serde(with = "seconds")]
    pub listening_time: Duration,
}

impl AggregateCounters {
    /// Apply a delta
    pub fn apply(&mut self, delta: AggregateDelta) {
        self.completed_sessions += u64::from(delta.completed_sessions);
        self.listening_time += delta.listening_time;
    }
}
