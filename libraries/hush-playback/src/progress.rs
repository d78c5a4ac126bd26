//! Progress tracking
//!
//! Turns periodic ticks into [`ProgressSnapshot`]s. Decoded audio reports its
//! own position; synthesized speech does not, so the tracker advances its own
//! clock by one cadence interval per tick while the synthesizer is speaking.
//!
//! The tracker also decides when the last offset is worth persisting: at most
//! once per `persist_interval` of actual playback, never because of seeks.

use crate::types::ProgressSnapshot;
use std::time::Duration;

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    /// Position after the tick
    pub snapshot: ProgressSnapshot,
    /// Offset to persist, when the coalescing window has elapsed
    pub persist_offset: Option<Duration>,
    /// The content ran out
    pub reached_end: bool,
}

/// Per-episode progress tracker
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    cadence: Duration,
    persist_interval: Duration,
    current: Duration,
    duration: Option<Duration>,
    listened: Duration,
    since_persist: Duration,
}

impl ProgressTracker {
    /// Create an idle tracker
    pub fn new(cadence: Duration, persist_interval: Duration) -> Self {
        Self {
            cadence,
            persist_interval,
            current: Duration::ZERO,
            duration: None,
            listened: Duration::ZERO,
            since_persist: Duration::ZERO,
        }
    }

    /// Start tracking a new source
    pub fn begin(&mut self, duration: Option<Duration>, start_at: Duration) {
        self.duration = duration;
        self.current = start_at;
        self.listened = Duration::ZERO;
        self.since_persist = Duration::ZERO;
    }

    /// Tick for a source with native position reporting
    pub fn native_tick(&mut self, position: Duration, finished: bool) -> TickOutcome {
        self.current = match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        };
        let reached_end = finished || self.duration.is_some_and(|d| position >= d);
        self.advance(reached_end)
    }

    /// Tick for a self-clocked source
    ///
    /// Time only moves while `speaking`; the episode ends once the estimate
    /// is reached or the synthesizer reports it has finished.
    pub fn self_clocked_tick(&mut self, speaking: bool, finished: bool) -> TickOutcome {
        if speaking {
            self.current += self.cadence;
            if let Some(duration) = self.duration {
                self.current = self.current.min(duration);
            }
        }
        let reached_end = finished || self.duration.is_some_and(|d| self.current >= d);
        if speaking {
            self.advance(reached_end)
        } else {
            TickOutcome {
                snapshot: self.snapshot(),
                persist_offset: None,
                reached_end,
            }
        }
    }

    fn advance(&mut self, reached_end: bool) -> TickOutcome {
        self.listened += self.cadence;
        self.since_persist += self.cadence;

        let persist_offset = if !reached_end && self.since_persist >= self.persist_interval {
            self.since_persist = Duration::ZERO;
            Some(self.current)
        } else {
            None
        };

        TickOutcome {
            snapshot: self.snapshot(),
            persist_offset,
            reached_end,
        }
    }

    /// Record a seek acknowledged by the source
    pub fn seek(&mut self, position: Duration) -> ProgressSnapshot {
        self.current = position;
        self.snapshot()
    }

    /// Mark the content as fully played
    pub fn finish(&mut self) -> ProgressSnapshot {
        if let Some(duration) = self.duration {
            self.current = duration;
        }
        self.snapshot()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::new(self.current, self.duration)
    }

    /// Current position
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Known duration
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Time actually played this episode
    pub fn listened(&self) -> Duration {
        self.listened
    }

    /// Forget everything (back to 0, 0, 0)
    pub fn reset(&mut self) {
        self.current = Duration::ZERO;
        self.duration = None;
        self.listened = Duration::ZERO;
        self.since_persist = Duration::ZERO;
    }
}
