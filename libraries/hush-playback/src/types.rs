//! Core types for session playback

use hush_core::types::seconds;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Playback state
///
/// Exactly one is active at a time and only the controller changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing loaded
    #[default]
    Idle,

    /// Opening the primary source or its speech fallback
    Loading,

    /// Audio is audible
    Playing,

    /// Paused mid-episode
    Paused,

    /// Source starved, waiting for data
    Buffering,

    /// Episode reached its natural end
    Completed,

    /// No playable source; needs `acknowledge`
    Failed,
}

impl PlaybackState {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Buffering => "buffering",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether a content source is live in this state
    pub fn has_live_source(&self) -> bool {
        matches!(self, Self::Playing | Self::Paused | Self::Buffering)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifier of one playback episode
///
/// Every `start`, and every repeat loop, gets a fresh id. Results that
/// arrive tagged with an older id are stale and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodeId(pub u64);

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Immutable position report
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Elapsed position
    #[serde(with = "seconds")]
    pub current_time: Duration,

    /// Total duration (zero while unknown)
    #[serde(with = "seconds")]
    pub duration: Duration,

    /// `current_time / duration`, clamped to [0, 1]
    pub normalized: f64,
}

impl ProgressSnapshot {
    /// The reset snapshot (0, 0, 0)
    pub const ZERO: Self = Self {
        current_time: Duration::ZERO,
        duration: Duration::ZERO,
        normalized: 0.0,
    };

    /// Build a snapshot, guarding against a zero duration
    pub fn new(current_time: Duration, duration: Option<Duration>) -> Self {
        let duration = duration.unwrap_or_default();
        let normalized = if duration.is_zero() {
            0.0
        } else {
            (current_time.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
        };

        Self {
            current_time,
            duration,
            normalized,
        }
    }
}

/// Why the controller entered `Paused`
///
/// Interruption pauses are transient: the grant is kept and the monitor may
/// resume on its own. Everything else needs the user to resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    /// Explicit pause from the UI or a remote control
    User,

    /// Hardware interruption (incoming call, alarm)
    Interruption,

    /// Output device went away
    RouteChange,
}

impl PauseReason {
    /// Whether this pause keeps the background grant
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Interruption)
    }
}

/// Configuration for the playback controller
///
/// Every policy constant lives here so hosts can tune them from config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Progress cadence (default: 0.5 s)
    #[serde(with = "seconds")]
    pub tick_interval: Duration,

    /// Minimum playback between two offset writes (default: 10 s)
    #[serde(with = "seconds")]
    pub offset_persist_interval: Duration,

    /// Now-playing refresh period while playing (default: 5 s)
    #[serde(with = "seconds")]
    pub now_playing_interval: Duration,

    /// Fraction played at which a manual stop counts as complete (default: 0.9)
    pub completion_threshold: f64,

    /// Reading rate used to estimate speech duration (default: 14 chars/s)
    pub speech_chars_per_second: f64,

    /// Default remote skip interval (default: 15 s)
    #[serde(with = "seconds")]
    pub skip_interval: Duration,

    /// Initial volume (0.0-1.0, default: 1.0)
    pub volume: f32,

    /// Initial repeat setting (default: false)
    pub repeat: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(500),
            offset_persist_interval: Duration::from_secs(10),
            now_playing_interval: Duration::from_secs(5),
            completion_threshold: 0.9,
            speech_chars_per_second: 14.0,
            skip_interval: Duration::from_secs(15),
            volume: 1.0,
            repeat: false,
        }
    }
}
