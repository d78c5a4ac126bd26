//! Remote control bridge
//!
//! Publishes now-playing information to the system control surface (lock
//! screen, media keys, car head unit) and translates the transport commands
//! it sends back into controller operations.

use crate::types::PlaybackState;
use hush_core::types::{seconds, SessionId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Read-only descriptor shown on the control surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlaying {
    /// Session being played
    pub session_id: SessionId,
    /// Title line
    pub title: String,
    /// Subtitle line
    pub subtitle: Option<String>,
    /// Total duration, if known
    #[serde(with = "seconds::option")]
    pub duration: Option<Duration>,
    /// Elapsed position
    #[serde(with = "seconds")]
    pub elapsed: Duration,
    /// 1.0 while playing, 0.0 otherwise
    pub rate: f32,
}

/// External now-playing surface
pub trait NowPlayingSurface: Send {
    /// Replace the displayed descriptor
    fn publish(&mut self, now_playing: &NowPlaying);

    /// Remove the descriptor
    fn clear(&mut self);
}

/// Transport command received from the control surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RemoteCommand {
    /// Play
    Play,
    /// Pause
    Pause,
    /// Play/pause toggle
    TogglePlayPause,
    /// Skip forward, by the configured interval when none is given
    SkipForward(Option<Duration>),
    /// Skip backward, by the configured interval when none is given
    SkipBackward(Option<Duration>),
}

/// Controller operation a remote command maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAction {
    /// Resume playback
    Resume,
    /// Pause playback
    Pause,
    /// Skip forward
    SkipForward(Duration),
    /// Skip backward
    SkipBackward(Duration),
    /// Acknowledge without a transition
    Ignore,
}

/// Now-playing publisher and command router
pub struct RemoteControlBridge {
    surface: Box<dyn NowPlayingSurface>,
    interval: Duration,
    skip_interval: Duration,
    last_bucket: Option<u64>,
}

impl RemoteControlBridge {
    /// Create a bridge that refreshes every `interval` of playback
    ///
    /// Skip commands without an interval of their own use `skip_interval`.
    pub fn new(
        surface: Box<dyn NowPlayingSurface>,
        interval: Duration,
        skip_interval: Duration,
    ) -> Self {
        Self {
            surface,
            interval,
            skip_interval,
            last_bucket: None,
        }
    }

    /// Publish unconditionally (state change, seek)
    pub fn publish(&mut self, now_playing: &NowPlaying) {
        debug!(
            "Now playing: {} at {:.1}s (rate {})",
            now_playing.title,
            now_playing.elapsed.as_secs_f64(),
            now_playing.rate
        );
        self.last_bucket = Some(self.bucket(now_playing.elapsed));
        self.surface.publish(now_playing);
    }

    /// Publish if playback crossed into a new refresh period
    ///
    /// Returns whether anything was published.
    pub fn refresh(&mut self, now_playing: &NowPlaying) -> bool {
        let bucket = self.bucket(now_playing.elapsed);
        if self.last_bucket == Some(bucket) {
            return false;
        }
        self.publish(now_playing);
        true
    }

    /// Remove the descriptor from the surface
    pub fn clear(&mut self) {
        self.last_bucket = None;
        self.surface.clear();
    }

    /// Map a remote command onto a controller operation
    ///
    /// Commands arriving while idle or failed are acknowledged and dropped.
    pub fn route(&self, command: RemoteCommand, state: PlaybackState) -> RemoteAction {
        let action = match state {
            PlaybackState::Idle | PlaybackState::Failed => RemoteAction::Ignore,
            _ => match command {
                RemoteCommand::Play => RemoteAction::Resume,
                RemoteCommand::Pause => RemoteAction::Pause,
                RemoteCommand::TogglePlayPause => match state {
                    PlaybackState::Playing | PlaybackState::Buffering => RemoteAction::Pause,
                    PlaybackState::Paused => RemoteAction::Resume,
                    _ => RemoteAction::Ignore,
                },
                RemoteCommand::SkipForward(interval) => {
                    RemoteAction::SkipForward(interval.unwrap_or(self.skip_interval))
                }
                RemoteCommand::SkipBackward(interval) => {
                    RemoteAction::SkipBackward(interval.unwrap_or(self.skip_interval))
                }
            },
        };
        info!("Remote command {:?} while {} -> {:?}", command, state, action);
        action
    }

    fn bucket(&self, elapsed: Duration) -> u64 {
        let period = self.interval.as_secs().max(1);
        elapsed.as_secs() / period
    }
}

impl std::fmt::Debug for RemoteControlBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteControlBridge")
            .field("interval", &self.interval)
            .field("skip_interval", &self.skip_interval)
            .field("last_bucket", &self.last_bucket)
            .finish_non_exhaustive()
    }
}
