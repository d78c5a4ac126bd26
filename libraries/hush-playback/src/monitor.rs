//! Interruption and route monitor
//!
//! Maps externally triggered signals onto pause/resume decisions. The
//! monitor never touches the source itself; it tells the controller what to
//! do and remembers why playback was paused, because only a pause it caused
//! through a hardware interruption may end in an automatic resume.

use crate::types::{PauseReason, PlaybackState};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Audio interruption notice (incoming call, alarm, another app taking audio)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptionSignal {
    /// Interruption started
    Began,
    /// Interruption is over
    Ended {
        /// The host suggests resuming playback
        should_resume: bool,
    },
}

/// Why the audio route changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteChangeReason {
    /// The current output device disappeared (headphones unplugged)
    DeviceUnavailable,
    /// A new output device appeared
    NewDeviceAvailable,
    /// The audio category changed
    CategoryChange,
    /// Output was overridden
    Override,
    /// Anything else
    Other,
}

/// Application focus transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppLifecycle {
    /// App lost foreground focus
    Background,
    /// App regained foreground focus
    Foreground,
}

/// What the controller should do about a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorAction {
    /// Pause for the given reason
    Pause(PauseReason),
    /// Resume playback
    Resume,
    /// Leave the state alone
    Ignore,
}

/// Recovery policy for external signals
#[derive(Debug, Clone, Default)]
pub struct InterruptionMonitor {
    paused_by: Option<PauseReason>,
}

impl InterruptionMonitor {
    /// Create a monitor
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide on an interruption signal
    pub fn on_interruption(
        &self,
        signal: InterruptionSignal,
        state: PlaybackState,
    ) -> MonitorAction {
        match signal {
            InterruptionSignal::Began if state == PlaybackState::Playing => {
                info!("Audio interruption began, pausing");
                MonitorAction::Pause(PauseReason::Interruption)
            }
            InterruptionSignal::Began => {
                debug!("Audio interruption began while {}, ignoring", state);
                MonitorAction::Ignore
            }
            InterruptionSignal::Ended { should_resume } => {
                let ours = state == PlaybackState::Paused
                    && self.paused_by == Some(PauseReason::Interruption);
                if ours && should_resume {
                    info!("Audio interruption ended, resuming");
                    MonitorAction::Resume
                } else {
                    debug!(
                        "Audio interruption ended (should_resume={}), staying {}",
                        should_resume, state
                    );
                    MonitorAction::Ignore
                }
            }
        }
    }

    /// Decide on a route change
    ///
    /// Only losing the current output device while playing pauses.
    pub fn on_route_change(&self, reason: RouteChangeReason, state: PlaybackState) -> MonitorAction {
        if reason == RouteChangeReason::DeviceUnavailable && state == PlaybackState::Playing {
            info!("Output device became unavailable, pausing");
            MonitorAction::Pause(PauseReason::RouteChange)
        } else {
            debug!("Route change {:?} while {}, ignoring", reason, state);
            MonitorAction::Ignore
        }
    }

    /// Record a focus change
    ///
    /// Never changes state: the execution grant covers background playback,
    /// and coming back to the foreground does not resume a non-hardware pause.
    pub fn on_lifecycle(
        &self,
        lifecycle: AppLifecycle,
        state: PlaybackState,
        speech_active: bool,
    ) -> MonitorAction {
        match lifecycle {
            AppLifecycle::Background => {
                debug!("App moved to background while {}", state);
            }
            AppLifecycle::Foreground => {
                if state == PlaybackState::Paused && speech_active {
                    debug!(
                        "App returned to foreground with speech paused by {:?}, not resuming",
                        self.paused_by
                    );
                } else {
                    debug!("App returned to foreground while {}", state);
                }
            }
        }
        MonitorAction::Ignore
    }

    /// Remember why playback paused
    pub fn note_paused(&mut self, reason: PauseReason) {
        self.paused_by = Some(reason);
    }

    /// Playback resumed or stopped
    pub fn clear(&mut self) {
        self.paused_by = None;
    }

    /// Why playback is paused, if it is
    pub fn paused_by(&self) -> Option<PauseReason> {
        self.paused_by
    }
}
