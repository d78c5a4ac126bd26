//! Playback Events
//!
//! Two directions of traffic around the controller:
//! - [`PlaybackEvent`]: emitted by the controller for UIs and the host
//! - [`ControlEvent`]: fed into the controller (source results, ticks,
//!   platform notifications, remote commands)

use crate::error::Result;
use crate::monitor::{AppLifecycle, InterruptionSignal, RouteChangeReason};
use crate::remote::{NowPlaying, RemoteCommand};
use crate::resolver::LoadRequest;
use crate::source::ContentSource;
use crate::types::{PlaybackState, ProgressSnapshot};
use hush_core::CompletionRecord;
use serde::{Deserialize, Serialize};

/// Events emitted by the playback system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Playback state changed
    StateChanged {
        /// The new playback state
        state: PlaybackState,
    },

    /// Position update (every tick while a source is live, and on seek)
    Progress(ProgressSnapshot),

    /// Now-playing descriptor published to the control surface
    NowPlaying(NowPlaying),

    /// Now-playing descriptor removed
    NowPlayingCleared,

    /// A completion record was produced
    CompletionRecorded(CompletionRecord),

    /// Non-fatal problem (persistence write failed, grant expiring)
    Warning {
        /// Warning message
        message: String,
    },

    /// Playback failed
    Error {
        /// Error message
        message: String,
    },
}

/// Everything that can drive a controller transition besides direct calls
#[derive(Debug)]
pub enum ControlEvent {
    /// A load request finished
    SourceResolved {
        /// The request this answers
        request: LoadRequest,
        /// The opened source, or why it could not be opened
        result: Result<ContentSource>,
    },

    /// Progress cadence tick
    Tick,

    /// The live source ran out of data
    BufferUnderrun,

    /// The live source has data again
    BufferRecovered,

    /// Audio interruption
    Interruption(InterruptionSignal),

    /// Audio route change
    RouteChanged(RouteChangeReason),

    /// App focus change
    Lifecycle(AppLifecycle),

    /// The host is about to revoke a background grant
    GrantExpiring {
        /// Grant the notice is for
        grant_id: u64,
    },

    /// Transport command from the control surface
    Remote(RemoteCommand),
}

/// Notifications a host platform delivers
///
/// The subset of [`ControlEvent`] that originates outside the crate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlatformSignal {
    /// The live source ran out of data
    BufferUnderrun,
    /// The live source has data again
    BufferRecovered,
    /// Audio interruption
    Interruption(InterruptionSignal),
    /// Audio route change
    RouteChanged(RouteChangeReason),
    /// App focus change
    Lifecycle(AppLifecycle),
    /// A background grant is about to lapse
    GrantExpiring {
        /// Grant the notice is for
        grant_id: u64,
    },
    /// Transport command from the control surface
    Remote(RemoteCommand),
}

impl From<PlatformSignal> for ControlEvent {
    fn from(signal: PlatformSignal) -> Self {
        match signal {
            PlatformSignal::BufferUnderrun => ControlEvent::BufferUnderrun,
            PlatformSignal::BufferRecovered => ControlEvent::BufferRecovered,
            PlatformSignal::Interruption(signal) => ControlEvent::Interruption(signal),
            PlatformSignal::RouteChanged(reason) => ControlEvent::RouteChanged(reason),
            PlatformSignal::Lifecycle(lifecycle) => ControlEvent::Lifecycle(lifecycle),
            PlatformSignal::GrantExpiring { grant_id } => ControlEvent::GrantExpiring { grant_id },
            PlatformSignal::Remote(command) => ControlEvent::Remote(command),
        }
    }
}
