//! Hush - Session Playback
//!
//! Platform-agnostic playback orchestration for guided-audio sessions.
//!
//! This crate provides:
//! - Playback state machine (Idle, Loading, Playing, Paused, Buffering, Completed, Failed)
//! - Content source resolution (decoded audio, synthesized speech fallback)
//! - Progress tracking at a fixed cadence, with coalesced offset persistence
//! - Background execution grant discipline
//! - Interruption and audio route recovery
//! - Now-playing publication and remote transport commands
//! - Completion records and aggregate counters
//! - Volume (logarithmic, mute/unmute) and repeat
//!
//! # Architecture
//!
//! `hush-playback` knows nothing about a concrete audio stack, speech
//! engine, OS media controls or database. Platform code plugs in through
//! traits:
//! - [`ContentBackend`] opens [`DecodedAudio`] and [`SpeechOutput`] handles
//! - [`ExecutionHost`] grants background execution
//! - [`NowPlayingSurface`] shows the lock screen / media key descriptor
//! - [`hush_core::PersistenceStore`] stores completions and offsets
//!
//! [`SessionController`] is the synchronous state machine; [`PlaybackService`]
//! runs it on a tokio task and hands out a cloneable [`PlaybackHandle`].
//!
//! # Example: Driving the controller directly
//!
//! ```rust
//! use hush_core::PlayableSession;
//! use hush_playback::{
//!     ContentBackend, DecodedAudio, ExecutionGrant, ExecutionHost, NowPlaying,
//!     NowPlayingSurface, PlaybackConfig, PlaybackError, PlaybackState, Result,
//!     SessionController, SpeechOutput,
//! };
//! use std::path::{Path, PathBuf};
//! use std::sync::Arc;
//!
//! struct NoAudio;
//!
//! impl ContentBackend for NoAudio {
//!     fn open_audio(&self, _path: &Path) -> Result<Box<dyn DecodedAudio>> {
//!         Err(PlaybackError::source_unavailable("no audio stack"))
//!     }
//!
//!     fn synthesize(&self, _transcript: &str) -> Result<Box<dyn SpeechOutput>> {
//!         Err(PlaybackError::source_unavailable("no speech engine"))
//!     }
//! }
//!
//! struct Host;
//!
//! impl ExecutionHost for Host {
//!     fn acquire(&mut self) -> Result<ExecutionGrant> {
//!         Ok(ExecutionGrant { id: 1, expires_in: None })
//!     }
//!
//!     fn release(&mut self, _grant: ExecutionGrant) {}
//! }
//!
//! struct Surface;
//!
//! impl NowPlayingSurface for Surface {
//!     fn publish(&mut self, _now_playing: &NowPlaying) {}
//!     fn clear(&mut self) {}
//! }
//!
//! let (jobs, _jobs_rx) = tokio::sync::mpsc::unbounded_channel();
//! let mut controller = SessionController::new(
//!     PlaybackConfig::default(),
//!     Arc::new(NoAudio),
//!     Box::new(Host),
//!     Box::new(Surface),
//!     jobs,
//! );
//!
//! controller.start(
//!     PlayableSession::new("sleep-01", "Body Scan", PathBuf::from("/audio/sleep-01.m4a")),
//!     None,
//! );
//! controller.load_pending_blocking();
//!
//! // No audio and no transcript
//! assert_eq!(controller.state(), PlaybackState::Failed);
//! controller.acknowledge();
//! assert_eq!(controller.state(), PlaybackState::Idle);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod completion;
mod controller;
mod error;
mod events;
mod grant;
mod monitor;
mod progress;
mod remote;
mod resolver;
mod service;
mod source;
pub mod types;
mod volume;

// Public exports
pub use completion::{run_persistence_worker, CompletionRecorder, PersistenceJob};
pub use controller::SessionController;
pub use error::{PlaybackError, Result};
pub use events::{ControlEvent, PlatformSignal, PlaybackEvent};
pub use grant::{BackgroundExecutionGuard, ExecutionGrant, ExecutionHost};
pub use monitor::{
    AppLifecycle, InterruptionMonitor, InterruptionSignal, MonitorAction, RouteChangeReason,
};
pub use progress::{ProgressTracker, TickOutcome};
pub use remote::{NowPlaying, NowPlayingSurface, RemoteAction, RemoteCommand, RemoteControlBridge};
pub use resolver::{ContentResolver, LoadRequest, SourceStage};
pub use service::{Platform, PlaybackHandle, PlaybackService, PlaybackStatus, SignalSender};
pub use source::{ContentBackend, ContentSource, DecodedAudio, SpeechOutput};
pub use types::{EpisodeId, PauseReason, PlaybackConfig, PlaybackState, ProgressSnapshot};
pub use volume::Volume;
