//! Session controller - core orchestration
//!
//! Owns the playback state, the single live content source and the single
//! background execution grant. Everything that can change them goes through
//! this type: direct calls from the UI and [`ControlEvent`]s from the
//! platform. The controller is synchronous; the reactor in
//! [`crate::service`] serializes calls onto it and performs the slow work
//! (opening sources, persistence) elsewhere.

use crate::{
    completion::{CompletionRecorder, PersistenceJob},
    error::{PlaybackError, Result},
    events::{ControlEvent, PlaybackEvent},
    grant::{BackgroundExecutionGuard, ExecutionHost},
    monitor::{InterruptionMonitor, MonitorAction},
    progress::ProgressTracker,
    remote::{NowPlaying, NowPlayingSurface, RemoteAction, RemoteControlBridge},
    resolver::{ContentResolver, LoadRequest, SourceStage},
    source::{ContentBackend, ContentSource},
    types::{EpisodeId, PauseReason, PlaybackConfig, PlaybackState, ProgressSnapshot},
    volume::Volume,
};
use hush_core::PlayableSession;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Where a freshly loaded source starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartPosition {
    Beginning,
    /// Offset passed to `start`; clamped to the duration
    Explicit(Duration),
    /// Last persisted offset; dropped if it is past the content
    Resume(Duration),
}

/// Playback state machine for one session at a time
pub struct SessionController {
    config: PlaybackConfig,
    state: PlaybackState,
    resolver: ContentResolver,

    session: Option<PlayableSession>,
    episode: Option<EpisodeId>,
    next_episode: u64,
    start_position: StartPosition,
    pending_load: Option<LoadRequest>,

    // The one live source
    source: Option<ContentSource>,

    progress: ProgressTracker,
    guard: BackgroundExecutionGuard,
    monitor: InterruptionMonitor,
    remote: RemoteControlBridge,
    recorder: CompletionRecorder,
    volume: Volume,
    repeat: bool,
    pending_rating: Option<u8>,
    last_error: Option<PlaybackError>,

    // Event queue for UI synchronization
    pending_events: Vec<PlaybackEvent>,
}

impl SessionController {
    /// Create a controller
    ///
    /// Persistence writes are queued on `jobs`; run
    /// [`crate::run_persistence_worker`] on the other end.
    pub fn new(
        config: PlaybackConfig,
        backend: Arc<dyn ContentBackend>,
        host: Box<dyn ExecutionHost>,
        surface: Box<dyn NowPlayingSurface>,
        jobs: mpsc::UnboundedSender<PersistenceJob>,
    ) -> Self {
        Self {
            state: PlaybackState::Idle,
            resolver: ContentResolver::new(backend, config.speech_chars_per_second),
            session: None,
            episode: None,
            next_episode: 0,
            start_position: StartPosition::Beginning,
            pending_load: None,
            source: None,
            progress: ProgressTracker::new(config.tick_interval, config.offset_persist_interval),
            guard: BackgroundExecutionGuard::new(host),
            monitor: InterruptionMonitor::new(),
            remote: RemoteControlBridge::new(
                surface,
                config.now_playing_interval,
                config.skip_interval,
            ),
            recorder: CompletionRecorder::new(jobs, config.completion_threshold),
            volume: Volume::new(config.volume),
            repeat: config.repeat,
            pending_rating: None,
            last_error: None,
            pending_events: Vec::new(),
            config,
        }
    }

    // ===== Playback Control =====

    /// Begin a new episode for `session`
    ///
    /// Any active episode is stopped first. Without an explicit offset the
    /// session's last known offset is used. The controller enters `Loading`
    /// and queues a load request (see [`Self::take_load_request`]).
    pub fn start(&mut self, session: PlayableSession, offset: Option<Duration>) -> EpisodeId {
        match self.state {
            PlaybackState::Idle => {}
            PlaybackState::Failed => self.reset_to_idle(),
            _ => {
                info!("Starting {} replaces the active episode", session.id);
                self.stop();
            }
        }

        let position = match offset {
            Some(offset) => StartPosition::Explicit(offset),
            None if !session.last_offset.is_zero() => StartPosition::Resume(session.last_offset),
            None => StartPosition::Beginning,
        };
        self.begin_episode(session, position)
    }

    /// Pause at the user's request
    pub fn pause(&mut self) {
        self.pause_with(PauseReason::User);
    }

    /// Resume a paused episode
    pub fn resume(&mut self) {
        if self.state != PlaybackState::Paused {
            debug!("resume() while {}, ignoring", self.state);
            return;
        }

        if let Err(e) = self.guard.ensure() {
            self.fail(e);
            return;
        }

        let resumed = match self.source.as_mut() {
            Some(source) => source.resume(),
            None => Err(PlaybackError::NoActiveEpisode),
        };
        if let Err(e) = resumed {
            self.fail(e);
            return;
        }

        self.monitor.clear();
        self.set_state(PlaybackState::Playing);
        self.publish_now_playing();
    }

    /// Stop the active episode and return to `Idle`
    ///
    /// Stopping with at least the completion threshold played still counts
    /// as a completion. Stopping while loading cancels the load. `Failed`
    /// is left only through [`Self::acknowledge`].
    pub fn stop(&mut self) {
        match self.state {
            PlaybackState::Idle => {
                debug!("stop() while idle, ignoring");
            }
            PlaybackState::Failed => {
                debug!("stop() while failed, waiting for acknowledge");
            }
            PlaybackState::Loading | PlaybackState::Completed => {
                info!("Cancelling load of episode {:?}", self.episode);
                self.reset_to_idle();
            }
            PlaybackState::Playing | PlaybackState::Paused | PlaybackState::Buffering => {
                let snapshot = self.progress.snapshot();
                if self.recorder.counts_as_complete(&snapshot) {
                    if let Some(episode) = self.episode {
                        info!(
                            "Stopped at {:.0}% played, counting as complete",
                            snapshot.normalized * 100.0
                        );
                        self.record_completion(episode, self.progress.listened());
                    }
                }
                self.reset_to_idle();
            }
        }
    }

    /// Move the live source to `position`
    ///
    /// The target is clamped to the duration. A no-op without a live source.
    ///
    /// # Errors
    /// `NotSeekable` for speech and for audio of unknown duration; errors
    /// from the source itself are passed through
    pub fn seek(&mut self, position: Duration) -> Result<()> {
        if !self.state.has_live_source() {
            debug!("seek() while {}, ignoring", self.state);
            return Ok(());
        }
        let Some(source) = self.source.as_mut() else {
            return Ok(());
        };
        if !source.is_seekable() {
            return Err(PlaybackError::NotSeekable);
        }

        let target = source.duration().map_or(position, |d| position.min(d));
        let landed = source.seek(target)?;
        let snapshot = self.progress.seek(landed);
        debug!("Seeked to {:.1}s", landed.as_secs_f64());

        self.emit(PlaybackEvent::Progress(snapshot));
        self.publish_now_playing();
        Ok(())
    }

    /// Seek forward by `interval`
    ///
    /// # Errors
    /// See [`Self::seek`]
    pub fn skip_forward(&mut self, interval: Duration) -> Result<()> {
        self.seek(self.progress.current().saturating_add(interval))
    }

    /// Seek backward by `interval`, stopping at zero
    ///
    /// # Errors
    /// See [`Self::seek`]
    pub fn skip_backward(&mut self, interval: Duration) -> Result<()> {
        self.seek(self.progress.current().saturating_sub(interval))
    }

    /// Leave `Failed`
    pub fn acknowledge(&mut self) {
        if self.state == PlaybackState::Failed {
            self.reset_to_idle();
        }
    }

    // ===== Volume / Settings =====

    /// Set volume (0.0-1.0)
    pub fn set_volume(&mut self, level: f32) {
        self.volume.set_level(level);
        self.apply_gain();
    }

    /// Toggle mute, returning the new mute state
    pub fn toggle_mute(&mut self) -> bool {
        let muted = self.volume.toggle_mute();
        self.apply_gain();
        muted
    }

    /// Loop the session when it ends naturally
    pub fn set_repeat_enabled(&mut self, enabled: bool) {
        self.repeat = enabled;
    }

    /// Attach a rating (1-5) to the current episode's completion record
    pub fn set_pending_rating(&mut self, rating: u8) {
        if self.episode.is_some() && self.state != PlaybackState::Idle {
            self.pending_rating = Some(rating.clamp(1, 5));
        }
    }

    // ===== Events =====

    /// Feed an event into the state machine
    pub fn handle_event(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::SourceResolved { request, result } => {
                self.on_source_resolved(request, result);
            }
            ControlEvent::Tick => self.on_tick(),
            ControlEvent::BufferUnderrun => {
                if self.state == PlaybackState::Playing {
                    self.set_state(PlaybackState::Buffering);
                    self.publish_now_playing();
                }
            }
            ControlEvent::BufferRecovered => {
                if self.state == PlaybackState::Buffering {
                    self.set_state(PlaybackState::Playing);
                    self.publish_now_playing();
                }
            }
            ControlEvent::Interruption(signal) => {
                let action = self.monitor.on_interruption(signal, self.state);
                self.apply(action);
            }
            ControlEvent::RouteChanged(reason) => {
                let action = self.monitor.on_route_change(reason, self.state);
                self.apply(action);
            }
            ControlEvent::Lifecycle(lifecycle) => {
                let speech_active = self.source.as_ref().is_some_and(ContentSource::is_speech);
                let action = self.monitor.on_lifecycle(lifecycle, self.state, speech_active);
                self.apply(action);
            }
            ControlEvent::GrantExpiring { grant_id } => {
                if self.guard.is_expiring(grant_id) {
                    warn!("Background grant {} expiring, stopping playback", grant_id);
                    self.emit(PlaybackEvent::Warning {
                        message: PlaybackError::GrantExpiring.to_string(),
                    });
                    self.stop();
                } else {
                    debug!("Expiry notice for released grant {}, ignoring", grant_id);
                }
            }
            ControlEvent::Remote(command) => match self.remote.route(command, self.state) {
                RemoteAction::Resume => self.resume(),
                RemoteAction::Pause => self.pause(),
                RemoteAction::SkipForward(interval) => {
                    if let Err(e) = self.skip_forward(interval) {
                        warn!("Remote skip forward failed: {}", e);
                    }
                }
                RemoteAction::SkipBackward(interval) => {
                    if let Err(e) = self.skip_backward(interval) {
                        warn!("Remote skip backward failed: {}", e);
                    }
                }
                RemoteAction::Ignore => {}
            },
        }
    }

    /// Take the queued load request, if any
    ///
    /// The caller resolves it (usually off the control path) and feeds the
    /// result back as [`ControlEvent::SourceResolved`].
    pub fn take_load_request(&mut self) -> Option<LoadRequest> {
        self.pending_load.take()
    }

    /// Resolve queued load requests on the calling thread
    ///
    /// Covers the primary attempt and the speech fallback.
    pub fn load_pending_blocking(&mut self) {
        while let Some(request) = self.take_load_request() {
            let result = self.resolver.resolve(&request);
            self.handle_event(ControlEvent::SourceResolved { request, result });
        }
    }

    /// Drain all pending events
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // ===== State Queries =====

    /// Current state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Current progress
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Most recent episode
    pub fn episode(&self) -> Option<EpisodeId> {
        self.episode
    }

    /// Session of the active episode
    pub fn session(&self) -> Option<&PlayableSession> {
        self.session.as_ref()
    }

    /// Why the controller is `Failed`
    pub fn last_error(&self) -> Option<&PlaybackError> {
        self.last_error.as_ref()
    }

    /// Resolver used for load requests
    pub fn resolver(&self) -> &ContentResolver {
        &self.resolver
    }

    /// Configuration
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Whether a background grant is held
    pub fn grant_held(&self) -> bool {
        self.guard.is_held()
    }

    /// Whether the live source is the speech fallback
    pub fn is_speech_active(&self) -> bool {
        self.source.as_ref().is_some_and(ContentSource::is_speech)
    }

    /// Whether a source is live
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Volume level (0.0-1.0)
    pub fn volume(&self) -> f32 {
        self.volume.level()
    }

    /// Whether output is muted
    pub fn is_muted(&self) -> bool {
        self.volume.is_muted()
    }

    /// Whether repeat is on
    pub fn repeat_enabled(&self) -> bool {
        self.repeat
    }

    /// Descriptor for the control surface, while a session is loaded
    pub fn now_playing(&self) -> Option<NowPlaying> {
        let session = self.session.as_ref()?;
        Some(NowPlaying {
            session_id: session.id.clone(),
            title: session.title.clone(),
            subtitle: session.subtitle.clone(),
            duration: self.progress.duration().or(session.duration),
            elapsed: self.progress.current(),
            rate: if self.state == PlaybackState::Playing {
                1.0
            } else {
                0.0
            },
        })
    }

    // ===== Transitions =====

    fn begin_episode(&mut self, session: PlayableSession, position: StartPosition) -> EpisodeId {
        self.next_episode += 1;
        let episode = EpisodeId(self.next_episode);
        info!("Episode {}: loading {} ({})", episode, session.id, session.title);

        self.episode = Some(episode);
        self.start_position = position;
        self.pending_rating = None;
        self.last_error = None;
        self.progress.reset();
        self.pending_load = Some(LoadRequest {
            episode,
            session: session.clone(),
            stage: SourceStage::Primary,
        });
        self.session = Some(session);
        self.set_state(PlaybackState::Loading);
        episode
    }

    fn on_source_resolved(&mut self, request: LoadRequest, result: Result<ContentSource>) {
        if self.state != PlaybackState::Loading || self.episode != Some(request.episode) {
            debug!(
                "Dropping stale {:?} result for episode {}",
                request.stage, request.episode
            );
            if let Ok(source) = result {
                source.release();
            }
            return;
        }

        match result {
            Ok(source) => self.on_source_ready(request, source),
            Err(e) => self.on_source_failed(request, e),
        }
    }

    fn on_source_ready(&mut self, request: LoadRequest, mut source: ContentSource) {
        if let Err(e) = self.guard.ensure() {
            source.release();
            self.fail(e);
            return;
        }

        let start_at = self.seek_to_start(&mut source);
        source.set_gain(self.volume.gain());
        if let Err(e) = source.begin() {
            source.release();
            self.guard.release();
            self.on_source_failed(request, e);
            return;
        }

        self.progress.begin(source.duration(), start_at);
        info!(
            "Episode {} ready: {:?} from {:.1}s",
            request.episode,
            source,
            start_at.as_secs_f64()
        );

        self.source = Some(source);
        self.monitor.clear();
        self.set_state(PlaybackState::Playing);
        self.emit(PlaybackEvent::Progress(self.progress.snapshot()));
        self.publish_now_playing();
    }

    fn on_source_failed(&mut self, request: LoadRequest, error: PlaybackError) {
        if request.stage == SourceStage::Primary && request.session.has_fallback() {
            warn!(
                "Primary source for {} unavailable ({}), falling back to speech",
                request.session.id, error
            );
            self.pending_load = Some(LoadRequest {
                stage: SourceStage::Fallback,
                ..request
            });
            // Loading re-entered with the fallback
            self.emit(PlaybackEvent::StateChanged {
                state: PlaybackState::Loading,
            });
        } else {
            self.fail(error);
        }
    }

    fn seek_to_start(&self, source: &mut ContentSource) -> Duration {
        let (requested, resuming) = match self.start_position {
            StartPosition::Beginning => return Duration::ZERO,
            StartPosition::Explicit(offset) => (offset, false),
            StartPosition::Resume(offset) => (offset, true),
        };
        let Some(duration) = source.duration().filter(|_| source.is_seekable()) else {
            debug!("Source is not seekable, starting from the beginning");
            return Duration::ZERO;
        };
        if resuming && requested >= duration {
            return Duration::ZERO;
        }

        match source.seek(requested.min(duration)) {
            Ok(landed) => landed,
            Err(e) => {
                warn!("Could not seek to start offset: {}", e);
                Duration::ZERO
            }
        }
    }

    fn pause_with(&mut self, reason: PauseReason) {
        match self.state {
            PlaybackState::Playing | PlaybackState::Buffering => {}
            PlaybackState::Paused
                if !reason.is_transient()
                    && self.monitor.paused_by().is_some_and(|r| r.is_transient()) =>
            {
                // Explicit pause during an interruption: no auto-resume
                self.monitor.note_paused(reason);
                self.guard.release();
                return;
            }
            _ => {
                debug!("pause({:?}) while {}, ignoring", reason, self.state);
                return;
            }
        }

        if let Some(source) = self.source.as_mut() {
            source.pause();
        }
        self.monitor.note_paused(reason);
        if !reason.is_transient() {
            self.guard.release();
        }
        self.set_state(PlaybackState::Paused);
        self.publish_now_playing();
    }

    fn apply(&mut self, action: MonitorAction) {
        match action {
            MonitorAction::Pause(reason) => self.pause_with(reason),
            MonitorAction::Resume => self.resume(),
            MonitorAction::Ignore => {}
        }
    }

    fn on_tick(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        let Some(source) = self.source.as_ref() else {
            return;
        };

        let outcome = match source {
            ContentSource::DecodedAudio { handle, .. } => self
                .progress
                .native_tick(handle.position(), handle.is_finished()),
            ContentSource::SynthesizedSpeech { output, .. } => self
                .progress
                .self_clocked_tick(output.is_speaking(), output.is_finished()),
        };

        self.emit(PlaybackEvent::Progress(outcome.snapshot));
        if let (Some(offset), Some(session)) = (outcome.persist_offset, self.session.as_ref()) {
            debug!("Persisting offset {:.1}s for {}", offset.as_secs_f64(), session.id);
            self.recorder.persist_offset(&session.id, offset);
        }

        if outcome.reached_end {
            self.natural_end();
        } else if let Some(now_playing) = self.now_playing() {
            if self.remote.refresh(&now_playing) {
                self.emit(PlaybackEvent::NowPlaying(now_playing));
            }
        }
    }

    fn natural_end(&mut self) {
        let Some(episode) = self.episode else {
            return;
        };
        self.progress.finish();
        self.record_completion(episode, self.progress.listened());

        if let Some(source) = self.source.take() {
            source.release();
        }
        self.set_state(PlaybackState::Completed);

        match self.session.clone() {
            Some(session) if self.repeat => {
                info!("Repeat is on, looping {}", session.id);
                self.begin_episode(session, StartPosition::Beginning);
            }
            _ => self.reset_to_idle(),
        }
    }

    fn record_completion(&mut self, episode: EpisodeId, played: Duration) {
        let Some(session_id) = self.session.as_ref().map(|s| s.id.clone()) else {
            return;
        };
        let rating = self.pending_rating.take();
        if let Some(record) = self.recorder.record(episode, &session_id, played, rating) {
            self.emit(PlaybackEvent::CompletionRecorded(record));
        }
    }

    fn fail(&mut self, error: PlaybackError) {
        error!("Playback failed: {}", error);
        if let Some(source) = self.source.take() {
            source.release();
        }
        self.guard.release();
        self.pending_load = None;
        self.progress.reset();
        self.monitor.clear();
        self.clear_now_playing();

        self.emit(PlaybackEvent::Error {
            message: error.to_string(),
        });
        self.last_error = Some(error);
        self.set_state(PlaybackState::Failed);
    }

    fn reset_to_idle(&mut self) {
        if let Some(source) = self.source.take() {
            source.release();
        }
        self.guard.release();
        self.pending_load = None;
        self.session = None;
        self.start_position = StartPosition::Beginning;
        self.pending_rating = None;
        self.last_error = None;
        self.progress.reset();
        self.monitor.clear();
        self.clear_now_playing();

        self.set_state(PlaybackState::Idle);
        self.emit(PlaybackEvent::Progress(ProgressSnapshot::ZERO));
    }

    fn apply_gain(&mut self) {
        let gain = self.volume.gain();
        if let Some(source) = self.source.as_mut() {
            source.set_gain(gain);
        }
    }

    fn publish_now_playing(&mut self) {
        if let Some(now_playing) = self.now_playing() {
            self.remote.publish(&now_playing);
            self.emit(PlaybackEvent::NowPlaying(now_playing));
        }
    }

    fn clear_now_playing(&mut self) {
        self.remote.clear();
        self.emit(PlaybackEvent::NowPlayingCleared);
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }
        info!("Playback state: {} -> {}", self.state, state);
        self.state = state;
        self.emit(PlaybackEvent::StateChanged { state });
    }

    fn emit(&mut self, event: PlaybackEvent) {
        self.pending_events.push(event);
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state)
            .field("episode", &self.episode)
            .field("source", &self.source)
            .field("guard", &self.guard)
            .field("repeat", &self.repeat)
            .finish_non_exhaustive()
    }
}
