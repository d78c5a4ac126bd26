//! Playback service
//!
//! Async reactor around [`SessionController`]. Every input (caller commands,
//! platform signals, load results, the progress ticker) arrives on its own
//! channel and is applied on one task, so transitions never run
//! concurrently. Platform signals are polled first: an interruption that is
//! already queued wins over a tick that is also ready.

use crate::{
    completion::run_persistence_worker,
    controller::SessionController,
    error::{PlaybackError, Result},
    events::{ControlEvent, PlatformSignal, PlaybackEvent},
    grant::ExecutionHost,
    remote::{NowPlaying, NowPlayingSurface},
    source::ContentBackend,
    types::{EpisodeId, PlaybackConfig, PlaybackState, ProgressSnapshot},
};
use hush_core::{PersistenceStore, PlayableSession};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 256;
const NOW_PLAYING_CAPACITY: usize = 16;

/// Platform capabilities injected into the service
pub struct Platform {
    /// Opens decoded audio and synthesizes speech
    pub backend: Arc<dyn ContentBackend>,
    /// Grants background execution
    pub host: Box<dyn ExecutionHost>,
    /// Lock screen / media key surface
    pub surface: Box<dyn NowPlayingSurface>,
    /// Completion and offset storage
    pub store: Arc<dyn PersistenceStore>,
}

/// State and progress, as seen by UI bindings
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackStatus {
    /// Current state
    pub state: PlaybackState,
    /// Current progress
    pub progress: ProgressSnapshot,
}

#[derive(Debug, Clone, Copy)]
enum SeekTarget {
    To(Duration),
    Forward(Duration),
    Backward(Duration),
}

enum Command {
    Start {
        session: PlayableSession,
        offset: Option<Duration>,
        reply: oneshot::Sender<Result<PlaybackState>>,
    },
    Pause,
    Resume,
    Stop,
    Seek {
        target: SeekTarget,
        reply: oneshot::Sender<Result<()>>,
    },
    SetVolume(f32),
    ToggleMute,
    SetRepeat(bool),
    SetRating(u8),
    Acknowledge,
}

/// Handle to the playback service for sending commands
///
/// Cheap to clone. The service shuts down once every handle is dropped.
#[derive(Clone)]
pub struct PlaybackHandle {
    command_tx: mpsc::UnboundedSender<Command>,
    signal_tx: mpsc::UnboundedSender<PlatformSignal>,
    status_rx: watch::Receiver<PlaybackStatus>,
    now_playing_tx: broadcast::Sender<NowPlaying>,
    events_tx: broadcast::Sender<PlaybackEvent>,
}

impl PlaybackHandle {
    /// Start a session, waiting until its source is live or has failed
    ///
    /// Returns the state reached (`Playing`).
    ///
    /// # Errors
    /// The failure reason when the episode ends in `Failed`; `Cancelled` if
    /// `stop` or another `start` overtakes it; `ServiceClosed` if the
    /// service is gone
    pub async fn start(
        &self,
        session: PlayableSession,
        offset: Option<Duration>,
    ) -> Result<PlaybackState> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Start {
            session,
            offset,
            reply,
        })?;
        rx.await.map_err(|_| PlaybackError::ServiceClosed)?
    }

    /// Seek, waiting until the source acknowledges the new position
    ///
    /// # Errors
    /// `NotSeekable` for sources without reliable positions
    pub async fn seek(&self, position: Duration) -> Result<()> {
        self.seek_to(SeekTarget::To(position)).await
    }

    /// Skip forward by `interval`
    ///
    /// # Errors
    /// See [`Self::seek`]
    pub async fn skip_forward(&self, interval: Duration) -> Result<()> {
        self.seek_to(SeekTarget::Forward(interval)).await
    }

    /// Skip backward by `interval`
    ///
    /// # Errors
    /// See [`Self::seek`]
    pub async fn skip_backward(&self, interval: Duration) -> Result<()> {
        self.seek_to(SeekTarget::Backward(interval)).await
    }

    async fn seek_to(&self, target: SeekTarget) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Seek { target, reply })?;
        rx.await.map_err(|_| PlaybackError::ServiceClosed)?
    }

    /// Pause
    pub fn pause(&self) {
        let _ = self.send(Command::Pause);
    }

    /// Resume
    pub fn resume(&self) {
        let _ = self.send(Command::Resume);
    }

    /// Stop, cancelling any pending `start`
    pub fn stop(&self) {
        let _ = self.send(Command::Stop);
    }

    /// Set volume (0.0-1.0)
    pub fn set_volume(&self, level: f32) {
        let _ = self.send(Command::SetVolume(level));
    }

    /// Toggle mute
    pub fn toggle_mute(&self) {
        let _ = self.send(Command::ToggleMute);
    }

    /// Loop the session at its natural end
    pub fn set_repeat_enabled(&self, enabled: bool) {
        let _ = self.send(Command::SetRepeat(enabled));
    }

    /// Rate the current episode (1-5)
    pub fn set_pending_rating(&self, rating: u8) {
        let _ = self.send(Command::SetRating(rating));
    }

    /// Leave `Failed`
    pub fn acknowledge(&self) {
        let _ = self.send(Command::Acknowledge);
    }

    /// Deliver a platform notification
    pub fn signal(&self, signal: PlatformSignal) {
        if self.signal_tx.send(signal).is_err() {
            debug!("Playback service closed, dropping {:?}", signal);
        }
    }

    /// A signal-only sender that does not keep the service alive
    pub fn signal_sender(&self) -> SignalSender {
        SignalSender {
            signal_tx: self.signal_tx.downgrade(),
        }
    }

    /// Latest state and progress
    pub fn status(&self) -> PlaybackStatus {
        *self.status_rx.borrow()
    }

    /// Observe `(state, progress)`
    pub fn subscribe_state(&self) -> watch::Receiver<PlaybackStatus> {
        self.status_rx.clone()
    }

    /// Observe now-playing descriptors
    pub fn subscribe_now_playing(&self) -> broadcast::Receiver<NowPlaying> {
        self.now_playing_tx.subscribe()
    }

    /// Observe every playback event
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events_tx.subscribe()
    }

    fn send(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| PlaybackError::ServiceClosed)
    }
}

/// Delivers platform signals without holding the service open
///
/// Platform callbacks that outlive the UI hold one of these instead of a
/// [`PlaybackHandle`], so dropping the last handle still shuts the service down.
#[derive(Debug, Clone)]
pub struct SignalSender {
    signal_tx: mpsc::WeakUnboundedSender<PlatformSignal>,
}

impl SignalSender {
    /// Deliver a platform notification
    ///
    /// Returns `false` once the service has shut down.
    pub fn signal(&self, signal: PlatformSignal) -> bool {
        match self.signal_tx.upgrade() {
            Some(tx) => tx.send(signal).is_ok(),
            None => {
                debug!("Playback service closed, dropping {:?}", signal);
                false
            }
        }
    }
}

/// Playback service that drives one controller
pub struct PlaybackService {
    controller: SessionController,
    command_rx: mpsc::UnboundedReceiver<Command>,
    signal_rx: mpsc::UnboundedReceiver<PlatformSignal>,
    load_tx: mpsc::UnboundedSender<ControlEvent>,
    load_rx: mpsc::UnboundedReceiver<ControlEvent>,
    status_tx: watch::Sender<PlaybackStatus>,
    now_playing_tx: broadcast::Sender<NowPlaying>,
    events_tx: broadcast::Sender<PlaybackEvent>,
    pending_start: Option<(EpisodeId, oneshot::Sender<Result<PlaybackState>>)>,
}

impl PlaybackService {
    /// Spawn the service and its persistence worker on the current runtime
    pub fn spawn(config: PlaybackConfig, platform: Platform) -> PlaybackHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (load_tx, load_rx) = mpsc::unbounded_channel();
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(PlaybackStatus::default());
        let (now_playing_tx, _) = broadcast::channel(NOW_PLAYING_CAPACITY);
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);

        tokio::spawn(run_persistence_worker(
            jobs_rx,
            platform.store,
            Some(events_tx.clone()),
        ));

        let controller = SessionController::new(
            config,
            platform.backend,
            platform.host,
            platform.surface,
            jobs_tx,
        );

        let service = Self {
            controller,
            command_rx,
            signal_rx,
            load_tx,
            load_rx,
            status_tx,
            now_playing_tx: now_playing_tx.clone(),
            events_tx: events_tx.clone(),
            pending_start: None,
        };
        tokio::spawn(service.run());

        PlaybackHandle {
            command_tx,
            signal_tx,
            status_rx,
            now_playing_tx,
            events_tx,
        }
    }

    async fn run(mut self) {
        info!("Playback service started");

        let mut ticker = tokio::time::interval(self.controller.config().tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                signal = self.signal_rx.recv() => match signal {
                    Some(signal) => self.controller.handle_event(signal.into()),
                    None => break,
                },
                Some(event) = self.load_rx.recv() => {
                    self.controller.handle_event(event);
                }
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                _ = ticker.tick() => {
                    self.controller.handle_event(ControlEvent::Tick);
                }
            }

            self.dispatch_loads();
            self.flush();
        }

        info!("All playback handles dropped, shutting down");
        self.controller.stop();
        self.flush();
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start {
                session,
                offset,
                reply,
            } => {
                if let Some((episode, previous)) = self.pending_start.take() {
                    debug!("Start of episode {} overtaken", episode);
                    let _ = previous.send(Err(PlaybackError::Cancelled));
                }
                let episode = self.controller.start(session, offset);
                self.pending_start = Some((episode, reply));
            }
            Command::Pause => self.controller.pause(),
            Command::Resume => self.controller.resume(),
            Command::Stop => self.controller.stop(),
            Command::Seek { target, reply } => {
                let result = match target {
                    SeekTarget::To(position) => self.controller.seek(position),
                    SeekTarget::Forward(interval) => self.controller.skip_forward(interval),
                    SeekTarget::Backward(interval) => self.controller.skip_backward(interval),
                };
                if let Err(e) = &result {
                    warn!("Seek {:?} rejected: {}", target, e);
                }
                let _ = reply.send(result);
            }
            Command::SetVolume(level) => self.controller.set_volume(level),
            Command::ToggleMute => {
                self.controller.toggle_mute();
            }
            Command::SetRepeat(enabled) => self.controller.set_repeat_enabled(enabled),
            Command::SetRating(rating) => self.controller.set_pending_rating(rating),
            Command::Acknowledge => self.controller.acknowledge(),
        }
    }

    /// Run queued load requests off the control path
    fn dispatch_loads(&mut self) {
        while let Some(request) = self.controller.take_load_request() {
            let resolver = self.controller.resolver().clone();
            let load_tx = self.load_tx.clone();
            tokio::task::spawn_blocking(move || {
                let result = resolver.resolve(&request);
                // Receiver only goes away on shutdown
                let _ = load_tx.send(ControlEvent::SourceResolved { request, result });
            });
        }
    }

    /// Fan queued events out to subscribers
    fn flush(&mut self) {
        for event in self.controller.drain_events() {
            if let PlaybackEvent::NowPlaying(now_playing) = &event {
                let _ = self.now_playing_tx.send(now_playing.clone());
            }
            let _ = self.events_tx.send(event);
        }

        let status = PlaybackStatus {
            state: self.controller.state(),
            progress: self.controller.progress(),
        };
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });

        self.settle_pending_start();
    }

    fn settle_pending_start(&mut self) {
        let Some((episode, _)) = &self.pending_start else {
            return;
        };

        let state = self.controller.state();
        let outcome = if self.controller.episode() != Some(*episode) {
            Some(Err(PlaybackError::Cancelled))
        } else {
            match state {
                PlaybackState::Loading => None,
                PlaybackState::Playing | PlaybackState::Paused | PlaybackState::Buffering => {
                    Some(Ok(state))
                }
                PlaybackState::Failed => Some(Err(self
                    .controller
                    .last_error()
                    .cloned()
                    .unwrap_or_else(|| PlaybackError::source_unavailable("unknown")))),
                PlaybackState::Idle | PlaybackState::Completed => {
                    Some(Err(PlaybackError::Cancelled))
                }
            }
        };

        if let Some(outcome) = outcome {
            if let Some((_, reply)) = self.pending_start.take() {
                let _ = reply.send(outcome);
            }
        }
    }
}
