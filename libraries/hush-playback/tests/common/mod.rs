//! Fake platform capabilities shared by the integration tests

#![allow(dead_code)]

use hush_core::{CompletionRecord, PlayableSession};
use hush_playback::{
    ContentBackend, ControlEvent, DecodedAudio, ExecutionGrant, ExecutionHost, NowPlaying,
    NowPlayingSurface, PersistenceJob, PlaybackConfig, PlaybackError, PlaybackEvent,
    PlaybackState, Result, SessionController, SpeechOutput,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const HALF: Duration = Duration::from_millis(500);

// ============================================================================
// Decoded audio
// ============================================================================

#[derive(Debug, Default)]
pub struct AudioState {
    pub position: Duration,
    pub duration: Option<Duration>,
    pub playing: bool,
    pub gain: f32,
    pub seeks: Vec<Duration>,
    pub closed: bool,
}

/// Test-side view of an opened audio handle
#[derive(Debug, Clone, Default)]
pub struct AudioTap(Arc<Mutex<AudioState>>);

impl AudioTap {
    pub fn state(&self) -> std::sync::MutexGuard<'_, AudioState> {
        self.0.lock().unwrap()
    }

    /// Move the playhead if the handle is playing
    pub fn advance(&self, step: Duration) {
        let mut state = self.state();
        if state.playing && !state.closed {
            state.position += step;
            if let Some(duration) = state.duration {
                state.position = state.position.min(duration);
            }
        }
    }
}

struct FakeAudio(AudioTap);

impl DecodedAudio for FakeAudio {
    fn play(&mut self) -> Result<()> {
        self.0.state().playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.0.state().playing = false;
    }

    fn seek(&mut self, position: Duration) -> Result<Duration> {
        let mut state = self.0.state();
        state.position = position;
        state.seeks.push(position);
        Ok(position)
    }

    fn position(&self) -> Duration {
        self.0.state().position
    }

    fn duration(&self) -> Option<Duration> {
        self.0.state().duration
    }

    fn is_finished(&self) -> bool {
        let state = self.0.state();
        state.duration.is_some_and(|d| state.position >= d)
    }

    fn set_gain(&mut self, gain: f32) {
        self.0.state().gain = gain;
    }

    fn close(&mut self) {
        self.0.state().closed = true;
    }
}

// ============================================================================
// Speech
// ============================================================================

#[derive(Debug, Default)]
pub struct SpeechState {
    pub transcript: String,
    pub speaking: bool,
    pub stopped: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SpeechTap(Arc<Mutex<SpeechState>>);

impl SpeechTap {
    pub fn state(&self) -> std::sync::MutexGuard<'_, SpeechState> {
        self.0.lock().unwrap()
    }
}

struct FakeSpeech(SpeechTap);

impl SpeechOutput for FakeSpeech {
    fn speak(&mut self) -> Result<()> {
        self.0.state().speaking = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.0.state().speaking = false;
    }

    fn resume(&mut self) {
        self.0.state().speaking = true;
    }

    fn stop(&mut self) {
        let mut state = self.0.state();
        state.speaking = false;
        state.stopped = true;
    }

    fn is_speaking(&self) -> bool {
        self.0.state().speaking
    }

    fn set_gain(&mut self, _gain: f32) {}
}

// ============================================================================
// Backend
// ============================================================================

/// Backend with a fixed set of audio files
#[derive(Default)]
pub struct FakeBackend {
    files: HashMap<PathBuf, Option<Duration>>,
    fail_synthesis: bool,
    audio: Mutex<Vec<AudioTap>>,
    speech: Mutex<Vec<SpeechTap>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, duration: Option<Duration>) -> Self {
        self.files.insert(PathBuf::from(path), duration);
        self
    }

    pub fn failing_synthesis(mut self) -> Self {
        self.fail_synthesis = true;
        self
    }

    pub fn audio(&self) -> Vec<AudioTap> {
        self.audio.lock().unwrap().clone()
    }

    pub fn speech(&self) -> Vec<SpeechTap> {
        self.speech.lock().unwrap().clone()
    }

    /// Sources opened and not yet torn down
    pub fn live_sources(&self) -> usize {
        let audio = self
            .audio
            .lock()
            .unwrap()
            .iter()
            .filter(|tap| !tap.state().closed)
            .count();
        let speech = self
            .speech
            .lock()
            .unwrap()
            .iter()
            .filter(|tap| !tap.state().stopped)
            .count();
        audio + speech
    }

    /// Advance every playing audio handle
    pub fn advance(&self, step: Duration) {
        for tap in self.audio.lock().unwrap().iter() {
            tap.advance(step);
        }
    }
}

impl ContentBackend for FakeBackend {
    fn open_audio(&self, path: &Path) -> Result<Box<dyn DecodedAudio>> {
        let duration = self
            .files
            .get(path)
            .ok_or_else(|| PlaybackError::source_unavailable(format!("{} missing", path.display())))?;
        let tap = AudioTap::default();
        tap.state().duration = *duration;
        self.audio.lock().unwrap().push(tap.clone());
        Ok(Box::new(FakeAudio(tap)))
    }

    fn synthesize(&self, transcript: &str) -> Result<Box<dyn SpeechOutput>> {
        if self.fail_synthesis {
            return Err(PlaybackError::source_unavailable("synthesizer offline"));
        }
        let tap = SpeechTap::default();
        tap.state().transcript = transcript.to_string();
        self.speech.lock().unwrap().push(tap.clone());
        Ok(Box::new(FakeSpeech(tap)))
    }
}

// ============================================================================
// Execution host
// ============================================================================

#[derive(Debug, Default)]
pub struct GrantLedger {
    pub acquired: u32,
    pub released: u32,
    pub deny: bool,
    next_id: u64,
}

impl GrantLedger {
    pub fn outstanding(&self) -> i64 {
        i64::from(self.acquired) - i64::from(self.released)
    }
}

pub struct FakeHost(pub Arc<Mutex<GrantLedger>>);

impl ExecutionHost for FakeHost {
    fn acquire(&mut self) -> Result<ExecutionGrant> {
        let mut ledger = self.0.lock().unwrap();
        if ledger.deny {
            return Err(PlaybackError::grant_denied("background audio disabled"));
        }
        ledger.next_id += 1;
        ledger.acquired += 1;
        Ok(ExecutionGrant {
            id: ledger.next_id,
            expires_in: Some(Duration::from_secs(180)),
        })
    }

    fn release(&mut self, _grant: ExecutionGrant) {
        self.0.lock().unwrap().released += 1;
    }
}

// ============================================================================
// Now-playing surface
// ============================================================================

pub struct RecordingSurface(pub Arc<Mutex<Vec<Option<NowPlaying>>>>);

impl NowPlayingSurface for RecordingSurface {
    fn publish(&mut self, now_playing: &NowPlaying) {
        self.0.lock().unwrap().push(Some(now_playing.clone()));
    }

    fn clear(&mut self) {
        self.0.lock().unwrap().push(None);
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Controller wired to fakes, driven by simulated time
pub struct Harness {
    pub controller: SessionController,
    pub backend: Arc<FakeBackend>,
    pub grants: Arc<Mutex<GrantLedger>>,
    pub surface: Arc<Mutex<Vec<Option<NowPlaying>>>>,
    jobs_rx: mpsc::UnboundedReceiver<PersistenceJob>,
    jobs: Vec<PersistenceJob>,
    events: Vec<PlaybackEvent>,
}

impl Harness {
    pub fn new(backend: FakeBackend) -> Self {
        Self::with_config(backend, PlaybackConfig::default())
    }

    pub fn with_config(backend: FakeBackend, config: PlaybackConfig) -> Self {
        let backend = Arc::new(backend);
        let grants = Arc::new(Mutex::new(GrantLedger::default()));
        let surface = Arc::new(Mutex::new(Vec::new()));
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let controller = SessionController::new(
            config,
            backend.clone(),
            Box::new(FakeHost(grants.clone())),
            Box::new(RecordingSurface(surface.clone())),
            jobs_tx,
        );

        Self {
            controller,
            backend,
            grants,
            surface,
            jobs_rx,
            jobs: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Start and resolve the source inline
    pub fn start(&mut self, session: PlayableSession, offset: Option<Duration>) {
        self.controller.start(session, offset);
        self.controller.load_pending_blocking();
    }

    pub fn event(&mut self, event: ControlEvent) {
        self.controller.handle_event(event);
        self.controller.load_pending_blocking();
    }

    /// Simulate `seconds` of wall time at the 0.5 s cadence
    pub fn advance(&mut self, seconds: f64) {
        let steps = (seconds / HALF.as_secs_f64()).round() as u64;
        for _ in 0..steps {
            self.backend.advance(HALF);
            self.event(ControlEvent::Tick);
            assert!(
                self.backend.live_sources() <= 1,
                "more than one live source"
            );
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    /// Everything queued for persistence so far
    pub fn jobs(&mut self) -> &[PersistenceJob] {
        while let Ok(job) = self.jobs_rx.try_recv() {
            self.jobs.push(job);
        }
        &self.jobs
    }

    pub fn completions(&mut self) -> Vec<CompletionRecord> {
        self.jobs()
            .iter()
            .filter_map(|job| match job {
                PersistenceJob::RecordCompletion(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn offset_writes(&mut self) -> Vec<Duration> {
        self.jobs()
            .iter()
            .filter_map(|job| match job {
                PersistenceJob::UpdateLastOffset { offset, .. } => Some(*offset),
                _ => None,
            })
            .collect()
    }

    /// Every event emitted so far
    pub fn events(&mut self) -> &[PlaybackEvent] {
        self.events.extend(self.controller.drain_events());
        &self.events
    }

    pub fn states(&mut self) -> Vec<PlaybackState> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                PlaybackEvent::StateChanged { state } => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub fn published(&self) -> Vec<NowPlaying> {
        self.surface.lock().unwrap().iter().flatten().cloned().collect()
    }
}

pub fn audio_session(id: &str, seconds: u64) -> PlayableSession {
    PlayableSession::new(id, format!("Session {id}"), PathBuf::from(format!("/audio/{id}.m4a")))
        .with_subtitle("Guided")
        .with_duration(Duration::from_secs(seconds))
}

pub fn backend_with(id: &str, seconds: u64) -> FakeBackend {
    FakeBackend::new().with_file(
        &format!("/audio/{id}.m4a"),
        Some(Duration::from_secs(seconds)),
    )
}
