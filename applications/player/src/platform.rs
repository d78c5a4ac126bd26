//! Headless platform capabilities
//!
//! Stand-ins for the OS services a device build would provide: no output
//! device, no speech engine, no lock screen. Audio files are still opened
//! with symphonia so missing or corrupt assets fail the same way they
//! would on a device, and playback position follows the wall clock.

use crate::config::HushConfig;
use hush_core::PersistenceStore;
use hush_playback::{
    ContentBackend, DecodedAudio, ExecutionGrant, ExecutionHost, NowPlaying, NowPlayingSurface,
    Platform, PlatformSignal, PlaybackError, Result, SignalSender, SpeechOutput,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

/// Open an audio file and return its duration, if the container reports one
pub fn read_duration(path: &Path) -> Result<Option<Duration>> {
    let file = std::fs::File::open(path).map_err(|e| {
        PlaybackError::source_unavailable(format!("{}: {e}", path.display()))
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let opened = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| {
            PlaybackError::source_unavailable(format!("failed to read {}: {e}", path.display()))
        })?;

    let track = opened.format.default_track().ok_or_else(|| {
        PlaybackError::source_unavailable(format!("no audio track in {}", path.display()))
    })?;

    let params = &track.codec_params;
    let duration = match (params.n_frames, params.sample_rate) {
        (Some(n_frames), Some(sample_rate)) if sample_rate > 0 => Some(Duration::from_secs_f64(
            n_frames as f64 / f64::from(sample_rate),
        )),
        _ => None,
    };

    Ok(duration)
}

/// Decoded audio whose playhead follows the clock
///
/// Nothing is rendered; position advances while playing and stops at the
/// container duration.
#[derive(Debug)]
pub struct ClockedAudio {
    duration: Option<Duration>,
    base: Duration,
    started: Option<Instant>,
    gain: f32,
}

impl ClockedAudio {
    pub fn new(duration: Option<Duration>) -> Self {
        Self {
            duration,
            base: Duration::ZERO,
            started: None,
            gain: 1.0,
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    fn clamp(&self, position: Duration) -> Duration {
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }
}

impl DecodedAudio for ClockedAudio {
    fn play(&mut self) -> Result<()> {
        self.started.get_or_insert_with(Instant::now);
        Ok(())
    }

    fn pause(&mut self) {
        self.base = self.position();
        self.started = None;
    }

    fn seek(&mut self, position: Duration) -> Result<Duration> {
        self.base = self.clamp(position);
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
        Ok(self.base)
    }

    fn position(&self) -> Duration {
        let running = self.started.map_or(Duration::ZERO, |started| started.elapsed());
        self.clamp(self.base + running)
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn is_finished(&self) -> bool {
        self.duration.is_some_and(|d| self.position() >= d)
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    fn close(&mut self) {
        self.started = None;
    }
}

/// Speech output that logs instead of talking
///
/// Reports itself as speaking until stopped; the controller's estimate
/// decides when the transcript is done.
#[derive(Debug, Default)]
pub struct SilentSpeech {
    chars: usize,
    speaking: bool,
}

impl SilentSpeech {
    pub fn new(transcript: &str) -> Self {
        Self {
            chars: transcript.chars().count(),
            speaking: false,
        }
    }
}

impl SpeechOutput for SilentSpeech {
    fn speak(&mut self) -> Result<()> {
        info!("Speaking transcript ({} chars)", self.chars);
        self.speaking = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.speaking = false;
    }

    fn resume(&mut self) {
        self.speaking = true;
    }

    fn stop(&mut self) {
        self.speaking = false;
    }

    fn is_speaking(&self) -> bool {
        self.speaking
    }

    fn set_gain(&mut self, _gain: f32) {}
}

/// Opens files with symphonia and synthesizes silent speech
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessBackend;

impl ContentBackend for HeadlessBackend {
    fn open_audio(&self, path: &Path) -> Result<Box<dyn DecodedAudio>> {
        let duration = read_duration(path)?;
        debug!("Opened {} ({:?})", path.display(), duration);
        Ok(Box::new(ClockedAudio::new(duration)))
    }

    fn synthesize(&self, transcript: &str) -> Result<Box<dyn SpeechOutput>> {
        Ok(Box::new(SilentSpeech::new(transcript)))
    }
}

/// Execution host that grants every request
///
/// With a lifetime set, each issued grant is also reported on the notice
/// channel so [`forward_expiry_notices`] can tell the service when it lapses.
#[derive(Debug)]
pub struct AlwaysGrant {
    next_id: u64,
    lifetime: Option<Duration>,
    issued: Option<mpsc::UnboundedSender<ExecutionGrant>>,
}

impl AlwaysGrant {
    pub fn new(lifetime: Option<Duration>) -> Self {
        Self {
            next_id: 0,
            lifetime,
            issued: None,
        }
    }

    /// Report every issued grant on the returned channel
    pub fn with_expiry_notices(mut self) -> (Self, mpsc::UnboundedReceiver<ExecutionGrant>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.issued = Some(tx);
        (self, rx)
    }
}

impl ExecutionHost for AlwaysGrant {
    fn acquire(&mut self) -> Result<ExecutionGrant> {
        self.next_id += 1;
        let grant = ExecutionGrant {
            id: self.next_id,
            expires_in: self.lifetime,
        };
        if let Some(issued) = &self.issued {
            let _ = issued.send(grant);
        }
        Ok(grant)
    }

    fn release(&mut self, grant: ExecutionGrant) {
        debug!("Host took back grant {}", grant.id);
    }
}

/// Deliver `GrantExpiring` for each issued grant once its lifetime elapses
///
/// Notices for grants the controller already released are ignored there.
/// Returns when the host is dropped with the service.
pub async fn forward_expiry_notices(
    mut issued: mpsc::UnboundedReceiver<ExecutionGrant>,
    signals: SignalSender,
) {
    while let Some(grant) = issued.recv().await {
        let Some(lifetime) = grant.expires_in else {
            continue;
        };
        let signals = signals.clone();
        tokio::spawn(async move {
            tokio::time::sleep(lifetime).await;
            signals.signal(PlatformSignal::GrantExpiring { grant_id: grant.id });
        });
    }
    debug!("Execution host dropped, no more expiry notices");
}

/// Now-playing surface that writes to the log
#[derive(Debug, Default)]
pub struct LoggingSurface;

impl NowPlayingSurface for LoggingSurface {
    fn publish(&mut self, now_playing: &NowPlaying) {
        let total = now_playing
            .duration
            .map_or_else(|| "--:--".to_string(), format_clock);
        info!(
            "{} {} / {}{}",
            now_playing.title,
            format_clock(now_playing.elapsed),
            total,
            if now_playing.rate > 0.0 { "" } else { " (paused)" }
        );
    }

    fn clear(&mut self) {
        debug!("Now playing cleared");
    }
}

/// `mm:ss`
pub fn format_clock(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Wire the headless capabilities into a [`Platform`]
///
/// The receiver is present when grants have a lifetime and must be passed
/// to [`forward_expiry_notices`] once the service is running.
pub fn headless_platform(
    config: &HushConfig,
    store: Arc<dyn PersistenceStore>,
) -> (Platform, Option<mpsc::UnboundedReceiver<ExecutionGrant>>) {
    let host = AlwaysGrant::new(config.grant_lifetime());
    let (host, notices) = if config.grant_lifetime().is_some() {
        let (host, rx) = host.with_expiry_notices();
        (host, Some(rx))
    } else {
        (host, None)
    };

    let platform = Platform {
        backend: Arc::new(HeadlessBackend),
        host: Box::new(host),
        surface: Box::new(LoggingSurface),
        store,
    };
    (platform, notices)
}
