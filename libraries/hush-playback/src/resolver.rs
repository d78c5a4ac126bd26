//! Content source resolution
//!
//! Picks the primary decoded audio or, when that fails and the session has a
//! transcript, synthesized speech. The controller drives the two stages as
//! separate load requests so a failed primary is fully torn down before the
//! fallback is built.

use crate::error::{PlaybackError, Result};
use crate::source::{ContentBackend, ContentSource};
use crate::types::EpisodeId;
use hush_core::PlayableSession;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Which source a load request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStage {
    /// Decoded audio from `audio_path`
    Primary,
    /// Speech synthesized from the transcript
    Fallback,
}

/// A pending request to open a source for an episode
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Episode the result belongs to
    pub episode: EpisodeId,
    /// Session being loaded
    pub session: PlayableSession,
    /// Which source to open
    pub stage: SourceStage,
}

/// Opens content sources through a platform backend
#[derive(Clone)]
pub struct ContentResolver {
    backend: Arc<dyn ContentBackend>,
    chars_per_second: f64,
}

impl ContentResolver {
    /// Create a resolver
    ///
    /// `chars_per_second` is the reading rate used to estimate how long the
    /// speech fallback runs.
    pub fn new(backend: Arc<dyn ContentBackend>, chars_per_second: f64) -> Self {
        Self {
            backend,
            chars_per_second,
        }
    }

    /// Open the source a request asks for
    ///
    /// # Errors
    /// `SourceUnavailable` when the backend fails or, for the fallback stage,
    /// when the session has no usable transcript
    pub fn resolve(&self, request: &LoadRequest) -> Result<ContentSource> {
        let session = &request.session;
        match request.stage {
            SourceStage::Primary => {
                debug!(
                    "Opening primary audio for {} ({})",
                    session.id,
                    session.audio_path.display()
                );
                let handle = self.backend.open_audio(&session.audio_path)?;
                Ok(ContentSource::DecodedAudio {
                    handle,
                    duration_estimate: session.duration,
                })
            }
            SourceStage::Fallback => {
                let transcript = session.fallback_transcript().ok_or_else(|| {
                    PlaybackError::source_unavailable(format!(
                        "session {} has no transcript",
                        session.id
                    ))
                })?;
                let estimated_duration = self.estimate_speech_duration(transcript);
                warn!(
                    "Synthesizing speech fallback for {} (~{:.0}s)",
                    session.id,
                    estimated_duration.as_secs_f64()
                );
                let output = self.backend.synthesize(transcript)?;
                Ok(ContentSource::SynthesizedSpeech {
                    output,
                    estimated_duration,
                })
            }
        }
    }

    /// Estimate speech duration from transcript length
    pub fn estimate_speech_duration(&self, transcript: &str) -> Duration {
        let chars = transcript.chars().count() as f64;
        let rate = if self.chars_per_second > 0.0 {
            self.chars_per_second
        } else {
            1.0
        };
        Duration::from_secs_f64(chars / rate)
    }
}

impl std::fmt::Debug for ContentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentResolver")
            .field("chars_per_second", &self.chars_per_second)
            .finish_non_exhaustive()
    }
}
