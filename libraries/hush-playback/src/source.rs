//! Content sources
//!
//! A session plays from exactly one of two kinds of source: decoded audio
//! (the primary asset) or synthesized speech read from the transcript.
//! Platforms plug in through [`ContentBackend`].

use crate::error::{PlaybackError, Result};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Decoded audio handle
///
/// Implementors wrap the platform player. Position reporting is native:
/// the controller polls `position()` on every tick.
pub trait DecodedAudio: Send {
    /// Begin or continue audible output
    fn play(&mut self) -> Result<()>;

    /// Pause output, keeping the position
    fn pause(&mut self);

    /// Move to `position`, returning where the source actually landed
    fn seek(&mut self, position: Duration) -> Result<Duration>;

    /// Current position
    fn position(&self) -> Duration;

    /// Total duration, if the container reports one
    fn duration(&self) -> Option<Duration>;

    /// Whether output ran off the end of the content
    fn is_finished(&self) -> bool;

    /// Apply an output gain (0.0-1.0)
    fn set_gain(&mut self, gain: f32);

    /// Release platform resources
    fn close(&mut self) {}
}

/// Speech synthesizer output for one transcript
///
/// Synthesizers expose no position, only whether they are speaking.
pub trait SpeechOutput: Send {
    /// Start speaking from the beginning of the transcript
    fn speak(&mut self) -> Result<()>;

    /// Pause mid-utterance
    fn pause(&mut self);

    /// Continue after `pause`
    fn resume(&mut self);

    /// Stop and discard the utterance
    fn stop(&mut self);

    /// Whether the synthesizer is currently producing speech
    fn is_speaking(&self) -> bool;

    /// Whether the whole transcript has been spoken
    fn is_finished(&self) -> bool {
        false
    }

    /// Apply an output gain (0.0-1.0)
    fn set_gain(&mut self, gain: f32);
}

/// Platform factory for content sources
///
/// Both calls may block (file I/O, decoder probing, synthesis warm-up); the
/// playback service runs them off the control path.
pub trait ContentBackend: Send + Sync {
    /// Open the primary audio asset
    ///
    /// # Errors
    /// `SourceUnavailable` when the file is missing or cannot be decoded
    fn open_audio(&self, path: &Path) -> Result<Box<dyn DecodedAudio>>;

    /// Prepare speech for a transcript
    ///
    /// # Errors
    /// `SourceUnavailable` when the synthesizer cannot be set up
    fn synthesize(&self, transcript: &str) -> Result<Box<dyn SpeechOutput>>;
}

/// The single live source of an episode
pub enum ContentSource {
    /// Primary asset
    DecodedAudio {
        /// Platform handle
        handle: Box<dyn DecodedAudio>,
        /// Catalog duration, used when the container reports none
        duration_estimate: Option<Duration>,
    },

    /// Transcript read aloud
    SynthesizedSpeech {
        /// Platform handle
        output: Box<dyn SpeechOutput>,
        /// Duration derived from transcript length
        estimated_duration: Duration,
    },
}

impl ContentSource {
    /// Best known duration
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::DecodedAudio {
                handle,
                duration_estimate,
            } => handle.duration().or(*duration_estimate),
            Self::SynthesizedSpeech {
                estimated_duration, ..
            } => Some(*estimated_duration),
        }
    }

    /// Whether the source supports seeking
    ///
    /// Speech never does; decoded audio only with a known duration.
    pub fn is_seekable(&self) -> bool {
        match self {
            Self::DecodedAudio { .. } => self.duration().is_some(),
            Self::SynthesizedSpeech { .. } => false,
        }
    }

    /// Whether this is the speech fallback
    pub fn is_speech(&self) -> bool {
        matches!(self, Self::SynthesizedSpeech { .. })
    }

    /// Start audible output for a freshly opened source
    pub(crate) fn begin(&mut self) -> Result<()> {
        match self {
            Self::DecodedAudio { handle, .. } => handle.play(),
            Self::SynthesizedSpeech { output, .. } => output.speak(),
        }
    }

    pub(crate) fn pause(&mut self) {
        match self {
            Self::DecodedAudio { handle, .. } => handle.pause(),
            Self::SynthesizedSpeech { output, .. } => output.pause(),
        }
    }

    pub(crate) fn resume(&mut self) -> Result<()> {
        match self {
            Self::DecodedAudio { handle, .. } => handle.play(),
            Self::SynthesizedSpeech { output, .. } => {
                output.resume();
                Ok(())
            }
        }
    }

    pub(crate) fn seek(&mut self, position: Duration) -> Result<Duration> {
        match self {
            Self::DecodedAudio { handle, .. } => handle.seek(position),
            Self::SynthesizedSpeech { .. } => Err(PlaybackError::NotSeekable),
        }
    }

    pub(crate) fn set_gain(&mut self, gain: f32) {
        match self {
            Self::DecodedAudio { handle, .. } => handle.set_gain(gain),
            Self::SynthesizedSpeech { output, .. } => output.set_gain(gain),
        }
    }

    /// Tear the source down completely
    pub(crate) fn release(mut self) {
        match &mut self {
            Self::DecodedAudio { handle, .. } => {
                handle.pause();
                handle.close();
            }
            Self::SynthesizedSpeech { output, .. } => output.stop(),
        }
    }
}

impl fmt::Debug for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecodedAudio {
                duration_estimate, ..
            } => f
                .debug_struct("DecodedAudio")
                .field("duration", &self.duration())
                .field("duration_estimate", duration_estimate)
                .finish_non_exhaustive(),
            Self::SynthesizedSpeech {
                estimated_duration, ..
            } => f
                .debug_struct("SynthesizedSpeech")
                .field("estimated_duration", estimated_duration)
                .finish_non_exhaustive(),
        }
    }
}
