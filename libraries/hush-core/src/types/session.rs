/// Playable session types
use super::{seconds, SessionId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Catalog category a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Guided meditation
    #[default]
    Meditation,
    /// Sleep stories and wind-down tracks
    Sleep,
    /// Focus and concentration
    Focus,
    /// Coaching talks
    Coaching,
    /// Breathing exercises
    Breathwork,
}

impl Category {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meditation => "meditation",
            Self::Sleep => "sleep",
            Self::Focus => "focus",
            Self::Coaching => "coaching",
            Self::Breathwork => "breathwork",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "meditation" => Some(Self::Meditation),
            "sleep" => Some(Self::Sleep),
            "focus" => Some(Self::Focus),
            "coaching" => Some(Self::Coaching),
            "breathwork" => Some(Self::Breathwork),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A guided-audio session as handed out by the catalog
///
/// The playback engine clones one of these for the lifetime of a single
/// episode; the catalog stays the owner of record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayableSession {
    /// Catalog identifier
    pub id: SessionId,

    /// Display title
    pub title: String,

    /// Secondary line (coach name, series)
    #[serde(default)]
    pub subtitle: Option<String>,

    /// Catalog category
    #[serde(default)]
    pub category: Category,

    /// Duration in seconds, if known before the audio is opened
    #[serde(default, with = "seconds::option")]
    pub duration: Option<Duration>,

    /// Primary decoded-audio reference
    pub audio_path: PathBuf,

    /// Transcript used for synthesized speech when the audio is unavailable
    #[serde(default)]
    pub transcript: Option<String>,

    /// Requires a premium entitlement
    #[serde(default)]
    pub premium: bool,

    /// Last persisted playback offset
    #[serde(default, with = "seconds")]
    pub last_offset: Duration,
}

impl PlayableSession {
    /// Create a session with the required fields
    pub fn new(id: impl Into<SessionId>, title: impl Into<String>, audio_path: PathBuf) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subtitle: None,
            category: Category::default(),
            duration: None,
            audio_path,
            transcript: None,
            premium: false,
            last_offset: Duration::ZERO,
        }
    }

    /// Set the subtitle
    #[must_use]
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    /// Set the category
    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Set the catalog duration
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Set the fallback transcript
    #[must_use]
    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }

    /// Mark as premium content
    #[must_use]
    pub fn premium(mut self) -> Self {
        self.premium = true;
        self
    }

    /// Set the last known playback offset
    #[must_use]
    pub fn with_last_offset(mut self, offset: Duration) -> Self {
        self.last_offset = offset;
        self
    }

    /// Transcript text, if it has any non-whitespace content
    pub fn fallback_transcript(&self) -> Option<&str> {
        self.transcript
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Whether speech synthesis can stand in for the primary audio
    pub fn has_fallback(&self) -> bool {
        self.fallback_transcript().is_some()
    }
}
