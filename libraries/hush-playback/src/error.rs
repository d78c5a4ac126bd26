//! Error types for session playback

use thiserror::Error;

/// Playback errors
///
/// Most of these never reach the caller: the controller absorbs source and
/// grant failures into a state transition and reports persistence failures
/// as warnings. `NotSeekable`, `Cancelled` and `ServiceClosed` are returned
/// directly from the corresponding calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// Primary content missing or corrupt (or synthesis failed)
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// The live source cannot report or change its position reliably
    #[error("Source is not seekable")]
    NotSeekable,

    /// The host refused a background execution grant
    #[error("Background execution denied: {0}")]
    GrantDenied(String),

    /// The background execution grant is about to lapse
    #[error("Background execution grant expiring")]
    GrantExpiring,

    /// A completion or offset write was rejected
    #[error("Persistence write failed: {0}")]
    PersistenceWriteFailed(String),

    /// Operation needs a live episode and there is none
    #[error("No active episode")]
    NoActiveEpisode,

    /// The pending operation was cancelled by `stop` or a newer `start`
    #[error("Operation cancelled")]
    Cancelled,

    /// The playback service task is gone
    #[error("Playback service closed")]
    ServiceClosed,
}

impl PlaybackError {
    /// Create a source unavailable error
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    /// Create a grant denied error
    pub fn grant_denied(msg: impl Into<String>) -> Self {
        Self::GrantDenied(msg.into())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
