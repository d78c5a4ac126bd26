/// Player error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session {0} requires a premium entitlement")]
    Locked(String),

    #[error("Playback error: {0}")]
    Playback(#[from] hush_playback::PlaybackError),

    #[error("Core error: {0}")]
    Core(#[from] hush_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PlayerError>;
