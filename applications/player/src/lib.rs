//! Hush Player Library
//!
//! Headless guided-audio player: loads a TOML catalog, gates premium
//! sessions, and drives one session through the playback service on
//! wall-clock platform stand-ins.
//!
//! This library exposes the core components for testing purposes.

pub mod catalog;
pub mod config;
pub mod error;
pub mod platform;

// Re-export commonly used types for convenience
pub use catalog::{list_sessions, load_catalog, parse_catalog, playable_session};
pub use config::{EntitlementSettings, HushConfig};
pub use error::{PlayerError, Result};
pub use platform::{
    forward_expiry_notices, headless_platform, read_duration, AlwaysGrant, ClockedAudio,
    HeadlessBackend, LoggingSurface, SilentSpeech,
};
