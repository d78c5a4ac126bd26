/// Player configuration
use crate::error::{PlayerError, Result};
use hush_core::{SessionId, StaticEntitlements};
use hush_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HushConfig {
    /// Policy constants handed to the playback controller
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// TOML catalog with `[[sessions]]` entries
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Tracing filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Lifetime of each background execution grant, in seconds
    ///
    /// Unset means grants never lapse. When set, an expiry notice is
    /// delivered once the lifetime runs out.
    #[serde(default)]
    pub grant_lifetime_secs: Option<u64>,

    #[serde(default)]
    pub entitlements: EntitlementSettings,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EntitlementSettings {
    #[serde(default)]
    pub unlock_all: bool,

    /// Premium sessions unlocked for this listener
    #[serde(default)]
    pub unlocked: Vec<String>,
}

impl EntitlementSettings {
    pub fn provider(&self) -> StaticEntitlements {
        if self.unlock_all {
            StaticEntitlements::unlock_all()
        } else {
            StaticEntitlements::with_unlocked(
                self.unlocked.iter().map(|id| SessionId::new(id.as_str())),
            )
        }
    }
}

impl HushConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `hush.toml` in the working
    /// directory is read when present. `HUSH_*` variables override both,
    /// with `__` separating nested keys (`HUSH_PLAYBACK__REPEAT=true`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from("hush.toml");
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("HUSH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| PlayerError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| PlayerError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let threshold = self.playback.completion_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(PlayerError::Config(format!(
                "completion_threshold must be within 0.0..=1.0, got {threshold}"
            )));
        }

        if self.playback.tick_interval.is_zero() {
            return Err(PlayerError::Config(
                "tick_interval must be greater than zero".to_string(),
            ));
        }

        if self.grant_lifetime_secs == Some(0) {
            return Err(PlayerError::Config(
                "grant_lifetime_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn grant_lifetime(&self) -> Option<Duration> {
        self.grant_lifetime_secs.map(Duration::from_secs)
    }
}

// Default values
fn default_catalog_path() -> PathBuf {
    PathBuf::from("catalog.toml")
}

fn default_log_filter() -> String {
    "hush_player=info,hush_playback=info".to_string()
}

impl Default for HushConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            catalog_path: default_catalog_path(),
            log_filter: default_log_filter(),
            grant_lifetime_secs: None,
            entitlements: EntitlementSettings::default(),
        }
    }
}
