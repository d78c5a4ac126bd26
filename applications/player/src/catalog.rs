//! Catalog file loading and session lookup
//!
//! The catalog is a TOML file of `[[sessions]]` tables, each one a
//! [`PlayableSession`]. Relative `audio_path`s are resolved against the
//! catalog's own directory.

use crate::error::{PlayerError, Result};
use hush_core::{
    CatalogProvider, Category, EntitlementProvider, InMemoryCatalog, PlayableSession, SessionId,
};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

const CATEGORIES: [Category; 5] = [
    Category::Meditation,
    Category::Sleep,
    Category::Focus,
    Category::Coaching,
    Category::Breathwork,
];

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    sessions: Vec<PlayableSession>,
}

/// Parse catalog TOML, resolving relative audio paths against `base_dir`
pub fn parse_catalog(contents: &str, base_dir: &Path) -> Result<InMemoryCatalog> {
    let file: CatalogFile =
        toml::from_str(contents).map_err(|e| PlayerError::Catalog(e.to_string()))?;

    let sessions = file
        .sessions
        .into_iter()
        .map(|mut session| {
            if session.audio_path.is_relative() {
                session.audio_path = base_dir.join(&session.audio_path);
            }
            session
        })
        .collect();

    Ok(InMemoryCatalog::new(sessions)?)
}

/// Load a catalog file from disk
pub fn load_catalog(path: &Path) -> Result<InMemoryCatalog> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        PlayerError::Catalog(format!("cannot read {}: {e}", path.display()))
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let catalog = parse_catalog(&contents, base_dir)?;
    info!(
        "Loaded {} sessions from {}",
        catalog.sessions().len(),
        path.display()
    );
    Ok(catalog)
}

/// Sessions in one category, or in every category when `category` is `None`
pub async fn list_sessions(
    catalog: &dyn CatalogProvider,
    category: Option<Category>,
) -> Result<Vec<PlayableSession>> {
    let categories = match category {
        Some(category) => vec![category],
        None => CATEGORIES.to_vec(),
    };

    let mut sessions = Vec::new();
    for category in categories {
        sessions.extend(catalog.sessions_by_category(category).await?);
    }
    Ok(sessions)
}

/// Look up a session and check it may be played
///
/// Premium sessions need an entitlement; the playback engine itself never
/// checks, so this is the gate.
pub async fn playable_session(
    catalog: &dyn CatalogProvider,
    entitlements: &dyn EntitlementProvider,
    id: &SessionId,
) -> Result<PlayableSession> {
    let session = catalog
        .session(id)
        .await?
        .ok_or_else(|| PlayerError::SessionNotFound(id.to_string()))?;

    if session.premium && !entitlements.is_premium_unlocked(id).await {
        return Err(PlayerError::Locked(id.to_string()));
    }

    debug!("Session {} is playable", id);
    Ok(session)
}
