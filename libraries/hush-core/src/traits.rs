/// Collaborator contracts consumed by the playback engine
///
/// These are deliberately narrow: the engine loads sessions, writes
/// completion bookkeeping, and nothing else. Entitlement is checked by the
/// caller before playback starts.
use crate::error::Result;
use crate::types::{AggregateDelta, Category, CompletionRecord, PlayableSession, SessionId};
use async_trait::async_trait;
use std::time::Duration;

/// Catalog of playable sessions
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// All sessions in a category, in catalog order
    async fn sessions_by_category(&self, category: Category) -> Result<Vec<PlayableSession>>;

    /// Look up a single session
    async fn session(&self, id: &SessionId) -> Result<Option<PlayableSession>>;
}

/// Persistence layer for completion bookkeeping
///
/// Implementations must accept concurrent append-only writes.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Persist a completion record
    ///
    /// # Errors
    /// Returns an error if the record could not be written
    async fn record_completion(&self, record: CompletionRecord) -> Result<()>;

    /// Remember where playback of a session last stood
    ///
    /// # Errors
    /// Returns an error if the offset could not be written
    async fn update_last_offset(&self, session_id: &SessionId, offset: Duration) -> Result<()>;

    /// Add to the aggregate listening counters
    ///
    /// # Errors
    /// Returns an error if the counters could not be written
    async fn increment_aggregate_counters(&self, delta: AggregateDelta) -> Result<()>;
}

/// Premium entitlement lookup
#[async_trait]
pub trait EntitlementProvider: Send + Sync {
    /// Whether the premium content of `session_id` is available to the user
    async fn is_premium_unlocked(&self, session_id: &SessionId) -> bool;
}
