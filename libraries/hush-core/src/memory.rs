//! In-memory collaborators
//!
//! Used by the headless player and by tests. They honour the same contracts
//! as a database-backed implementation, including concurrent writers.

use crate::error::{CoreError, Result};
use crate::traits::{CatalogProvider, EntitlementProvider, PersistenceStore};
use crate::types::{
    AggregateCounters, AggregateDelta, Category, CompletionRecord, PlayableSession, SessionId,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Catalog backed by a fixed list of sessions
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    sessions: Vec<PlayableSession>,
}

impl InMemoryCatalog {
    /// Create a catalog from a list of sessions
    ///
    /// # Errors
    /// Returns an error if two sessions share an id
    pub fn new(sessions: Vec<PlayableSession>) -> Result<Self> {
        let mut seen = HashSet::new();
        for session in &sessions {
            if !seen.insert(session.id.clone()) {
                return Err(CoreError::catalog(format!(
                    "duplicate session id: {}",
                    session.id
                )));
            }
        }
        Ok(Self { sessions })
    }

    /// All sessions in catalog order
    pub fn sessions(&self) -> &[PlayableSession] {
        &self.sessions
    }
}

#[async_trait]
impl CatalogProvider for InMemoryCatalog {
    async fn sessions_by_category(&self, category: Category) -> Result<Vec<PlayableSession>> {
        Ok(self
            .sessions
            .iter()
            .filter(|session| session.category == category)
            .cloned()
            .collect())
    }

    async fn session(&self, id: &SessionId) -> Result<Option<PlayableSession>> {
        Ok(self.sessions.iter().find(|session| &session.id == id).cloned())
    }
}

/// Persistence store that keeps everything in memory
///
/// `set_failing(true)` makes every write fail, which is how tests exercise
/// the non-fatal persistence path.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    completions: Mutex<Vec<CompletionRecord>>,
    offsets: Mutex<HashMap<SessionId, Duration>>,
    offset_writes: Mutex<Vec<(SessionId, Duration)>>,
    counters: Mutex<AggregateCounters>,
    failing: AtomicBool,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of persisted completion records
    pub fn completions(&self) -> Vec<CompletionRecord> {
        lock(&self.completions).clone()
    }

    /// Last offset persisted for a session
    pub fn last_offset(&self, session_id: &SessionId) -> Option<Duration> {
        lock(&self.offsets).get(session_id).copied()
    }

    /// Every offset write in arrival order
    pub fn offset_writes(&self) -> Vec<(SessionId, Duration)> {
        lock(&self.offset_writes).clone()
    }

    /// Current aggregate counters
    pub fn counters(&self) -> AggregateCounters {
        *lock(&self.counters)
    }

    fn check_writable(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CoreError::store("store is unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PersistenceStore for InMemoryStore {
    async fn record_completion(&self, record: CompletionRecord) -> Result<()> {
        self.check_writable()?;
        let mut completions = lock(&self.completions);
        if completions.iter().any(|r| r.record_id == record.record_id) {
            return Ok(());
        }
        completions.push(record);
        Ok(())
    }

    async fn update_last_offset(&self, session_id: &SessionId, offset: Duration) -> Result<()> {
        self.check_writable()?;
        lock(&self.offsets).insert(session_id.clone(), offset);
        lock(&self.offset_writes).push((session_id.clone(), offset));
        Ok(())
    }

    async fn increment_aggregate_counters(&self, delta: AggregateDelta) -> Result<()> {
        self.check_writable()?;
        lock(&self.counters).apply(delta);
        Ok(())
    }
}

/// Entitlements from a fixed allow-list
#[derive(Debug, Default, Clone)]
pub struct StaticEntitlements {
    unlock_all: bool,
    unlocked: HashSet<SessionId>,
}

impl StaticEntitlements {
    /// Every premium session is unlocked
    pub fn unlock_all() -> Self {
        Self {
            unlock_all: true,
            unlocked: HashSet::new(),
        }
    }

    /// Only the listed sessions are unlocked
    pub fn with_unlocked(ids: impl IntoIterator<Item = SessionId>) -> Self {
        Self {
            unlock_all: false,
            unlocked: ids.into_iter().collect(),
        }
    }
}

#[async_trait]
impl EntitlementProvider for StaticEntitlements {
    async fn is_premium_unlocked(&self, session_id: &SessionId) -> bool {
        self.unlock_all || self.unlocked.contains(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn session(id: &str, category: Category) -> PlayableSession {
        PlayableSession::new(id, id.to_uppercase(), PathBuf::from(format!("/audio/{id}.m4a")))
            .with_category(category)
    }

    #[test]
    fn catalog_rejects_duplicate_ids() {
        let result = InMemoryCatalog::new(vec![
            session("a", Category::Sleep),
            session("a", Category::Focus),
        ]);
        assert!(matches!(result, Err(CoreError::Catalog(_))));
    }

    #[tokio::test]
    async fn catalog_filters_by_category() {
        let catalog = InMemoryCatalog::new(vec![
            session("a", Category::Sleep),
            session("b", Category::Focus),
            session("c", Category::Sleep),
        ])
        .unwrap();

        let sleep = catalog.sessions_by_category(Category::Sleep).await.unwrap();
        let ids: Vec<_> = sleep.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        assert!(catalog.session(&SessionId::new("b")).await.unwrap().is_some());
        assert!(catalog.session(&SessionId::new("z")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_deduplicates_record_ids() {
        let store = InMemoryStore::new();
        let record = CompletionRecord::new(SessionId::new("a"), Duration::from_secs(10), None);

        store.record_completion(record.clone()).await.unwrap();
        store.record_completion(record).await.unwrap();

        assert_eq!(store.completions().len(), 1);
    }

    #[tokio::test]
    async fn failing_store_rejects_writes() {
        let store = InMemoryStore::new();
        store.set_failing(true);

        let id = SessionId::new("a");
        assert!(store.update_last_offset(&id, Duration::from_secs(5)).await.is_err());
        assert!(store
            .increment_aggregate_counters(AggregateDelta::completion(Duration::from_secs(5)))
            .await
            .is_err());
        assert_eq!(store.last_offset(&id), None);

        store.set_failing(false);
        store.update_last_offset(&id, Duration::from_secs(5)).await.unwrap();
        assert_eq!(store.last_offset(&id), Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn entitlements_respect_allow_list() {
        let entitlements = StaticEntitlements::with_unlocked([SessionId::new("a")]);
        assert!(entitlements.is_premium_unlocked(&SessionId::new("a")).await);
        assert!(!entitlements.is_premium_unlocked(&SessionId::new("b")).await);
        assert!(StaticEntitlements::unlock_all().is_premium_unlocked(&SessionId::new("b")).await);
    }
}
