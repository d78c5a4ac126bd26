//! Hush Core
//!
//! Platform-agnostic domain types and collaborator contracts for Hush
//! guided-audio playback.
//!
//! This crate provides the building blocks shared by the playback engine and
//! the host applications that embed it.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `PlayableSession`, `CompletionRecord`, `AggregateDelta`
//! - **Collaborator Traits**: `CatalogProvider`, `PersistenceStore`, `EntitlementProvider`
//! - **In-memory Collaborators**: `InMemoryCatalog`, `InMemoryStore`, `StaticEntitlements`
//! - **Error Handling**: Unified `CoreError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use hush_core::types::{Category, PlayableSession, SessionId};
//! use std::path::PathBuf;
//! use std::time::Duration;
//!
//! let session = PlayableSession::new("breath-01", "Box Breathing", PathBuf::from("/audio/breath-01.m4a"))
//!     .with_category(Category::Breathwork)
//!     .with_duration(Duration::from_secs(600))
//!     .with_transcript("Breathe in for four counts. Hold for four counts.");
//!
//! assert_eq!(session.id, SessionId::new("breath-01"));
//! assert!(session.has_fallback());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{CoreError, Result, StoreError};
pub use memory::{InMemoryCatalog, InMemoryStore, StaticEntitlements};
pub use traits::{CatalogProvider, EntitlementProvider, PersistenceStore};
pub use types::{
    AggregateCounters, AggregateDelta, Category, CompletionRecord, PlayableSession, SessionId,
};
