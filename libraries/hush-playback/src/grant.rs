//! Background execution guard
//!
//! Hosts only let an app keep playing in the background while it holds a
//! time-limited execution grant. The guard keeps at most one grant
//! outstanding and hands it back as soon as playback no longer needs it.

use crate::error::Result;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Opaque permission to keep running without foreground focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutionGrant {
    /// Host-assigned identifier
    pub id: u64,
    /// Time until the host revokes the grant, if it enforces a deadline
    pub expires_in: Option<Duration>,
}

/// Platform side of background execution
///
/// When a grant is about to lapse the host delivers
/// `PlatformSignal::GrantExpiring` with the grant's id.
pub trait ExecutionHost: Send {
    /// Ask for a grant
    ///
    /// # Errors
    /// `GrantDenied` when the host will not allow background execution
    fn acquire(&mut self) -> Result<ExecutionGrant>;

    /// Return a grant
    fn release(&mut self, grant: ExecutionGrant);
}

/// Single-outstanding-grant discipline on top of an [`ExecutionHost`]
pub struct BackgroundExecutionGuard {
    host: Box<dyn ExecutionHost>,
    held: Option<ExecutionGrant>,
}

impl BackgroundExecutionGuard {
    /// Wrap a host
    pub fn new(host: Box<dyn ExecutionHost>) -> Self {
        Self { host, held: None }
    }

    /// Acquire a fresh grant, releasing any held one first
    ///
    /// # Errors
    /// `GrantDenied` from the host; no grant is held afterwards
    pub fn acquire(&mut self) -> Result<ExecutionGrant> {
        self.release();
        match self.host.acquire() {
            Ok(grant) => {
                info!(
                    "Background execution grant {} acquired (expires in {:?})",
                    grant.id, grant.expires_in
                );
                self.held = Some(grant);
                Ok(grant)
            }
            Err(e) => {
                warn!("Background execution grant denied: {}", e);
                Err(e)
            }
        }
    }

    /// Acquire only if nothing is held
    ///
    /// # Errors
    /// `GrantDenied` from the host
    pub fn ensure(&mut self) -> Result<()> {
        if self.held.is_none() {
            self.acquire()?;
        }
        Ok(())
    }

    /// Release the held grant, if any
    pub fn release(&mut self) {
        if let Some(grant) = self.held.take() {
            debug!("Releasing background execution grant {}", grant.id);
            self.host.release(grant);
        }
    }

    /// Whether a grant is held
    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    /// Whether an expiry notice concerns the grant we hold
    ///
    /// Notices for grants already released are stale.
    pub fn is_expiring(&self, grant_id: u64) -> bool {
        self.held.is_some_and(|grant| grant.id == grant_id)
    }
}

impl std::fmt::Debug for BackgroundExecutionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundExecutionGuard")
            .field("held", &self.held)
            .finish_non_exhaustive()
    }
}
