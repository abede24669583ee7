use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Notify;

use crate::WakelockError;

// Type alias for the boxed release closure for clarity
type ReleaseFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), WakelockError>> + Send>;

/// Platform seam for acquiring the screen wake lock.
///
/// `request` may reject transiently (e.g. the page is not visible); the
/// controller treats every rejection as retryable. A successful request
/// yields a [`WakeLockSentinel`] that the controller holds until it releases
/// it or the platform revokes it out-of-band.
pub trait WakeLockProvider: Send + Sync + 'static {
    fn request(&self) -> BoxFuture<'static, Result<WakeLockSentinel, WakelockError>>;
}

/// A held wake lock. At most one is live at a time; it is owned exclusively
/// by the controller's convergence worker.
pub struct WakeLockSentinel {
    revoked: Arc<Notify>,
    release: ReleaseFn,
}

impl WakeLockSentinel {
    /// Build a sentinel. `revoked` must be notified (via `notify_one`) when
    /// the platform invalidates the lock without the holder's action;
    /// `release` performs the caller-initiated release.
    pub fn new<F>(revoked: Arc<Notify>, release: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'static, Result<(), WakelockError>> + Send + 'static,
    {
        Self {
            revoked,
            release: Box::new(release),
        }
    }

    /// Release the lock and await completion. Consumes the sentinel, so the
    /// revocation notification can no longer be observed for it.
    pub async fn release(self) -> Result<(), WakelockError> {
        (self.release)().await
    }

    /// Handle on the external-revocation notification. `notify_one` stores a
    /// permit, so a revocation that fires while nobody is waiting is still
    /// observed by the next waiter.
    pub fn revocation(&self) -> Arc<Notify> {
        self.revoked.clone()
    }
}

impl std::fmt::Debug for WakeLockSentinel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WakeLockSentinel").finish_non_exhaustive()
    }
}
