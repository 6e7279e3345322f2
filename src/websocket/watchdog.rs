//! Liveness watchdog for the live-update channel.
//!
//! The gateway does not announce a dropped connection: the symptom is
//! silence. The watchdog turns silence into action — every decoded frame
//! re-arms a timer, and if the timer ever expires, a caller-supplied
//! recovery action runs (typically: tear down and reconnect).
//!
//! # Timer Model
//!
//! At most one timer is outstanding per instance. [`Watchdog::trigger`]
//! cancels the previous timer and schedules a new one under a single lock,
//! so a stale timer can never fire after a newer trigger
//! (last-trigger-wins). [`Watchdog::cancel`] before expiry guarantees the
//! action does not fire for that cycle; a cancel racing the exact expiry
//! instant is undefined, which is acceptable because the recovery action
//! is idempotent-safe by contract.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Recovery action invoked when the watchdog expires.
///
/// Zero-argument and possibly suspending. An error it returns is logged by
/// the timer task; further handling is up to the action itself.
pub type RecoveryAction = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

// ============================================================================
// Watchdog
// ============================================================================

/// Timeout supervisor for the live-update channel.
///
/// Idle until the first [`trigger`](Self::trigger); armed while a timer is
/// outstanding; idle again after [`cancel`](Self::cancel) or expiry.
///
/// Lifecycle events are logged through `tracing`.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use wiser_gateway::Watchdog;
///
/// # fn example() -> wiser_gateway::Result<()> {
/// let watchdog = Watchdog::new(
///     || Box::pin(async { Ok(()) }),
///     Duration::from_secs(90),
/// )?;
///
/// watchdog.trigger();
/// watchdog.cancel();
/// # Ok(())
/// # }
/// ```
pub struct Watchdog {
    /// Interval of silence after which the recovery action fires.
    timeout: Duration,
    /// Action to run on expiry.
    action: RecoveryAction,
    /// Outstanding timer task, at most one at a time.
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Watchdog {
    /// Creates a watchdog with a recovery action and timeout.
    ///
    /// # Arguments
    ///
    /// * `action` - Zero-argument callable run on expiry; may suspend
    /// * `timeout` - Interval of silence tolerated before expiry
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `timeout` is zero.
    pub fn new<A>(action: A, timeout: Duration) -> Result<Self>
    where
        A: Fn() -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        if timeout.is_zero() {
            return Err(Error::config("watchdog timeout must be greater than zero"));
        }

        Ok(Self {
            timeout,
            action: Arc::new(action),
            timer: Mutex::new(None),
        })
    }

    /// Returns the configured timeout.
    #[inline]
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns `true` if a timer is currently outstanding.
    #[inline]
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    /// (Re-)arms the timer.
    ///
    /// Any outstanding timer is cancelled first, then a new one is
    /// scheduled for the full timeout. Returns once the new timer task is
    /// scheduled; does not wait for expiry.
    pub fn trigger(&self) {
        let mut slot = self.timer.lock();

        if let Some(previous) = slot.take() {
            previous.abort();
        }

        let action = Arc::clone(&self.action);
        let timeout = self.timeout;

        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;

            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "No liveness signal within timeout, running recovery action"
            );

            if let Err(e) = action().await {
                error!(error = %e, "Recovery action failed");
            }
        }));
    }

    /// Cancels any outstanding timer.
    ///
    /// After this returns, the recovery action will not fire for the cycle
    /// that was cancelled. No-op while idle.
    pub fn cancel(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
            debug!("Watchdog cancelled");
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        // A replaced or discarded watchdog must not fire afterwards
        self.cancel();
    }
}

impl std::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watchdog")
            .field("timeout", &self.timeout)
            .field("armed", &self.is_armed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
