use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use jiff::Timestamp;
use tracing::debug;

use crate::errors::RefreshFailure;
use crate::telemetry::refresh::RefreshTelemetry;

type PendingRefresh = Shared<BoxFuture<'static, Result<String, RefreshFailure>>>;

enum RefreshState {
    /// `issued` is the token produced by the last successful refresh, if any.
    Idle { issued: Option<String> },
    Refreshing {
        pending: PendingRefresh,
        telemetry: RefreshTelemetry,
    },
}

/// Coalesces concurrent refresh attempts into a single round-trip.
///
/// The first caller moves the state from Idle to Refreshing and installs a shared pending
/// future; callers arriving while Refreshing await that same future and observe its outcome.
/// Whichever waiter finishes first moves the state back to Idle.
///
/// A caller whose rejected token predates the last issued token gets that token back
/// without a new round-trip. The check happens under the state lock, so a refresh that
/// settles concurrently is never repeated.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    started: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RefreshState::Idle { issued: None }),
            started: AtomicU64::new(0),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock_state(), RefreshState::Refreshing { .. })
    }

    /// Number of refresh round-trips started by this coordinator.
    pub fn refreshes_started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    /// Forgets the last issued token, e.g. after a login or logout replaced the session.
    pub fn forget_issued(&self) {
        let mut state = self.lock_state();
        if let RefreshState::Idle { issued } = &mut *state {
            *issued = None;
        }
    }

    /// Runs `refresh_cb` unless a refresh is already pending, in which case its result is shared.
    ///
    /// `stale` is the access token the backend rejected. When a refresh has already replaced
    /// it, the replacement is returned and `refresh_cb` is not invoked.
    ///
    /// `refresh_cb` is only invoked by the caller that starts the refresh, and must complete
    /// every side effect (persisting or clearing tokens) before resolving.
    pub async fn refresh<F, Fut>(
        &self,
        waiter: &str,
        stale: Option<&str>,
        refresh_cb: F,
    ) -> Result<String, RefreshFailure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, RefreshFailure>> + Send + 'static,
    {
        let pending = match self.join_or_start(waiter, stale, refresh_cb) {
            Ok(pending) => pending,
            Err(issued) => return Ok(issued),
        };
        let result = pending.clone().await;
        self.settle(&pending, &result);
        result
    }

    /// Returns the pending refresh to await, or `Err` with an already issued replacement token.
    fn join_or_start<F, Fut>(
        &self,
        waiter: &str,
        stale: Option<&str>,
        refresh_cb: F,
    ) -> Result<PendingRefresh, String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, RefreshFailure>> + Send + 'static,
    {
        let mut state = self.lock_state();
        match &*state {
            RefreshState::Refreshing { pending, telemetry } => {
                telemetry.emit_join(waiter);
                return Ok(pending.clone());
            }
            RefreshState::Idle {
                issued: Some(issued),
            } if stale.is_some_and(|stale| stale != issued.as_str()) => {
                debug!(waiter, "refresh.reused");
                return Err(issued.clone());
            }
            RefreshState::Idle { .. } => {}
        }

        let telemetry = RefreshTelemetry::new(waiter);
        let events = telemetry.clone();
        let refresh = refresh_cb();
        let pending = async move {
            events.emit_start(Timestamp::now());
            let result = refresh.await;
            match &result {
                Ok(_) => events.emit_success(Timestamp::now()),
                Err(failure) => events.emit_failure(failure, Timestamp::now()),
            }
            result
        }
        .boxed()
        .shared();

        self.started.fetch_add(1, Ordering::SeqCst);
        *state = RefreshState::Refreshing {
            pending: pending.clone(),
            telemetry,
        };
        Ok(pending)
    }

    fn settle(&self, finished: &PendingRefresh, result: &Result<String, RefreshFailure>) {
        let mut state = self.lock_state();
        if let RefreshState::Refreshing { pending, .. } = &*state
            && pending.ptr_eq(finished)
        {
            debug!("refresh.idle");
            *state = RefreshState::Idle {
                issued: result.as_ref().ok().cloned(),
            };
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        // every transition is a single assignment, so a poisoned state is still consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
