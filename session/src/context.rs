//! Auth Context: observable session state with a background refresh timer.
//!
//! DESIGN
//! ======
//! The Token Store is the single source of truth. `AuthState` is a derived
//! view published on a `watch` channel: every session event (login, refresh,
//! logout, expiry observed inside an authenticated request) re-reads the
//! store and publishes only if something changed.
//!
//! Both background tasks (event listener, refresh timer) hold a `Weak`
//! reference, so dropping the last `AuthContext` handle stops them.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::AuthError;
use crate::service::{SessionEvent, SessionService};
use crate::token::{Credentials, SessionToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthState {
    pub is_authenticated: bool,
    /// True until [`AuthContext::init`] has resolved.
    pub is_loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self { is_authenticated: false, is_loading: true }
    }
}

#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    session: SessionService,
    state: watch::Sender<AuthState>,
    listener: Mutex<Option<JoinHandle<()>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl AuthContext {
    /// Wrap `session`. Starts listening to its events immediately; call
    /// [`Self::init`] to resolve the initial state.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(session: SessionService) -> Self {
        let events = session.subscribe();
        let (state, _) = watch::channel(AuthState::default());
        let inner = Arc::new(ContextInner {
            session,
            state,
            listener: Mutex::new(None),
            timer: Mutex::new(None),
        });
        let listener = tokio::spawn(listen(Arc::downgrade(&inner), events));
        *inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
        Self { inner }
    }

    #[must_use]
    pub fn session(&self) -> &SessionService {
        &self.inner.session
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        *self.inner.state.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Resolve the initial state from the Token Store. An expired token gets
    /// exactly one refresh attempt.
    pub async fn init(&self) -> AuthState {
        let store = self.inner.session.token_store();
        if store.get_token().is_some() && store.is_expired() {
            if let Err(e) = self.inner.session.refresh().await {
                tracing::info!(error = %e, "stored session could not be renewed");
            }
        }
        self.inner.sync();
        self.inner.state.send_modify(|state| state.is_loading = false);
        self.state()
    }

    /// # Errors
    ///
    /// Propagates [`SessionService::login`] failures; state is unchanged.
    pub async fn login(&self, credentials: &Credentials) -> Result<SessionToken, AuthError> {
        let token = self.inner.session.login(credentials).await?;
        self.inner.sync();
        Ok(token)
    }

    pub async fn logout(&self) {
        self.inner.session.logout().await;
        self.inner.sync();
    }

    /// # Errors
    ///
    /// `SessionExpired` when the refresh fails; the state is then signed out.
    pub async fn refresh_token(&self) -> Result<SessionToken, AuthError> {
        let outcome = self.inner.session.refresh().await;
        self.inner.sync();
        outcome
    }

    /// Login location for a view at `current` that needs a session, or
    /// `None` while loading or when signed in.
    #[must_use]
    pub fn require_auth(&self, current: &str) -> Option<String> {
        let state = self.state();
        (!state.is_loading && !state.is_authenticated).then(|| self.inner.session.login_location(current))
    }

    /// Whether the background refresh timer is currently running.
    #[must_use]
    pub fn refresh_timer_active(&self) -> bool {
        self.inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl ContextInner {
    /// Re-derive `is_authenticated` from the store and start or stop the
    /// refresh timer to match.
    fn sync(self: &Arc<Self>) {
        let authenticated = self.session.is_authenticated();
        self.state.send_if_modified(|state| {
            if state.is_authenticated == authenticated {
                return false;
            }
            state.is_authenticated = authenticated;
            true
        });
        if authenticated {
            self.start_timer();
        } else {
            self.stop_timer();
        }
    }

    fn start_timer(self: &Arc<Self>) {
        let mut slot = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let period = self.session.config().refresh_interval;
        tracing::debug!(period_secs = period.as_secs_f64(), "starting background refresh");
        *slot = Some(tokio::spawn(refresh_periodically(Arc::downgrade(self), period)));
    }

    fn stop_timer(&self) {
        let handle = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            tracing::debug!("stopping background refresh");
            handle.abort();
        }
    }
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        for slot in [&mut self.listener, &mut self.timer] {
            if let Some(handle) = slot.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
                handle.abort();
            }
        }
    }
}

// =============================================================================
// BACKGROUND TASKS
// =============================================================================

async fn listen(context: Weak<ContextInner>, mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                let Some(inner) = context.upgrade() else { return };
                inner.sync();
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

async fn refresh_periodically(context: Weak<ContextInner>, period: std::time::Duration) {
    let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticks.tick().await;
        // Never hold the context across the request.
        let Some(session) = context.upgrade().map(|inner| inner.session.clone()) else {
            return;
        };
        if let Err(e) = session.refresh().await {
            tracing::warn!(error = %e, "background refresh failed, signing out");
            if let Some(inner) = context.upgrade() {
                inner.sync();
            }
            return;
        }
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
