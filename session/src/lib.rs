//! Authenticated-session lifecycle for the salary coherence front-end.
//!
//! SYSTEM CONTEXT
//! ==============
//! Four pieces, leaves first:
//! - [`token_store`]: the durable auth record plus its `access_token` cookie
//!   mirror, written and cleared together.
//! - [`service`]: login, refresh, logout and the authenticated-request wrapper
//!   that refreshes an expired token before sending.
//! - [`guard`]: the cookie-only route policy applied to page navigations.
//! - [`context`]: observable `AuthState` with a periodic background refresh.
//!
//! The server uses the guard and the cookie builders; long-lived clients (the
//! CLI) use the full service + context stack.

pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod service;
pub mod storage;
pub mod token;
pub mod token_store;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::{ConfigError, SessionConfig};
pub use context::{AuthContext, AuthState};
pub use error::{AuthError, RequestError, StorageError};
pub use guard::{ACCESS_TOKEN_COOKIE, GuardDecision, GuardPolicy};
pub use service::{Navigator, SessionEvent, SessionService, SignOutReason};
pub use storage::{FileStorage, MemoryStorage, TokenStorage};
pub use token::{AuthRecord, Credentials, SessionToken};
pub use token_store::{Clock, SystemClock, TokenStore};
