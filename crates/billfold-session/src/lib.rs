//! billfold-session
//!
//! The session/auth core: the single source of truth for "who is signed in"
//! within a running client process.
//!
//! - **Sign-in from a provider assertion**: verification at the trust
//!   boundary, user upsert by provider subject, a signed local session with
//!   a fixed validity window
//! - **Lazy expiry**: an expired session is detected and cleared the next
//!   time authentication is consulted, not by background eviction
//! - **Durable persistence**: the session survives process restarts via the
//!   client-local state store, re-checked (token signature and expiry) on
//!   restore
//! - **Auth-state observers**: subscribers are notified synchronously, in
//!   registration order, on every committed transition; there is no replay
//!   of the current state at subscription time, so call
//!   [`AuthCore::session`] once at mount
//! - **Idle timeout**: a last-activity cell updated by
//!   [`AuthCore::record_activity`] and polled by the host through
//!   [`AuthCore::idle_tick`]
//!
//! A sign-out that lands while a verification is in flight wins: the stale
//! result is discarded at commit, never reapplied.
//!
//! Every failure is normalized to [`AuthError`] before it reaches a caller;
//! which verification check failed is logged, never surfaced.

mod error;
mod session;

pub use error::{AuthError, Result};
pub use session::{
    AuthCore, AuthSubscription, LAST_ACTIVITY_KEY, ProviderVerifier, SESSION_KEY, Session,
    SessionOptions, VerifyAssertion,
};
