//! Error types.

use thiserror::Error;

/// Crate result type.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Failures surfaced by the session core, normalized at the boundary.
///
/// Verification, upstream, and storage failures all collapse into
/// [`AuthError::AuthenticationFailed`]; the specific reason is logged and
/// never exposed to callers. Rate limiting is reported distinctly so the
/// caller can show remaining-attempts context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("too many attempts; {remaining} remaining in the current window")]
    RateLimited { remaining: u32 },
}
