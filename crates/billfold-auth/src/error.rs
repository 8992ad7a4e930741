//! Error types.

use thiserror::Error;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
///
/// The verification variants are deliberately distinct so the trust
/// boundary can log the exact reason; the session core collapses all of
/// them into one generic failure before anything reaches a caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Input was malformed before any provider check ran.
    #[error("malformed verification input: {0}")]
    Malformed(String),

    /// The provider rejected the assertion or returned an unusable response.
    #[error("invalid assertion: {0}")]
    InvalidAssertion(String),

    /// `aud` does not match the configured client id.
    #[error("audience mismatch")]
    AudienceMismatch,

    /// The assertion's expiry is in the past.
    #[error("assertion expired")]
    Expired,

    /// The provider reports the email as unverified.
    #[error("email not verified by provider")]
    EmailUnverified,

    /// Introspected subject/email differ from the client-claimed values.
    #[error("claimed identity does not match assertion")]
    DataMismatch,

    /// Session token failed to mint, or failed its signature/claim checks.
    #[error("session token rejected: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// An error occurred while performing HTTP requests.
    #[cfg(feature = "fetch-reqwest")]
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// HTTP status of the verification boundary: 400 for malformed input,
    /// 401 for everything else.
    pub fn status(&self) -> u16 {
        match self {
            Error::Malformed(_) => 400,
            _ => 401,
        }
    }
}
