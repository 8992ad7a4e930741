//! billfold-auth
//!
//! Authentication primitives for the Billfold client runtime. It covers the
//! two trust-boundary jobs the session core delegates:
//!
//! - **Verifying identity assertions** from the external provider
//!   (introspection, iss/aud checks, expiry with leeway, email-verified
//!   flag, claimed subject/email match)
//! - **Minting and checking signed session tokens** (an HS256 keyed MAC
//!   over the session claims, so the local session is server-verifiable
//!   rather than client-declared)
//!
//! The core API is `AssertionVerifier`, which can introspect an assertion
//! against the provider's endpoint (with the `fetch-reqwest` feature) or
//! against claims you provide directly.
//!
//! ## Quick start
//! ```no_run
//! use billfold_auth::{AssertionVerifier, ClaimedIdentity, IntrospectionSource, VerifyOptions};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let verifier = AssertionVerifier::default();
//! let identity = verifier.verify(
//!     "opaque-assertion-blob",
//!     &ClaimedIdentity {
//!         subject: "provider-subject-id".to_string(),
//!         email: "user@example.com".to_string(),
//!     },
//!     &IntrospectionSource::Url("https://id.example/introspect".to_string()),
//!     &VerifyOptions {
//!         client_id: "my-client-id".to_string(),
//!         ..Default::default()
//!     },
//! ).await?;
//!
//! println!("verified subject {}", identity.subject);
//! # Ok(()) }
//! ```
//!
//! Verification failures carry a distinct internal reason (and the 400/401
//! status of the verification boundary via [`Error::status`]); callers above
//! the boundary are expected to collapse them into one generic
//! "authentication failed".

#![forbid(unsafe_code)]

mod error;
mod introspect;
mod token;

pub use error::{Error, Result};
pub use introspect::{
    AssertionVerifier, ClaimedIdentity, IntrospectedAssertion, IntrospectionSource,
    VerifiedIdentity, VerifyOptions,
};
pub use token::{SessionClaims, mint_session_token, verify_session_token};
