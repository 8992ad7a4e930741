//! Signed session tokens.
//!
//! The session core mints a compact HS256 token over the session claims, a
//! keyed MAC that makes the local session server-verifiable. Expiry is
//! enforced by the session core against its own clock; [`verify_session_token`]
//! checks the signature and claim shape.

use crate::Result;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Provider subject id.
    pub sub: String,
    /// Account email.
    pub email: String,
    /// Issued-at, seconds since epoch.
    pub iat: u64,
    /// Expiry, seconds since epoch.
    pub exp: u64,
}

/// Mint a signed session token.
pub fn mint_session_token(claims: &SessionClaims, secret: &[u8]) -> Result<String> {
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )?;
    Ok(token)
}

/// Check a session token's signature and decode its claims.
pub fn verify_session_token(token: &str, secret: &[u8]) -> Result<SessionClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    // The session core owns expiry via its injected clock.
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    let data = jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret),
        &validation,
    )?;
    Ok(data.claims)
}
