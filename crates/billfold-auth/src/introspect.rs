//! Assertion verification against the identity provider.

use crate::{Error, Result};

use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of introspection data for an assertion.
#[derive(Debug, Clone)]
pub enum IntrospectionSource {
    /// POST the assertion to this provider endpoint.
    Url(String),
    /// Parse this JSON string as the introspection response.
    Json(String),
    /// Use these already-parsed claims.
    Claims(Value),
}

/// Options for assertion verification.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Client id the assertion's `aud` must equal.
    pub client_id: String,

    /// Expected issuer (`iss`), when the provider publishes one.
    pub issuer: Option<String>,

    /// Clock skew/leeway in seconds applied to the expiry check.
    pub leeway_seconds: u64,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            issuer: None,
            leeway_seconds: 60,
        }
    }
}

/// The subject/email the client claims the assertion belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedIdentity {
    /// Provider subject id.
    pub subject: String,
    /// Account email.
    pub email: String,
}

/// Identity attested by the provider after all checks passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Provider subject id.
    pub subject: String,
    /// Verified email.
    pub email: String,
    /// Display name, when the provider supplies one.
    pub display_name: Option<String>,
    /// Avatar URL, when the provider supplies one.
    pub avatar_url: Option<String>,
}

/// Raw introspection claims with typed accessors.
#[derive(Debug, Clone)]
pub struct IntrospectedAssertion {
    /// The decoded claims as JSON.
    pub claims: Value,
}

impl IntrospectedAssertion {
    /// Get a claim by key.
    pub fn claim(&self, key: &str) -> Option<&Value> {
        self.claims.get(key)
    }

    /// Convenience accessor for `sub`.
    pub fn sub(&self) -> Option<&str> {
        self.claim("sub").and_then(|v| v.as_str())
    }

    /// Convenience accessor for `iss`.
    pub fn iss(&self) -> Option<&str> {
        self.claim("iss").and_then(|v| v.as_str())
    }

    /// Convenience accessor for `aud`.
    pub fn aud(&self) -> Option<&Value> {
        self.claim("aud")
    }

    /// Convenience accessor for `exp` (seconds since epoch).
    pub fn exp(&self) -> Option<i64> {
        self.claim("exp").and_then(|v| v.as_i64())
    }

    /// Convenience accessor for `email`.
    pub fn email(&self) -> Option<&str> {
        self.claim("email").and_then(|v| v.as_str())
    }

    /// Whether the provider reports the email as verified.
    ///
    /// Some providers encode the flag as the string `"true"` rather than a
    /// JSON boolean; both forms are accepted.
    pub fn email_verified(&self) -> bool {
        match self.claim("email_verified") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "true",
            _ => false,
        }
    }

    /// Convenience accessor for `name`.
    pub fn name(&self) -> Option<&str> {
        self.claim("name").and_then(|v| v.as_str())
    }

    /// Convenience accessor for `picture`.
    pub fn picture(&self) -> Option<&str> {
        self.claim("picture").and_then(|v| v.as_str())
    }
}

/// Verifies bearer assertions from the identity provider.
#[derive(Debug, Clone, Default)]
pub struct AssertionVerifier {
    _priv: (),
}

impl AssertionVerifier {
    /// Verify an assertion against a claimed identity.
    ///
    /// Checks run in order: introspection, issuer, audience, expiry,
    /// email-verified flag, claimed subject/email match. The first failing
    /// check wins; its reason is logged here and returned distinctly. No
    /// retries are attempted, and a failed verification never touches a
    /// user record.
    pub async fn verify(
        &self,
        assertion: &str,
        claimed: &ClaimedIdentity,
        source: &IntrospectionSource,
        opts: &VerifyOptions,
    ) -> Result<VerifiedIdentity> {
        match self.verify_inner(assertion, claimed, source, opts).await {
            Ok(identity) => Ok(identity),
            Err(e) => {
                tracing::warn!(status = e.status(), error = %e, "assertion verification failed");
                Err(e)
            }
        }
    }

    async fn verify_inner(
        &self,
        assertion: &str,
        claimed: &ClaimedIdentity,
        source: &IntrospectionSource,
        opts: &VerifyOptions,
    ) -> Result<VerifiedIdentity> {
        if assertion.trim().is_empty() {
            return Err(Error::Malformed("empty assertion".to_string()));
        }
        if claimed.subject.is_empty() || claimed.email.is_empty() {
            return Err(Error::Malformed("missing claimed subject or email".to_string()));
        }

        let introspected = introspect(assertion, source).await?;

        if let Some(expected_iss) = &opts.issuer {
            let iss = introspected
                .iss()
                .ok_or_else(|| Error::InvalidAssertion("missing iss".to_string()))?;
            if iss != expected_iss {
                return Err(Error::InvalidAssertion(format!(
                    "issuer mismatch: expected {expected_iss}, got {iss}"
                )));
            }
        }

        check_audience(&introspected, &opts.client_id)?;
        check_expiry(&introspected, opts.leeway_seconds)?;

        if !introspected.email_verified() {
            return Err(Error::EmailUnverified);
        }

        let sub = introspected
            .sub()
            .ok_or_else(|| Error::InvalidAssertion("missing sub".to_string()))?;
        let email = introspected
            .email()
            .ok_or_else(|| Error::InvalidAssertion("missing email".to_string()))?;
        if sub != claimed.subject || !email.eq_ignore_ascii_case(&claimed.email) {
            return Err(Error::DataMismatch);
        }

        Ok(VerifiedIdentity {
            subject: sub.to_string(),
            email: email.to_string(),
            display_name: introspected.name().map(ToString::to_string),
            avatar_url: introspected.picture().map(ToString::to_string),
        })
    }
}

fn check_audience(introspected: &IntrospectedAssertion, client_id: &str) -> Result<()> {
    let aud = introspected
        .aud()
        .ok_or_else(|| Error::InvalidAssertion("missing aud".to_string()))?;
    let ok = match aud {
        Value::String(s) => s == client_id,
        Value::Array(arr) => arr.iter().any(|v| v.as_str() == Some(client_id)),
        _ => false,
    };
    if ok { Ok(()) } else { Err(Error::AudienceMismatch) }
}

fn check_expiry(introspected: &IntrospectedAssertion, leeway_seconds: u64) -> Result<()> {
    let exp = introspected
        .exp()
        .ok_or_else(|| Error::InvalidAssertion("missing exp".to_string()))?;
    if exp + leeway_seconds as i64 <= now_epoch_secs() {
        return Err(Error::Expired);
    }
    Ok(())
}

fn now_epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs() as i64
}

async fn introspect(assertion: &str, source: &IntrospectionSource) -> Result<IntrospectedAssertion> {
    match source {
        IntrospectionSource::Claims(claims) => Ok(IntrospectedAssertion {
            claims: claims.clone(),
        }),
        IntrospectionSource::Json(json) => Ok(IntrospectedAssertion {
            claims: serde_json::from_str(json)?,
        }),
        IntrospectionSource::Url(url) => fetch_introspection(url, assertion).await,
    }
}

#[cfg(feature = "fetch-reqwest")]
async fn fetch_introspection(url: &str, assertion: &str) -> Result<IntrospectedAssertion> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let resp = client
        .post(url)
        .form(&[("assertion", assertion)])
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(Error::InvalidAssertion(format!(
            "provider returned {}",
            resp.status()
        )));
    }

    let claims: Value = resp.json().await?;
    Ok(IntrospectedAssertion { claims })
}

#[cfg(not(feature = "fetch-reqwest"))]
async fn fetch_introspection(_url: &str, _assertion: &str) -> Result<IntrospectedAssertion> {
    Err(Error::InvalidAssertion(
        "IntrospectionSource::Url requires the fetch-reqwest feature (or provide Json/Claims)"
            .to_string(),
    ))
}
