use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use billfold_api::{BillfoldError, FailPolicy};
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub issuer: Option<String>,
    pub introspection_url: String,
    pub client_id: String,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub validity_ms: u64,
    pub idle_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub token_secret_ref: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            validity_ms: 24 * 60 * 60 * 1000,
            idle_timeout_ms: 30 * 60 * 1000,
            poll_interval_ms: 60 * 1000,
            token_secret_ref: "BILLFOLD_TOKEN_SECRET".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub fail_policy: FailPolicy,
    pub window_ms: u64,
    pub limits: BTreeMap<String, u32>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            fail_policy: FailPolicy::Open,
            window_ms: 60 * 60 * 1000,
            limits: BTreeMap::from([
                ("signin".to_string(), 5),
                ("payment".to_string(), 3),
                ("invoice_create".to_string(), 20),
                ("client_create".to_string(), 20),
            ]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BillfoldConfig {
    pub identity: IdentityConfig,
    pub session: SessionConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    identity: RawIdentity,
    #[serde(default)]
    session: RawSession,
    #[serde(default)]
    rate_limit: RawRateLimit,
}

#[derive(Debug, Deserialize)]
struct RawIdentity {
    #[serde(default)]
    issuer: Option<String>,
    introspection_url: String,
    client_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawSession {
    validity_hours: u64,
    idle_timeout_minutes: u64,
    poll_interval_seconds: u64,
    token_secret_ref: String,
}

impl Default for RawSession {
    fn default() -> Self {
        Self {
            validity_hours: 24,
            idle_timeout_minutes: 30,
            poll_interval_seconds: 60,
            token_secret_ref: "BILLFOLD_TOKEN_SECRET".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawRateLimit {
    fail_policy: FailPolicy,
    window_minutes: u64,
    limits: BTreeMap<String, u32>,
}

impl Default for RawRateLimit {
    fn default() -> Self {
        let defaults = RateLimitConfig::default();
        Self {
            fail_policy: defaults.fail_policy,
            window_minutes: 60,
            limits: defaults.limits,
        }
    }
}

pub fn default_config_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config").join("billfold")
    } else {
        PathBuf::from(".billfold")
    }
}

pub fn load_config_from_dir(dir: &Path) -> Result<BillfoldConfig, BillfoldError> {
    let path = dir.join("billfold.toml");
    load_config_from_file(&path)
}

pub fn load_config_from_file(path: &Path) -> Result<BillfoldConfig, BillfoldError> {
    let content = fs::read_to_string(path)
        .map_err(|e| BillfoldError::NotFound(format!("failed to read {}: {e}", path.display())))?;
    let raw: RawConfig = toml::from_str(&content).map_err(|e| {
        BillfoldError::Validation(format!("invalid TOML in {}: {e}", path.display()))
    })?;

    let config = BillfoldConfig {
        identity: IdentityConfig {
            issuer: raw.identity.issuer,
            introspection_url: raw.identity.introspection_url,
            client_id: raw.identity.client_id,
        },
        session: SessionConfig {
            validity_ms: raw.session.validity_hours * 60 * 60 * 1000,
            idle_timeout_ms: raw.session.idle_timeout_minutes * 60 * 1000,
            poll_interval_ms: raw.session.poll_interval_seconds * 1000,
            token_secret_ref: raw.session.token_secret_ref,
        },
        rate_limit: RateLimitConfig {
            fail_policy: raw.rate_limit.fail_policy,
            window_ms: raw.rate_limit.window_minutes * 60 * 1000,
            limits: raw.rate_limit.limits,
        },
    };
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &BillfoldConfig) -> Result<(), BillfoldError> {
    if config.identity.client_id.trim().is_empty() {
        return Err(BillfoldError::Validation(
            "identity.client_id must not be empty".to_string(),
        ));
    }
    if config.identity.introspection_url.trim().is_empty() {
        return Err(BillfoldError::Validation(
            "identity.introspection_url must not be empty".to_string(),
        ));
    }
    if config.session.token_secret_ref.trim().is_empty() {
        return Err(BillfoldError::Validation(
            "session.token_secret_ref must not be empty".to_string(),
        ));
    }
    if config.session.validity_ms == 0 {
        return Err(BillfoldError::Validation(
            "session.validity_hours must be non-zero".to_string(),
        ));
    }
    if config.rate_limit.window_ms == 0 {
        return Err(BillfoldError::Validation(
            "rate_limit.window_minutes must be non-zero".to_string(),
        ));
    }
    for (action, limit) in &config.rate_limit.limits {
        if *limit == 0 {
            return Err(BillfoldError::Validation(format!(
                "rate_limit.limits.{action} must be non-zero"
            )));
        }
    }
    Ok(())
}
