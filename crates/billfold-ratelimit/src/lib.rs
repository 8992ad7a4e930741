//! Sliding-window rate limiting over the client's durable state store.
//!
//! Protects sensitive actions (sign-in attempts, payment attempts, record
//! creation) against rapid repetition. Attempt entries are appended on
//! accepted checks and pruned lazily on read; rejected checks record
//! nothing.
//!
//! This limiter protects only the local client instance. It must be paired
//! with equivalent enforcement at the trust boundary and is never a
//! substitute for server-side throttling.
//!
//! On storage failure the limiter follows its [`FailPolicy`]: the default
//! fails **open** (the action is allowed), trading strict throttling for
//! availability. Deployments needing stricter guarantees should construct
//! the limiter with [`FailPolicy::Closed`].

use std::sync::Arc;

use billfold_api::{BillfoldError, Clock, FailPolicy, StateStore};
use serde::{Deserialize, Serialize};

/// Default sliding window: one hour.
pub const DEFAULT_WINDOW_MS: u64 = 60 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AttemptEntry {
    ts_ms: u64,
    count: u32,
}

pub struct RateLimiter {
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    policy: FailPolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn StateStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            policy: FailPolicy::Open,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: FailPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Compose a limiter key from an action and an optional identifier
    /// (such as an email), e.g. `signin:user@example.com`.
    pub fn key_for(action: &str, identifier: Option<&str>) -> String {
        match identifier {
            Some(id) => format!("{action}:{id}"),
            None => action.to_string(),
        }
    }

    /// Check and record an attempt.
    ///
    /// Returns true and appends an entry when the sum of counts in the live
    /// window is below `limit`; returns false and records nothing
    /// otherwise. Storage errors resolve per the fail policy.
    pub fn is_allowed(&self, action: &str, limit: u32, window_ms: u64) -> bool {
        match self.check(action, limit, window_ms) {
            Ok(allowed) => allowed,
            Err(e) => {
                let open = self.policy == FailPolicy::Open;
                tracing::warn!(
                    action,
                    error = %e,
                    allowed = open,
                    "rate-limit storage failed, applying fail policy"
                );
                open
            }
        }
    }

    /// Remaining attempts in the live window.
    ///
    /// Prunes expired entries as a side effect but never counts as an
    /// attempt itself.
    pub fn remaining_attempts(&self, action: &str, limit: u32, window_ms: u64) -> u32 {
        match self.pruned_entries(action, window_ms) {
            Ok(entries) => {
                let used: u32 = entries.iter().map(|e| e.count).sum();
                limit.saturating_sub(used)
            }
            Err(e) => {
                let open = self.policy == FailPolicy::Open;
                tracing::warn!(
                    action,
                    error = %e,
                    "rate-limit storage failed while reading remaining attempts"
                );
                if open { limit } else { 0 }
            }
        }
    }

    fn check(&self, action: &str, limit: u32, window_ms: u64) -> Result<bool, BillfoldError> {
        let mut entries = self.pruned_entries(action, window_ms)?;
        let used: u32 = entries.iter().map(|e| e.count).sum();
        if used >= limit {
            return Ok(false);
        }
        entries.push(AttemptEntry {
            ts_ms: self.clock.now_ms(),
            count: 1,
        });
        self.save(action, &entries)?;
        Ok(true)
    }

    fn pruned_entries(
        &self,
        action: &str,
        window_ms: u64,
    ) -> Result<Vec<AttemptEntry>, BillfoldError> {
        let key = storage_key(action);
        let mut entries: Vec<AttemptEntry> = match self.store.get(&key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| BillfoldError::Storage(format!("corrupt window for {action}: {e}")))?,
            None => Vec::new(),
        };

        let cutoff = self.clock.now_ms().saturating_sub(window_ms);
        let before = entries.len();
        entries.retain(|e| e.ts_ms >= cutoff);
        if entries.len() != before {
            self.save(action, &entries)?;
        }
        Ok(entries)
    }

    fn save(&self, action: &str, entries: &[AttemptEntry]) -> Result<(), BillfoldError> {
        let raw = serde_json::to_string(entries)
            .map_err(|e| BillfoldError::Storage(format!("failed to encode window: {e}")))?;
        self.store.put(&storage_key(action), &raw)
    }
}

fn storage_key(action: &str) -> String {
    format!("ratelimit:{action}")
}
