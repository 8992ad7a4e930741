use serde::{Deserialize, Serialize};

pub type UserId = String;
pub type ProviderSubject = String;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Free,
    Pro,
    Business,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Business => "business",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub provider_subject: ProviderSubject,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub provider_subject: ProviderSubject,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub user_id: UserId,
    pub tier: Tier,
    pub subscribed: bool,
    pub period_end_ms: Option<u64>,
    pub billing_ref: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailPolicy {
    #[default]
    Open,
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum BillfoldError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    }
}

pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, BillfoldError>;
    fn put(&self, key: &str, value: &str) -> Result<(), BillfoldError>;
    fn remove(&self, key: &str) -> Result<(), BillfoldError>;
}

pub trait SecretStore: Send + Sync {
    fn get(&self, secret_ref: &str) -> Result<String, BillfoldError>;
}

#[allow(async_fn_in_trait)]
pub trait UserStore: Send + Sync {
    async fn upsert_user_by_subject(&self, profile: &UserProfile) -> Result<User, BillfoldError>;
    async fn read_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, BillfoldError>;
}
