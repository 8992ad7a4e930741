use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use billfold_api::{
    BillfoldError, Clock, SecretStore, StateStore, SubscriptionRecord, User, UserId, UserProfile,
    UserStore,
};

pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn get(&self, secret_ref: &str) -> Result<String, BillfoldError> {
        std::env::var(secret_ref)
            .map_err(|_| BillfoldError::NotFound(format!("missing secret env var {secret_ref}")))
    }
}

/// Durable client-local store: one file per key under a directory.
///
/// This subsystem is the only writer of its keys; no cross-process
/// coordination exists because each client instance is independent.
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: PathBuf) -> Result<Self, BillfoldError> {
        fs::create_dir_all(&dir).map_err(|e| {
            BillfoldError::Storage(format!("failed to create {}: {e}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl StateStore for FileStateStore {
    fn get(&self, key: &str) -> Result<Option<String>, BillfoldError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BillfoldError::Storage(format!("failed to read {key}: {e}"))),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), BillfoldError> {
        fs::write(self.path_for(key), value)
            .map_err(|e| BillfoldError::Storage(format!("failed to write {key}: {e}")))
    }

    fn remove(&self, key: &str) -> Result<(), BillfoldError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BillfoldError::Storage(format!("failed to remove {key}: {e}"))),
        }
    }
}

#[derive(Default)]
pub struct MemoryStateStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Result<Option<String>, BillfoldError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| BillfoldError::Internal("state store poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), BillfoldError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| BillfoldError::Internal("state store poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BillfoldError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| BillfoldError::Internal("state store poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

struct MemoryUsers {
    by_subject: BTreeMap<String, User>,
    subscriptions: BTreeMap<UserId, SubscriptionRecord>,
    next_id: u64,
}

/// Reference `UserStore` with upsert-by-subject semantics.
///
/// Subscription records are the mirror a webhook collaborator would
/// maintain; `set_subscription` stands in for that collaborator.
pub struct MemoryUserStore {
    clock: Arc<dyn Clock>,
    inner: RwLock<MemoryUsers>,
}

impl MemoryUserStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: RwLock::new(MemoryUsers {
                by_subject: BTreeMap::new(),
                subscriptions: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    pub fn set_subscription(&self, record: SubscriptionRecord) -> Result<(), BillfoldError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| BillfoldError::Internal("user store poisoned".to_string()))?;
        inner.subscriptions.insert(record.user_id.clone(), record);
        Ok(())
    }

    pub fn user_count(&self) -> usize {
        self.inner.read().map_or(0, |inner| inner.by_subject.len())
    }
}

impl UserStore for MemoryUserStore {
    async fn upsert_user_by_subject(&self, profile: &UserProfile) -> Result<User, BillfoldError> {
        let now = self.clock.now_ms();
        let mut inner = self
            .inner
            .write()
            .map_err(|_| BillfoldError::Internal("user store poisoned".to_string()))?;

        if let Some(user) = inner.by_subject.get_mut(&profile.provider_subject) {
            user.email = profile.email.clone();
            user.display_name = profile.display_name.clone();
            user.avatar_url = profile.avatar_url.clone();
            user.updated_at_ms = now;
            return Ok(user.clone());
        }

        let id = format!("user-{}", inner.next_id);
        inner.next_id += 1;
        let user = User {
            id,
            email: profile.email.clone(),
            display_name: profile.display_name.clone(),
            avatar_url: profile.avatar_url.clone(),
            provider_subject: profile.provider_subject.clone(),
            created_at_ms: now,
            updated_at_ms: now,
        };
        inner
            .by_subject
            .insert(profile.provider_subject.clone(), user.clone());
        Ok(user)
    }

    async fn read_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, BillfoldError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| BillfoldError::Internal("user store poisoned".to_string()))?;
        Ok(inner.subscriptions.get(user_id).cloned())
    }
}
