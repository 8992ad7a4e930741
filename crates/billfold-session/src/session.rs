use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use billfold_api::{BillfoldError, Clock, SecretStore, StateStore, User, UserProfile, UserStore};
use billfold_auth::{
    AssertionVerifier, ClaimedIdentity, IntrospectionSource, SessionClaims, VerifiedIdentity,
    VerifyOptions,
};
use billfold_core::BillfoldConfig;
use billfold_ratelimit::RateLimiter;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Durable key holding the serialized current session.
pub const SESSION_KEY: &str = "session";

/// Durable key holding the last-activity instant (epoch ms).
pub const LAST_ACTIVITY_KEY: &str = "last_activity";

const SIGNIN_ACTION: &str = "signin";

/// The current signed-in identity and its validity window.
///
/// Exactly one per process, owned by [`AuthCore`]; replaced wholesale on
/// re-authentication, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub token: String,
    pub expires_at_ms: u64,
}

impl Session {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms <= now_ms
    }
}

/// Verification seam between the session core and the trust boundary.
#[allow(async_fn_in_trait)]
pub trait VerifyAssertion: Send + Sync {
    async fn verify(
        &self,
        assertion: &str,
        claimed: &ClaimedIdentity,
    ) -> Result<VerifiedIdentity, billfold_auth::Error>;
}

/// Production verifier bound to a configured identity provider.
pub struct ProviderVerifier {
    verifier: AssertionVerifier,
    source: IntrospectionSource,
    options: VerifyOptions,
}

impl ProviderVerifier {
    pub fn new(source: IntrospectionSource, options: VerifyOptions) -> Self {
        Self {
            verifier: AssertionVerifier::default(),
            source,
            options,
        }
    }

    pub fn from_config(config: &BillfoldConfig) -> Self {
        Self::new(
            IntrospectionSource::Url(config.identity.introspection_url.clone()),
            VerifyOptions {
                client_id: config.identity.client_id.clone(),
                issuer: config.identity.issuer.clone(),
                ..Default::default()
            },
        )
    }
}

impl VerifyAssertion for ProviderVerifier {
    async fn verify(
        &self,
        assertion: &str,
        claimed: &ClaimedIdentity,
    ) -> Result<VerifiedIdentity, billfold_auth::Error> {
        self.verifier
            .verify(assertion, claimed, &self.source, &self.options)
            .await
    }
}

/// Tunables of the session core.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub validity_ms: u64,
    pub idle_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub token_secret: Vec<u8>,
    pub signin_limit: u32,
    pub signin_window_ms: u64,
}

impl SessionOptions {
    /// Defaults: 24 h validity, 30 min idle timeout, 60 s poll interval,
    /// 5 sign-in attempts per hour.
    pub fn new(token_secret: Vec<u8>) -> Self {
        Self {
            validity_ms: 24 * 60 * 60 * 1000,
            idle_timeout_ms: 30 * 60 * 1000,
            poll_interval_ms: 60 * 1000,
            token_secret,
            signin_limit: 5,
            signin_window_ms: 60 * 60 * 1000,
        }
    }

    pub fn from_config(
        config: &BillfoldConfig,
        secrets: &dyn SecretStore,
    ) -> Result<Self, BillfoldError> {
        let token_secret = secrets.get(&config.session.token_secret_ref)?.into_bytes();
        Ok(Self {
            validity_ms: config.session.validity_ms,
            idle_timeout_ms: config.session.idle_timeout_ms,
            poll_interval_ms: config.session.poll_interval_ms,
            token_secret,
            signin_limit: config
                .rate_limit
                .limits
                .get(SIGNIN_ACTION)
                .copied()
                .unwrap_or(5),
            signin_window_ms: config.rate_limit.window_ms,
        })
    }
}

struct CoreState {
    session: Option<Session>,
    // Bumped on every committed transition; an in-flight sign-in whose
    // entry epoch no longer matches is stale and must be discarded.
    epoch: u64,
}

type AuthCallback = Arc<dyn Fn(Option<&Session>) + Send + Sync>;
type SubscriberRegistry = RwLock<Vec<(u64, AuthCallback)>>;

/// Handle returned by [`AuthCore::on_auth_state_change`].
pub struct AuthSubscription {
    id: u64,
    registry: Weak<SubscriberRegistry>,
}

impl AuthSubscription {
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            if let Ok(mut subscribers) = registry.write() {
                subscribers.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

/// The session/auth core.
pub struct AuthCore<V, U> {
    verifier: V,
    users: U,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    limiter: RateLimiter,
    options: SessionOptions,
    state: RwLock<CoreState>,
    subscribers: Arc<SubscriberRegistry>,
    next_subscriber: AtomicU64,
    last_activity_ms: AtomicU64,
}

impl<V, U> AuthCore<V, U>
where
    V: VerifyAssertion,
    U: UserStore,
{
    /// Build the core, restoring a persisted session when its token still
    /// checks out and its expiry is in the future.
    pub fn new(
        verifier: V,
        users: U,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
        limiter: RateLimiter,
        options: SessionOptions,
    ) -> Self {
        let session = restore_session(store.as_ref(), clock.as_ref(), &options.token_secret);
        let last_activity = match store.get(LAST_ACTIVITY_KEY) {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|_| clock.now_ms()),
            _ => clock.now_ms(),
        };
        Self {
            verifier,
            users,
            store,
            clock,
            limiter,
            options,
            state: RwLock::new(CoreState { session, epoch: 0 }),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_subscriber: AtomicU64::new(0),
            last_activity_ms: AtomicU64::new(last_activity),
        }
    }

    /// Build the core from loaded configuration, wiring the sign-in rate
    /// limiter with the configured fail policy.
    pub fn from_config(
        verifier: V,
        users: U,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
        config: &BillfoldConfig,
        secrets: &dyn SecretStore,
    ) -> Result<Self, BillfoldError> {
        let options = SessionOptions::from_config(config, secrets)?;
        let limiter = RateLimiter::new(store.clone(), clock.clone())
            .with_policy(config.rate_limit.fail_policy);
        Ok(Self::new(verifier, users, store, clock, limiter, options))
    }

    /// Sign in with an opaque provider assertion.
    ///
    /// Rate-limit gate, verification across the trust boundary, user
    /// upsert, then a signed session persisted before the in-memory commit.
    /// Subscribers are notified after the commit. On any failure no session
    /// is created or altered.
    pub async fn sign_in_with_assertion(
        &self,
        assertion: &str,
        claimed: &ClaimedIdentity,
    ) -> Result<User, AuthError> {
        let limit_key = RateLimiter::key_for(SIGNIN_ACTION, Some(&claimed.email));
        if !self.limiter.is_allowed(
            &limit_key,
            self.options.signin_limit,
            self.options.signin_window_ms,
        ) {
            let remaining = self.limiter.remaining_attempts(
                &limit_key,
                self.options.signin_limit,
                self.options.signin_window_ms,
            );
            return Err(AuthError::RateLimited { remaining });
        }

        let entry_epoch = self.epoch();

        let identity = self
            .verifier
            .verify(assertion, claimed)
            .await
            .map_err(|e| {
                tracing::warn!(status = e.status(), error = %e, "sign-in verification failed");
                AuthError::AuthenticationFailed
            })?;

        // A transition may have landed while verification was in flight;
        // a stale result must not reach the user store.
        if self.epoch() != entry_epoch {
            tracing::warn!(subject = %identity.subject, "discarding stale sign-in result");
            return Err(AuthError::AuthenticationFailed);
        }

        let profile = UserProfile {
            provider_subject: identity.subject.clone(),
            email: identity.email.clone(),
            display_name: identity
                .display_name
                .clone()
                .unwrap_or_else(|| identity.email.clone()),
            avatar_url: identity.avatar_url.clone(),
        };
        let user = self
            .users
            .upsert_user_by_subject(&profile)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "user upsert failed");
                AuthError::AuthenticationFailed
            })?;

        let now = self.clock.now_ms();
        let expires_at_ms = now + self.options.validity_ms;
        let claims = SessionClaims {
            sub: user.provider_subject.clone(),
            email: user.email.clone(),
            iat: now / 1000,
            exp: expires_at_ms / 1000,
        };
        let token = billfold_auth::mint_session_token(&claims, &self.options.token_secret)
            .map_err(|e| {
                tracing::warn!(error = %e, "failed to mint session token");
                AuthError::AuthenticationFailed
            })?;
        let session = Session {
            user: user.clone(),
            token,
            expires_at_ms,
        };

        {
            let Ok(mut guard) = self.state.write() else {
                tracing::warn!("session state poisoned");
                return Err(AuthError::AuthenticationFailed);
            };
            if guard.epoch != entry_epoch {
                tracing::warn!(subject = %identity.subject, "discarding stale sign-in result");
                return Err(AuthError::AuthenticationFailed);
            }
            let payload = serde_json::to_string(&session).map_err(|e| {
                tracing::warn!(error = %e, "failed to encode session");
                AuthError::AuthenticationFailed
            })?;
            if let Err(e) = self.store.put(SESSION_KEY, &payload) {
                tracing::warn!(error = %e, "failed to persist session");
                return Err(AuthError::AuthenticationFailed);
            }
            guard.session = Some(session.clone());
            guard.epoch += 1;
        }

        self.touch_activity();
        tracing::debug!(user = %user.id, "signed in");
        self.notify(Some(&session));
        Ok(user)
    }

    /// Clear the session everywhere and notify subscribers with "no
    /// session". Always bumps the epoch so any in-flight sign-in becomes
    /// stale.
    pub fn sign_out(&self) {
        if let Ok(mut guard) = self.state.write() {
            guard.session = None;
            guard.epoch += 1;
        }
        if let Err(e) = self.store.remove(SESSION_KEY) {
            tracing::warn!(error = %e, "failed to clear persisted session");
        }
        tracing::debug!("signed out");
        self.notify(None);
    }

    /// Current session. Pure read of in-memory state.
    pub fn session(&self) -> Option<Session> {
        self.state.read().ok().and_then(|guard| guard.session.clone())
    }

    /// Current user. Pure read of in-memory state.
    pub fn user(&self) -> Option<User> {
        self.state
            .read()
            .ok()
            .and_then(|guard| guard.session.as_ref().map(|s| s.user.clone()))
    }

    /// True iff a session exists and its expiry is in the future.
    ///
    /// A mutating read: an expired session triggers an implicit sign-out
    /// from within this very check (lazy expiry).
    pub fn is_authenticated(&self) -> bool {
        let expired = match self.state.read() {
            Ok(guard) => match &guard.session {
                None => return false,
                Some(session) => session.is_expired(self.clock.now_ms()),
            },
            Err(_) => return false,
        };
        if expired {
            tracing::debug!("session expired, signing out");
            self.sign_out();
            return false;
        }
        true
    }

    /// Register an auth-state subscriber.
    ///
    /// Subscribers receive only forward transitions, not a replay of the
    /// current state; call [`AuthCore::session`] once at mount to learn it.
    pub fn on_auth_state_change(
        &self,
        callback: impl Fn(Option<&Session>) + Send + Sync + 'static,
    ) -> AuthSubscription {
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut subscribers) = self.subscribers.write() {
            subscribers.push((id, Arc::new(callback)));
        }
        AuthSubscription {
            id,
            registry: Arc::downgrade(&self.subscribers),
        }
    }

    /// Record an interaction event, refreshing the idle-timeout window.
    pub fn record_activity(&self) {
        self.touch_activity();
    }

    /// Timer-driven idle check; the host calls this on a fixed interval
    /// (see [`SessionOptions::poll_interval_ms`]). Signs out once the idle
    /// timeout has elapsed since the last recorded activity.
    pub fn idle_tick(&self) {
        if !self.is_authenticated() {
            return;
        }
        let last = self.last_activity_ms.load(Ordering::Relaxed);
        let now = self.clock.now_ms();
        if now.saturating_sub(last) >= self.options.idle_timeout_ms {
            tracing::info!("idle timeout reached, signing out");
            self.sign_out();
        }
    }

    fn touch_activity(&self) {
        let now = self.clock.now_ms();
        self.last_activity_ms.store(now, Ordering::Relaxed);
        if let Err(e) = self.store.put(LAST_ACTIVITY_KEY, &now.to_string()) {
            tracing::warn!(error = %e, "failed to persist last activity");
        }
    }

    fn epoch(&self) -> u64 {
        // A poisoned lock reads as an unmatchable epoch, so in-flight work
        // discards itself.
        self.state.read().map_or(u64::MAX, |guard| guard.epoch)
    }

    fn notify(&self, session: Option<&Session>) {
        let snapshot: Vec<AuthCallback> = match self.subscribers.read() {
            Ok(subscribers) => subscribers.iter().map(|(_, cb)| cb.clone()).collect(),
            Err(_) => return,
        };
        for callback in snapshot {
            callback(session);
        }
    }
}

fn restore_session(store: &dyn StateStore, clock: &dyn Clock, secret: &[u8]) -> Option<Session> {
    let raw = match store.get(SESSION_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read persisted session");
            return None;
        }
    };
    let session: Session = match serde_json::from_str(&raw) {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "corrupt persisted session, discarding");
            let _ = store.remove(SESSION_KEY);
            return None;
        }
    };
    if session.is_expired(clock.now_ms()) {
        tracing::debug!("persisted session expired, discarding");
        let _ = store.remove(SESSION_KEY);
        return None;
    }
    if let Err(e) = billfold_auth::verify_session_token(&session.token, secret) {
        tracing::warn!(error = %e, "persisted session token rejected, discarding");
        let _ = store.remove(SESSION_KEY);
        return None;
    }
    Some(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use billfold_core::{MemoryStateStore, MemoryUserStore};
    use std::sync::Mutex;

    const DAY_MS: u64 = 24 * 60 * 60 * 1000;

    struct TestClock(AtomicU64);

    impl TestClock {
        fn at(ms: u64) -> Arc<Self> {
            Arc::new(Self(AtomicU64::new(ms)))
        }

        fn advance(&self, ms: u64) {
            self.0.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl Clock for TestClock {
        fn now_ms(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct OkVerifier(VerifiedIdentity);

    impl VerifyAssertion for OkVerifier {
        async fn verify(
            &self,
            _assertion: &str,
            _claimed: &ClaimedIdentity,
        ) -> Result<VerifiedIdentity, billfold_auth::Error> {
            Ok(self.0.clone())
        }
    }

    struct RejectingVerifier;

    impl VerifyAssertion for RejectingVerifier {
        async fn verify(
            &self,
            _assertion: &str,
            _claimed: &ClaimedIdentity,
        ) -> Result<VerifiedIdentity, billfold_auth::Error> {
            Err(billfold_auth::Error::AudienceMismatch)
        }
    }

    struct GatedVerifier {
        gate: Arc<tokio::sync::Notify>,
        identity: VerifiedIdentity,
    }

    impl VerifyAssertion for GatedVerifier {
        async fn verify(
            &self,
            _assertion: &str,
            _claimed: &ClaimedIdentity,
        ) -> Result<VerifiedIdentity, billfold_auth::Error> {
            self.gate.notified().await;
            Ok(self.identity.clone())
        }
    }

    struct FailingStore;

    impl StateStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, BillfoldError> {
            Err(BillfoldError::Storage("disk gone".to_string()))
        }
        fn put(&self, _key: &str, _value: &str) -> Result<(), BillfoldError> {
            Err(BillfoldError::Storage("disk gone".to_string()))
        }
        fn remove(&self, _key: &str) -> Result<(), BillfoldError> {
            Err(BillfoldError::Storage("disk gone".to_string()))
        }
    }

    fn identity() -> VerifiedIdentity {
        VerifiedIdentity {
            subject: "subject-1".to_string(),
            email: "user@example.com".to_string(),
            display_name: Some("Ada".to_string()),
            avatar_url: None,
        }
    }

    fn claimed() -> ClaimedIdentity {
        ClaimedIdentity {
            subject: "subject-1".to_string(),
            email: "user@example.com".to_string(),
        }
    }

    fn core_with(
        verifier: impl VerifyAssertion,
        store: Arc<dyn StateStore>,
        clock: Arc<TestClock>,
    ) -> AuthCore<impl VerifyAssertion, MemoryUserStore> {
        let limiter = RateLimiter::new(store.clone(), clock.clone());
        AuthCore::new(
            verifier,
            MemoryUserStore::new(clock.clone()),
            store,
            clock,
            limiter,
            SessionOptions::new(b"test-secret".to_vec()),
        )
    }

    #[tokio::test]
    async fn sign_in_mints_day_long_session() {
        let clock = TestClock::at(1_000_000);
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::default());
        let core = core_with(OkVerifier(identity()), store.clone(), clock);

        let user = core.sign_in_with_assertion("blob", &claimed()).await.unwrap();
        let session = core.session().unwrap();
        assert_eq!(session.expires_at_ms, 1_000_000 + DAY_MS);
        assert_eq!(session.user.id, user.id);
        assert!(core.is_authenticated());
        assert!(store.get(SESSION_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn lazy_expiry_clears_session_on_check() {
        let clock = TestClock::at(1_000_000);
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::default());
        let core = core_with(OkVerifier(identity()), store.clone(), clock.clone());

        core.sign_in_with_assertion("blob", &claimed()).await.unwrap();
        clock.advance(DAY_MS + 1);

        assert!(!core.is_authenticated());
        assert_eq!(core.session(), None);
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn verification_failure_creates_no_session() {
        let clock = TestClock::at(1_000_000);
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::default());
        let core = core_with(RejectingVerifier, store.clone(), clock);

        let err = core.sign_in_with_assertion("blob", &claimed()).await.unwrap_err();
        assert_eq!(err, AuthError::AuthenticationFailed);
        assert_eq!(core.session(), None);
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn storage_failure_creates_no_session() {
        let clock = TestClock::at(1_000_000);
        let core = core_with(OkVerifier(identity()), Arc::new(FailingStore), clock);

        let err = core.sign_in_with_assertion("blob", &claimed()).await.unwrap_err();
        assert_eq!(err, AuthError::AuthenticationFailed);
        assert_eq!(core.session(), None);
    }

    #[tokio::test]
    async fn sixth_sign_in_attempt_is_rate_limited() {
        let clock = TestClock::at(1_000_000);
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::default());
        let core = core_with(RejectingVerifier, store, clock);

        for _ in 0..5 {
            assert_eq!(
                core.sign_in_with_assertion("blob", &claimed()).await.unwrap_err(),
                AuthError::AuthenticationFailed
            );
        }
        assert_eq!(
            core.sign_in_with_assertion("blob", &claimed()).await.unwrap_err(),
            AuthError::RateLimited { remaining: 0 }
        );
    }

    #[tokio::test]
    async fn sign_out_during_verification_wins() {
        let clock = TestClock::at(1_000_000);
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::default());
        let gate = Arc::new(tokio::sync::Notify::new());
        let core = core_with(
            GatedVerifier {
                gate: gate.clone(),
                identity: identity(),
            },
            store,
            clock,
        );

        let claimed = claimed();
        let (result, ()) = tokio::join!(core.sign_in_with_assertion("blob", &claimed), async {
            // Let the sign-in reach the verifier gate first.
            tokio::task::yield_now().await;
            core.sign_out();
            gate.notify_one();
        });

        assert_eq!(result.unwrap_err(), AuthError::AuthenticationFailed);
        assert_eq!(core.session(), None);
        assert!(!core.is_authenticated());
    }

    #[tokio::test]
    async fn subscribers_notified_in_registration_order_without_replay() {
        let clock = TestClock::at(1_000_000);
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::default());
        let core = core_with(OkVerifier(identity()), store, clock);

        let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let a_events = events.clone();
        let _a = core.on_auth_state_change(move |session| {
            a_events
                .lock()
                .unwrap()
                .push(format!("a:{}", session.map_or("none", |_| "some")));
        });
        let b_events = events.clone();
        let b = core.on_auth_state_change(move |session| {
            b_events
                .lock()
                .unwrap()
                .push(format!("b:{}", session.map_or("none", |_| "some")));
        });

        // No replay of the current state at subscription time.
        assert!(events.lock().unwrap().is_empty());

        core.sign_in_with_assertion("blob", &claimed()).await.unwrap();
        assert_eq!(*events.lock().unwrap(), vec!["a:some", "b:some"]);

        b.unsubscribe();
        core.sign_out();
        assert_eq!(*events.lock().unwrap(), vec!["a:some", "b:some", "a:none"]);
    }

    #[tokio::test]
    async fn restores_persisted_session() {
        let clock = TestClock::at(1_000_000);
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::default());
        {
            let core = core_with(OkVerifier(identity()), store.clone(), clock.clone());
            core.sign_in_with_assertion("blob", &claimed()).await.unwrap();
        }

        let core = core_with(OkVerifier(identity()), store, clock);
        let session = core.session().unwrap();
        assert_eq!(session.user.provider_subject, "subject-1");
        assert!(core.is_authenticated());
    }

    #[tokio::test]
    async fn does_not_restore_expired_session() {
        let clock = TestClock::at(1_000_000);
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::default());
        {
            let core = core_with(OkVerifier(identity()), store.clone(), clock.clone());
            core.sign_in_with_assertion("blob", &claimed()).await.unwrap();
        }
        clock.advance(DAY_MS + 1);

        let core = core_with(OkVerifier(identity()), store.clone(), clock);
        assert_eq!(core.session(), None);
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn does_not_restore_tampered_session() {
        let clock = TestClock::at(1_000_000);
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::default());
        {
            let core = core_with(OkVerifier(identity()), store.clone(), clock.clone());
            core.sign_in_with_assertion("blob", &claimed()).await.unwrap();
        }

        let mut session: Session =
            serde_json::from_str(&store.get(SESSION_KEY).unwrap().unwrap()).unwrap();
        session.token = format!("{}x", session.token);
        store
            .put(SESSION_KEY, &serde_json::to_string(&session).unwrap())
            .unwrap();

        let core = core_with(OkVerifier(identity()), store.clone(), clock);
        assert_eq!(core.session(), None);
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn idle_tick_signs_out_after_timeout() {
        let clock = TestClock::at(1_000_000);
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::default());
        let core = core_with(OkVerifier(identity()), store, clock.clone());

        core.sign_in_with_assertion("blob", &claimed()).await.unwrap();

        clock.advance(10 * 60 * 1000);
        core.idle_tick();
        assert!(core.is_authenticated());

        core.record_activity();
        clock.advance(29 * 60 * 1000);
        core.idle_tick();
        assert!(core.is_authenticated());

        clock.advance(60 * 1000);
        core.idle_tick();
        assert!(!core.is_authenticated());
        assert_eq!(core.session(), None);
    }
}
