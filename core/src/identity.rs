use crate::error::AuthError;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, Weak};
use tokio::sync::Notify;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub app_metadata: Map<String, Value>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: Some(email.into()),
            role: None,
            app_metadata: Map::new(),
            user_metadata: Map::new(),
        }
    }

    /// Application role, preferring the provider's app metadata over the JWT role.
    pub fn app_role(&self) -> Option<&str> {
        self.app_metadata
            .get("role")
            .and_then(Value::as_str)
            .or(self.role.as_deref())
    }
}

/// A signed-in identity as issued by the provider.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default = "AuthSession::default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix timestamp in seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
}

impl AuthSession {
    pub fn new(access_token: impl Into<String>, user: User) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: Self::default_token_type(),
            expires_in: None,
            expires_at: None,
            refresh_token: None,
            user,
        }
    }

    fn default_token_type() -> String {
        "bearer".to_string()
    }

    pub fn with_expiry(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Fill `expires_at` from `expires_in` when the provider only sent the latter.
    pub(crate) fn stamp_expiry(mut self) -> Self {
        if self.expires_at.is_none() {
            if let Some(expires_in) = self.expires_in {
                self.expires_at = Some(Utc::now().timestamp() + expires_in);
            }
        }
        self
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|at| at <= Utc::now().timestamp())
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<AuthSession>,
}

impl AuthEvent {
    pub fn new(kind: AuthEventKind, session: Option<AuthSession>) -> Self {
        Self { kind, session }
    }

    pub fn signed_in(session: AuthSession) -> Self {
        Self::new(AuthEventKind::SignedIn, Some(session))
    }

    pub fn signed_out() -> Self {
        Self::new(AuthEventKind::SignedOut, None)
    }
}

pub type AuthListener = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

/// Listener bookkeeping shared by provider implementations.
#[derive(Default)]
pub struct ListenerRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    listeners: Vec<(u64, AuthListener)>,
}

impl ListenerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscribe(self: &Arc<Self>, listener: AuthListener) -> Subscription {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.listeners.push((id, listener));
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) {
        self.inner.write().listeners.retain(|(key, _)| *key != id);
    }

    /// Deliver `event` to every listener. Listeners run outside the registry lock,
    /// so they may subscribe or unsubscribe re-entrantly.
    pub fn emit(&self, event: &AuthEvent) {
        let listeners: Vec<AuthListener> = self
            .inner
            .read()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.read().listeners.len()
    }
}

/// Handle to a registered auth listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Third-party identity service the auth bridge delegates to.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session, if one exists and is still usable.
    async fn get_session(&self) -> Result<Option<AuthSession>, AuthError>;

    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription;

    /// Returns the new session when the account is usable immediately, or `None`
    /// when the provider requires email confirmation first.
    async fn sign_up(&self, email: &str, password: &str)
        -> Result<Option<AuthSession>, AuthError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    async fn reset_password_for_email(&self, email: &str) -> Result<(), AuthError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    GetSession,
    SignUp { email: String, password: String },
    SignIn { email: String, password: String },
    SignOut,
    ResetPassword { email: String },
}

/// Scripted in-process identity provider.
///
/// Successful sign-in, sign-up with a session, and sign-out emit the matching
/// events to listeners before returning, like the hosted provider does.
#[derive(Clone)]
pub struct MockIdentityProvider {
    registry: Arc<ListenerRegistry>,
    state: Arc<Mutex<MockState>>,
    lookup_gate: Arc<Mutex<Option<Arc<Notify>>>>,
}

#[derive(Default)]
struct MockState {
    current: Option<AuthSession>,
    calls: Vec<ProviderCall>,
    sign_in: Option<Result<AuthSession, String>>,
    sign_up: Option<Result<Option<AuthSession>, String>>,
    sign_out_error: Option<String>,
    reset_error: Option<String>,
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self {
            registry: ListenerRegistry::new(),
            state: Arc::new(Mutex::new(MockState::default())),
            lookup_gate: Arc::new(Mutex::new(None)),
        }
    }

    /// Session returned by the initial lookup.
    pub fn with_session(self, session: AuthSession) -> Self {
        self.state.lock().current = Some(session);
        self
    }

    pub fn will_sign_in(&self, result: Result<AuthSession, String>) {
        self.state.lock().sign_in = Some(result);
    }

    pub fn will_sign_up(&self, result: Result<Option<AuthSession>, String>) {
        self.state.lock().sign_up = Some(result);
    }

    pub fn fail_sign_out(&self, message: impl Into<String>) {
        self.state.lock().sign_out_error = Some(message.into());
    }

    pub fn fail_reset(&self, message: impl Into<String>) {
        self.state.lock().reset_error = Some(message.into());
    }

    /// Make `get_session` wait until the returned handle is notified.
    pub fn hold_initial_lookup(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.lookup_gate.lock() = Some(gate.clone());
        gate
    }

    pub fn emit(&self, event: AuthEvent) {
        self.state.lock().current = event.session.clone();
        self.registry.emit(&event);
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().calls.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.registry.listener_count()
    }

    fn record(&self, call: ProviderCall) {
        self.state.lock().calls.push(call);
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn get_session(&self) -> Result<Option<AuthSession>, AuthError> {
        self.record(ProviderCall::GetSession);
        let gate = self.lookup_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self.state.lock().current.clone())
    }

    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription {
        self.registry.subscribe(listener)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<AuthSession>, AuthError> {
        self.record(ProviderCall::SignUp {
            email: email.to_owned(),
            password: password.to_owned(),
        });
        let scripted = self.state.lock().sign_up.take();
        match scripted.unwrap_or(Ok(None)) {
            Ok(Some(session)) => {
                self.emit(AuthEvent::signed_in(session.clone()));
                Ok(Some(session))
            }
            Ok(None) => Ok(None),
            Err(message) => Err(AuthError::provider(message)),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        self.record(ProviderCall::SignIn {
            email: email.to_owned(),
            password: password.to_owned(),
        });
        let scripted = self.state.lock().sign_in.take();
        match scripted {
            Some(Ok(session)) => {
                self.emit(AuthEvent::signed_in(session.clone()));
                Ok(session)
            }
            Some(Err(message)) => Err(AuthError::provider(message)),
            None => Err(AuthError::provider("Invalid login credentials")),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.record(ProviderCall::SignOut);
        let error = self.state.lock().sign_out_error.take();
        if let Some(message) = error {
            return Err(AuthError::provider(message));
        }
        self.emit(AuthEvent::signed_out());
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str) -> Result<(), AuthError> {
        self.record(ProviderCall::ResetPassword {
            email: email.to_owned(),
        });
        match self.state.lock().reset_error.take() {
            Some(message) => Err(AuthError::provider(message)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_listener(counter: &Arc<AtomicUsize>) -> AuthListener {
        let counter = counter.clone();
        Arc::new(move |_event: &AuthEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn dropping_subscription_removes_listener() {
        let registry = ListenerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let subscription = registry.subscribe(counting_listener(&counter));
        registry.emit(&AuthEvent::signed_out());
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        subscription.unsubscribe();
        registry.emit(&AuthEvent::signed_out());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(registry.listener_count(), 0);
    }

    #[test]
    fn subscription_outliving_registry_drops_cleanly() {
        let registry = ListenerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let subscription = registry.subscribe(counting_listener(&counter));
        drop(registry);
        drop(subscription);
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let session = AuthSession::new("secret-jwt", User::new("u1", "a@b.com"))
            .with_refresh_token("secret-refresh");
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-jwt"));
        assert!(!rendered.contains("secret-refresh"));
        assert!(rendered.contains("u1"));
    }

    #[test]
    fn expiry_is_derived_from_expires_in() {
        let mut session = AuthSession::new("t", User::new("u1", "a@b.com"));
        session.expires_in = Some(3600);
        let session = session.stamp_expiry();
        assert!(session.expires_at.is_some());
        assert!(!session.is_expired());
        assert!(AuthSession::new("t", User::new("u1", "a@b.com"))
            .with_expiry(0)
            .is_expired());
    }

    #[test]
    fn app_role_prefers_metadata() {
        let mut user = User::new("u1", "a@b.com");
        user.role = Some("authenticated".into());
        assert_eq!(user.app_role(), Some("authenticated"));
        user.app_metadata
            .insert("role".into(), Value::String("admin".into()));
        assert_eq!(user.app_role(), Some("admin"));
    }

    #[tokio::test]
    async fn mock_sign_in_emits_before_returning() {
        let provider = MockIdentityProvider::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let _subscription = provider.on_auth_state_change(counting_listener(&counter));
        provider.will_sign_in(Ok(AuthSession::new("T", User::new("u1", "a@b.com"))));

        provider
            .sign_in_with_password("a@b.com", "pw")
            .await
            .expect("sign in");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(
            provider.get_session().await.unwrap().map(|s| s.access_token),
            Some("T".to_string())
        );
    }
}
