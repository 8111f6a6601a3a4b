use crate::config::IdentityConfig;
use crate::error::AuthError;
use crate::identity::{AuthEvent, AuthSession, IdentityProvider, Subscription, User};
use crate::storage::{TokenStore, TOKEN_STORAGE_KEY};
use crate::store::SessionFile;
use crate::supabase::SupabaseProvider;
use crate::transport::Transport;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Uninitialized,
    Loading,
    Authenticated,
    Anonymous,
}

/// Point-in-time view of who is signed in.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub phase: AuthPhase,
    pub user: Option<User>,
    pub session: Option<AuthSession>,
}

impl AuthSnapshot {
    /// True until the first resolution; auth-gated views should wait for `false`.
    pub fn loading(&self) -> bool {
        matches!(self.phase, AuthPhase::Uninitialized | AuthPhase::Loading)
    }
}

/// Result of a credential operation: `error` is set exactly when it failed.
///
/// `session` is the session the operation itself started, if any. A sign-up
/// that still needs email confirmation succeeds with no session.
#[derive(Debug, Default)]
#[must_use]
pub struct AuthOutcome {
    pub error: Option<AuthError>,
    pub session: Option<AuthSession>,
}

impl AuthOutcome {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failure(error: AuthError) -> Self {
        Self {
            error: Some(error),
            session: None,
        }
    }

    pub fn started(session: Option<AuthSession>) -> Self {
        Self {
            error: None,
            session,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(AuthError::message)
    }

    pub fn into_result(self) -> Result<(), AuthError> {
        self.into_session().map(|_| ())
    }

    pub fn into_session(self) -> Result<Option<AuthSession>, AuthError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.session),
        }
    }
}

impl From<Result<(), AuthError>> for AuthOutcome {
    fn from(result: Result<(), AuthError>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(err) => Self::failure(err),
        }
    }
}

impl From<Result<Option<AuthSession>, AuthError>> for AuthOutcome {
    fn from(result: Result<Option<AuthSession>, AuthError>) -> Self {
        match result {
            Ok(session) => Self::started(session),
            Err(err) => Self::failure(err),
        }
    }
}

impl From<Result<AuthSession, AuthError>> for AuthOutcome {
    fn from(result: Result<AuthSession, AuthError>) -> Self {
        result.map(Some).into()
    }
}

struct BridgeState {
    phase: AuthPhase,
    session: Option<AuthSession>,
}

/// Single source of truth for the signed-in identity.
///
/// Every provider event is reduced to "a session is available" or "no session
/// is available"; the first writes the session's access token into the shared
/// token slot, the second removes the slot entirely.
#[derive(Clone)]
pub struct AuthBridge {
    provider: Option<Arc<dyn IdentityProvider>>,
    storage: Arc<dyn TokenStore>,
    state: Arc<RwLock<BridgeState>>,
}

impl AuthBridge {
    pub fn new(provider: Option<Arc<dyn IdentityProvider>>, storage: Arc<dyn TokenStore>) -> Self {
        Self {
            provider,
            storage,
            state: Arc::new(RwLock::new(BridgeState {
                phase: AuthPhase::Uninitialized,
                session: None,
            })),
        }
    }

    /// Bridge over the hosted provider, or a permanently anonymous one when
    /// `config` is absent.
    pub fn from_config(
        config: Option<IdentityConfig>,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn TokenStore>,
        persistence: Option<SessionFile>,
    ) -> Self {
        let provider = config.map(|config| {
            let provider = SupabaseProvider::new(config, transport);
            let provider = match persistence {
                Some(file) => provider.with_persistence(file),
                None => provider,
            };
            Arc::new(provider) as Arc<dyn IdentityProvider>
        });
        if provider.is_none() {
            warn!("identity provider not configured; authentication is disabled");
        }
        Self::new(provider, storage)
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        let state = self.state.read();
        AuthSnapshot {
            phase: state.phase,
            user: state.session.as_ref().map(|session| session.user.clone()),
            session: state.session.clone(),
        }
    }

    pub fn phase(&self) -> AuthPhase {
        self.state.read().phase
    }

    pub fn loading(&self) -> bool {
        self.snapshot().loading()
    }

    pub fn user(&self) -> Option<User> {
        self.state
            .read()
            .session
            .as_ref()
            .map(|session| session.user.clone())
    }

    pub fn session(&self) -> Option<AuthSession> {
        self.state.read().session.clone()
    }

    /// Subscribe to provider events and resolve the initial session.
    ///
    /// The subscription lives as long as the returned guard.
    pub async fn mount(&self) -> MountGuard {
        {
            let mut state = self.state.write();
            if state.phase == AuthPhase::Uninitialized {
                state.phase = AuthPhase::Loading;
            }
        }

        let Some(provider) = self.provider.clone() else {
            self.resolve_initial(None);
            return MountGuard { subscription: None };
        };

        let state = self.state.clone();
        let storage = self.storage.clone();
        let subscription = provider.on_auth_state_change(Arc::new(move |event: &AuthEvent| {
            apply_session(&state, storage.as_ref(), event.session.clone());
        }));

        match provider.get_session().await {
            Ok(session) => self.resolve_initial(session),
            Err(err) => {
                warn!(error = %err, "initial session lookup failed");
                self.resolve_initial(None);
            }
        }

        MountGuard {
            subscription: Some(subscription),
        }
    }

    /// Apply the initial lookup unless an event already resolved the state.
    fn resolve_initial(&self, session: Option<AuthSession>) {
        let mut state = self.state.write();
        if matches!(state.phase, AuthPhase::Uninitialized | AuthPhase::Loading) {
            apply_locked(&mut state, self.storage.as_ref(), session);
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthOutcome {
        let Some(provider) = &self.provider else {
            return AuthOutcome::failure(AuthError::NotConfigured);
        };
        report("sign up", provider.sign_up(email, password).await.into())
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthOutcome {
        let Some(provider) = &self.provider else {
            return AuthOutcome::failure(AuthError::NotConfigured);
        };
        report(
            "sign in",
            provider.sign_in_with_password(email, password).await.into(),
        )
    }

    pub async fn sign_out(&self) -> AuthOutcome {
        let Some(provider) = &self.provider else {
            return AuthOutcome::failure(AuthError::NotConfigured);
        };
        report("sign out", provider.sign_out().await.into())
    }

    pub async fn reset_password(&self, email: &str) -> AuthOutcome {
        let Some(provider) = &self.provider else {
            return AuthOutcome::failure(AuthError::NotConfigured);
        };
        report(
            "password reset",
            provider.reset_password_for_email(email).await.into(),
        )
    }
}

fn report(action: &str, outcome: AuthOutcome) -> AuthOutcome {
    if let Some(err) = &outcome.error {
        warn!(action, error = %err, "auth operation failed");
    }
    outcome
}

fn apply_session(
    state: &RwLock<BridgeState>,
    storage: &dyn TokenStore,
    session: Option<AuthSession>,
) {
    apply_locked(&mut state.write(), storage, session);
}

fn apply_locked(state: &mut BridgeState, storage: &dyn TokenStore, session: Option<AuthSession>) {
    match &session {
        Some(session) => {
            storage.set_item(TOKEN_STORAGE_KEY, &session.access_token);
            if state.phase != AuthPhase::Authenticated {
                info!(user_id = %session.user.id, "auth session available");
            }
            state.phase = AuthPhase::Authenticated;
        }
        None => {
            storage.remove_item(TOKEN_STORAGE_KEY);
            if state.phase != AuthPhase::Anonymous {
                info!("no auth session available");
            }
            state.phase = AuthPhase::Anonymous;
        }
    }
    state.session = session;
}

/// Keeps the bridge subscribed to provider events; dropping it unsubscribes.
#[must_use = "dropping the guard unsubscribes the bridge"]
pub struct MountGuard {
    subscription: Option<Subscription>,
}

impl MountGuard {
    pub fn unmount(self) {
        drop(self);
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }
}

impl std::fmt::Debug for MountGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountGuard")
            .field("subscription", &self.subscription)
            .finish()
    }
}
