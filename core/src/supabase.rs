//! Hosted identity provider speaking the Supabase GoTrue REST API.

use crate::config::IdentityConfig;
use crate::error::AuthError;
use crate::identity::{
    AuthEvent, AuthEventKind, AuthListener, AuthSession, IdentityProvider, ListenerRegistry,
    Subscription,
};
use crate::store::SessionFile;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct SupabaseProvider {
    config: IdentityConfig,
    transport: Arc<dyn Transport>,
    registry: Arc<ListenerRegistry>,
    current: RwLock<Option<AuthSession>>,
    persistence: Option<SessionFile>,
}

impl SupabaseProvider {
    pub fn new(config: IdentityConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            registry: ListenerRegistry::new(),
            current: RwLock::new(None),
            persistence: None,
        }
    }

    /// Restore any session saved by an earlier run and keep the file in sync.
    pub fn with_persistence(mut self, file: SessionFile) -> Self {
        *self.current.write() = file.load();
        self.persistence = Some(file);
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1{path}", self.config.url)
    }

    fn request(&self, path: &str, bearer: &str) -> HttpRequest {
        HttpRequest::new(Method::POST, self.endpoint(path))
            .with_header("apikey", self.config.anon_key.as_str())
            .with_header("Authorization", format!("Bearer {bearer}"))
            .with_header("Content-Type", "application/json")
    }

    async fn call(&self, path: &str, body: Value) -> Result<Value, AuthError> {
        let request = self
            .request(path, &self.config.anon_key)
            .with_body(body.to_string());
        debug!(path, "calling identity provider");
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(provider_error(&response));
        }
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(AuthError::Decode)
    }

    async fn grant(&self, grant_type: &str, body: Value) -> Result<AuthSession, AuthError> {
        let value = self
            .call(&format!("/token?grant_type={grant_type}"), body)
            .await?;
        let session: AuthSession = serde_json::from_value(value).map_err(AuthError::Decode)?;
        Ok(session.stamp_expiry())
    }

    fn install(&self, kind: AuthEventKind, session: Option<AuthSession>) {
        *self.current.write() = session.clone();
        if let Some(file) = &self.persistence {
            let outcome = match &session {
                Some(session) => file.save(session),
                None => file.clear(),
            };
            if let Err(err) = outcome {
                warn!(error = %err, "failed to persist identity session");
            }
        }
        self.registry.emit(&AuthEvent::new(kind, session));
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let session = self
            .grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;
        self.install(AuthEventKind::TokenRefreshed, Some(session.clone()));
        Ok(session)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseProvider {
    async fn get_session(&self) -> Result<Option<AuthSession>, AuthError> {
        let current = self.current.read().clone();
        let Some(session) = current else {
            return Ok(None);
        };
        if !session.is_expired() {
            return Ok(Some(session));
        }
        match session.refresh_token.as_deref() {
            Some(refresh_token) => match self.refresh(refresh_token).await {
                Ok(refreshed) => Ok(Some(refreshed)),
                Err(err) => {
                    self.install(AuthEventKind::SignedOut, None);
                    Err(err)
                }
            },
            None => {
                self.install(AuthEventKind::SignedOut, None);
                Ok(None)
            }
        }
    }

    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription {
        self.registry.subscribe(listener)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<AuthSession>, AuthError> {
        let value = self
            .call("/signup", json!({ "email": email, "password": password }))
            .await?;
        // Without auto-confirm the provider answers with the bare user record.
        if value.get("access_token").is_none() {
            return Ok(None);
        }
        let session: AuthSession = serde_json::from_value(value).map_err(AuthError::Decode)?;
        let session = session.stamp_expiry();
        self.install(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(Some(session))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let session = self
            .grant("password", json!({ "email": email, "password": password }))
            .await?;
        self.install(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let current = self.current.read().clone();
        if let Some(session) = current {
            let request = self.request("/logout", &session.access_token);
            let response = self.transport.send(request).await?;
            // An already invalid token still counts as signed out locally.
            if !response.is_success() && !matches!(response.status, 401 | 403 | 404) {
                return Err(provider_error(&response));
            }
        }
        self.install(AuthEventKind::SignedOut, None);
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str) -> Result<(), AuthError> {
        self.call("/recover", json!({ "email": email })).await?;
        Ok(())
    }
}

fn provider_error(response: &HttpResponse) -> AuthError {
    let message = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|body| {
            ["msg", "error_description", "message", "error"]
                .iter()
                .find_map(|key| body.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| format!("HTTP {}: {}", response.status, response.status_text));
    AuthError::Provider {
        status: Some(response.status),
        message,
    }
}
