use crate::config::ClientConfig;
use crate::endpoints;
use crate::error::ApiError;
use crate::models::{
    ApprovalRequest, AuditLogList, AuditLogQuery, AuditStatistics, AuthStatus,
    ConnectionTestResult, CreateSessionRequest, ExecuteQueryRequest, ProposalDecision,
    ProposalDetail, ProposalList, ProtectedProbe, QueryPreview, QueryPreviewRequest, QueryResult,
    RawQueryRequest, RejectionRequest, SchemaProposalRequest, SchemaProposalResponse,
    SessionClosed, SessionCreated, SessionInfo, TestConnectionRequest, TokenValidation,
    UserProfile,
};
use crate::storage::{TokenStore, TOKEN_STORAGE_KEY};
use crate::transport::{HttpRequest, ReqwestTransport, Transport};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Client for the DataVibe backend.
///
/// Every request carries `Content-Type: application/json`, plus a bearer
/// `Authorization` header when the token slot in `storage` is non-empty at the
/// moment the request is built. The slot is read on every call and never
/// cached, so a sign-out is visible to the very next request.
#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    storage: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            config,
            transport,
            storage,
        }
    }

    /// Build a client over the network transport, bounded by `config.timeout`.
    pub fn from_config(
        config: ClientConfig,
        storage: Arc<dyn TokenStore>,
    ) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::new(config, Arc::new(transport), storage))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn auth_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(token) = self
            .storage
            .get_item(TOKEN_STORAGE_KEY)
            .filter(|token| !token.is_empty())
        {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        headers
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<T, ApiError> {
        let headers = self.auth_headers();
        let authenticated = headers.len() > 1;
        let request = HttpRequest {
            method: method.clone(),
            url: self.config.url_for(path),
            headers,
            body,
        };
        debug!(%method, path, authenticated, "sending backend request");

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            let err = ApiError::from_response(&response);
            warn!(%method, path, status = response.status, error = %err, "backend request failed");
            return Err(err);
        }
        serde_json::from_str(&response.body).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
    }

    fn encode<B: Serialize + ?Sized>(payload: &B) -> Result<String, ApiError> {
        serde_json::to_string(payload).map_err(ApiError::Encode)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.dispatch(Method::GET, path, None).await
    }

    pub async fn post<T, B>(&self, path: &str, payload: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = Self::encode(payload)?;
        self.dispatch(Method::POST, path, Some(body)).await
    }

    /// POST with no body at all.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.dispatch(Method::POST, path, None).await
    }

    pub async fn put<T, B>(&self, path: &str, payload: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = Self::encode(payload)?;
        self.dispatch(Method::PUT, path, Some(body)).await
    }

    /// PUT with no body at all.
    pub async fn put_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.dispatch(Method::PUT, path, None).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.dispatch(Method::DELETE, path, None).await
    }

    // Database sessions

    pub async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<SessionCreated, ApiError> {
        self.post(endpoints::sessions::CREATE, request).await
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ApiError> {
        self.get(endpoints::sessions::LIST).await
    }

    pub async fn destroy_session(&self, session_id: &str) -> Result<SessionClosed, ApiError> {
        self.delete(&endpoints::sessions::destroy(session_id)).await
    }

    // Queries

    pub async fn preview_query(
        &self,
        request: &QueryPreviewRequest,
    ) -> Result<QueryPreview, ApiError> {
        self.post(endpoints::query::PREVIEW, request).await
    }

    pub async fn execute_query(
        &self,
        request: &ExecuteQueryRequest,
    ) -> Result<QueryResult, ApiError> {
        self.post(endpoints::query::EXECUTE, request).await
    }

    pub async fn providers_info(&self) -> Result<Value, ApiError> {
        self.get(endpoints::query::PROVIDERS_INFO).await
    }

    // Authentication

    pub async fn auth_status(&self) -> Result<AuthStatus, ApiError> {
        self.get(endpoints::auth::STATUS).await
    }

    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.get(endpoints::auth::ME).await
    }

    pub async fn test_protected(&self) -> Result<ProtectedProbe, ApiError> {
        self.get(endpoints::auth::TEST_PROTECTED).await
    }

    pub async fn validate_token(&self) -> Result<TokenValidation, ApiError> {
        self.post_empty(endpoints::auth::VALIDATE_TOKEN).await
    }

    // Direct database access

    pub async fn test_connection(
        &self,
        request: &TestConnectionRequest,
    ) -> Result<ConnectionTestResult, ApiError> {
        self.post(endpoints::database::TEST_CONNECTION, request)
            .await
    }

    pub async fn execute_raw_query(&self, request: &RawQueryRequest) -> Result<Value, ApiError> {
        self.post(endpoints::database::EXECUTE_QUERY, request).await
    }

    pub async fn database_schema(
        &self,
        request: &TestConnectionRequest,
    ) -> Result<Value, ApiError> {
        self.post(endpoints::database::SCHEMA, request).await
    }

    // Schema change workflow

    pub async fn propose_schema_change(
        &self,
        request: &SchemaProposalRequest,
    ) -> Result<SchemaProposalResponse, ApiError> {
        self.post(endpoints::schema::PROPOSE, request).await
    }

    pub async fn list_schema_proposals(&self) -> Result<ProposalList, ApiError> {
        self.get(endpoints::schema::PROPOSALS).await
    }

    pub async fn schema_proposal(&self, proposal_id: &str) -> Result<ProposalDetail, ApiError> {
        self.get(&endpoints::schema::proposal(proposal_id)).await
    }

    pub async fn approve_proposal(
        &self,
        proposal_id: &str,
        request: &ApprovalRequest,
    ) -> Result<ProposalDecision, ApiError> {
        self.post(&endpoints::schema::approve(proposal_id), request)
            .await
    }

    pub async fn reject_proposal(
        &self,
        proposal_id: &str,
        request: &RejectionRequest,
    ) -> Result<ProposalDecision, ApiError> {
        self.post(&endpoints::schema::reject(proposal_id), request)
            .await
    }

    // Audit trail

    pub async fn audit_logs(&self, query: &AuditLogQuery) -> Result<AuditLogList, ApiError> {
        let query_string = query.to_query_string();
        if query_string.is_empty() {
            self.get(endpoints::audit::LOGS).await
        } else {
            self.get(&format!("{}?{query_string}", endpoints::audit::LOGS))
                .await
        }
    }

    pub async fn session_audit_logs(&self, session_id: &str) -> Result<AuditLogList, ApiError> {
        self.get(&endpoints::audit::session_logs(session_id)).await
    }

    pub async fn audit_statistics(&self) -> Result<AuditStatistics, ApiError> {
        self.get(endpoints::audit::STATISTICS).await
    }

    pub async fn audit_event_types(&self) -> Result<Value, ApiError> {
        self.get(endpoints::audit::EVENT_TYPES).await
    }
}
