//! Request and response payloads exchanged with the DataVibe backend.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateSessionRequest {
    pub connection_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CreateSessionRequest {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Metadata about a backend database session. Never includes the connection string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionInfo {
    pub session_id: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_accessed: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionCreated {
    pub session_id: String,
    #[serde(default)]
    pub session_info: Option<SessionInfo>,
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClosed {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryPreviewRequest {
    pub session_id: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryPreview {
    pub query_id: String,
    pub sql_generated: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(deserialize_with = "unit_interval")]
    pub confidence: f64,
}

fn unit_interval<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(de::Error::custom(format!(
            "confidence {value} is outside [0, 1]"
        )))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecuteQueryRequest {
    pub session_id: String,
    pub query_id: String,
    pub sql_query: String,
    pub confirm_execution: bool,
}

impl ExecuteQueryRequest {
    /// Confirmed execution of a preview's SQL exactly as generated.
    pub fn confirmed(session_id: impl Into<String>, preview: &QueryPreview) -> Self {
        Self {
            session_id: session_id.into(),
            query_id: preview.query_id.clone(),
            sql_query: preview.sql_generated.clone(),
            confirm_execution: true,
        }
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql_query = sql.into();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub success: bool,
    #[serde(default)]
    pub data: Vec<Row>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub row_count: u64,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub follow_up_suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthStatus {
    pub configured: bool,
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub app_metadata: Map<String, Value>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtectedProbe {
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenValidation {
    pub valid: bool,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestConnectionRequest {
    pub connection_string: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionTestResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub provider: Option<String>,
}

/// Ad-hoc read-only query against a connection string, bypassing sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawQueryRequest {
    pub connection_string: String,
    pub sql_query: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaProposalRequest {
    pub natural_language: String,
    pub session_id: String,
    pub environment: Environment,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaProposalResponse {
    pub success: bool,
    #[serde(default)]
    pub proposal_id: Option<String>,
    #[serde(default)]
    pub migration_sql: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// A stored schema proposal. Fields the client does not model are kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaProposal {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub natural_language: Option<String>,
    #[serde(default)]
    pub migration_sql: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposalList {
    pub success: bool,
    #[serde(default)]
    pub proposals: Vec<SchemaProposal>,
    #[serde(default)]
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposalDetail {
    pub success: bool,
    pub proposal: SchemaProposal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApprovalRequest {
    pub execute_immediately: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RejectionRequest {
    pub reason: String,
}

/// Outcome of an approve or reject call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposalDecision {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLogEntry {
    pub id: String,
    pub event_type: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub details: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLogList {
    pub success: bool,
    #[serde(default)]
    pub logs: Vec<AuditLogEntry>,
    #[serde(default)]
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditStatistics {
    pub success: bool,
    #[serde(default)]
    pub statistics: Map<String, Value>,
}

/// Filter for the audit log listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditLogQuery {
    pub limit: Option<u32>,
    pub event_type: Option<String>,
}

impl AuditLogQuery {
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        if let Some(limit) = self.limit {
            serializer.append_pair("limit", &limit.to_string());
        }
        if let Some(event_type) = &self.event_type {
            serializer.append_pair("event_type", event_type);
        }
        serializer.finish()
    }
}
