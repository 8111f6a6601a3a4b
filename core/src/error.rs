use crate::transport::{HttpResponse, TransportError};
use serde_json::Value;

/// Coarse classification of an [`ApiError`], for callers that need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Http,
    Status,
    Decode,
    Encode,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No response was obtained; carries the transport's own message.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Non-2xx response with a JSON body.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        body: Value,
    },
    /// Non-2xx response whose body was not JSON.
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Http { .. } => ErrorKind::Http,
            Self::Status { .. } => ErrorKind::Status,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Encode(_) => ErrorKind::Encode,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Build the error for a non-2xx response.
    pub(crate) fn from_response(response: &HttpResponse) -> Self {
        match serde_json::from_str::<Value>(&response.body) {
            Ok(body) => Self::Http {
                status: response.status,
                message: detail_message(&body),
                body,
            },
            Err(_) => Self::Status {
                status: response.status,
                message: format!("HTTP {}: {}", response.status, response.status_text),
            },
        }
    }
}

fn detail_message(body: &Value) -> String {
    match body.get("detail") {
        Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
        Some(Value::String(_)) | Some(Value::Null) | None => "Request failed".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Failure reported by the identity provider or its plumbing.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{message}")]
    Provider { status: Option<u16>, message: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to decode identity provider response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("Authentication is not configured")]
    NotConfigured,
}

impl AuthError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            status: None,
            message: message.into(),
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}
