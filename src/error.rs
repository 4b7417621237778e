use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::utils::json_response;

/// Failures talking to the key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("kv backend error: {0}")]
    Backend(String),
    #[error("stored value under `{key}` is not valid JSON: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("stored value under `{key}` has an unexpected shape: {source}")]
    Shape {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode value for `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid origin pattern `{pattern}`: {source}")]
    OriginPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid value `{value}` for {name}")]
    InvalidValue { name: &'static str, value: String },
}

/// Every failure a request can end in. Each variant maps to exactly one
/// status code and renders as a JSON envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest {
        message: String,
        hint: Option<String>,
    },
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{message}")]
    NotFound {
        message: String,
        hint: Option<String>,
    },
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Collection mapping not configured")]
    MappingNotConfigured,
    #[error("Unknown collection: {name}")]
    UnknownCollection { name: String, valid: Vec<String> },
    #[error("{context}")]
    MalformedBody {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{context}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            hint: None,
        }
    }

    pub fn bad_request_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    pub fn not_found(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    pub fn not_found_bare(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            hint: None,
        }
    }

    pub fn store(context: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { context, source }
    }

    pub fn malformed(context: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| Self::MalformedBody { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } | Self::UnknownCollection { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::MappingNotConfigured | Self::MalformedBody { .. } | Self::Store { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn hint(&self) -> Option<String> {
        match self {
            Self::BadRequest { hint, .. } | Self::NotFound { hint, .. } => hint.clone(),
            Self::MappingNotConfigured => {
                Some("Run cache refresh workflow to populate collection mapping".to_string())
            }
            _ => None,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::MalformedBody { source, .. } => Some(source.to_string()),
            Self::Store { source, .. } => Some(source.to_string()),
            _ => None,
        }
    }

    fn valid_collections(&self) -> Option<Vec<String>> {
        match self {
            Self::UnknownCollection { valid, .. } => Some(valid.clone()),
            _ => None,
        }
    }

    fn log(&self) {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), details = ?self.details(), "{}", self);
        } else {
            tracing::debug!(status = status.as_u16(), "{}", self);
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_collections: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        let body = ErrorBody {
            error: self.to_string(),
            hint: self.hint(),
            details: self.details(),
            valid_collections: self.valid_collections(),
        };
        json_response(self.status(), &body)
    }
}

/// GraphQL-shaped rendering of an [`ApiError`]: `{"errors": [{"message": ...}]}`.
#[derive(Debug)]
pub struct GraphqlError(pub ApiError);

impl From<ApiError> for GraphqlError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlErrorEntry {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_collections: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct GraphqlErrorBody {
    errors: Vec<GraphqlErrorEntry>,
}

impl IntoResponse for GraphqlError {
    fn into_response(self) -> Response {
        let err = self.0;
        // Auth failures keep the flat envelope so clients can tell them apart.
        if matches!(err, ApiError::Unauthorized(_)) {
            return err.into_response();
        }
        err.log();
        let body = GraphqlErrorBody {
            errors: vec![GraphqlErrorEntry {
                message: err.to_string(),
                hint: err.hint(),
                details: err.details(),
                valid_collections: err.valid_collections(),
            }],
        };
        json_response(err.status(), &body)
    }
}
