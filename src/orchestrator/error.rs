//! Orchestration error types

use crate::adapters::mcp_client::ToolClientError;
use crate::domain::ValidationError;
use crate::persistence::StoreError;
use thiserror::Error;

/// Errors that can occur while running an orchestration turn
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Malformed request payload
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Referenced entity does not exist
    #[error("Not found: {entity_type} with identifier '{identifier}'")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    /// Caller does not own the referenced entity
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Entity exists but is not usable as configured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Main agent could not be reached or returned an error
    #[error("Upstream agent error: {0}")]
    Upstream(String),

    /// Persistence failure on a read path
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl OrchestratorError {
    pub fn not_found(entity_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.into(),
        }
    }

    /// Convert to HTTP status code for API responses
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Configuration(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ToolClientError> for OrchestratorError {
    fn from(err: ToolClientError) -> Self {
        OrchestratorError::Upstream(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn status_codes_map_by_category() {
        let err = OrchestratorError::not_found("conversation", "42");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = OrchestratorError::Forbidden("conversation 42".to_string());
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = OrchestratorError::Upstream("connect refused".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let err = OrchestratorError::Configuration("agent has no endpoint".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
