use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{alerts::AlertError, forest::MetricsError, narrative::NarrativeError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Forest '{0}' not found")]
    ForestNotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Narrative(#[from] NarrativeError),
    #[error(transparent)]
    Alert(#[from] AlertError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ForestNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Narrative(NarrativeError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Narrative(NarrativeError::QuotaExceeded) => StatusCode::PAYMENT_REQUIRED,
            ApiError::Narrative(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Alert(AlertError::Dispatch(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Alert(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MetricsError> for ApiError {
    fn from(err: MetricsError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrative_errors_map_to_gateway_statuses() {
        assert_eq!(
            ApiError::from(NarrativeError::RateLimited).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::from(NarrativeError::QuotaExceeded).status(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            ApiError::from(NarrativeError::NotConfigured).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn alert_input_errors_are_client_errors() {
        assert_eq!(
            ApiError::from(AlertError::MissingPhoneNumber).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AlertError::Dispatch("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::ForestNotFound("nowhere".into()).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn rate_limit_message_is_passed_through() {
        let err = ApiError::from(NarrativeError::RateLimited);
        assert_eq!(err.to_string(), "Rate limit exceeded. Please try again later.");
    }
}
