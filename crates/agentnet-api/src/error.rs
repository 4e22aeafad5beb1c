//! Mapping of [`AgentNetError`] onto HTTP responses.

use agentnet_types::error::AgentNetError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};

/// HTTP status for an error kind.
pub fn status_for(err: &AgentNetError) -> StatusCode {
    match err {
        AgentNetError::NotFound(_) => StatusCode::NOT_FOUND,
        AgentNetError::Conflict(_) => StatusCode::CONFLICT,
        AgentNetError::Validation(_) | AgentNetError::UnsupportedType(_) => StatusCode::BAD_REQUEST,
        AgentNetError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        AgentNetError::Connection(_)
        | AgentNetError::Remote { .. }
        | AgentNetError::RetriesExhausted { .. }
        | AgentNetError::Serialization(_) => StatusCode::BAD_GATEWAY,
        AgentNetError::RegistryCorrupted(_)
        | AgentNetError::Config(_)
        | AgentNetError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Handler error: renders as `{"error": {"kind", "message"}}`.
#[derive(Debug)]
pub struct ApiError(pub AgentNetError);

impl From<AgentNetError> for ApiError {
    fn from(e: AgentNetError) -> Self {
        ApiError(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(AgentNetError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(AgentNetError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(kind = self.0.kind(), error = %self.0, "Request failed");
        } else {
            warn!(kind = self.0.kind(), error = %self.0, "Request rejected");
        }
        (status, Json(self.0.to_body())).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AgentNetError::NotFound("x".into()), 404),
            (AgentNetError::Conflict("x".into()), 409),
            (AgentNetError::Validation("x".into()), 400),
            (AgentNetError::UnsupportedType("x".into()), 400),
            (AgentNetError::Timeout(10), 504),
            (AgentNetError::Connection("x".into()), 502),
            (
                AgentNetError::Remote {
                    status: 500,
                    body: String::new(),
                },
                502,
            ),
            (
                AgentNetError::RetriesExhausted {
                    attempts: 3,
                    last: "x".into(),
                },
                502,
            ),
            (AgentNetError::RegistryCorrupted("x".into()), 500),
        ];
        for (err, code) in cases {
            assert_eq!(status_for(&err).as_u16(), code, "{err}");
        }
    }

    #[test]
    fn test_error_response_status() {
        let resp = ApiError(AgentNetError::UnsupportedType("nope".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
