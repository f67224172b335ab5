//! `HubError` at the HTTP boundary.

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::HubError;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub details: String,
}

impl HubError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HubError::ManifestUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            HubError::ProviderNotFound(_) => StatusCode::NOT_FOUND,
            HubError::ProviderLoad { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            HubError::ProviderCall { .. }
            | HubError::UpstreamMalformed { .. }
            | HubError::ExtractionFailed { .. }
            | HubError::RelayUpstream { .. } => StatusCode::BAD_GATEWAY,
            HubError::StageTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            // Client went away; nobody reads this.
            HubError::Cancelled { .. } => StatusCode::REQUEST_TIMEOUT,
            HubError::UnknownExtractionService(_) | HubError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(code = self.code(), %status, "request failed: {self}");
        } else {
            tracing::debug!(code = self.code(), %status, "request rejected: {self}");
        }
        let body = ErrorBody {
            error: self.code(),
            details: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<QueryRejection> for HubError {
    fn from(rejection: QueryRejection) -> Self {
        HubError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for HubError {
    fn from(rejection: PathRejection) -> Self {
        HubError::InvalidRequest(rejection.body_text())
    }
}

/// Router fallback for paths no route matches.
pub async fn not_found(uri: Uri) -> Response {
    let body = ErrorBody {
        error: "not_found",
        details: format!("no route for {}", uri.path()),
    };
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
