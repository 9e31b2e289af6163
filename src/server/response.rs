//! Mapping of errors and results onto HTTP responses

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

use crate::check::CheckError;
use crate::release::Release;
use crate::store::StoreError;

/// Body of a successful `PUT /check`
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub success: bool,
    pub data: Release,
}

impl CheckResponse {
    pub fn new(data: Release) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Body of every error response; carries only the canonical status reason
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
}

fn error_response(status: StatusCode) -> Response {
    let body = ErrorBody {
        success: false,
        error: status.canonical_reason().unwrap_or("Error"),
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for CheckError {
    fn into_response(self) -> Response {
        let status = match &self {
            CheckError::UnauthorizedAgent => StatusCode::FORBIDDEN,
            CheckError::ClientInput(_) => StatusCode::BAD_REQUEST,
            CheckError::UnknownPackage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CheckError::Resolver(_) => StatusCode::BAD_GATEWAY,
        };

        if status.is_server_error() {
            error!(error = %self, "Check failed");
        } else {
            warn!(error = %self, "Check rejected");
        }

        error_response(status)
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        error!(error = %self, "Storage failure");
        error_response(StatusCode::INTERNAL_SERVER_ERROR)
    }
}
