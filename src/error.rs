use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::analyzer::AnalyzerError;

/// Errors surfaced to API callers as structured JSON.
///
/// Backend failures never appear here: the stage endpoints convert those
/// into placeholder output instead of an error response.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Analyzer(_) => StatusCode::BAD_GATEWAY,
        };
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_maps_to_400() {
        let resp = ServiceError::BadRequest("stage is required".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn analyzer_failure_maps_to_502() {
        let resp = ServiceError::Analyzer(AnalyzerError::Timeout).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
