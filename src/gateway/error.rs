//! Gateway error types.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Missing search term")]
    MissingQuery,

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Upstream responded with status {0}")]
    UpstreamStatus(u16),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            GatewayError::MissingQuery => {
                (StatusCode::BAD_REQUEST, "A search term is required")
            }
            GatewayError::Upstream(ref e) => {
                tracing::error!("Error contacting the catalog provider: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error while searching tracks",
                )
            }
            GatewayError::UpstreamStatus(code) => {
                tracing::error!("Catalog provider responded with status {}", code);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error while searching tracks",
                )
            }
        };

        (
            status,
            [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
            Json(json!({ "error": message })),
        )
            .into_response()
    }
}
