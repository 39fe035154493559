use std::io;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("missing required fields: source and destination")]
    MissingEndpoints,
    #[error("missing node parameter")]
    MissingNode,
    #[error("failed to read itinerary file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid itinerary definition: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("itinerary {from} -> {to} must start at its source and end at its destination")]
    InvalidItinerary { from: String, to: String },
}

impl BackendError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingEndpoints | Self::MissingNode => StatusCode::BAD_REQUEST,
            Self::Io(_) | Self::Parse(_) | Self::InvalidItinerary { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ApiError {
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}
