//! Error handling

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::{error, info};

/// definitions for the imgen application.
#[derive(Debug)]
pub enum ImgenError {
    /// Required configuration (the API key) is missing
    Configuration(String),
    /// The images API returned a failure, or the transport to it broke
    Api {
        /// HTTP status from the upstream response, when one was received
        status: Option<u16>,
        /// Human-readable description of what went wrong
        message: String,
    },
    /// A base64 image payload could not be decoded
    Decode(String),
    /// Writing or reading a local image file failed
    Io(String),
    /// When a requested resource is not found
    NotFound(String),
    /// When an internal server error occurs
    InternalServerError(String),
}

impl std::fmt::Display for ImgenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(message) => write!(f, "{message}"),
            Self::Api { message, .. } => write!(f, "{message}"),
            Self::Decode(message) => write!(f, "Failed to decode image payload: {message}"),
            Self::Io(message) => write!(f, "Image file error: {message}"),
            Self::NotFound(what) => write!(f, "Not found: {what}"),
            Self::InternalServerError(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ImgenError {}

impl From<std::io::Error> for ImgenError {
    fn from(err: std::io::Error) -> Self {
        ImgenError::Io(err.to_string())
    }
}

impl From<base64::DecodeError> for ImgenError {
    fn from(err: base64::DecodeError) -> Self {
        ImgenError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for ImgenError {
    fn from(err: reqwest::Error) -> Self {
        ImgenError::Api {
            status: err.status().map(|status| status.as_u16()),
            message: format!("Request to images API failed: {err}"),
        }
    }
}

impl From<axum::http::Error> for ImgenError {
    fn from(err: axum::http::Error) -> Self {
        ImgenError::InternalServerError(err.to_string())
    }
}

impl IntoResponse for ImgenError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ImgenError::NotFound(what) => {
                info!("404 {what}");
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Not Found"));
                *response.status_mut() = StatusCode::NOT_FOUND;
                response
            }
            // The browser front-end branches on the `success` flag alone, so
            // configuration, upstream, and local IO failures all collapse to
            // the same shape.
            other => {
                error!("Generation request failed: {other}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "error": other.to_string() })),
                )
                    .into_response()
            }
        }
    }
}
