use rouille::Response;
use serde_json::json;

use crate::{ingest::error::IngestError, library::playlist::PlaylistError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl From<&IngestError> for ApiError {
    fn from(err: &IngestError) -> Self {
        match err {
            IngestError::MissingRequiredField { .. }
            | IngestError::MalformedPayload(_)
            | IngestError::Transport(_) => ApiError::BadRequest(err.to_string()),

            IngestError::Internal(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<PlaylistError> for ApiError {
    fn from(err: PlaylistError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::BadRequest(_) => 400,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) | ApiError::Internal(msg) => msg,
        }
    }

    pub fn into_response(self) -> Response {
        Response::json(&json!({ "error": self.message() })).with_status_code(self.status_code())
    }
}
