use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DoctextError {
    #[error("Failed to open document: {0}")]
    Open(String),

    #[error("Failed to read page {page}: {message}")]
    Page { page: usize, message: String },

    #[error("Rasterization error: {0}")]
    Rasterize(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("No content extracted from {0}")]
    EmptyContent(String),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input directory '{}' does not exist", .0.display())]
    InputDirMissing(PathBuf),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DoctextError {
    /// Failure on a 0-based page index, reported 1-based.
    pub fn page(index: usize, message: impl Into<String>) -> Self {
        DoctextError::Page {
            page: index + 1,
            message: message.into(),
        }
    }
}

impl IntoResponse for DoctextError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            DoctextError::Open(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            DoctextError::Page { .. } => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            DoctextError::Rasterize(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            DoctextError::Ocr(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            DoctextError::OcrUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            DoctextError::UnsupportedType(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            DoctextError::EmptyContent(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            DoctextError::Write { .. } => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            DoctextError::InputDirMissing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            DoctextError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            DoctextError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            DoctextError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, DoctextError>;
