use std::path::Path;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use super::AppState;
use crate::error::{DoctextError, Result};
use crate::models::DocumentType;
use crate::processing::extractors::PdfImageExtractor;
use crate::processing::{output_file_name, ContentExtractor, ExtractedContent};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub file_name: String,
    pub doc_type: DocumentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
    pub download_name: String,
    pub word_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_pages: Option<usize>,
    pub image_count: usize,
}

impl ExtractResponse {
    pub fn new(
        file_name: String,
        base_name: &str,
        content: ExtractedContent,
        image_count: usize,
    ) -> Self {
        Self {
            file_name,
            doc_type: content.doc_type,
            title: content.title,
            download_name: output_file_name(base_name),
            word_count: content.word_count,
            native_pages: content.pages.map(|p| p.native_pages),
            ocr_pages: content.pages.map(|p| p.ocr_pages),
            text: content.text,
            image_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub ocr_available: bool,
}

/// Upload name without its extension, spaces replaced by `_`.
pub fn upload_base_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().replace(' ', "_"))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

/// `GET /api/v1/health`
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ocr_available: state.extractor.ocr_available(),
    })
}

/// `POST /api/v1/extract`
///
/// Accepts a multipart form with a `file` field and returns its text.
pub async fn extract_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut file_content_type: Option<String> = None;
    let max_bytes = state.config.server.max_upload_bytes;

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        if let Some(name) = field.file_name() {
            file_name = Some(name.to_string());
        }
        if let Some(content_type) = field.content_type() {
            file_content_type = Some(content_type.to_string());
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| DoctextError::Validation(format!("Failed to read file: {e}")))?;

        if bytes.len() > max_bytes {
            return Err(DoctextError::Validation(format!(
                "File too large: {} bytes (max {} bytes)",
                bytes.len(),
                max_bytes
            )));
        }

        file_bytes = Some(bytes.to_vec());
    }

    let bytes = file_bytes
        .ok_or_else(|| DoctextError::Validation("Missing required 'file' field".to_string()))?;
    let file_name = file_name.unwrap_or_else(|| "upload".to_string());

    let doc_type = ContentExtractor::detect_type_from_upload(
        &bytes,
        Some(&file_name),
        file_content_type.as_deref(),
    );
    if !doc_type.is_supported() {
        warn!(file = %file_name, "Rejected upload with unsupported type");
        return Err(DoctextError::UnsupportedType(
            file_content_type.unwrap_or_else(|| file_name.clone()),
        ));
    }

    let base_name = upload_base_name(&file_name);
    info!(file = %file_name, doc_type = %doc_type, "Processing upload");

    let task_state = state.clone();
    let task_base = base_name.clone();
    let (content, image_count) = tokio::task::spawn_blocking(move || {
        extract_upload(&task_state, &bytes, &task_base, doc_type)
    })
    .await
    .map_err(|e| DoctextError::Internal(format!("Extraction task failed: {e}")))??;

    if content.is_empty() {
        return Err(DoctextError::EmptyContent(file_name));
    }

    Ok(Json(ExtractResponse::new(file_name, &base_name, content, image_count)))
}

/// Runs on a blocking thread. The upload is staged as `<base>.<ext>` so image
/// folders are named after the upload.
fn extract_upload(
    state: &AppState,
    bytes: &[u8],
    base_name: &str,
    doc_type: DocumentType,
) -> Result<(ExtractedContent, usize)> {
    let staging = tempfile::Builder::new().prefix("doctext-upload-").tempdir()?;
    let path = staging.path().join(format!("{base_name}.{doc_type}"));
    std::fs::write(&path, bytes)?;

    let content = state.extractor.extract(&path, doc_type)?;

    let batch = &state.config.batch;
    let images = if doc_type == DocumentType::Pdf && batch.extract_images {
        PdfImageExtractor::extract(&path, &batch.images_root())
    } else {
        0
    };

    Ok((content, images))
}
