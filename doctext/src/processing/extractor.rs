use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::{Config, OfficeConfig};
use crate::error::{DoctextError, Result};
use crate::models::DocumentType;
use crate::ocr::{OcrProvider, PdftoppmRasterizer, Rasterizer, TextRecognizer};
use crate::processing::extractors::{
    DocxExtractor, ExtractedContent, PageResolver, PdfExtractor, XlsxExtractor,
};
use crate::processing::progress::{NoProgress, ProgressReporter};

/// Routes a document to the handler for its type.
pub struct ContentExtractor {
    rasterizer: Arc<dyn Rasterizer>,
    recognizer: Arc<dyn TextRecognizer>,
    progress: Arc<dyn ProgressReporter>,
    office: OfficeConfig,
}

impl ContentExtractor {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        recognizer: Arc<dyn TextRecognizer>,
        office: OfficeConfig,
    ) -> Self {
        Self {
            rasterizer,
            recognizer,
            progress: Arc::new(NoProgress),
            office,
        }
    }

    /// Tesseract + pdftoppm as configured.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(PdftoppmRasterizer::new(&config.ocr)),
            Arc::new(OcrProvider::new(&config.ocr)),
            config.office.clone(),
        )
    }

    /// Per-page progress for PDFs.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Both the page renderer and the recognizer are usable.
    pub fn ocr_available(&self) -> bool {
        self.rasterizer.is_available() && self.recognizer.is_available()
    }

    pub fn extract_path(&self, path: &Path) -> Result<ExtractedContent> {
        self.extract(path, Self::detect_type(path))
    }

    pub fn extract(&self, path: &Path, doc_type: DocumentType) -> Result<ExtractedContent> {
        debug!(file = %path.display(), doc_type = %doc_type, "Dispatching document");
        match doc_type {
            DocumentType::Pdf => {
                let resolver = PageResolver::new(self.rasterizer.as_ref(), self.recognizer.as_ref());
                PdfExtractor::new(resolver, self.progress.as_ref()).extract(path)
            }
            DocumentType::Docx => DocxExtractor::extract_file(path, self.office.include_metadata),
            DocumentType::Xlsx => XlsxExtractor::extract_file(path, self.office.include_empty_rows),
            DocumentType::Unknown => Err(DoctextError::UnsupportedType(
                path.extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_else(|| path.display().to_string()),
            )),
        }
    }

    /// By file extension only.
    pub fn detect_type(path: &Path) -> DocumentType {
        path.extension()
            .map(|ext| DocumentType::from_extension(&ext.to_string_lossy()))
            .unwrap_or_default()
    }

    pub fn detect_type_from_bytes(bytes: &[u8]) -> DocumentType {
        if bytes.starts_with(b"%PDF") {
            return DocumentType::Pdf;
        }

        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            if let Ok(mut archive) = zip::ZipArchive::new(Cursor::new(bytes)) {
                if archive.by_name("[Content_Types].xml").is_ok() {
                    if archive.by_name("word/document.xml").is_ok() {
                        return DocumentType::Docx;
                    }
                    if archive.by_name("xl/workbook.xml").is_ok() {
                        return DocumentType::Xlsx;
                    }
                }
            }
        }

        DocumentType::Unknown
    }

    /// Declared MIME type first, then the file name, then the bytes
    /// themselves (browsers often send `application/octet-stream`).
    pub fn detect_type_from_upload(
        bytes: &[u8],
        file_name: Option<&str>,
        content_type: Option<&str>,
    ) -> DocumentType {
        if let Some(by_mime) = content_type
            .map(DocumentType::from_mime)
            .filter(DocumentType::is_supported)
        {
            return by_mime;
        }

        if let Some(by_name) = file_name
            .map(|name| Self::detect_type(Path::new(name)))
            .filter(DocumentType::is_supported)
        {
            return by_name;
        }

        Self::detect_type_from_bytes(bytes)
    }
}
