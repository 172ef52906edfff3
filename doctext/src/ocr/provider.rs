use std::sync::{Arc, Mutex};

use leptess::LepTess;
use tracing::{info, warn};

use super::TextRecognizer;
use crate::config::OcrConfig;
use crate::error::{DoctextError, Result};

enum OcrBackend {
    Local { tesseract: Arc<Mutex<LepTess>> },
    Unavailable { reason: String },
}

pub struct OcrProvider {
    backend: OcrBackend,
    config: OcrConfig,
}

fn create_tesseract(config: &OcrConfig) -> std::result::Result<LepTess, String> {
    LepTess::new(config.tessdata_path.as_deref(), &config.languages).map_err(|e| e.to_string())
}

impl OcrProvider {
    /// Never fails: a missing engine or language pack yields an unavailable
    /// provider whose `recognize` reports why.
    pub fn new(config: &OcrConfig) -> Self {
        let backend = match create_tesseract(config) {
            Ok(lt) => {
                info!(languages = %config.languages, "Tesseract OCR initialized");
                OcrBackend::Local {
                    tesseract: Arc::new(Mutex::new(lt)),
                }
            }
            Err(e) => {
                let reason = format!("Tesseract not available: {e}");
                warn!("{}", reason);
                OcrBackend::Unavailable { reason }
            }
        };

        Self {
            backend,
            config: config.clone(),
        }
    }

    pub fn unavailable(config: &OcrConfig, reason: impl Into<String>) -> Self {
        Self {
            backend: OcrBackend::Unavailable {
                reason: reason.into(),
            },
            config: config.clone(),
        }
    }
}

impl TextRecognizer for OcrProvider {
    fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }

    fn recognize(&self, image: &[u8]) -> Result<String> {
        match &self.backend {
            OcrBackend::Local { tesseract } => {
                let mut lt = tesseract
                    .lock()
                    .map_err(|_| DoctextError::Ocr("Tesseract handle poisoned".to_string()))?;
                lt.set_image_from_mem(image)
                    .map_err(|e| DoctextError::Ocr(format!("Failed to set image: {e}")))?;
                lt.set_source_resolution(self.config.dpi as i32);
                lt.get_utf8_text()
                    .map_err(|e| DoctextError::Ocr(format!("Failed to extract text: {e}")))
            }
            OcrBackend::Unavailable { reason } => Err(DoctextError::OcrUnavailable(reason.clone())),
        }
    }
}

impl Clone for OcrProvider {
    fn clone(&self) -> Self {
        match &self.backend {
            OcrBackend::Local { tesseract } => Self {
                backend: OcrBackend::Local {
                    tesseract: Arc::clone(tesseract),
                },
                config: self.config.clone(),
            },
            OcrBackend::Unavailable { reason } => Self {
                backend: OcrBackend::Unavailable {
                    reason: reason.clone(),
                },
                config: self.config.clone(),
            },
        }
    }
}
