//! PDF text extraction with per-page OCR fallback.
//!
//! Every page is resolved independently: if the page carries machine-readable
//! text it is used as-is, otherwise the page is rendered and recognized. The
//! document either yields text for all of its pages or fails as a whole.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::ExtractedContent;
use crate::error::{DoctextError, Result};
use crate::models::{DocumentType, PageCounts, PageOrigin};
use crate::ocr::{Rasterizer, TextRecognizer};
use crate::processing::progress::ProgressReporter;

/// An opened PDF whose pages can be addressed by 0-based index.
pub trait PageSource {
    /// File backing the document, used for rasterization.
    fn path(&self) -> &Path;

    fn page_count(&self) -> usize;

    /// Machine-readable text of one page, possibly empty.
    fn page_text(&self, index: usize) -> Result<String>;
}

/// PDF opened with `pdf-extract`, holding the text layer of every page.
pub struct PdfDocument {
    path: PathBuf,
    pages: Vec<String>,
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| DoctextError::Open(format!("{}: {e}", path.display())))?;
        Self::from_bytes(path, &bytes)
    }

    /// `path` must point at the same bytes; it is handed to the rasterizer.
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self> {
        // pdf-extract asserts on some malformed content streams
        let pages = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }))
        .map_err(|cause| {
            DoctextError::Open(format!(
                "{}: parser panicked: {}",
                path.display(),
                panic_message(cause.as_ref())
            ))
        })?
        .map_err(|e| DoctextError::Open(format!("{}: {e}", path.display())))?;

        Ok(Self {
            path: path.to_path_buf(),
            pages,
        })
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    cause
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| cause.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}

impl PageSource for PdfDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<String> {
        self.pages
            .get(index)
            .cloned()
            .ok_or_else(|| DoctextError::page(index, "page index out of range"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPage {
    pub text: String,
    pub origin: PageOrigin,
}

/// Decides, for one page, between its text layer and OCR.
pub struct PageResolver<'a> {
    rasterizer: &'a dyn Rasterizer,
    recognizer: &'a dyn TextRecognizer,
}

impl<'a> PageResolver<'a> {
    pub fn new(rasterizer: &'a dyn Rasterizer, recognizer: &'a dyn TextRecognizer) -> Self {
        Self {
            rasterizer,
            recognizer,
        }
    }

    pub fn resolve(&self, doc: &dyn PageSource, index: usize) -> Result<ResolvedPage> {
        let text = doc.page_text(index)?;
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            return Ok(ResolvedPage {
                text: trimmed.to_string(),
                origin: PageOrigin::Native,
            });
        }

        let page_number = index + 1;
        info!(
            page = page_number,
            dpi = self.rasterizer.dpi(),
            "Page has no extractable text. Applying OCR."
        );

        // Removed on drop, whichever way this function returns.
        let scratch = tempfile::Builder::new()
            .prefix("doctext-ocr-")
            .tempdir()
            .map_err(|e| DoctextError::Rasterize(format!("Failed to create scratch dir: {e}")))?;

        let image = self
            .rasterizer
            .rasterize(doc.path(), page_number, scratch.path())?;
        let recognized = self.recognizer.recognize(&image)?;

        Ok(ResolvedPage {
            text: format!("[OCR - Page {page_number}]\n{}", recognized.trim()),
            origin: PageOrigin::Ocr,
        })
    }
}

pub struct PdfExtractor<'a> {
    resolver: PageResolver<'a>,
    progress: &'a dyn ProgressReporter,
}

impl<'a> PdfExtractor<'a> {
    pub fn new(resolver: PageResolver<'a>, progress: &'a dyn ProgressReporter) -> Self {
        Self { resolver, progress }
    }

    pub fn extract(&self, path: &Path) -> Result<ExtractedContent> {
        let doc = PdfDocument::open(path)?;
        self.extract_from(&doc)
    }

    pub fn extract_from(&self, doc: &dyn PageSource) -> Result<ExtractedContent> {
        let total = doc.page_count();
        let label = doc
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "PDF".to_string());

        let mut blocks: Vec<String> = Vec::with_capacity(total);
        let mut counts = PageCounts::default();

        self.progress.start(&label, total);
        for index in 0..total {
            let page = match self.resolver.resolve(doc, index) {
                Ok(page) => page,
                Err(e) => {
                    self.progress.finish();
                    return Err(e);
                }
            };
            counts.record(page.origin);
            match page.origin {
                PageOrigin::Native => blocks.push(page.text),
                // OCR blocks are set off by a blank line
                PageOrigin::Ocr => blocks.push(format!("\n{}", page.text)),
            }
            self.progress.advance(index + 1);
        }
        self.progress.finish();

        info!(
            file = %label,
            native_pages = counts.native_pages,
            ocr_pages = counts.ocr_pages,
            "Extraction complete: {} native pages, {} OCR pages.",
            counts.native_pages,
            counts.ocr_pages
        );
        debug_assert_eq!(counts.total(), total);

        let text = blocks.join("\n").trim().to_string();
        let mut content = ExtractedContent::new(text, DocumentType::Pdf);
        content.pages = Some(counts);
        debug!(words = content.word_count, "PDF text assembled");
        Ok(content)
    }
}
