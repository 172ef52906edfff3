use crate::models::{DocumentType, PageCounts};

#[derive(Debug)]
pub struct ExtractedContent {
    pub text: String,
    pub title: Option<String>,
    pub doc_type: DocumentType,
    pub word_count: usize,
    /// Present for PDFs only.
    pub pages: Option<PageCounts>,
}

impl ExtractedContent {
    pub fn new(text: String, doc_type: DocumentType) -> Self {
        let word_count = count_words(&text);
        Self {
            text,
            title: None,
            doc_type,
            word_count,
            pages: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

pub(crate) fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

pub mod docx;
pub mod pdf;
pub mod pdf_images;
pub mod xlsx;

pub use docx::DocxExtractor;
pub use pdf::{PdfDocument, PageResolver, PageSource, PdfExtractor, ResolvedPage};
pub use pdf_images::PdfImageExtractor;
pub use xlsx::XlsxExtractor;
