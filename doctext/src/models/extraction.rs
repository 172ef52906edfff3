use serde::Serialize;

/// How a single PDF page's text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOrigin {
    Native,
    Ocr,
}

/// Per-document page counters. `native + ocr` always equals the page count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCounts {
    pub native_pages: usize,
    pub ocr_pages: usize,
}

impl PageCounts {
    pub fn record(&mut self, origin: PageOrigin) {
        match origin {
            PageOrigin::Native => self.native_pages += 1,
            PageOrigin::Ocr => self.ocr_pages += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.native_pages + self.ocr_pages
    }
}
