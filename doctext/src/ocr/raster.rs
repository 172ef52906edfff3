use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use tracing::{debug, warn};

use super::Rasterizer;
use crate::config::OcrConfig;
use crate::error::{DoctextError, Result};

/// Renders PDF pages with poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: String,
    dpi: u32,
    /// Checked on first use.
    available: OnceLock<bool>,
}

impl PdftoppmRasterizer {
    const OUTPUT_STEM: &'static str = "page";

    pub fn new(config: &OcrConfig) -> Self {
        Self {
            program: config.rasterizer.clone(),
            dpi: config.dpi,
            available: OnceLock::new(),
        }
    }

    fn command(&self, pdf: &Path, page_number: usize, scratch_dir: &Path) -> Command {
        let page = page_number.to_string();
        let mut cmd = Command::new(&self.program);
        cmd.arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg(&page)
            .arg("-l")
            .arg(&page)
            .arg("-singlefile")
            .arg(pdf)
            .arg(scratch_dir.join(Self::OUTPUT_STEM));
        cmd
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf: &Path, page_number: usize, scratch_dir: &Path) -> Result<Vec<u8>> {
        debug!(page = page_number, dpi = self.dpi, "Rasterizing page");

        let output = self
            .command(pdf, page_number, scratch_dir)
            .output()
            .map_err(|e| DoctextError::Rasterize(format!("Failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DoctextError::Rasterize(format!(
                "{} exited with {} on page {page_number}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let image_path = scratch_dir.join(format!("{}.png", Self::OUTPUT_STEM));
        std::fs::read(&image_path).map_err(|e| {
            DoctextError::Rasterize(format!(
                "Rendered image missing at {}: {e}",
                image_path.display()
            ))
        })
    }

    fn dpi(&self) -> u32 {
        self.dpi
    }

    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| {
            let found = Command::new(&self.program).arg("-v").output().is_ok();
            if !found {
                warn!(program = %self.program, "Page rasterizer not found");
            }
            found
        })
    }
}
