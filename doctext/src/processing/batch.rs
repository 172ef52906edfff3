use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::BatchConfig;
use crate::error::{DoctextError, Result};
use crate::models::DocumentType;
use crate::processing::extractor::ContentExtractor;
use crate::processing::extractors::PdfImageExtractor;
use crate::processing::progress::{NoProgress, ProgressReporter};

/// `majd_zarai_<stem>_cleaned.txt`
pub fn output_file_name(stem: &str) -> String {
    format!("majd_zarai_{stem}_cleaned.txt")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Written { path: PathBuf },
    /// The handler succeeded but produced no text.
    Empty,
    Unsupported { extension: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub file_name: String,
    pub outcome: FileOutcome,
    pub images: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Written { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Unsupported { .. }))
    }

    pub fn empty(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Empty))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }
}

/// Extracts every supported file of the input directory, one at a time, in
/// name order.
pub struct BatchDriver {
    extractor: Arc<ContentExtractor>,
    config: BatchConfig,
    progress: Arc<dyn ProgressReporter>,
}

impl BatchDriver {
    pub fn new(extractor: Arc<ContentExtractor>, config: BatchConfig) -> Self {
        Self {
            extractor,
            config,
            progress: Arc::new(NoProgress),
        }
    }

    /// Per-file progress.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Fails only when the input directory cannot be listed; per-file
    /// failures are logged and recorded in the report.
    pub fn run(&self) -> Result<BatchReport> {
        let input_dir = &self.config.input_dir;
        if !input_dir.is_dir() {
            return Err(DoctextError::InputDirMissing(input_dir.clone()));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(input_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect();
        files.sort();

        let mut report = BatchReport::default();
        if files.is_empty() {
            warn!("No files found in the {} directory.", input_dir.display());
            return Ok(report);
        }

        self.progress.start("files", files.len());
        for (index, path) in files.iter().enumerate() {
            if path.is_file() {
                report.files.push(self.process_file(path));
            } else {
                debug!(path = %path.display(), "Skipping non-file entry");
            }
            self.progress.advance(index + 1);
        }
        self.progress.finish();

        info!(
            written = report.written(),
            skipped = report.skipped(),
            empty = report.empty(),
            failed = report.failed(),
            "Batch finished"
        );
        Ok(report)
    }

    pub fn process_file(&self, path: &Path) -> FileReport {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let lowered = PathBuf::from(file_name.to_lowercase());
        let stem = lowered
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        info!("Processing: {}", file_name);

        let doc_type = ContentExtractor::detect_type(&lowered);
        if !doc_type.is_supported() {
            let extension = lowered
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            warn!(
                "Unsupported file type: {} - Skipping '{}'",
                extension, file_name
            );
            return FileReport {
                file_name,
                outcome: FileOutcome::Unsupported { extension },
                images: 0,
            };
        }

        let extracted = self.extractor.extract(path, doc_type);

        let images = if doc_type == DocumentType::Pdf && self.config.extract_images {
            PdfImageExtractor::extract(path, &self.config.images_root())
        } else {
            0
        };

        let outcome = match extracted {
            Ok(content) if content.is_empty() => {
                warn!("No content extracted from: {}", file_name);
                FileOutcome::Empty
            }
            Ok(content) => match self.save_text(&stem, &content.text) {
                Ok(path) => FileOutcome::Written { path },
                Err(e) => {
                    error!("{}", e);
                    FileOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            },
            Err(e) => {
                error!("Failed to process '{}': {}", file_name, e);
                FileOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        FileReport {
            file_name,
            outcome,
            images,
        }
    }

    fn save_text(&self, stem: &str, text: &str) -> Result<PathBuf> {
        let output_dir = &self.config.output_dir;
        let path = output_dir.join(output_file_name(stem));
        std::fs::create_dir_all(output_dir)
            .and_then(|()| std::fs::write(&path, text))
            .map_err(|source| DoctextError::Write {
                path: path.clone(),
                source,
            })?;
        info!("Output saved to: {}", path.display());
        Ok(path)
    }
}
