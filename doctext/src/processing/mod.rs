mod batch;
mod extractor;

pub mod extractors;
pub mod progress;

pub use batch::{output_file_name, BatchDriver, BatchReport, FileOutcome, FileReport};
pub use extractor::ContentExtractor;
pub use extractors::ExtractedContent;
pub use progress::{BarProgress, LogProgress, NoProgress, ProgressReporter};
