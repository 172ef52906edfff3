use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

/// Receives progress for a unit of work with a known number of steps
/// (pages of a PDF, files of a batch). Callers pick the implementation.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, label: &str, total: usize);

    /// `done` is the number of completed steps so far.
    fn advance(&self, done: usize);

    fn finish(&self);
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn start(&self, _label: &str, _total: usize) {}

    fn advance(&self, _done: usize) {}

    fn finish(&self) {}
}

/// Emits one debug event per step.
#[derive(Debug, Default)]
pub struct LogProgress {
    state: Mutex<Option<(String, usize)>>,
}

impl ProgressReporter for LogProgress {
    fn start(&self, label: &str, total: usize) {
        if let Ok(mut state) = self.state.lock() {
            *state = Some((label.to_string(), total));
        }
    }

    fn advance(&self, done: usize) {
        if let Ok(state) = self.state.lock() {
            if let Some((label, total)) = state.as_ref() {
                tracing::debug!(label = %label, done, total, "progress");
            }
        }
    }

    fn finish(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = None;
        }
    }
}

/// Terminal progress bar.
pub struct BarProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl BarProgress {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for BarProgress {
    fn start(&self, label: &str, total: usize) {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(Self::style());
        bar.set_message(label.to_string());
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(previous) = slot.replace(bar) {
                previous.finish_and_clear();
            }
        }
    }

    fn advance(&self, done: usize) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.set_position(done as u64);
            }
        }
    }

    fn finish(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records every call for assertions.
    #[derive(Default)]
    pub struct RecordingProgress {
        pub events: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn start(&self, label: &str, total: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("start {label} {total}"));
        }

        fn advance(&self, done: usize) {
            self.events.lock().unwrap().push(format!("advance {done}"));
        }

        fn finish(&self) {
            self.events.lock().unwrap().push("finish".to_string());
        }
    }

    #[test]
    fn test_log_progress_resets_on_finish() {
        let progress = LogProgress::default();
        progress.start("report.pdf", 2);
        progress.advance(1);
        progress.finish();
        assert!(progress.state.lock().unwrap().is_none());
    }

    #[test]
    fn test_bar_progress_lifecycle() {
        let progress = BarProgress::new();
        progress.start("pages", 3);
        progress.advance(2);
        assert_eq!(
            progress.bar.lock().unwrap().as_ref().map(|b| b.position()),
            Some(2)
        );
        progress.finish();
        assert!(progress.bar.lock().unwrap().is_none());
    }
}
