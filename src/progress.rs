use indicatif::{ProgressBar, ProgressStyle};

/// Receives progress notifications from the batch loops. Purely advisory:
/// nothing an observer does can change what gets converted or drawn.
pub trait ProgressObserver {
    fn start(&self, _len: u64) {}
    fn advance(&self) {}
    fn finish(&self) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

impl ProgressObserver for ProgressBar {
    fn start(&self, len: u64) {
        self.set_length(len);
    }

    fn advance(&self) {
        self.inc(1);
    }

    fn finish(&self) {
        ProgressBar::finish(self);
    }
}

/// Create a progress bar with the given label; the length is set by `start`
pub fn create_progress_bar(label: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
                label
            ))
            .progress_chars("#>-"),
    );
    pb
}
