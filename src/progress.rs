//! Console progress for the upload and the post-upload flash wait

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct UploadProgress {
    bar: ProgressBar,
}

impl UploadProgress {
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Uploading {bytes}/{total_bytes} [{bar:40.cyan/blue}] {binary_bytes_per_sec}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self::from_bar(bar)
    }

    /// Tracks counts without drawing anything.
    pub fn hidden(total: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total);
        Self::from_bar(bar)
    }

    fn from_bar(bar: ProgressBar) -> Self {
        Self { bar }
    }

    pub fn advance(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn total(&self) -> u64 {
        self.bar.length().unwrap_or(0)
    }

    /// Print a line above the bar without tearing it.
    pub fn note(&self, msg: &str) {
        if self.bar.is_hidden() {
            return;
        }
        self.bar.suspend(|| println!("{}", msg));
    }

    /// Clears the bar; the caller prints the summary line.
    pub fn finish_success(&self) {
        self.bar.finish_and_clear();
    }

    pub fn finish_error(&self) {
        self.bar.abandon();
    }
}

/// Cosmetic countdown while the device writes flash; it reads nothing from
/// the device, the step length is an estimate of the firmware's own timer.
pub fn flash_wait(steps: u32, step: Duration, visible: bool) {
    let bar = if visible {
        let bar = ProgressBar::new(steps as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Device is upgrading the firmware (estimated)... {pos}% [{bar:40.cyan/blue}]")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar
    } else {
        ProgressBar::hidden()
    };
    for percent in 1..=steps {
        bar.set_position(percent as u64);
        std::thread::sleep(step);
    }
    bar.finish_and_clear();
}
