//! Progress display for comparison runs.

use crossdiff::{ProgressCallback, ServiceComparisonResult};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar advanced once per finished service.
///
/// Safe to drive from worker threads; indicatif synchronizes internally.
pub struct ServiceProgress {
    bar: ProgressBar,
}

impl ServiceProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        Self { bar }
    }

    /// A progress display that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ServiceProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCallback for ServiceProgress {
    fn on_service_start(&self, service: &str, index: usize, total: usize) {
        log::debug!("Comparing {service} ({index}/{total})");
        self.bar.set_length(total as u64);
        self.bar.set_message(format!("Comparing {service}..."));
    }

    fn on_service_complete(&self, result: &ServiceComparisonResult) {
        self.bar.inc(1);
        self.bar.set_message(format!(
            "{} done ({} changes)",
            result.service_name,
            result.total_changes()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_progress_counts() {
        let progress = ServiceProgress::hidden();
        progress.on_service_start("s3", 1, 2);
        assert_eq!(progress.bar.length(), Some(2));
        progress.on_service_complete(&ServiceComparisonResult::new("s3"));
        progress.on_service_complete(&ServiceComparisonResult::new("sqs"));
        assert_eq!(progress.bar.position(), 2);
        progress.finish();
    }
}
