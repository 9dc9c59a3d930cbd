use extractor::Progress;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::Cell;

pub struct ScrapeProgress {
    enabled: bool,
    bar: Option<ProgressBar>,
    finished: Cell<bool>,
}

impl ScrapeProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            bar: None,
            finished: Cell::new(false),
        }
    }
}

impl Progress for ScrapeProgress {
    fn begin(&mut self, total: usize) {
        if !self.enabled {
            return;
        }
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} promos ({eta}) {msg}",
                )
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );
        self.bar = Some(pb);
    }

    fn url_started(&mut self, _index: usize, _total: usize, url: &str) {
        if let Some(ref pb) = self.bar {
            pb.set_message(url.to_string());
            pb.inc(1);
        }
    }

    fn finish(&mut self) {
        // If we've already finished once, don't finish again or clear the message later.
        if self.finished.replace(true) {
            return;
        }

        if let Some(ref pb) = self.bar {
            pb.finish_with_message("✓ Batch completed");
        }
    }
}

impl Drop for ScrapeProgress {
    fn drop(&mut self) {
        // Only auto-clear the progress bar if we haven't explicitly finished it.
        if !self.finished.get() {
            if let Some(ref pb) = self.bar {
                pb.finish_and_clear();
            }
        }
    }
}
