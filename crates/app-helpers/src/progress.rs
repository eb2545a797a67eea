//! Progress bar styles shared by the tasks.

use indicatif::{ProgressBar, ProgressStyle};

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Overall progress over a list of items.
#[must_use]
pub fn items_bar(len: usize, message: &str) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(style(
        "{msg:<12} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {prefix}",
    ));
    bar.set_message(message.to_string());
    bar
}

/// A 0-100 bar for a single ffmpeg run.
#[must_use]
pub fn percent_bar(message: &str) -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(style("  {msg:<40!} [{bar:40.green/white}] {pos:>3}%"));
    bar.set_message(message.to_string());
    bar
}

#[must_use]
pub fn bytes_bar(len: u64, message: &str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(style(
        "  {msg:<40!} [{bar:40.yellow/white}] {bytes}/{total_bytes} ({bytes_per_sec})",
    ));
    bar.set_message(message.to_string());
    bar
}
