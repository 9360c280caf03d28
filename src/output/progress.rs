//! Progress bar utilities.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Spinner for a single blocking step such as login.
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner().with_message(message.to_string());
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.magenta} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Byte bar for a large CDN download.
pub fn create_download_bar(total: u64) -> ProgressBar {
    ProgressBar::new(total).with_style(bar_style(
        "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
    ))
}

/// Byte bar for a chunked upload. The position tracks the acknowledged
/// offset, so a retried chunk never moves it backwards.
pub fn create_transfer_bar(total: u64) -> ProgressBar {
    ProgressBar::new(total).with_style(bar_style(
        "{spinner:.green} upload [{bar:40.magenta/blue}] {bytes}/{total_bytes} ({eta})",
    ))
}

/// Counting bar, e.g. posts of a profile.
pub fn create_item_bar(total: u64, message: &str) -> ProgressBar {
    ProgressBar::new(total).with_style(bar_style(&format!(
        "{{spinner:.green}} {} [{{bar:40.cyan/blue}}] {{pos}}/{{len}}",
        message
    )))
}
