//! Statistics reporting.

use console::style;

use crate::download::DownloadReport;

/// Print statistics for one download command.
pub fn print_report(report: &DownloadReport) {
    println!();
    println!("{}", style(format!("Statistics for {}:", report.target)).bold());
    println!("  Pictures: {}", report.image_count);
    println!("  Videos:   {}", report.video_count);
    println!("  Skipped:  {} (already on disk)", report.skipped_count);
    println!("  Total:    {} downloaded", report.total_downloaded());

    if report.has_failures() {
        println!("  Failed:   {}", style(report.failures.len()).red());
        for (name, reason) in &report.failures {
            println!("    {} {}: {}", style("-").dim(), name, reason);
        }
    }
}

/// Print a summary line for quick viewing.
pub fn print_summary(report: &DownloadReport) {
    println!(
        "Downloaded: {} pics, {} vids ({} skipped, {} failed)",
        style(report.image_count).green(),
        style(report.video_count).green(),
        style(report.skipped_count).yellow(),
        style(report.failures.len()).red()
    );
}
