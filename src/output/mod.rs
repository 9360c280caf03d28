//! Output module for console output and progress.
//!
//! Provides:
//! - Colored console output
//! - Progress bars for downloads and uploads
//! - Statistics reporting

pub mod console;
pub mod progress;
pub mod stats;

pub use console::{
    print_banner, print_error, print_info, print_session_summary, print_success, print_warning,
};
pub use progress::{create_download_bar, create_item_bar, create_spinner, create_transfer_bar};
pub use stats::{print_report, print_summary};
