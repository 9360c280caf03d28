//! Console output utilities.

use console::{style, StyledObject};

fn tagged(tag: StyledObject<&str>, message: &str) -> String {
    format!("{} {}", tag.bold(), message)
}

pub fn print_info(message: &str) {
    println!("{}", tagged(style("INFO").cyan(), message));
}

pub fn print_success(message: &str) {
    println!("{}", tagged(style("OK").green(), message));
}

/// Recoverable problems: skipped sections, unsaved cookies.
pub fn print_warning(message: &str) {
    println!("{}", tagged(style("WARN").yellow(), message));
}

/// Errors go to stderr so piped output stays clean.
pub fn print_error(message: &str) {
    eprintln!("{}", tagged(style("ERROR").red(), message));
}

pub fn print_banner() {
    println!(
        "{} {}",
        style("instagram-client").magenta().bold(),
        style(env!("CARGO_PKG_VERSION")).dim()
    );
}

/// Print the account and directory a command runs with.
pub fn print_session_summary(account: &str, command: &str, download_dir: &str) {
    println!();
    for (label, value) in [
        ("Account", format!("@{}", account)),
        ("Command", command.to_string()),
        ("Directory", download_dir.to_string()),
    ] {
        println!("  {:<10} {}", style(label).bold(), value);
    }
    println!();
}
