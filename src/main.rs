//! instagram-client - CLI entry point.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use instagram_client::{
    api::InstagramClient,
    cli::{resolve_username, Args, Command},
    config::{validate_config, Config},
    download::{
        download_highlights, download_post, download_profile, download_reel, download_story,
        DownloadReport, ProfileOptions,
    },
    error::{exit_codes, Error, Result},
    interact::{comment_on_latest_post, comment_on_post, like_post, unlike_post},
    output::{
        create_spinner, print_banner, print_error, print_info, print_report,
        print_session_summary, print_success, print_summary, print_warning,
    },
    session::Session,
    upload::{upload_photo, upload_reel},
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            ExitCode::from(exit_code_for(&e) as u8)
        }
    }
}

fn exit_code_for(e: &Error) -> i32 {
    match e {
        Error::Config(_)
        | Error::ConfigValidation { .. }
        | Error::MissingConfig(_)
        | Error::TomlParse(_)
        | Error::InvalidUrl(_)
        | Error::UrlParse(_) => exit_codes::CONFIG_ERROR,
        Error::Authentication(_)
        | Error::ChallengeRequired { .. }
        | Error::Reauthentication(_)
        | Error::InvalidSession(_)
        | Error::SessionExpired(_) => exit_codes::AUTH_ERROR,
        Error::UploadRejected(_)
        | Error::Configuration(_)
        | Error::Upload(_)
        | Error::Media(_)
        | Error::FFmpeg(_)
        | Error::FFmpegNotFound => exit_codes::UPLOAD_ERROR,
        Error::Api(_)
        | Error::Rejected(_)
        | Error::Transient(_)
        | Error::NotFound(_)
        | Error::PrivateAccount(_) => exit_codes::API_ERROR,
        Error::Download(_) | Error::InvalidFilename(_) => exit_codes::DOWNLOAD_ERROR,
        Error::DuplicateComment { .. } => exit_codes::ABORT,
        _ => exit_codes::UNEXPECTED_ERROR,
    }
}

async fn run() -> Result<i32> {
    // Parse CLI arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt().with_env_filter(filter).with_target(false).init();

    print_banner();

    // Load configuration
    let config_path = args.config.clone();
    let config_exists = config_path.exists();
    let mut config = if config_exists {
        Config::load(&config_path)?
    } else {
        print_warning(&format!(
            "Configuration file not found: {}",
            config_path.display()
        ));
        print_info("Using default configuration with CLI arguments");
        Config::default()
    };

    // Merge CLI arguments into config
    args.merge_into_config(&mut config);

    validate_config(&config)?;
    if config.account.username.is_empty() {
        return Err(Error::MissingConfig(
            "account.username (use --username or IG_USERNAME)".to_string(),
        ));
    }

    print_session_summary(
        &config.account.username,
        args.command.name(),
        &config.download_directory().display().to_string(),
    );

    let mut client = InstagramClient::new(config.clone())?;

    match &args.command {
        Command::Login => {
            let password = config.account.password.clone().ok_or_else(|| {
                Error::MissingConfig("password (use --password or IG_PASSWORD)".to_string())
            })?;

            let spinner = create_spinner(&format!("Logging in as @{}...", config.account.username));
            let result = client.login(&config.account.username, &password).await;
            spinner.finish_and_clear();
            let session = result?;

            print_success(&format!(
                "Logged in as @{} (user id {})",
                session.account,
                session.user_id.as_deref().unwrap_or("unknown")
            ));
            print_info(&format!("Cookies saved to {}", config.cookie_file().display()));

            if !config_exists {
                save_account_config(&config, &config_path);
            }
            return Ok(exit_codes::SUCCESS);
        }
        Command::Logout => {
            match client.sessions().current().cloned() {
                Some(mut session) => {
                    client.logout(&mut session)?;
                    print_success(&format!("Logged out @{}", session.account));
                }
                None => {
                    if client.forget_account()? {
                        print_success(&format!(
                            "Removed the expired session of @{}",
                            config.account.username
                        ));
                    } else {
                        print_warning(&format!(
                            "No saved session for @{}",
                            config.account.username
                        ));
                    }
                }
            }
            return Ok(exit_codes::SUCCESS);
        }
        _ => {}
    }

    let mut session = client.connect().await?;
    let result = dispatch(&mut client, &mut session, &args.command).await;

    // Rotated cookies are worth keeping even when the command failed.
    if session.valid {
        if let Err(e) = client.persist(&session) {
            print_warning(&format!("Could not save session cookies: {}", e));
        }
    }

    result
}

async fn dispatch(
    client: &mut InstagramClient,
    session: &mut Session,
    command: &Command,
) -> Result<i32> {
    match command {
        Command::Post { url } => finish_download(download_post(client, session, url).await?),
        Command::Reel { url } => finish_download(download_reel(client, session, url).await?),
        Command::Story { url } => finish_download(download_story(client, session, url).await?),
        Command::Highlights { user } => {
            let username = resolve_username(user)?;
            finish_download(download_highlights(client, session, &username).await?)
        }
        Command::Profile { user, .. } => {
            let username = resolve_username(user)?;
            let options = ProfileOptions::from_config(client.config());
            finish_download(download_profile(client, session, &username, options).await?)
        }
        Command::UploadPhoto { path, caption } => {
            let media_id = upload_photo(client, session, path, caption).await?;
            print_success(&format!("Photo published (media id {})", media_id));
            Ok(exit_codes::SUCCESS)
        }
        Command::UploadReel {
            path,
            thumbnail,
            caption,
        } => {
            let media_id =
                upload_reel(client, session, path, thumbnail.as_deref(), caption).await?;
            print_success(&format!("Reel published (media id {})", media_id));
            Ok(exit_codes::SUCCESS)
        }
        Command::Comment { url, text } => {
            let comment_id = comment_on_post(client, session, url, text).await?;
            print_success(&format!("Comment posted (id {})", comment_id));
            Ok(exit_codes::SUCCESS)
        }
        Command::CommentLatest { user, text } => {
            let username = resolve_username(user)?;
            let comment_id = comment_on_latest_post(client, session, &username, text).await?;
            print_success(&format!(
                "Comment posted on the latest post of @{} (id {})",
                username, comment_id
            ));
            Ok(exit_codes::SUCCESS)
        }
        Command::Like { url } => {
            like_post(client, session, url).await?;
            print_success("Post liked");
            Ok(exit_codes::SUCCESS)
        }
        Command::Unlike { url } => {
            unlike_post(client, session, url).await?;
            print_success("Like removed");
            Ok(exit_codes::SUCCESS)
        }
        Command::Login | Command::Logout => Ok(exit_codes::SUCCESS),
    }
}

/// Print the report; partial failures turn into a download exit code.
fn finish_download(report: DownloadReport) -> Result<i32> {
    print_report(&report);
    print_summary(&report);

    if report.has_failures() {
        print_warning(&format!(
            "{} item(s) of {} could not be downloaded",
            report.failures.len(),
            report.target
        ));
        return Ok(exit_codes::DOWNLOAD_ERROR);
    }
    Ok(exit_codes::SUCCESS)
}

/// Remember the account in a fresh configuration file. The password is never
/// written.
fn save_account_config(config: &Config, path: &Path) {
    match config.save(path) {
        Ok(()) => print_info(&format!("Configuration written to {}", path.display())),
        Err(e) => print_warning(&format!("Could not write {}: {}", path.display(), e)),
    }
}
