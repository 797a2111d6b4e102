//! bulk-imessage - personalized bulk iMessage with SMS fallback
//!
//! Reads a CSV contact list, sends each contact a templated message through
//! Messages.app and falls back to SMS when iMessage can't reach them.
//!
//! CHANGELOG:
//! - 10/19/2026 - Bulk send CLI replaces the read/query command set
//! - 01/10/2026 - Initial scaffold with CLI skeleton

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use bulk_imessage::commands::send::{self, SendRequest};
use bulk_imessage::dispatch::DEFAULT_DELAY_SECS;
use bulk_imessage::output::{self, OutputControls};
use bulk_imessage::send_log::DEFAULT_LOG_FILE;
use bulk_imessage::template::DEFAULT_LINK_FIELD;
use bulk_imessage::verify::{DEFAULT_VERIFY_TIMEOUT, DEFAULT_VERIFY_WAIT};

/// Bulk iMessage sender with delivery verification and SMS fallback.
#[derive(Parser, Debug)]
#[command(name = "bulk-imessage")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Output the run summary as JSON (suppresses per-contact lines)
    #[arg(long, global = true)]
    json: bool,

    /// Compact JSON output (no whitespace)
    #[arg(long, global = true)]
    compact: bool,

    /// Comma-separated field allowlist for JSON output
    #[arg(long, global = true)]
    fields: Option<String>,

    /// CSV with at least 'phone'. Optional 'first_name'
    csv_path: PathBuf,

    /// Message template (supports {first_name})
    #[arg(short, long)]
    message: String,

    /// AppleScript file to use instead of the built-in iMessage sender
    #[arg(long)]
    applescript: Option<PathBuf>,

    /// AppleScript file to use instead of the built-in SMS sender
    #[arg(long)]
    sms_applescript: Option<PathBuf>,

    /// Delay between rows (seconds)
    #[arg(long, default_value_t = DEFAULT_DELAY_SECS)]
    delay: f64,

    /// No sends; just print/log
    #[arg(long)]
    dry_run: bool,

    /// Only the first N rows (0 = all)
    #[arg(short, long, default_value_t = 0)]
    limit: usize,

    /// Output log CSV
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Append ?cid=<digits> to the first link
    #[arg(long)]
    track_link: bool,

    /// Query parameter name for link tracking
    #[arg(long, default_value = DEFAULT_LINK_FIELD)]
    link_field_name: String,

    /// After an iMessage send, poll Messages.db; send SMS if still undelivered
    #[arg(long)]
    verify_imessage: bool,

    /// Seconds to wait before the first delivery check
    #[arg(long, default_value_t = DEFAULT_VERIFY_WAIT)]
    verify_wait: f64,

    /// Max seconds to wait before falling back to SMS
    #[arg(long, default_value_t = DEFAULT_VERIFY_TIMEOUT)]
    verify_timeout: f64,

    /// Path to chat.db (default: ~/Library/Messages/chat.db)
    #[arg(long)]
    db: Option<String>,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    // Build output controls from global flags
    let output_controls = OutputControls {
        json: cli.json,
        compact: cli.compact,
        fields: cli.fields.clone(),
    };

    let request = SendRequest {
        csv_path: cli.csv_path,
        template: cli.message,
        applescript: cli.applescript,
        sms_applescript: cli.sms_applescript,
        delay: cli.delay,
        dry_run: cli.dry_run,
        limit: cli.limit,
        log_file: cli.log_file,
        track_link: cli.track_link,
        link_field_name: cli.link_field_name,
        verify_imessage: cli.verify_imessage,
        verify_wait: cli.verify_wait,
        verify_timeout: cli.verify_timeout,
        db: cli.db,
    };

    match send::run(&request, &output_controls) {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            if output_controls.json {
                println!("{}", output::format_error(&format!("{:#}", e)));
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["bulk-imessage", "contacts.csv", "--message", "Hi {first_name}"]);
        assert_eq!(cli.delay, 2.5);
        assert_eq!(cli.limit, 0);
        assert_eq!(cli.log_file, PathBuf::from("send_log.csv"));
        assert_eq!(cli.link_field_name, "cid");
        assert_eq!(cli.verify_wait, 2.0);
        assert_eq!(cli.verify_timeout, 8.0);
        assert!(!cli.dry_run && !cli.verify_imessage && !cli.track_link);
    }

    #[test]
    fn test_cli_requires_message() {
        assert!(Cli::try_parse_from(["bulk-imessage", "contacts.csv"]).is_err());
    }

    #[test]
    fn test_cli_full_flags() {
        let cli = Cli::parse_from([
            "bulk-imessage",
            "contacts.csv",
            "-m",
            "Hello",
            "--applescript",
            "send_imessage.applescript",
            "--dry-run",
            "--limit",
            "5",
            "--verify-imessage",
            "--db",
            "~/chat_copy.db",
            "--json",
        ]);
        assert_eq!(cli.applescript, Some(PathBuf::from("send_imessage.applescript")));
        assert_eq!(cli.limit, 5);
        assert!(cli.dry_run && cli.verify_imessage && cli.json);
        assert_eq!(cli.db.as_deref(), Some("~/chat_copy.db"));
    }
}
