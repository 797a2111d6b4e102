//! Bulk send command: CSV in, one message per contact out.
//!
//! CHANGELOG:
//! - 10/19/2026 - Initial implementation

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::applescript::OsascriptHost;
use crate::channels::{Channel, ChannelInvoker, IMessageInvoker, ScriptInvoker, SmsInvoker};
use crate::contacts::ContactFeed;
use crate::db::connection::resolve_db_path;
use crate::dispatch::{Dispatcher, RunOptions, RunSummary};
use crate::output::OutputControls;
use crate::send_log::{new_run_id, SendLog};
use crate::verify::{secs, ChatDbVerifier};

/// Everything the send command needs, straight from the CLI.
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub csv_path: PathBuf,
    pub template: String,
    /// Replaces the built-in iMessage sender.
    pub applescript: Option<PathBuf>,
    /// Replaces the built-in SMS sender.
    pub sms_applescript: Option<PathBuf>,
    pub delay: f64,
    pub dry_run: bool,
    pub limit: usize,
    pub log_file: PathBuf,
    pub track_link: bool,
    pub link_field_name: String,
    pub verify_imessage: bool,
    pub verify_wait: f64,
    pub verify_timeout: f64,
    pub db: Option<String>,
}

fn invoker_for(channel: Channel, script: Option<&PathBuf>) -> Box<dyn ChannelInvoker> {
    match (script, channel) {
        (Some(path), _) => Box::new(ScriptInvoker::new(channel, path)),
        (None, Channel::IMessage) => Box::new(IMessageInvoker::new(OsascriptHost)),
        (None, Channel::Sms) => Box::new(SmsInvoker::new(OsascriptHost)),
    }
}

/// Validate inputs, then run the whole feed.
pub fn execute(req: &SendRequest, output: &OutputControls) -> Result<RunSummary> {
    if !req.csv_path.exists() {
        bail!("CSV not found at {}", req.csv_path.display());
    }

    if !req.dry_run {
        for script in [&req.applescript, &req.sms_applescript].into_iter().flatten() {
            if !script.exists() {
                bail!("AppleScript not found at {}", script.display());
            }
        }
    }

    let delay = secs("--delay", req.delay)?;
    let verifier = if req.verify_imessage && !req.dry_run {
        let db_path = resolve_db_path(req.db.as_deref());
        if !db_path.exists() {
            bail!(
                "Messages DB not found at {}. Grant Full Disk Access or pass --db to a copy.",
                db_path.display()
            );
        }
        Some(ChatDbVerifier::new(
            db_path,
            secs("--verify-wait", req.verify_wait)?,
            secs("--verify-timeout", req.verify_timeout)?,
        ))
    } else {
        None
    };

    let feed = ContactFeed::load(&req.csv_path)?;
    if !output.json {
        println!("Loaded {} rows from {}", feed.len(), req.csv_path.display());
    }

    let imessage = invoker_for(Channel::IMessage, req.applescript.as_ref());
    let sms = invoker_for(Channel::Sms, req.sms_applescript.as_ref());

    let options = RunOptions {
        template: req.template.clone(),
        delay,
        dry_run: req.dry_run,
        limit: req.limit,
        track_link: req.track_link,
        link_field: req.link_field_name.clone(),
        echo: !output.json,
    };

    let mut dispatcher = Dispatcher::new(
        imessage.as_ref(),
        sms.as_ref(),
        SendLog::new(&req.log_file),
        new_run_id(),
        options,
    );
    if let Some(verifier) = verifier.as_ref() {
        dispatcher = dispatcher.with_verifier(verifier);
    }

    dispatcher.run(&feed)
}

/// Run the send command and print the summary.
pub fn run(req: &SendRequest, output: &OutputControls) -> Result<()> {
    let summary = execute(req, output)?;
    output.print_summary(&summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::send_log::AttemptStatus;

    fn request(dir: &std::path::Path, csv: &str) -> SendRequest {
        let csv_path = dir.join("contacts.csv");
        std::fs::write(&csv_path, csv).unwrap();
        SendRequest {
            csv_path,
            template: "Hi {first_name}".to_string(),
            applescript: None,
            sms_applescript: None,
            delay: 0.0,
            dry_run: true,
            limit: 0,
            log_file: dir.join("send_log.csv"),
            track_link: false,
            link_field_name: "cid".to_string(),
            verify_imessage: false,
            verify_wait: 0.0,
            verify_timeout: 0.0,
            db: None,
        }
    }

    fn quiet() -> OutputControls {
        OutputControls {
            json: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_dry_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(
            dir.path(),
            "phone,first_name,email\n+14085550001,Ana,\n4085550002,Bo,bo@x.y\nbad,Cy,\n",
        );

        let summary = execute(&req, &quiet()).unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.dry_run, 2);
        assert_eq!(summary.skipped, 1);
        let rows = SendLog::new(&req.log_file).read_all().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].phone, "+14085550002");
        assert_eq!(rows[1].message, "Hi Bo");
        assert_eq!(rows[2].status, AttemptStatus::Failed);
        assert!(rows.iter().all(|r| r.run_id == summary.run_id));
    }

    #[test]
    fn test_missing_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = request(dir.path(), "phone\n");
        req.csv_path = dir.path().join("nope.csv");
        let err = execute(&req, &quiet()).unwrap_err();
        assert!(err.to_string().starts_with("CSV not found at"));
    }

    #[test]
    fn test_missing_script_rejected_when_sending() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = request(dir.path(), "phone\n+14085550001\n");
        req.dry_run = false;
        req.sms_applescript = Some(dir.path().join("send_sms_only.applescript"));
        let err = execute(&req, &quiet()).unwrap_err();
        assert!(err.to_string().contains("AppleScript not found"));
        assert!(!req.log_file.exists());
    }

    #[test]
    fn test_missing_script_ignored_in_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = request(dir.path(), "phone\n+14085550001\n");
        req.applescript = Some(dir.path().join("missing.applescript"));
        assert!(execute(&req, &quiet()).is_ok());
    }

    #[test]
    fn test_infinite_delay_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = request(dir.path(), "phone\n+14085550001\n");
        req.delay = f64::INFINITY;
        let err = execute(&req, &quiet()).unwrap_err();
        assert!(err.to_string().contains("--delay must be a finite number"));
        assert!(!req.log_file.exists());
    }

    #[test]
    fn test_missing_db_rejected_when_verifying() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = request(dir.path(), "phone\n+14085550001\n");
        req.dry_run = false;
        req.verify_imessage = true;
        req.db = Some(dir.path().join("chat.db").display().to_string());
        let err = execute(&req, &quiet()).unwrap_err();
        assert!(err.to_string().contains("Messages DB not found"));
    }
}
