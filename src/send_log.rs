//! Append-only CSV log of send attempts.
//!
//! One row per attempt. The file is opened, appended and closed for every row
//! so a killed run leaves a complete log behind.
//!
//! CHANGELOG:
//! - 10/19/2026 - Initial implementation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::channels::Channel;

/// Default log path.
pub const DEFAULT_LOG_FILE: &str = "send_log.csv";

/// Outcome code written to the `status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Delivered over iMessage.
    Sent,
    /// iMessage can't reach the recipient; SMS comes next.
    Unreachable,
    /// iMessage sent but delivery was not confirmed in time.
    Undelivered,
    Failed,
    SmsSent,
    SmsFailed,
    DryRun,
}

/// One log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub timestamp: String,
    pub phone: String,
    pub first_name: String,
    /// Empty for rows that never reached a channel.
    pub channel: String,
    pub status: AttemptStatus,
    pub info: String,
    pub run_id: String,
    pub message: String,
}

impl AttemptRecord {
    pub fn new(
        run_id: &str,
        phone: &str,
        first_name: &str,
        channel: Option<Channel>,
        status: AttemptStatus,
        info: impl Into<String>,
        message: &str,
    ) -> Self {
        Self {
            timestamp: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            phone: phone.to_string(),
            first_name: first_name.to_string(),
            channel: channel.map(|c| c.label().to_string()).unwrap_or_default(),
            status,
            info: info.into(),
            run_id: run_id.to_string(),
            message: message.to_string(),
        }
    }
}

/// Build a run id: local timestamp plus six hex chars.
pub fn new_run_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", chrono::Local::now().format("%Y%m%d-%H%M%S"), &suffix[..6])
}

/// Append-only writer for the send log.
#[derive(Debug, Clone)]
pub struct SendLog {
    path: PathBuf,
}

impl SendLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, writing the header first if the file is empty.
    pub fn append(&self, record: &AttemptRecord) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open send log {:?}", self.path))?;
        let is_empty = file.metadata().map(|m| m.len() == 0).unwrap_or(true);

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_empty)
            .from_writer(file);
        writer
            .serialize(record)
            .with_context(|| format!("Failed to write send log {:?}", self.path))?;
        writer.flush()?;
        Ok(())
    }

    /// Read every row back (used for reporting and tests).
    pub fn read_all(&self) -> Result<Vec<AttemptRecord>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to read send log {:?}", self.path))?;
        reader
            .deserialize()
            .collect::<std::result::Result<Vec<AttemptRecord>, _>>()
            .context("Malformed send log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: AttemptStatus, message: &str) -> AttemptRecord {
        AttemptRecord::new("run-1", "+14085551234", "Ana", Some(Channel::IMessage), status, "", message)
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = SendLog::new(dir.path().join("log.csv"));

        log.append(&record(AttemptStatus::Sent, "one")).unwrap();
        log.append(&record(AttemptStatus::SmsSent, "two, with comma")).unwrap();

        let raw = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "timestamp,phone,first_name,channel,status,info,run_id,message"
        );
        assert!(lines[1].contains(",imessage,sent,,run-1,one"));

        let rows = log.read_all().unwrap();
        assert_eq!(rows[1].status, AttemptStatus::SmsSent);
        assert_eq!(rows[1].message, "two, with comma");
    }

    #[test]
    fn test_appends_to_existing_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        SendLog::new(&path).append(&record(AttemptStatus::Sent, "a")).unwrap();
        SendLog::new(&path).append(&record(AttemptStatus::Failed, "b")).unwrap();

        let rows = SendLog::new(&path).read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].message, "a");
        assert_eq!(rows[1].status, AttemptStatus::Failed);
    }

    #[test]
    fn test_run_id_shape() {
        let id = new_run_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[1].len(), 6);
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_channel_blank_without_channel() {
        let r = AttemptRecord::new("r", "", "", None, AttemptStatus::Failed, "Unusable phone: 'x'", "");
        assert_eq!(r.channel, "");
    }
}
