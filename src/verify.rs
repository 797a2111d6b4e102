//! Post-send delivery verification.
//!
//! After an iMessage send, poll Messages.db until the message shows as
//! delivered or the window closes. An unconfirmed send is retried over SMS
//! by the dispatcher.
//!
//! CHANGELOG:
//! - 10/19/2026 - Reject infinite or overflowing second values instead of panicking
//! - 10/19/2026 - Initial implementation

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use tracing::debug;

use crate::db::{connection::open_db_at, delivery};

/// Default seconds before the first check.
pub const DEFAULT_VERIFY_WAIT: f64 = 2.0;
/// Default seconds before giving up and falling back to SMS.
pub const DEFAULT_VERIFY_TIMEOUT: f64 = 8.0;

/// Decides whether a just-sent message reached the recipient.
pub trait DeliveryVerifier {
    /// `Ok(true)` once delivered, `Ok(false)` when the window closed first.
    fn confirm(&self, phone: &str) -> Result<bool>;
}

/// Polls a Messages database file.
#[derive(Debug, Clone)]
pub struct ChatDbVerifier {
    db_path: PathBuf,
    wait: Duration,
    timeout: Duration,
    poll_interval: Duration,
}

impl ChatDbVerifier {
    pub fn new(db_path: impl Into<PathBuf>, wait: Duration, timeout: Duration) -> Self {
        Self {
            db_path: db_path.into(),
            wait,
            timeout,
            poll_interval: Duration::from_secs(1),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Reopened every poll so each check sees what Messages has written since.
    fn poll_once(&self, phone: &str) -> Result<bool> {
        let conn = open_db_at(&self.db_path)?;
        delivery::delivery_confirmed(&conn, phone)
    }
}

impl DeliveryVerifier for ChatDbVerifier {
    fn confirm(&self, phone: &str) -> Result<bool> {
        let start = Instant::now();
        thread::sleep(self.wait);

        loop {
            if self.poll_once(phone)? {
                debug!(phone, elapsed_ms = start.elapsed().as_millis() as u64, "delivery confirmed");
                return Ok(true);
            }
            if start.elapsed() >= self.timeout {
                debug!(phone, "delivery not confirmed before timeout");
                return Ok(false);
            }
            thread::sleep(self.poll_interval);
        }
    }
}

/// Seconds from the command line flag `flag` as a `Duration`.
///
/// Negatives (and NaN) clamp to zero; infinite or overflowing values are
/// rejected.
pub fn secs(flag: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value.max(0.0))
        .map_err(|e| anyhow!("{} must be a finite number of seconds, got {}: {}", flag, value, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::delivery::tests::schema;
    use rusqlite::Connection;

    fn db_file(delivered: bool) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        let conn = Connection::open(file.path()).unwrap();
        schema(&conn, true);
        conn.execute(
            "INSERT INTO handle (ROWID, id) VALUES (1, '+14085551234')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO message VALUES (1, 'hi', 1, 1, 100, ?1, ?2)",
            [delivered as i64, if delivered { 500 } else { 0 }],
        )
        .unwrap();
        file
    }

    #[test]
    fn test_confirms_delivered_message() {
        let file = db_file(true);
        let verifier = ChatDbVerifier::new(file.path(), Duration::ZERO, Duration::ZERO);
        assert!(verifier.confirm("+14085551234").unwrap());
    }

    #[test]
    fn test_times_out_on_undelivered_message() {
        let file = db_file(false);
        let verifier = ChatDbVerifier::new(file.path(), Duration::ZERO, Duration::from_millis(30))
            .with_poll_interval(Duration::from_millis(10));

        let started = Instant::now();
        assert!(!verifier.confirm("+14085551234").unwrap());
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_missing_database_is_an_error() {
        let verifier = ChatDbVerifier::new("/nonexistent/chat.db", Duration::ZERO, Duration::ZERO);
        assert!(verifier.confirm("+14085551234").is_err());
    }

    #[test]
    fn test_secs_clamps_negative() {
        assert_eq!(secs("--delay", -1.0).unwrap(), Duration::ZERO);
        assert_eq!(secs("--delay", f64::NAN).unwrap(), Duration::ZERO);
        assert_eq!(secs("--delay", 2.5).unwrap(), Duration::from_millis(2500));
    }

    #[test]
    fn test_secs_rejects_unbounded() {
        let err = secs("--verify-timeout", f64::INFINITY).unwrap_err();
        assert!(err.to_string().starts_with("--verify-timeout must be a finite number"));
        assert!(secs("--delay", 1e300).is_err());
    }
}
