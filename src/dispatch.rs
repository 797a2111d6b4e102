//! Bulk dispatcher: iMessage first, SMS fallback, one contact at a time.
//!
//! Per contact: `Pending -> IMessageAttempted -> {Sent | SmsAttempted} ->
//! {Sent | Failed}`. The only retry is the single hop to SMS, taken when
//! iMessage reports the recipient unreachable or verification can't confirm
//! delivery.
//!
//! CHANGELOG:
//! - 10/19/2026 - Log the iMessage send before verifying; undelivered gets its own row
//! - 10/19/2026 - Branch on DeliveryOutcome instead of script error text
//! - 10/19/2026 - Initial implementation

use std::thread;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::channels::{Channel, ChannelInvoker, DeliveryOutcome, SendStatus};
use crate::contacts::phone::normalize_phone;
use crate::contacts::{Contact, ContactFeed};
use crate::send_log::{AttemptRecord, AttemptStatus, SendLog};
use crate::template;
use crate::verify::DeliveryVerifier;

/// Default pause between contacts, in seconds.
pub const DEFAULT_DELAY_SECS: f64 = 2.5;

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Message template, `{first_name}` is filled per contact.
    pub template: String,
    /// Pause after each attempted contact.
    pub delay: Duration,
    /// Render and log without sending.
    pub dry_run: bool,
    /// Only process the first N contacts (0 = all).
    pub limit: usize,
    /// Tag the first link with the recipient's digits.
    pub track_link: bool,
    pub link_field: String,
    /// Print a progress line per contact.
    pub echo: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            template: String::new(),
            delay: Duration::from_secs_f64(DEFAULT_DELAY_SECS),
            dry_run: false,
            limit: 0,
            track_link: false,
            link_field: template::DEFAULT_LINK_FIELD.to_string(),
            echo: false,
        }
    }
}

/// Final state of one contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactOutcome {
    Sent(SendStatus),
    Failed(String),
    /// Phone could not be normalized; nothing was attempted.
    Skipped,
    DryRun,
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub log_file: String,
    pub total: usize,
    pub processed: usize,
    pub imessage_sent: usize,
    pub imessage_failed: usize,
    pub imessage_unreachable: usize,
    pub imessage_undelivered: usize,
    pub sms_sent: usize,
    pub sms_failed: usize,
    pub skipped: usize,
    pub dry_run: usize,
}

/// Runs a contact feed through the two channels.
pub struct Dispatcher<'a> {
    imessage: &'a dyn ChannelInvoker,
    sms: &'a dyn ChannelInvoker,
    verifier: Option<&'a dyn DeliveryVerifier>,
    log: SendLog,
    run_id: String,
    options: RunOptions,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        imessage: &'a dyn ChannelInvoker,
        sms: &'a dyn ChannelInvoker,
        log: SendLog,
        run_id: impl Into<String>,
        options: RunOptions,
    ) -> Self {
        Self {
            imessage,
            sms,
            verifier: None,
            log,
            run_id: run_id.into(),
            options,
        }
    }

    /// Check delivery after each iMessage send. Ignored in dry-run mode.
    pub fn with_verifier(mut self, verifier: &'a dyn DeliveryVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Process the feed in order, honoring the limit and pacing delay.
    pub fn run(&self, feed: &ContactFeed) -> Result<RunSummary> {
        let mut summary = RunSummary {
            run_id: self.run_id.clone(),
            log_file: self.log.path().display().to_string(),
            total: feed.len(),
            ..Default::default()
        };

        for contact in feed.all() {
            if self.options.limit > 0 && summary.processed >= self.options.limit {
                break;
            }
            summary.processed += 1;

            let outcome = self.process_contact(contact, &mut summary)?;
            if outcome != ContactOutcome::Skipped && !self.options.delay.is_zero() {
                thread::sleep(self.options.delay);
            }
        }

        info!(
            run_id = %summary.run_id,
            processed = summary.processed,
            total = summary.total,
            imessage_sent = summary.imessage_sent,
            sms_sent = summary.sms_sent,
            sms_failed = summary.sms_failed,
            "run finished"
        );
        Ok(summary)
    }

    /// Take one contact through the state machine, logging every attempt.
    pub fn process_contact(
        &self,
        contact: &Contact,
        summary: &mut RunSummary,
    ) -> Result<ContactOutcome> {
        let Some(phone) = normalize_phone(&contact.phone) else {
            summary.skipped += 1;
            let info = format!("Unusable phone: '{}'", contact.phone);
            self.echo(format_args!("[SKIP] {}", info));
            self.record("", &contact.first_name, None, AttemptStatus::Failed, info, "")?;
            return Ok(ContactOutcome::Skipped);
        };

        let mut message = template::render(&self.options.template, &contact.first_name);
        if self.options.track_link {
            message = template::personalize_link(&message, &phone, &self.options.link_field);
        }
        let first_name = contact.first_name.as_str();

        if self.options.dry_run {
            summary.dry_run += 1;
            self.echo(format_args!("[DRY RUN] Would send to {}: {}", phone, message));
            self.record(&phone, first_name, None, AttemptStatus::DryRun, "dry-run", &message)?;
            return Ok(ContactOutcome::DryRun);
        }

        match self.imessage.deliver(&phone, &message) {
            DeliveryOutcome::Delivered(status) => {
                // The message is out; log it before waiting on chat.db.
                self.echo(format_args!("[IMESSAGE SENT] {} ({})", phone, status));
                self.record(&phone, first_name, Some(self.imessage.channel()), AttemptStatus::Sent, status.token(), &message)?;
                if self.delivery_confirmed(&phone) {
                    summary.imessage_sent += 1;
                    return Ok(ContactOutcome::Sent(status));
                }
                summary.imessage_undelivered += 1;
                self.echo(format_args!("[UNDELIVERED -> SMS] {}", phone));
                self.record(
                    &phone,
                    first_name,
                    Some(self.imessage.channel()),
                    AttemptStatus::Undelivered,
                    format!("{} not delivered within verify window", status),
                    &message,
                )?;
            }
            DeliveryOutcome::Unreachable => {
                summary.imessage_unreachable += 1;
                self.echo(format_args!("[NOT IMESSAGE -> SMS] {}", phone));
                self.record(&phone, first_name, Some(self.imessage.channel()), AttemptStatus::Unreachable, "NOT_IMESSAGE", &message)?;
            }
            DeliveryOutcome::Failed(err) => {
                summary.imessage_failed += 1;
                self.echo(format_args!("[IMESSAGE FAIL] {}: {}", phone, err));
                warn!(phone = %phone, error = %err, "iMessage delivery failed");
                self.record(&phone, first_name, Some(self.imessage.channel()), AttemptStatus::Failed, err.to_string(), &message)?;
                return Ok(ContactOutcome::Failed(err.to_string()));
            }
        }

        self.fall_back_to_sms(&phone, first_name, &message, summary)
    }

    fn fall_back_to_sms(
        &self,
        phone: &str,
        first_name: &str,
        message: &str,
        summary: &mut RunSummary,
    ) -> Result<ContactOutcome> {
        let detail = match self.sms.deliver(phone, message) {
            DeliveryOutcome::Delivered(status) => {
                summary.sms_sent += 1;
                self.echo(format_args!("[SMS SENT] {} ({})", phone, status));
                self.record(phone, first_name, Some(self.sms.channel()), AttemptStatus::SmsSent, status.token(), message)?;
                return Ok(ContactOutcome::Sent(status));
            }
            DeliveryOutcome::Unreachable => "recipient not reachable over SMS".to_string(),
            DeliveryOutcome::Failed(err) => err.to_string(),
        };

        summary.sms_failed += 1;
        self.echo(format_args!("[SMS FAIL] {}: {}", phone, detail));
        warn!(phone, error = %detail, "SMS fallback failed");
        self.record(phone, first_name, Some(self.sms.channel()), AttemptStatus::SmsFailed, detail.clone(), message)?;
        Ok(ContactOutcome::Failed(detail))
    }

    /// Without a verifier every accepted send counts as delivered. A verifier
    /// that errors also counts as delivered so nobody gets the message twice.
    fn delivery_confirmed(&self, phone: &str) -> bool {
        let Some(verifier) = self.verifier else {
            return true;
        };
        match verifier.confirm(phone) {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!(phone, error = %e, "delivery verification failed; assuming delivered");
                true
            }
        }
    }

    fn record(
        &self,
        phone: &str,
        first_name: &str,
        channel: Option<Channel>,
        status: AttemptStatus,
        info: impl Into<String>,
        message: &str,
    ) -> Result<()> {
        self.log.append(&AttemptRecord::new(
            &self.run_id,
            phone,
            first_name,
            channel,
            status,
            info,
            message,
        ))
    }

    fn echo(&self, line: std::fmt::Arguments<'_>) {
        if self.options.echo {
            println!("{}", line);
        }
    }
}
