//! Operator-supplied AppleScript senders.
//!
//! The script is run as `osascript <file> <recipient> <message>`. On success
//! it prints a status token; on failure it raises one of the error tokens.
//!
//! CHANGELOG:
//! - 10/19/2026 - Untokenized iMessage script errors fall through to SMS
//! - 10/19/2026 - Initial implementation

use std::path::PathBuf;

use tracing::debug;

use super::{Channel, ChannelInvoker, DeliveryError, DeliveryOutcome, SendStatus};
use crate::applescript::{self, ScriptOutput};

pub struct ScriptInvoker {
    channel: Channel,
    script: PathBuf,
}

impl ScriptInvoker {
    pub fn new(channel: Channel, script: impl Into<PathBuf>) -> Self {
        Self {
            channel,
            script: script.into(),
        }
    }

    /// Map a finished script run onto an outcome for this channel.
    pub fn interpret(&self, output: &ScriptOutput) -> DeliveryOutcome {
        if !output.success {
            return DeliveryOutcome::from_script_error(self.channel, &output.stderr);
        }

        match SendStatus::from_token(&output.stdout) {
            Some(status) => DeliveryOutcome::Delivered(status),
            None => {
                // Older scripts print nothing useful on success
                debug!(stdout = %output.stdout, "untokenized script success");
                DeliveryOutcome::Delivered(match self.channel {
                    Channel::IMessage => SendStatus::IMessage,
                    Channel::Sms => SendStatus::SmsBuddy,
                })
            }
        }
    }
}

impl ChannelInvoker for ScriptInvoker {
    fn channel(&self) -> Channel {
        self.channel
    }

    fn deliver(&self, recipient: &str, text: &str) -> DeliveryOutcome {
        match applescript::run_script_file(&self.script, &[recipient, text]) {
            Ok(output) => self.interpret(&output),
            Err(e) => DeliveryOutcome::Failed(DeliveryError::host_failure(self.channel, e.to_string())),
        }
    }
}
