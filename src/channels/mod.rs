//! Delivery channels: iMessage first, SMS as the fallback.
//!
//! Invokers report a [`DeliveryOutcome`] so the dispatcher can branch on the
//! variant. `Unreachable` is the "try the other channel" signal and is not an
//! error.
//!
//! CHANGELOG:
//! - 10/19/2026 - Channel-aware script error mapping; HostFailed for iMessage host faults
//! - 10/19/2026 - Tagged outcome type replaces string-matched script errors
//! - 10/19/2026 - Initial implementation

#[cfg(test)]
pub(crate) mod fake;
pub mod imessage;
pub mod script;
pub mod sms;

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub use imessage::IMessageInvoker;
pub use script::ScriptInvoker;
pub use sms::SmsInvoker;

/// The two delivery channels Messages.app offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Channel {
    /// iMessage (blue bubbles).
    #[serde(rename = "imessage")]
    IMessage,
    /// Carrier SMS relayed through an iPhone.
    #[serde(rename = "sms")]
    Sms,
}

impl Channel {
    /// AppleScript `service type` constant for this channel.
    pub fn service_type(self) -> &'static str {
        match self {
            Channel::IMessage => "iMessage",
            Channel::Sms => "SMS",
        }
    }

    /// Short label used in the send log.
    pub fn label(self) -> &'static str {
        match self {
            Channel::IMessage => "imessage",
            Channel::Sms => "sms",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_type())
    }
}

/// Which path delivered the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SendStatus {
    /// Sent into an existing SMS conversation.
    #[serde(rename = "SENT_SMS_EXISTING")]
    SmsExisting,
    /// Sent into a newly created SMS conversation.
    #[serde(rename = "SENT_SMS_CHAT")]
    SmsChat,
    /// Sent straight to the SMS participant.
    #[serde(rename = "SENT_SMS_BUDDY")]
    SmsBuddy,
    /// Sent over iMessage (direct participant or existing thread).
    #[serde(rename = "SENT_IMESSAGE")]
    IMessage,
}

impl SendStatus {
    pub fn token(self) -> &'static str {
        match self {
            SendStatus::SmsExisting => "SENT_SMS_EXISTING",
            SendStatus::SmsChat => "SENT_SMS_CHAT",
            SendStatus::SmsBuddy => "SENT_SMS_BUDDY",
            SendStatus::IMessage => "SENT_IMESSAGE",
        }
    }

    /// Parse a status token as printed by a send script.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim() {
            "SENT_SMS_EXISTING" => Some(SendStatus::SmsExisting),
            "SENT_SMS_CHAT" => Some(SendStatus::SmsChat),
            "SENT_SMS_BUDDY" => Some(SendStatus::SmsBuddy),
            "SENT_IMESSAGE" => Some(SendStatus::IMessage),
            _ => None,
        }
    }

}

impl fmt::Display for SendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Terminal delivery failures for a single contact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The account for this channel is missing or disabled in Messages.app.
    #[error("{}", unavailable_token(.0))]
    ServiceUnavailable(Channel),

    /// Every SMS send path was tried and failed.
    #[error("SMS_SEND_FAILED: {detail}")]
    SendFailed { detail: String },

    /// The automation host itself broke (osascript missing or not startable).
    #[error("{channel} automation failed: {detail}")]
    HostFailed { channel: Channel, detail: String },
}

impl DeliveryError {
    /// A host fault on `channel`. SMS keeps its `SMS_SEND_FAILED` token.
    pub fn host_failure(channel: Channel, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match channel {
            Channel::Sms => DeliveryError::SendFailed { detail },
            Channel::IMessage => DeliveryError::HostFailed { channel, detail },
        }
    }
}

fn unavailable_token(channel: &Channel) -> &'static str {
    match channel {
        Channel::IMessage => "NO_IMESSAGE_SERVICE",
        Channel::Sms => "NO_SMS_SERVICE",
    }
}

/// Result of one delivery attempt on one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered(SendStatus),
    /// The recipient cannot be reached on this channel (`NOT_IMESSAGE`).
    Unreachable,
    Failed(DeliveryError),
}

impl DeliveryOutcome {
    /// Classify the stderr of a failed send script run on `channel`.
    ///
    /// Scripts signal with `error "TOKEN"`, which osascript reports as
    /// `<file>:<range>: execution error: TOKEN (-2700)`. An iMessage script
    /// that dies without a token did not reach the recipient, so it maps to
    /// `Unreachable` and the SMS hop still runs.
    pub fn from_script_error(channel: Channel, stderr: &str) -> Self {
        static TOKEN: OnceLock<Regex> = OnceLock::new();
        let re = TOKEN.get_or_init(|| {
            Regex::new(
                r"\b(NO_SMS_SERVICE|NO_IMESSAGE_SERVICE|NOT_IMESSAGE|SMS_SEND_FAILED)\b(?::\s*(.*?))?\s*(?:\(-?\d+\))?\s*$",
            )
            .expect("static regex")
        });

        let trimmed = stderr.trim();
        let Some(caps) = trimmed.lines().find_map(|line| re.captures(line)) else {
            if channel == Channel::IMessage {
                debug!(stderr = %trimmed, "untokenized iMessage script error, treating as unreachable");
                return DeliveryOutcome::Unreachable;
            }
            let detail = if trimmed.is_empty() {
                "osascript failed".to_string()
            } else {
                trimmed.to_string()
            };
            return DeliveryOutcome::Failed(DeliveryError::SendFailed { detail });
        };

        match &caps[1] {
            "NOT_IMESSAGE" => DeliveryOutcome::Unreachable,
            "NO_IMESSAGE_SERVICE" => {
                DeliveryOutcome::Failed(DeliveryError::ServiceUnavailable(Channel::IMessage))
            }
            "NO_SMS_SERVICE" => {
                DeliveryOutcome::Failed(DeliveryError::ServiceUnavailable(Channel::Sms))
            }
            _ => DeliveryOutcome::Failed(DeliveryError::SendFailed {
                detail: caps
                    .get(2)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
            }),
        }
    }
}

/// Something that can attempt delivery of one message on one channel.
pub trait ChannelInvoker {
    fn channel(&self) -> Channel;

    fn deliver(&self, recipient: &str, text: &str) -> DeliveryOutcome;
}
