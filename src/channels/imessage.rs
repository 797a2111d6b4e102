//! iMessage delivery: direct participant first, then an existing thread.
//!
//! CHANGELOG:
//! - 10/19/2026 - Prefer a 1:1 thread over a group that includes the recipient
//! - 10/19/2026 - Initial implementation

use tracing::{debug, warn};

use super::{Channel, ChannelInvoker, DeliveryError, DeliveryOutcome, SendStatus};
use crate::applescript::{find_thread, HostError, MessagesHost};
use crate::contacts::phone;

/// Delivers over iMessage, reporting `Unreachable` when the recipient is not
/// reachable there.
pub struct IMessageInvoker<H> {
    host: H,
}

impl<H: MessagesHost> IMessageInvoker<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    /// Try every identifier variant as a direct participant.
    fn send_direct(&self, recipient: &str, text: &str) -> Result<bool, HostError> {
        for variant in phone::identifier_variants(recipient) {
            let Some(handle) = self.host.resolve_participant(Channel::IMessage, &variant)? else {
                debug!(variant = %variant, "no iMessage participant");
                continue;
            };
            match self.host.send_to_participant(Channel::IMessage, &handle, text) {
                Ok(()) => return Ok(true),
                Err(HostError::Script(e)) => {
                    warn!(handle = %handle, error = %e, "iMessage send to participant failed");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }

    /// Look for an iMessage thread that already includes the recipient.
    fn send_in_thread(&self, recipient: &str, text: &str) -> Result<bool, HostError> {
        let chats = self.host.list_chats(Channel::IMessage)?;
        let Some(chat) = find_thread(&chats, Channel::IMessage, recipient) else {
            return Ok(false);
        };

        match self.host.send_to_chat(&chat.id, text) {
            Ok(()) => Ok(true),
            Err(HostError::Script(e)) => {
                warn!(chat = %chat.id, error = %e, "iMessage send into thread failed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn try_deliver(&self, recipient: &str, text: &str) -> Result<DeliveryOutcome, HostError> {
        if !self.host.has_service(Channel::IMessage)? {
            return Ok(DeliveryOutcome::Failed(DeliveryError::ServiceUnavailable(
                Channel::IMessage,
            )));
        }

        if self.send_direct(recipient, text)? || self.send_in_thread(recipient, text)? {
            return Ok(DeliveryOutcome::Delivered(SendStatus::IMessage));
        }

        Ok(DeliveryOutcome::Unreachable)
    }
}

impl<H: MessagesHost> ChannelInvoker for IMessageInvoker<H> {
    fn channel(&self) -> Channel {
        Channel::IMessage
    }

    fn deliver(&self, recipient: &str, text: &str) -> DeliveryOutcome {
        match self.try_deliver(recipient, text) {
            Ok(outcome) => outcome,
            // A participant lookup or chat listing that errors out means the
            // path did not resolve; only a dead osascript is a real fault.
            Err(HostError::Script(e)) => {
                debug!(recipient, error = %e, "iMessage lookup failed, treating as unreachable");
                DeliveryOutcome::Unreachable
            }
            Err(e) => DeliveryOutcome::Failed(DeliveryError::host_failure(Channel::IMessage, e.to_string())),
        }
    }
}
